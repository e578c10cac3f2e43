use bar::Canvas;
use config::Color;

/// Two-tone frame drawn around a box.
///
/// The shadow goes on the bottom and right edges first; the highlight is then
/// drawn over the top and left edges, each line one pixel shorter than the
/// previous, which leaves diagonal corners.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bevel {
    pub thickness: u32,
    pub highlight: Color,
    pub shadow: Color,
}

impl Bevel {
    pub fn draw(&self, canvas: &mut Canvas, x: i32, y: i32, width: u32, height: u32) {
        if self.thickness == 0 || width == 0 || height == 0 {
            return;
        }
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let t = i32::try_from(self.thickness).unwrap_or(i32::MAX).min(w).min(h);

        canvas.fill_rect(x, y + h - t, width, t as u32, self.shadow);
        canvas.fill_rect(x + w - t, y, t as u32, (h - t) as u32, self.shadow);

        for i in 0..t {
            canvas.vline(x + i, y, y + h - 1 - i, self.highlight);
            canvas.hline(x, x + w - 1 - i, y + i, self.highlight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT: Color = Color::rgb(0xd6, 0xd6, 0xd6);
    const DARK: Color = Color::rgb(0x53, 0x53, 0x53);
    const BG: Color = Color::rgb(0, 0, 0);

    fn render(width: u32, height: u32, thickness: u32) -> Vec<String> {
        let mut canvas = Canvas::new(width + 2, height + 2);
        canvas.clear(BG);
        let bevel = Bevel {
            thickness,
            highlight: LIGHT,
            shadow: DARK,
        };
        bevel.draw(&mut canvas, 1, 1, width, height);
        (0..canvas.height())
            .map(|y| {
                (0..canvas.width())
                    .map(|x| match canvas.pixel(x, y) {
                        Some(px) if px == LIGHT.to_rgba() => 'L',
                        Some(px) if px == DARK.to_rgba() => 'D',
                        _ => '.',
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn two_pixel_bevel_has_diagonal_corners() {
        assert_eq!(
            render(6, 5, 2),
            vec![
                "........",
                ".LLLLLL.",
                ".LLLLLD.",
                ".LL..DD.",
                ".LLDDDD.",
                ".LDDDDD.",
                "........",
            ]
        );
    }

    #[test]
    fn single_pixel_bevel() {
        assert_eq!(
            render(4, 3, 1),
            vec!["......", ".LLLL.", ".L..D.", ".LDDD.", "......"]
        );
    }

    #[test]
    fn zero_thickness_draws_nothing() {
        assert!(render(4, 3, 0).iter().all(|row| row.chars().all(|c| c == '.')));
    }

    #[test]
    fn oversized_thickness_is_clamped() {
        let rows = render(3, 2, 10);
        assert_eq!(rows[0], ".....");
        assert_eq!(rows[3], ".....");
        assert!(rows[1..3].iter().all(|row| !row[1..4].contains('.')));
    }
}
