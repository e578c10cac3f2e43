use config::Color;

const BYTES_PER_PIXEL: usize = 4;

/// Off-screen RGBA pixel buffer. Every drawing call clips to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// The first `width` pixels of row `y`.
    pub fn row(&self, y: u32, width: u32) -> &[u8] {
        let start = y as usize * self.stride();
        let len = width.min(self.width) as usize * BYTES_PER_PIXEL;
        &self.pixels[start..start + len]
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(i64::from(x), i64::from(y))?;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[idx..idx + BYTES_PER_PIXEL]);
        Some(out)
    }

    pub fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba();
        for pixel in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgba);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        let rgba = color.to_rgba();
        let stride = self.stride();
        for py in y0..y1 {
            let row = py * stride;
            let span = &mut self.pixels[row + x0 * BYTES_PER_PIXEL..row + x1 * BYTES_PER_PIXEL];
            for pixel in span.chunks_exact_mut(BYTES_PER_PIXEL) {
                pixel.copy_from_slice(&rgba);
            }
        }
    }

    /// Horizontal line from `x0` to `x1`, both ends included.
    pub fn hline(&mut self, x0: i32, x1: i32, y: i32, color: Color) {
        if x1 < x0 {
            return;
        }
        self.fill_rect(x0, y, (x1 - x0 + 1) as u32, 1, color);
    }

    /// Vertical line from `y0` to `y1`, both ends included.
    pub fn vline(&mut self, x: i32, y0: i32, y1: i32, color: Color) {
        if y1 < y0 {
            return;
        }
        self.fill_rect(x, y0, 1, (y1 - y0 + 1) as u32, color);
    }

    /// Copies packed RGB rows of `width` pixels, at most `max_height` of them.
    pub fn blit_rgb(&mut self, x: i32, y: i32, width: u32, max_height: u32, rgb: &[u8]) {
        if width == 0 {
            return;
        }
        let src_stride = width as usize * 3;
        for (row, line) in rgb.chunks_exact(src_stride).take(max_height as usize).enumerate() {
            let py = i64::from(y) + row as i64;
            for (col, src) in line.chunks_exact(3).enumerate() {
                let px = i64::from(x) + col as i64;
                if let Some(idx) = self.index(px, py) {
                    self.pixels[idx..idx + 3].copy_from_slice(src);
                    self.pixels[idx + 3] = 255;
                }
            }
        }
    }

    /// Mixes `color` into the pixel at (`x`, `y`) with coverage `alpha`.
    pub fn blend(&mut self, x: i32, y: i32, color: Color, alpha: u8) {
        let Some(idx) = self.index(i64::from(x), i64::from(y)) else {
            return;
        };
        blend_pixel(&mut self.pixels[idx..idx + BYTES_PER_PIXEL], color.to_rgba(), alpha);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }

    fn clip(&self, x: i32, y: i32, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
        let x0 = i64::from(x).max(0);
        let y0 = i64::from(y).max(0);
        let x1 = (i64::from(x) + i64::from(width)).min(i64::from(self.width));
        let y1 = (i64::from(y) + i64::from(height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

fn blend_pixel(dst: &mut [u8], fg: [u8; 4], alpha: u8) {
    let a = alpha as u32;
    let inv = 255 - alpha as u32;
    dst[0] = ((fg[0] as u32 * a + dst[0] as u32 * inv) / 255) as u8;
    dst[1] = ((fg[1] as u32 * a + dst[1] as u32 * inv) / 255) as u8;
    dst[2] = ((fg[2] as u32 * a + dst[2] as u32 * inv) / 255) as u8;
    dst[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut canvas = Canvas::new(4, 3);
        canvas.fill_rect(-2, 1, 4, 10, RED);
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(0, 1), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(1, 2), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(2, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn fill_rect_outside_is_noop() {
        let mut canvas = Canvas::new(4, 3);
        canvas.fill_rect(10, 0, 2, 2, RED);
        canvas.fill_rect(0, -5, 2, 2, RED);
        canvas.fill_rect(0, 0, 0, 2, RED);
        assert!(canvas.pixels().iter().all(|b| *b == 0));
    }

    #[test]
    fn lines_include_both_ends() {
        let mut canvas = Canvas::new(5, 5);
        canvas.hline(1, 3, 0, RED);
        canvas.vline(4, 1, 2, BLUE);
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(1, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(3, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(4, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(4, 1), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(4, 2), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(4, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn reversed_lines_draw_nothing() {
        let mut canvas = Canvas::new(3, 3);
        canvas.hline(2, 1, 0, RED);
        canvas.vline(0, 2, 1, RED);
        assert!(canvas.pixels().iter().all(|b| *b == 0));
    }

    #[test]
    fn blit_rgb_clips_and_limits_rows() {
        let mut canvas = Canvas::new(3, 3);
        let rgb = [
            1, 2, 3, 4, 5, 6, //
            7, 8, 9, 10, 11, 12, //
            13, 14, 15, 16, 17, 18,
        ];
        canvas.blit_rgb(2, 0, 2, 2, &rgb);
        assert_eq!(canvas.pixel(2, 0), Some([1, 2, 3, 255]));
        assert_eq!(canvas.pixel(2, 1), Some([7, 8, 9, 255]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn blend_mixes_coverage() {
        let mut canvas = Canvas::new(1, 1);
        canvas.clear(Color::rgb(0, 0, 0));
        canvas.blend(0, 0, Color::rgb(255, 255, 255), 255);
        assert_eq!(canvas.pixel(0, 0), Some([255, 255, 255, 255]));
        canvas.clear(Color::rgb(0, 0, 0));
        canvas.blend(0, 0, Color::rgb(255, 0, 0), 51);
        assert_eq!(canvas.pixel(0, 0), Some([51, 0, 0, 255]));
        canvas.blend(5, 5, RED, 255);
    }

    #[test]
    fn row_is_limited_to_width() {
        let mut canvas = Canvas::new(4, 2);
        canvas.clear(RED);
        assert_eq!(canvas.row(1, 2).len(), 8);
        assert_eq!(canvas.row(0, 10).len(), 16);
    }
}
