use std::collections::HashMap;

use bar::Canvas;
use config::{Color, ConfigError, FontSelector};
use fontdue::Font;

/// Vertical text metrics in whole pixels, padding included.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FontMetrics {
    pub height: u32,
    pub baseline: u32,
    pub horizontal_margin: u32,
}

impl FontMetrics {
    /// `extra` adds room above and below the glyphs as a fraction of the
    /// unpadded height; half of it goes above the baseline.
    pub fn new(ascent: u32, descent: u32, line_height: u32, extra: f32) -> Self {
        let height = (ascent + descent).max(line_height);
        let baseline = height - descent.min(height);
        let extra = extra.max(0.0);
        let height_f = height as f32;
        let baseline = baseline + (0.5 * extra * height_f) as u32;
        let height = height + (extra * height_f) as u32;
        Self {
            height,
            baseline,
            horizontal_margin: (0.25 * height as f32) as u32,
        }
    }
}

/// Text measurement and drawing as the compositor needs it.
pub trait Typeface {
    fn metrics(&self) -> FontMetrics;

    /// Advance width of `text` in pixels.
    fn measure(&mut self, text: &str) -> u32;

    /// Draws `text` with its origin at `x` and its baseline at `baseline`.
    fn draw(&mut self, canvas: &mut Canvas, x: i32, baseline: i32, text: &str, color: Color);
}

pub struct FontRasterizer {
    font: Font,
    size: f32,
    metrics: FontMetrics,
    cache: HashMap<char, GlyphBitmap>,
}

impl FontRasterizer {
    pub fn new(bytes: Vec<u8>, size: f32, extra: f32) -> Result<Self, String> {
        let font = Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|err| err.to_string())?;
        let metrics = match font.horizontal_line_metrics(size) {
            Some(line) => FontMetrics::new(
                line.ascent.ceil().max(0.0) as u32,
                (-line.descent).ceil().max(0.0) as u32,
                line.new_line_size.ceil().max(0.0) as u32,
                extra,
            ),
            None => FontMetrics::new(size.ceil() as u32, 0, size.ceil() as u32, extra),
        };
        Ok(Self {
            font,
            size,
            metrics,
            cache: HashMap::new(),
        })
    }

    pub fn from_selector(selector: &FontSelector, extra: f32) -> Result<Self, ConfigError> {
        let (path, bytes) = selector.load()?;
        Self::new(bytes, selector.pixel_size, extra).map_err(|reason| ConfigError::FontLoad {
            family: path.display().to_string(),
            reason,
        })
    }

    fn glyph(&mut self, ch: char) -> &GlyphBitmap {
        let font = &self.font;
        let size = self.size;
        self.cache.entry(ch).or_insert_with(|| {
            let (metrics, bitmap) = font.rasterize(ch, size);
            GlyphBitmap {
                width: metrics.width as u32,
                height: metrics.height as u32,
                xmin: metrics.xmin,
                ymin: metrics.ymin,
                advance_width: metrics.advance_width,
                data: bitmap,
            }
        })
    }

    /// Pen position of every character, followed by the total advance.
    fn layout(&mut self, text: &str) -> (Vec<(char, f32)>, f32) {
        let mut pen = 0.0f32;
        let mut prev: Option<char> = None;
        let mut placed = Vec::with_capacity(text.len());
        for ch in text.chars() {
            if let Some(prev) = prev {
                pen += self.font.horizontal_kern(prev, ch, self.size).unwrap_or(0.0);
            }
            placed.push((ch, pen));
            pen += self.glyph(ch).advance_width;
            prev = Some(ch);
        }
        (placed, pen)
    }
}

impl Typeface for FontRasterizer {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn measure(&mut self, text: &str) -> u32 {
        let (_, advance) = self.layout(text);
        advance.ceil().max(0.0) as u32
    }

    fn draw(&mut self, canvas: &mut Canvas, x: i32, baseline: i32, text: &str, color: Color) {
        let (placed, _) = self.layout(text);
        for (ch, pen) in placed {
            let glyph = self.glyph(ch);
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let left = x + (pen + glyph.xmin as f32).round() as i32;
            let top = baseline - (glyph.ymin + glyph.height as i32);
            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    let alpha = glyph.data[(gy * glyph.width + gx) as usize];
                    if alpha == 0 {
                        continue;
                    }
                    canvas.blend(left + gx as i32, top + gy as i32, color, alpha);
                }
            }
        }
    }
}

struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    advance_width: f32,
    data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_add_padding_around_glyphs() {
        let metrics = FontMetrics::new(10, 3, 12, 0.5);
        // unpadded height 13, baseline 10
        assert_eq!(metrics.height, 19);
        assert_eq!(metrics.baseline, 13);
        assert_eq!(metrics.horizontal_margin, 4);
    }

    #[test]
    fn line_height_wins_when_larger() {
        let metrics = FontMetrics::new(8, 2, 14, 0.0);
        assert_eq!(metrics.height, 14);
        assert_eq!(metrics.baseline, 12);
        assert_eq!(metrics.horizontal_margin, 3);
    }

    #[test]
    fn negative_extra_is_ignored() {
        assert_eq!(FontMetrics::new(8, 2, 0, -1.0), FontMetrics::new(8, 2, 0, 0.0));
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        assert!(FontRasterizer::new(b"definitely not a font".to_vec(), 13.0, 0.5).is_err());
    }
}
