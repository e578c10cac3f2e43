use std::borrow::Cow;
use std::path::Path;

use bar::{BarRegistry, Cursor};
use config::{BarConfig, BaseColors, Spacing, TrailingMargin};
use proto::{Command, Limits, Parser, ProtocolError, Target};
use tracing::{debug, warn};

use crate::bevel::Bevel;
use crate::farbfeld::{self, PixelBuffer};
use crate::font::{FontMetrics, Typeface};
use crate::style::{Style, StyleTable};

/// Pixel sizes that drive the box model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layout {
    pub global_border: u32,
    pub inner_border: u32,
    pub segment_margin: u32,
    pub empty_width: u32,
    pub font: FontMetrics,
    pub trailing_margin: TrailingMargin,
}

impl Layout {
    pub fn new(spacing: Spacing, font: FontMetrics, trailing_margin: TrailingMargin) -> Self {
        Self {
            global_border: spacing.global_border,
            inner_border: spacing.inner_border,
            segment_margin: spacing.segment_margin,
            empty_width: spacing.empty_width,
            font,
            trailing_margin,
        }
    }

    /// Where the first segment starts.
    pub fn origin(&self) -> u32 {
        self.global_border.saturating_add(self.segment_margin)
    }

    pub fn content_height(&self) -> u32 {
        self.box_height()
            .saturating_add(self.global_border.saturating_mul(2))
            .saturating_add(self.segment_margin.saturating_mul(2))
    }

    pub fn box_height(&self) -> u32 {
        self.font.height.saturating_add(self.inner_border.saturating_mul(2))
    }

    /// Width of the bevelled box around `width` pixels of content.
    pub fn box_width(&self, width: u32) -> u32 {
        width.saturating_add(self.inner_border.saturating_mul(2))
    }

    /// Total advance of a segment whose content is `width` pixels wide.
    pub fn segment_advance(&self, width: u32) -> u32 {
        self.box_width(width).saturating_add(self.segment_margin)
    }

    pub fn text_width(&self, measured: u32) -> u32 {
        measured.saturating_add(self.font.horizontal_margin.saturating_mul(2))
    }

    fn segment_top(&self) -> i32 {
        self.origin() as i32
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Nothing was drawn; the previous frame stays on screen.
    Empty,
    /// Every bar holds a new frame.
    Ready { segments: usize },
}

/// Interprets messages into the bars' canvases.
pub struct Compositor<F> {
    layout: Layout,
    styles: StyleTable,
    base: BaseColors,
    font: F,
}

impl<F: Typeface> Compositor<F> {
    pub fn new(config: &BarConfig, font: F) -> Self {
        let layout = Layout::new(config.spacing, font.metrics(), config.trailing_margin);
        Self {
            layout,
            styles: StyleTable::from_config(config),
            base: config.base,
            font,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Runs one full pass over `message`. On success every bar's new canvas
    /// is committed; on error nothing is committed.
    pub fn run_pass(&mut self, bars: &mut BarRegistry, message: &[u8]) -> Result<Frame, ProtocolError> {
        let start = Cursor {
            dw: self.layout.origin(),
            dh: self.layout.content_height(),
        };
        for bar in bars.iter_mut() {
            bar.begin_pass(self.base.background, start);
        }

        let limits = Limits {
            bars: bars.len(),
            styles: self.styles.capacity(),
        };
        let mut trailing = vec![false; bars.len()];
        let mut target = None;
        let mut segments = 0;

        for command in Parser::new(message, limits) {
            match command? {
                Command::Select(selected) => target = Some(selected),
                Command::EndTarget => {
                    if let Some(ended) = target.take() {
                        if self.layout.trailing_margin == TrailingMargin::Retract {
                            self.retract_trailing_margin(bars, ended, &mut trailing);
                        }
                    }
                }
                Command::EndMessage => break,
                Command::Empty => {
                    let Some(target) = target else { continue };
                    self.draw_empty(bars, target, &mut trailing);
                    segments += 1;
                }
                Command::Text { style, text } => {
                    let style = *self.styles.get(style)?;
                    let Some(target) = target else { continue };
                    let text = String::from_utf8_lossy(text);
                    self.draw_text(bars, target, &style, &text, &mut trailing);
                    segments += 1;
                }
                Command::Image { style, path } => {
                    let style = *self.styles.get(style)?;
                    let Some(target) = target else { continue };
                    let path = payload_path(path);
                    match farbfeld::load(&path) {
                        Ok(image) => {
                            self.draw_image(bars, target, &style, &image, &mut trailing);
                            segments += 1;
                        }
                        Err(err) => warn!("skipping image {}: {err}", path.display()),
                    }
                }
            }
        }

        // A message may end without closing its last target.
        if self.layout.trailing_margin == TrailingMargin::Retract {
            self.retract_trailing_margin(bars, Target::All, &mut trailing);
        }
        self.draw_outer_border(bars);

        if segments == 0 {
            debug!("pass produced no content");
            return Ok(Frame::Empty);
        }
        for bar in bars.iter_mut() {
            bar.commit();
        }
        debug!("pass drew {segments} segments on {} bars", bars.len());
        Ok(Frame::Ready { segments })
    }

    fn draw_empty(&self, bars: &mut BarRegistry, target: Target, trailing: &mut [bool]) {
        for (index, bar) in bars.iter_mut().enumerate() {
            if target.includes(index) {
                bar.advance(self.layout.empty_width);
                trailing[index] = false;
            }
        }
    }

    fn draw_text(
        &mut self,
        bars: &mut BarRegistry,
        target: Target,
        style: &Style,
        text: &str,
        trailing: &mut [bool],
    ) {
        let layout = self.layout;
        let width = layout.text_width(self.font.measure(text));
        let box_width = layout.box_width(width);
        let box_height = layout.box_height();
        let top = layout.segment_top();
        let inner = layout.inner_border as i32;
        let bevel = segment_bevel(&layout, style);

        for (index, bar) in bars.iter_mut().enumerate() {
            if !target.includes(index) {
                continue;
            }
            let x = bar.cursor().dw as i32;
            let canvas = bar.canvas_mut();
            canvas.fill_rect(x, top, box_width, box_height, style.background);
            self.font.draw(
                canvas,
                x + inner + layout.font.horizontal_margin as i32,
                top + inner + layout.font.baseline as i32,
                text,
                style.text,
            );
            bevel.draw(canvas, x, top, box_width, box_height);
            bar.advance(layout.segment_advance(width));
            trailing[index] = true;
        }
    }

    fn draw_image(
        &self,
        bars: &mut BarRegistry,
        target: Target,
        style: &Style,
        image: &PixelBuffer,
        trailing: &mut [bool],
    ) {
        let layout = self.layout;
        let box_width = layout.box_width(image.width);
        let box_height = layout.box_height();
        let top = layout.segment_top();
        let inner = layout.inner_border as i32;
        let bevel = segment_bevel(&layout, style);

        for (index, bar) in bars.iter_mut().enumerate() {
            if !target.includes(index) {
                continue;
            }
            let x = bar.cursor().dw as i32;
            let canvas = bar.canvas_mut();
            canvas.blit_rgb(
                x + inner,
                top + inner,
                image.width,
                layout.font.height,
                &image.rgb,
            );
            bevel.draw(canvas, x, top, box_width, box_height);
            bar.advance(layout.segment_advance(image.width));
            trailing[index] = true;
        }
    }

    /// Takes back the margin added after the last segment of each targeted
    /// bar. Runs at every end of target, so a bar addressed by several blocks
    /// loses the margin after each of them.
    fn retract_trailing_margin(
        &self,
        bars: &mut BarRegistry,
        target: Target,
        trailing: &mut [bool],
    ) {
        for (index, bar) in bars.iter_mut().enumerate() {
            if target.includes(index) && std::mem::take(&mut trailing[index]) {
                bar.retract(self.layout.segment_margin);
            }
        }
    }

    fn draw_outer_border(&self, bars: &mut BarRegistry) {
        let border = self.layout.global_border;
        let bevel = Bevel {
            thickness: border,
            highlight: self.base.highlight,
            shadow: self.base.shadow,
        };
        for bar in bars.iter_mut() {
            let Cursor { dw, dh } = bar.cursor();
            bevel.draw(bar.canvas_mut(), 0, 0, dw + border, dh);
            bar.advance(border);
        }
    }
}

/// Image paths are taken byte for byte, as the filesystem stores them.
#[cfg(unix)]
fn payload_path(bytes: &[u8]) -> Cow<'_, Path> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(Path::new(std::ffi::OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn payload_path(bytes: &[u8]) -> Cow<'_, Path> {
    Cow::Owned(String::from_utf8_lossy(bytes).into_owned().into())
}

fn segment_bevel(layout: &Layout, style: &Style) -> Bevel {
    Bevel {
        thickness: layout.inner_border,
        highlight: style.highlight,
        shadow: style.shadow,
    }
}
