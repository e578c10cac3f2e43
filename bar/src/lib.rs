use std::cmp::Ordering;

use config::{Color, HorizontalAlign, PlacementConfig, VerticalAlign};

mod canvas;

pub use canvas::Canvas;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }
}

/// Filled width and total content height of a bar's canvas.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Cursor {
    pub dw: u32,
    pub dh: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum BarError {
    #[error("no display regions found")]
    NoRegions,
    #[error("invalid region size: {width}x{height}")]
    InvalidRegion { width: u32, height: u32 },
}

/// One bar per display region. Drawing goes to the work canvas; a committed
/// pass swaps it with the presented one.
#[derive(Debug)]
pub struct Bar {
    region: Rect,
    work: Option<Canvas>,
    presented: Option<Canvas>,
    cursor: Cursor,
    shown: Option<Cursor>,
}

impl Bar {
    fn new(region: Rect) -> Self {
        Self {
            region,
            work: None,
            presented: None,
            cursor: Cursor::default(),
            shown: None,
        }
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Resets the work canvas and the cursor for a new pass.
    pub fn begin_pass(&mut self, background: Color, cursor: Cursor) {
        self.canvas_mut().clear(background);
        self.cursor = Cursor {
            dw: cursor.dw.min(self.region.width),
            dh: cursor.dh,
        };
    }

    /// The canvas the current pass draws into, allocated on first use.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        let Rect { width, height, .. } = self.region;
        self.work.get_or_insert_with(|| Canvas::new(width, height))
    }

    pub fn advance(&mut self, amount: u32) {
        self.cursor.dw = self.cursor.dw.saturating_add(amount).min(self.region.width);
    }

    pub fn retract(&mut self, amount: u32) {
        self.cursor.dw = self.cursor.dw.saturating_sub(amount);
    }

    /// Makes the work canvas the presented one.
    pub fn commit(&mut self) {
        if self.work.is_none() {
            return;
        }
        std::mem::swap(&mut self.work, &mut self.presented);
        self.shown = Some(self.cursor);
    }

    /// The last committed canvas together with its cursor.
    pub fn frame(&self) -> Option<(&Canvas, Cursor)> {
        Some((self.presented.as_ref()?, self.shown?))
    }

    /// Screen rectangle of the last committed frame.
    pub fn placement(&self, config: &PlacementConfig) -> Option<Rect> {
        Some(place(self.region, self.shown?, config))
    }
}

/// Positions a bar of `cursor` size inside `region`.
pub fn place(region: Rect, cursor: Cursor, config: &PlacementConfig) -> Rect {
    let h_margin = config.horizontal_margin;
    let width = cursor
        .dw
        .min(region.width.saturating_sub(h_margin.saturating_mul(2)));
    let free = i64::from(region.width) - i64::from(width);

    let x = i64::from(region.x)
        + match config.horizontal {
            HorizontalAlign::Left => i64::from(h_margin),
            HorizontalAlign::Center => free / 2,
            HorizontalAlign::Right => free - i64::from(h_margin),
        };
    let y = match config.vertical {
        VerticalAlign::Top => i64::from(region.y) + i64::from(config.vertical_margin),
        VerticalAlign::Bottom => {
            region.bottom() - i64::from(cursor.dh) - i64::from(config.vertical_margin)
        }
    };

    Rect {
        x: clamp_i32(x),
        y: clamp_i32(y),
        width,
        height: cursor.dh,
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Left to right; regions sharing a left edge go top to bottom.
fn region_order(a: &Rect, b: &Rect) -> Ordering {
    a.x.cmp(&b.x).then_with(|| {
        if a.bottom() <= i64::from(b.y) {
            Ordering::Less
        } else if b.bottom() <= i64::from(a.y) {
            Ordering::Greater
        } else {
            a.y.cmp(&b.y)
        }
    })
}

#[derive(Debug)]
pub struct BarRegistry {
    bars: Vec<Bar>,
}

impl BarRegistry {
    /// Builds one bar per distinct region. Mirrored outputs with identical
    /// geometry share a bar.
    pub fn new(regions: impl IntoIterator<Item = Rect>) -> Result<Self, BarError> {
        let mut unique: Vec<Rect> = Vec::new();
        for region in regions {
            if region.width == 0 || region.height == 0 {
                return Err(BarError::InvalidRegion {
                    width: region.width,
                    height: region.height,
                });
            }
            if !unique.contains(&region) {
                unique.push(region);
            }
        }
        if unique.is_empty() {
            return Err(BarError::NoRegions);
        }
        unique.sort_by(region_order);
        Ok(Self {
            bars: unique.into_iter().map(Bar::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bar> {
        self.bars.iter_mut()
    }
}
