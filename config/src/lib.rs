use std::fmt;
use std::str::FromStr;

mod cli;
mod font;

pub use font::FontSelector;

pub const NUM_STYLES: usize = 10;
pub const COLORS_PER_STYLE: usize = 4;

pub const DEFAULT_FONT: &str = "DejaVuSansMono-Bold:pixelsize=13";
pub const DEFAULT_FONT_HEIGHT_EXTRA: f32 = 0.5;

const DEFAULT_BASE_COLORS: [&str; 3] = ["#a0a0a0", "#d6d6d6", "#535353"];
const DEFAULT_STYLES: [[&str; COLORS_PER_STYLE]; 6] = [
    ["#cbaa94", "#000000", "#d6d6d6", "#535353"],
    ["#a68b79", "#000000", "#535353", "#d6d6d6"],
    ["#a0a0a0", "#000000", "#d6d6d6", "#535353"],
    ["#828282", "#000000", "#535353", "#d6d6d6"],
    ["#ff0000", "#ffffff", "#d6d6d6", "#535353"],
    ["#ff0000", "#ffffff", "#535353", "#d6d6d6"],
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid color {0:?}, expected #rgb or #rrggbb")]
    InvalidColor(String),
    #[error("style {style} defines {defined} of {COLORS_PER_STYLE} colors")]
    IncompleteStyle { style: usize, defined: usize },
    #[error("invalid font selector {0:?}")]
    InvalidFont(String),
    #[error("font {family:?} not found")]
    FontNotFound { family: String },
    #[error("font {family:?} could not be loaded: {reason}")]
    FontLoad { family: String, reason: String },
    #[error(transparent)]
    Args(#[from] clap::Error),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum VerticalAlign {
    Top,
    #[default]
    Bottom,
}

/// Where a bar sits inside its monitor region.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlacementConfig {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub horizontal_margin: u32,
    pub vertical_margin: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            horizontal: HorizontalAlign::Center,
            vertical: VerticalAlign::Bottom,
            horizontal_margin: 5,
            vertical_margin: 5,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Spacing {
    pub global_border: u32,
    pub inner_border: u32,
    pub segment_margin: u32,
    pub empty_width: u32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            global_border: 2,
            inner_border: 2,
            segment_margin: 1,
            empty_width: 7,
        }
    }
}

/// What happens to the margin that follows the last segment of a bar.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TrailingMargin {
    #[default]
    Keep,
    Retract,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BaseColors {
    pub background: Color,
    pub highlight: Color,
    pub shadow: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StyleColors {
    pub background: Color,
    pub text: Color,
    pub highlight: Color,
    pub shadow: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarConfig {
    pub placement: PlacementConfig,
    pub spacing: Spacing,
    pub trailing_margin: TrailingMargin,
    pub font: FontSelector,
    pub font_height_extra: f32,
    pub base: BaseColors,
    pub styles: [Option<StyleColors>; NUM_STYLES],
}

impl BarConfig {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        cli::parse(args)
    }
}

impl Default for BarConfig {
    fn default() -> Self {
        let slots = default_style_slots();
        Self {
            placement: PlacementConfig::default(),
            spacing: Spacing::default(),
            trailing_margin: TrailingMargin::Keep,
            font: DEFAULT_FONT.parse::<FontSelector>().unwrap_or_default(),
            font_height_extra: DEFAULT_FONT_HEIGHT_EXTRA,
            base: default_base_colors(),
            styles: resolve_styles(&slots).unwrap_or([None; NUM_STYLES]),
        }
    }
}

type StyleSlots = [[Option<String>; COLORS_PER_STYLE]; NUM_STYLES];

fn default_style_slots() -> StyleSlots {
    let mut slots: StyleSlots = Default::default();
    for (slot, colors) in slots.iter_mut().zip(DEFAULT_STYLES) {
        for (entry, color) in slot.iter_mut().zip(colors) {
            *entry = Some(color.to_string());
        }
    }
    slots
}

fn default_base_colors() -> BaseColors {
    let [background, highlight, shadow] =
        DEFAULT_BASE_COLORS.map(|c| c.parse::<Color>().unwrap_or_default());
    BaseColors {
        background,
        highlight,
        shadow,
    }
}

fn resolve_styles(slots: &StyleSlots) -> Result<[Option<StyleColors>; NUM_STYLES], ConfigError> {
    let mut styles = [None; NUM_STYLES];
    for (index, slot) in slots.iter().enumerate() {
        if slot[0].is_none() {
            continue;
        }
        let defined = slot.iter().filter(|c| c.is_some()).count();
        let [Some(background), Some(text), Some(highlight), Some(shadow)] = slot else {
            return Err(ConfigError::IncompleteStyle {
                style: index,
                defined,
            });
        };
        styles[index] = Some(StyleColors {
            background: background.parse()?,
            text: text.parse()?,
            highlight: highlight.parse()?,
            shadow: shadow.parse()?,
        });
    }
    Ok(styles)
}
