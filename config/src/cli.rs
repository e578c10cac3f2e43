use std::ffi::OsString;

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use tracing::warn;

use crate::{
    default_style_slots, resolve_styles, BarConfig, BaseColors, ConfigError, FontSelector,
    HorizontalAlign, PlacementConfig, Spacing, StyleSlots, TrailingMargin, VerticalAlign,
    COLORS_PER_STYLE, DEFAULT_FONT, DEFAULT_FONT_HEIGHT_EXTRA, NUM_STYLES,
};

/// Bevelled status bar fed through stdin
#[derive(Parser, Debug)]
#[command(name = "bevelbar", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct Cli {
    /// Horizontal position of the bar on its monitor
    #[arg(short = 'h', long, value_enum, default_value_t = HorizontalAlign::Center)]
    horizontal: HorizontalAlign,

    /// Vertical position of the bar on its monitor
    #[arg(short = 'v', long, value_enum, default_value_t = VerticalAlign::Bottom)]
    vertical: VerticalAlign,

    /// Pixels between the monitor's left/right edge and the bar
    #[arg(short = 'H', long, value_parser = pixels(), default_value_t = 5)]
    horizontal_margin: u32,

    /// Pixels between the monitor's top/bottom edge and the bar
    #[arg(short = 'V', long, value_parser = pixels(), default_value_t = 5)]
    vertical_margin: u32,

    /// Width of the outer bevel
    #[arg(short = 'b', long, value_parser = pixels(), default_value_t = 2)]
    border: u32,

    /// Width of each segment's bevel
    #[arg(short = 'B', long, value_parser = pixels(), default_value_t = 2)]
    inner_border: u32,

    /// Pixels between adjacent segments
    #[arg(short = 'm', long, value_parser = pixels(), default_value_t = 1)]
    segment_margin: u32,

    /// Width of an empty segment
    #[arg(short = 'e', long, value_parser = pixels(), default_value_t = 7)]
    empty_width: u32,

    /// Font selector, e.g. "DejaVuSansMono-Bold:pixelsize=13"
    #[arg(short = 'f', long, default_value = DEFAULT_FONT)]
    font: String,

    /// Extra vertical room around the text, as a fraction of the font height
    #[arg(long, default_value_t = DEFAULT_FONT_HEIGHT_EXTRA)]
    font_height_extra: f32,

    /// Bar background color
    #[arg(short = 'p', long, default_value = "#a0a0a0")]
    background: String,

    /// Outer bevel highlight color
    #[arg(short = 'o', long, default_value = "#d6d6d6")]
    highlight: String,

    /// Outer bevel shadow color
    #[arg(short = 'O', long, default_value = "#535353")]
    shadow: String,

    /// Select a style slot; following -c options assign its colors
    #[arg(short = 's', long, action = ArgAction::Append)]
    style: Vec<i64>,

    /// Next color of the selected style: background, text, highlight, shadow
    #[arg(short = 'c', long, action = ArgAction::Append, allow_hyphen_values = true)]
    color: Vec<String>,

    /// Drop the margin after the last segment before drawing the outer bevel
    #[arg(long)]
    retract_trailing_margin: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

/// Largest accepted pixel distance.
const MAX_PIXELS: i64 = 4096;

fn pixels() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(..=MAX_PIXELS)
}

enum StyleArg<'a> {
    Select(i64),
    Color(&'a str),
}

pub(crate) fn parse<I, T>(args: I) -> Result<BarConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let slots = style_slots(&cli, &matches);

    Ok(BarConfig {
        placement: PlacementConfig {
            horizontal: cli.horizontal,
            vertical: cli.vertical,
            horizontal_margin: cli.horizontal_margin,
            vertical_margin: cli.vertical_margin,
        },
        spacing: Spacing {
            global_border: cli.border,
            inner_border: cli.inner_border,
            segment_margin: cli.segment_margin,
            empty_width: cli.empty_width,
        },
        trailing_margin: if cli.retract_trailing_margin {
            TrailingMargin::Retract
        } else {
            TrailingMargin::Keep
        },
        font: cli.font.parse::<FontSelector>()?,
        font_height_extra: cli.font_height_extra.max(0.0),
        base: BaseColors {
            background: cli.background.parse()?,
            highlight: cli.highlight.parse()?,
            shadow: cli.shadow.parse()?,
        },
        styles: resolve_styles(&slots)?,
    })
}

/// Replays `-s`/`-c` in command-line order on top of the default palette.
fn style_slots(cli: &Cli, matches: &ArgMatches) -> StyleSlots {
    let mut args: Vec<(usize, StyleArg<'_>)> = Vec::new();
    if let Some(indices) = matches.indices_of("style") {
        args.extend(indices.zip(cli.style.iter().map(|s| StyleArg::Select(*s))));
    }
    if let Some(indices) = matches.indices_of("color") {
        args.extend(indices.zip(cli.color.iter().map(|c| StyleArg::Color(c))));
    }
    args.sort_by_key(|(index, _)| *index);

    let mut slots = default_style_slots();
    let mut selector: Option<(usize, usize)> = None;
    for (_, arg) in args {
        match arg {
            StyleArg::Select(style) => {
                selector = usize::try_from(style)
                    .ok()
                    .filter(|s| *s < NUM_STYLES)
                    .map(|s| (s, 0));
                if selector.is_none() {
                    warn!("ignoring invalid style selector {style}");
                }
            }
            StyleArg::Color(color) => match selector {
                Some((style, slot)) => {
                    slots[style][slot] = Some(color.to_string());
                    selector = (slot + 1 < COLORS_PER_STYLE).then_some((style, slot + 1));
                }
                None => warn!(
                    "ignoring color {color:?}: no style selected or too many colors for one style"
                ),
            },
        }
    }
    slots
}
