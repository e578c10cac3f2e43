use config::{BarConfig, Color, StyleColors, NUM_STYLES};
use proto::ProtocolError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Style {
    pub background: Color,
    pub text: Color,
    pub highlight: Color,
    pub shadow: Color,
}

impl From<StyleColors> for Style {
    fn from(colors: StyleColors) -> Self {
        Self {
            background: colors.background,
            text: colors.text,
            highlight: colors.highlight,
            shadow: colors.shadow,
        }
    }
}

/// Fixed set of style slots, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    slots: [Option<Style>; NUM_STYLES],
}

impl StyleTable {
    pub fn new(slots: [Option<Style>; NUM_STYLES]) -> Self {
        Self { slots }
    }

    pub fn from_config(config: &BarConfig) -> Self {
        Self::new(config.styles.map(|colors| colors.map(Style::from)))
    }

    pub const fn capacity(&self) -> usize {
        NUM_STYLES
    }

    pub fn get(&self, index: usize) -> Result<&Style, ProtocolError> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(ProtocolError::UndefinedStyle(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_defined_styles_only() {
        let table = StyleTable::from_config(&BarConfig::default());
        assert_eq!(table.capacity(), NUM_STYLES);
        assert_eq!(table.get(0).unwrap().background, Color::rgb(0xcb, 0xaa, 0x94));
        assert_eq!(table.get(6), Err(ProtocolError::UndefinedStyle(6)));
        assert_eq!(table.get(42), Err(ProtocolError::UndefinedStyle(42)));
    }
}
