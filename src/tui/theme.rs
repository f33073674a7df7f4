use std::str::FromStr;

use ratatui::style::Color;

use crate::model::UiConfig;

/// Colors used when drawing the content string
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub text: Color,
    pub dim: Color,
    pub highlight: Color,
    pub error: Color,
    pub header: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            text: Color::Reset,
            dim: Color::DarkGray,
            highlight: Color::Cyan,
            error: Color::Rgb(0xFF, 0x44, 0x44),
            header: Color::Rgb(0xFF, 0xFF, 0xFF),
        }
    }
}

/// Parse a hex color string like "#FF4444" into an RGB Color
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// A highlight color value: `#rrggbb` or a named terminal color.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    parse_hex_color(value).or_else(|| Color::from_str(value).ok())
}

impl Theme {
    /// Create a theme from the UI config, falling back to defaults
    pub fn from_config(ui: &UiConfig) -> Self {
        let mut theme = Theme::default();
        if let Some(color) = parse_color(&ui.highlight_color) {
            theme.highlight = color;
        }
        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(
            parse_hex_color("#FF4444"),
            Some(Color::Rgb(0xFF, 0x44, 0x44))
        );
        assert_eq!(parse_hex_color("FF4444"), None); // missing #
        assert_eq!(parse_hex_color("#FF44"), None); // too short
        assert_eq!(parse_hex_color("#ZZZZZZ"), None); // invalid hex
    }

    #[test]
    fn named_colors_parse() {
        assert_eq!(parse_color("magenta"), Some(Color::Magenta));
        assert_eq!(parse_color(" #0C001B "), Some(Color::Rgb(0x0C, 0x00, 0x1B)));
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("not-a-color"), None);
    }

    #[test]
    fn test_from_config_overrides() {
        let mut ui = UiConfig::default();
        ui.highlight_color = "yellow".into();
        assert_eq!(Theme::from_config(&ui).highlight, Color::Yellow);
        ui.highlight_color = "???".into();
        assert_eq!(Theme::from_config(&ui).highlight, Theme::default().highlight);
    }
}
