//! Dashboard colours
//! Lozenge colours follow the usual status palette (grey, green, red, blue,
//! purple, yellow) and can be overridden from the `[theme]` config table.

use ratatui::style::Color;

use crate::config::ThemeConfig;
use crate::queue::format::Appearance;

/// Foreground/background pair for one lozenge appearance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LozengeColors {
    pub fg: Color,
    pub bg: Color,
}

impl LozengeColors {
    const fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,       // Selection marker, key hints
    pub danger: Color,       // Alerts
    pub warning: Color,      // Status messages
    pub text: Color,
    pub text_dim: Color,     // Status item titles
    pub inactive: Color,     // Borders, connector lines
    pub link: Color,

    pub lozenge_default: LozengeColors,
    pub lozenge_success: LozengeColors,
    pub lozenge_removed: LozengeColors,
    pub lozenge_inprogress: LozengeColors,
    pub lozenge_new: LozengeColors,
    pub lozenge_moved: LozengeColors,
}

impl Default for Theme {
    fn default() -> Self {
        let dark = Color::Rgb(23, 43, 77);
        Self {
            accent: Color::Rgb(76, 154, 255),
            danger: Color::Rgb(255, 86, 48),
            warning: Color::Rgb(255, 171, 0),
            text: Color::Rgb(223, 225, 230),
            text_dim: Color::Rgb(122, 134, 154),
            inactive: Color::Rgb(80, 95, 121),
            link: Color::Rgb(76, 154, 255),

            lozenge_default: LozengeColors::new(Color::Rgb(66, 82, 110), Color::Rgb(223, 225, 230)),
            lozenge_success: LozengeColors::new(Color::Rgb(0, 102, 68), Color::Rgb(227, 252, 239)),
            lozenge_removed: LozengeColors::new(Color::Rgb(191, 38, 0), Color::Rgb(255, 235, 230)),
            lozenge_inprogress: LozengeColors::new(
                Color::Rgb(7, 71, 166),
                Color::Rgb(222, 235, 255),
            ),
            lozenge_new: LozengeColors::new(Color::Rgb(64, 50, 148), Color::Rgb(234, 230, 255)),
            lozenge_moved: LozengeColors::new(dark, Color::Rgb(255, 240, 179)),
        }
    }
}

impl Theme {
    /// Defaults with any configured overrides applied
    pub fn load(overrides: &ThemeConfig) -> Self {
        let mut theme = Self::default();

        let slots = [
            (&overrides.default, &mut theme.lozenge_default.bg),
            (&overrides.success, &mut theme.lozenge_success.bg),
            (&overrides.removed, &mut theme.lozenge_removed.bg),
            (&overrides.inprogress, &mut theme.lozenge_inprogress.bg),
            (&overrides.new, &mut theme.lozenge_new.bg),
            (&overrides.moved, &mut theme.lozenge_moved.bg),
            (&overrides.accent, &mut theme.accent),
        ];

        for (value, slot) in slots {
            if let Some(value) = value {
                match Self::parse_hex_color(value) {
                    Some(color) => *slot = color,
                    None => tracing::warn!("Ignoring invalid theme colour: {}", value),
                }
            }
        }

        theme
    }

    pub fn lozenge(&self, appearance: Appearance) -> LozengeColors {
        match appearance {
            Appearance::Default => self.lozenge_default,
            Appearance::Success => self.lozenge_success,
            Appearance::Removed => self.lozenge_removed,
            Appearance::InProgress => self.lozenge_inprogress,
            Appearance::New => self.lozenge_new,
            Appearance::Moved => self.lozenge_moved,
        }
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');

        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
