//! Dark and light palettes
//!
//! Colors and style helpers for the TUI. The palette follows the persisted
//! [`ThemeMode`]: a red/amber accent over near-black (dark) or off-white
//! (light) backgrounds.

use ratatui::style::{Color, Modifier, Style};

use crate::store::ThemeMode;

/// Color palette for one theme mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Color,
    /// Panels and the status bar
    pub surface: Color,
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub text: Color,
    pub dim: Color,
    pub border: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // PALETTES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(0x0f, 0x0f, 0x12),
            surface: Color::Rgb(0x1a, 0x1a, 0x20),
            primary: Color::Rgb(0xf4, 0x3f, 0x5e),
            secondary: Color::Rgb(0xa7, 0x8b, 0xfa),
            accent: Color::Rgb(0xfb, 0xbf, 0x24),
            text: Color::Rgb(0xe5, 0xe5, 0xe5),
            dim: Color::Rgb(0x8a, 0x8a, 0x96),
            border: Color::Rgb(0x3f, 0x3f, 0x46),
            success: Color::Rgb(0x4a, 0xde, 0x80),
            warning: Color::Rgb(0xfb, 0x92, 0x3c),
            error: Color::Rgb(0xf8, 0x71, 0x71),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color::Rgb(0xfa, 0xfa, 0xf9),
            surface: Color::Rgb(0xe7, 0xe5, 0xe4),
            primary: Color::Rgb(0xbe, 0x12, 0x3c),
            secondary: Color::Rgb(0x6d, 0x28, 0xd9),
            accent: Color::Rgb(0xa1, 0x62, 0x07),
            text: Color::Rgb(0x1c, 0x19, 0x17),
            dim: Color::Rgb(0x57, 0x53, 0x4e),
            border: Color::Rgb(0xa8, 0xa2, 0x9e),
            success: Color::Rgb(0x15, 0x80, 0x3d),
            warning: Color::Rgb(0xc2, 0x41, 0x0c),
            error: Color::Rgb(0xb9, 0x1c, 0x1c),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.text)
    }

    /// Inverted with the primary color
    pub fn highlighted(&self) -> Style {
        Style::default()
            .fg(self.background)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success).add_modifier(Modifier::BOLD)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning).add_modifier(Modifier::BOLD)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn secondary(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn progress_bar(&self) -> Style {
        Style::default().fg(self.primary).bg(self.surface)
    }

    pub fn input(&self) -> Style {
        Style::default().fg(self.text).bg(self.surface)
    }

    pub fn keybind(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn status_bar(&self) -> Style {
        Style::default().fg(self.text).bg(self.surface)
    }

    pub fn loading(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn year(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    /// Rating color: high ratings green, low ones dimmed
    pub fn rating(&self, rating: f32) -> Style {
        if rating >= 8.0 {
            self.success()
        } else if rating >= 6.0 {
            self.warning()
        } else {
            self.dimmed()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLOR UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Relative luminance of a color
/// Formula: https://www.w3.org/TR/WCAG20/#relativeluminancedef
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel_luminance(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * channel_luminance(r) + 0.7152 * channel_luminance(g) + 0.0722 * channel_luminance(b)
}

/// Contrast ratio between two colors, from 1 (same) to 21 (black/white)
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let l1 = relative_luminance(fg.0, fg.1, fg.2);
    let l2 = relative_luminance(bg.0, bg.1, bg.2);

    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };

    (lighter + 0.05) / (darker + 0.05)
}

/// WCAG AA for normal text
pub fn meets_wcag_aa(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 4.5
}

/// WCAG AA for large text
pub fn meets_wcag_aa_large(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 3.0
}

/// RGB tuple of a ratatui Color (Rgb variant only)
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}
