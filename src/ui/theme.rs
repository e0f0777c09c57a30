//! Theme definitions for flowmate
//!
//! Four built-in themes: Gruvbox, Nord, Dracula, and Transparent.
//! One theme instance – applied globally to every module. Diagram node
//! and link colours come from the report palette, not from the theme.

use crate::config::ThemeName;
use ratatui::style::{Color, Modifier, Style};

/// Complete theme with all required colors
#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub bg: Color,
    pub fg: Color,
    pub fg_dim: Color,

    // Accent colors
    pub accent: Color,
    pub accent_dim: Color,

    // Status colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,

    // UI element colors
    pub border: Color,
    pub border_focused: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,

    // Internal flag for transparent mode
    is_transparent: bool,
}

impl Theme {
    /// Create a theme from a theme name
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Gruvbox => Self::gruvbox(),
            ThemeName::Nord => Self::nord(),
            ThemeName::Dracula => Self::dracula(),
            ThemeName::Transparent => Self::transparent(),
        }
    }

    /// Gruvbox dark theme (default)
    pub fn gruvbox() -> Self {
        Self {
            bg: Color::Rgb(40, 40, 40),
            fg: Color::Rgb(235, 219, 178),
            fg_dim: Color::Rgb(146, 131, 116),
            accent: Color::Rgb(254, 128, 25),
            accent_dim: Color::Rgb(214, 93, 14),
            success: Color::Rgb(184, 187, 38),
            warning: Color::Rgb(250, 189, 47),
            error: Color::Rgb(251, 73, 52),
            border: Color::Rgb(80, 73, 69),
            border_focused: Color::Rgb(168, 153, 132),
            selection_bg: Color::Rgb(80, 73, 69),
            selection_fg: Color::Rgb(235, 219, 178),
            is_transparent: false,
        }
    }

    /// Nord theme
    pub fn nord() -> Self {
        Self {
            bg: Color::Rgb(46, 52, 64),
            fg: Color::Rgb(236, 239, 244),
            fg_dim: Color::Rgb(76, 86, 106),
            accent: Color::Rgb(136, 192, 208),
            accent_dim: Color::Rgb(94, 129, 172),
            success: Color::Rgb(163, 190, 140),
            warning: Color::Rgb(235, 203, 139),
            error: Color::Rgb(191, 97, 106),
            border: Color::Rgb(59, 66, 82),
            border_focused: Color::Rgb(136, 192, 208),
            selection_bg: Color::Rgb(76, 86, 106),
            selection_fg: Color::Rgb(236, 239, 244),
            is_transparent: false,
        }
    }

    /// Dracula theme
    pub fn dracula() -> Self {
        Self {
            bg: Color::Rgb(40, 42, 54),
            fg: Color::Rgb(248, 248, 242),
            fg_dim: Color::Rgb(98, 114, 164),      // comment
            accent: Color::Rgb(189, 147, 249),     // purple
            accent_dim: Color::Rgb(139, 233, 253), // cyan
            success: Color::Rgb(80, 250, 123),     // green
            warning: Color::Rgb(241, 250, 140),    // yellow
            error: Color::Rgb(255, 85, 85),        // red
            border: Color::Rgb(68, 71, 90),        // current line
            border_focused: Color::Rgb(189, 147, 249),
            selection_bg: Color::Rgb(68, 71, 90),
            selection_fg: Color::Rgb(248, 248, 242),
            is_transparent: false,
        }
    }

    /// Transparent theme (uses terminal colors)
    pub fn transparent() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            fg_dim: Color::Gray,
            accent: Color::Cyan,
            accent_dim: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            selection_bg: Color::Reset,
            selection_fg: Color::White,
            is_transparent: true,
        }
    }

    // === STYLE HELPERS ===

    pub fn text(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.fg)
        } else {
            Style::default().fg(self.fg).bg(self.bg)
        }
    }

    pub fn text_dim(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.fg_dim)
        } else {
            Style::default().fg(self.fg_dim).bg(self.bg)
        }
    }

    pub fn title(&self) -> Style {
        if self.is_transparent {
            Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.accent)
                .bg(self.bg)
                .add_modifier(Modifier::BOLD)
        }
    }

    pub fn selected(&self) -> Style {
        if self.is_transparent {
            Style::default()
                .fg(self.selection_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.selection_fg)
                .bg(self.selection_bg)
                .add_modifier(Modifier::BOLD)
        }
    }

    pub fn border(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.border)
        } else {
            Style::default().fg(self.border).bg(self.bg)
        }
    }

    pub fn border_focused(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.border_focused)
        } else {
            Style::default().fg(self.border_focused).bg(self.bg)
        }
    }

    pub fn tab_inactive(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.fg_dim)
        } else {
            Style::default().fg(self.fg_dim).bg(self.bg)
        }
    }

    pub fn tab_active(&self) -> Style {
        if self.is_transparent {
            Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.accent)
                .bg(self.bg)
                .add_modifier(Modifier::BOLD)
        }
    }

    pub fn success(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.success)
        } else {
            Style::default().fg(self.success).bg(self.bg)
        }
    }

    pub fn warning(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.warning)
        } else {
            Style::default().fg(self.warning).bg(self.bg)
        }
    }

    pub fn error(&self) -> Style {
        if self.is_transparent {
            Style::default().fg(self.error)
        } else {
            Style::default().fg(self.error).bg(self.bg)
        }
    }

    pub fn block_style(&self) -> Style {
        if self.is_transparent {
            Style::default()
        } else {
            Style::default().bg(self.bg)
        }
    }
}
