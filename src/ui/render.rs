//! Main rendering module for flowmate
//!
//! Renders the complete UI:
//! - Vertical sidebar with the module list (left)
//! - Active module content area (right)
//! - Global status bar (bottom)
//! - Popup overlays + flash messages

use crate::app::{App, PopupState};
use crate::modules::funnel::FunSubTab;
use crate::ui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Tab definition with index for keybinding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleTab {
    Funnel,
    Settings,
    HelpAbout,
}

impl ModuleTab {
    pub fn label(&self) -> &'static str {
        match self {
            ModuleTab::Funnel => "Funnel",
            ModuleTab::Settings => "Settings",
            ModuleTab::HelpAbout => "Help / About",
        }
    }

    /// Keybind hint shown in sidebar
    pub fn key_hint(&self) -> &'static str {
        match self {
            ModuleTab::Funnel => "1",
            ModuleTab::Settings => ",",
            ModuleTab::HelpAbout => "?",
        }
    }
}

const SIDEBAR_MODULES: &[ModuleTab] = &[ModuleTab::Funnel];

/// Bottom items (below separator)
const SIDEBAR_BOTTOM: &[ModuleTab] = &[ModuleTab::Settings, ModuleTab::HelpAbout];

const SIDEBAR_WIDTH: u16 = 20;

/// Main render function – entry point for all UI rendering
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let theme = &app.theme;

    // Fill entire background
    frame.render_widget(Block::default().style(theme.block_style()), area);

    // Main layout: sidebar | content, status bar at bottom
    let vertical = Layout::vertical([
        Constraint::Min(8),    // sidebar + content
        Constraint::Length(1), // status bar
    ])
    .split(area);

    let horizontal = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(30), // content area
    ])
    .split(vertical[0]);

    render_sidebar(frame, app, horizontal[0]);
    render_module_content(frame, app, horizontal[1]);
    render_status_bar(frame, app, vertical[1]);

    // Popup overlays
    render_popups(frame, app, area);
}

/// Render the vertical sidebar
fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let sidebar_block = Block::default()
        .style(theme.block_style())
        .borders(Borders::RIGHT)
        .border_style(theme.border());
    let inner = sidebar_block.inner(area);
    frame.render_widget(sidebar_block, area);

    let mut lines: Vec<Line> = Vec::new();

    // Title
    lines.push(Line::from(vec![
        Span::styled(
            " flowmate",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(theme.fg_dim),
        ),
    ]));
    lines.push(Line::raw(""));

    for &module in SIDEBAR_MODULES {
        render_sidebar_item(&mut lines, app, module, theme);
    }

    // Separator
    lines.push(Line::raw(""));
    let sep_width = inner.width.saturating_sub(2) as usize;
    lines.push(Line::styled(
        format!(" {}", "─".repeat(sep_width.min(16))),
        Style::default().fg(theme.border),
    ));

    for &module in SIDEBAR_BOTTOM {
        render_sidebar_item(&mut lines, app, module, theme);
    }

    frame.render_widget(Paragraph::new(lines).style(theme.block_style()), area);
}

/// Render a single sidebar item
fn render_sidebar_item<'a>(
    lines: &mut Vec<Line<'a>>,
    app: &App,
    module: ModuleTab,
    theme: &crate::ui::Theme,
) {
    let is_active = app.active_tab == module;
    let hint = module.key_hint();

    if is_active {
        lines.push(Line::from(vec![
            Span::styled(" ▸ ", Style::default().fg(theme.accent)),
            Span::styled(hint.to_string(), Style::default().fg(theme.accent)),
            Span::styled(
                format!(" {}", module.label()),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::styled("   ", Style::default()),
            Span::styled(hint.to_string(), Style::default().fg(theme.fg_dim)),
            Span::styled(
                format!(" {}", module.label()),
                Style::default().fg(theme.fg),
            ),
        ]));
    }
}

/// Render the active module's content
fn render_module_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.active_tab {
        ModuleTab::Funnel => {
            crate::modules::funnel::render(frame, &app.funnel, &app.theme, area);
        }
        ModuleTab::Settings => render_settings(frame, app, area),
        ModuleTab::HelpAbout => render_help_about(frame, app, area),
    }
}

/// Render the Help / About tab
fn render_help_about(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let block = Block::default()
        .style(theme.block_style())
        .title(" Help / About ")
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut content: Vec<Line> = Vec::new();

    content.push(Line::raw(""));
    content.push(Line::from(vec![
        Span::styled(
            "flowmate",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(theme.fg_dim),
        ),
    ]));
    content.push(Line::styled(
        "Affiliate conversion funnel dashboard",
        Style::default().fg(theme.fg_dim),
    ));
    content.push(Line::raw(""));

    content.push(Line::styled(
        "── Keys ──",
        Style::default().fg(theme.accent),
    ));
    content.push(Line::raw(""));

    let keys: Vec<(&str, &str)> = vec![
        ("F1-F4", "Diagram / Links / Data / Platforms"),
        ("/", "Live keyword search (highlight matches)"),
        ("c", "Clear search"),
        ("h/l", "Select funnel stage"),
        ("+/-", "Adjust link width for the selected stage"),
        ("x", "Reset all width factors"),
        ("j/k", "Navigate nodes / scroll tables"),
        ("o", "Open another report file"),
        ("r", "Reload the current report"),
        ("e", "Export the diagram as JSON"),
        (",", "Settings"),
        ("q", "Quit"),
    ];

    for (key, desc) in keys {
        content.push(Line::from(vec![
            Span::styled(format!("  [{:^5}]  ", key), Style::default().fg(theme.accent)),
            Span::styled(desc.to_string(), Style::default().fg(theme.fg_dim)),
        ]));
    }
    content.push(Line::raw(""));

    content.push(Line::styled(
        "── Pipe mode ──",
        Style::default().fg(theme.accent),
    ));
    content.push(Line::raw(""));
    content.push(Line::styled(
        "cat report.csv | flowmate",
        Style::default().fg(theme.fg),
    ));

    frame.render_widget(Paragraph::new(content).alignment(Alignment::Center), inner);
}

/// Render the global Settings tab
fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let block = Block::default()
        .style(theme.block_style())
        .title(" Settings ")
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let settings: Vec<(&str, String, bool)> = vec![
        ("Theme", app.config.theme.as_str().to_string(), false),
        (
            "Default report",
            if app.settings_editing && app.settings_selected == 1 {
                format!("{}_", app.settings_edit_buffer)
            } else {
                app.config
                    .default_report
                    .clone()
                    .unwrap_or_else(|| "not set".to_string())
            },
            app.settings_editing && app.settings_selected == 1,
        ),
    ];

    let mut items: Vec<ListItem> = Vec::new();
    for (i, (label, value, editing)) in settings.iter().enumerate() {
        let style = if i == app.settings_selected {
            theme.selected()
        } else {
            theme.text()
        };
        let value_style = if *editing {
            Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.accent)
        };

        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("  {:<20}", label), style),
            Span::styled(format!("[{}]", value), value_style),
        ])));
    }

    if app.settings_editing {
        items.push(ListItem::new(Line::raw("")));
        items.push(ListItem::new(Line::styled(
            "  Enter saves, Esc cancels",
            theme.text_dim(),
        )));
    }

    let list = List::new(items);
    frame.render_widget(list, inner);

    // Config path at bottom
    let config_path = crate::config::Config::path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "Unknown".into());

    let path_area = Rect {
        x: inner.x,
        y: inner.y + inner.height.saturating_sub(2),
        width: inner.width,
        height: 1,
    };
    let path_widget =
        Paragraph::new(format!("Config: {}", config_path)).style(theme.text_dim());
    frame.render_widget(path_widget, path_area);
}

/// Render status bar with context-sensitive keybindings
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let hints = match app.active_tab {
        ModuleTab::Funnel => {
            let fun = &app.funnel;
            if fun.search_active {
                "[Enter/Esc] Done  type to search".to_string()
            } else if fun.path_active {
                "[Enter] Load  [Esc] Cancel".to_string()
            } else {
                match fun.active_sub_tab {
                    FunSubTab::Diagram => {
                        "[j/k] Nodes  [/] Search  [h/l +/-] Width  [o] Open  [r] Reload  [e] Export  [q] Quit"
                            .to_string()
                    }
                    _ => {
                        "[j/k] Scroll  [/] Search  [o] Open  [r] Reload  [e] Export  [q] Quit"
                            .to_string()
                    }
                }
            }
        }
        ModuleTab::Settings => {
            if app.settings_editing {
                "[Enter] Save  [Esc] Cancel  [q] Quit".to_string()
            } else {
                "[j/k] Navigate  [Enter] Change  [q] Quit".to_string()
            }
        }
        ModuleTab::HelpAbout => "[1] Funnel  [,] Settings  [q] Quit".to_string(),
    };

    widgets::render_status_bar(frame, &hints, "", theme, area);
}

/// Render popup overlays
fn render_popups(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    match &app.popup {
        PopupState::None => {}
        PopupState::Error { title, message } => {
            widgets::render_error_popup(frame, title, message, theme, area);
        }
    }

    // Flash message
    if let Some(msg) = &app.flash_message {
        widgets::render_flash_message(frame, &msg.text, msg.is_error, &app.theme, area);
    }
}
