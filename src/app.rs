//! Application state and event handling for flowmate

use crate::config::Config;
use crate::modules::funnel::{FunnelState, ReportSource};
use crate::types::FlashMessage;
use crate::ui::{ModuleTab, Theme};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;

/// Main application state
pub struct App {
    pub should_quit: bool,
    pub active_tab: ModuleTab,
    pub config: Config,
    pub theme: Theme,
    pub settings_selected: usize,
    pub settings_editing: bool,
    pub settings_edit_buffer: String,
    pub popup: PopupState,
    pub flash_message: Option<FlashMessage>,

    // Module states
    pub funnel: FunnelState,
}

#[derive(Debug, Clone)]
pub enum PopupState {
    None,
    Error { title: String, message: String },
}

impl App {
    pub fn new(
        config: Config,
        cli_report: Option<PathBuf>,
        piped_input: Option<String>,
    ) -> Result<Self> {
        let theme = Theme::from_name(config.theme);

        // CLI argument wins, then piped input, then the configured default
        let source = if let Some(path) = cli_report {
            ReportSource::Path(path)
        } else if let Some(text) = piped_input {
            ReportSource::Piped(text)
        } else if let Some(path) = &config.default_report {
            ReportSource::Path(PathBuf::from(path))
        } else {
            ReportSource::None
        };

        Ok(Self {
            should_quit: false,
            active_tab: ModuleTab::Funnel,
            config,
            theme,
            settings_selected: 0,
            settings_editing: false,
            settings_edit_buffer: String::new(),
            popup: PopupState::None,
            flash_message: None,
            funnel: FunnelState::new(source),
        })
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Clear expired flash
        if let Some(msg) = &self.flash_message {
            if msg.is_expired(3) {
                self.flash_message = None;
            }
        }

        // App-level popup handling
        if let PopupState::Error { .. } = &self.popup {
            match key.code {
                KeyCode::Char('o') | KeyCode::Enter | KeyCode::Esc => {
                    self.popup = PopupState::None;
                }
                _ => {}
            }
            return Ok(());
        }

        // Settings text editing mode captures ALL keys
        if self.settings_editing {
            self.handle_settings_edit_key(key)?;
            return Ok(());
        }

        // Try to let active module consume the key
        let consumed = self.try_module_key(key)?;
        if consumed {
            return Ok(());
        }

        // Global keys
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('1') => self.active_tab = ModuleTab::Funnel,
            KeyCode::Char(',') => self.active_tab = ModuleTab::Settings,
            KeyCode::Char('?') => self.active_tab = ModuleTab::HelpAbout,
            _ => {}
        }

        if self.active_tab == ModuleTab::Settings {
            self.handle_settings_key(key)?;
        }

        Ok(())
    }

    fn try_module_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.active_tab {
            ModuleTab::Funnel => {
                // Module captures ALL keys while a text input is active
                if self.funnel.search_active || self.funnel.path_active {
                    self.funnel.handle_key(key)?;
                    return Ok(true);
                }

                // F-keys always go to module
                if matches!(key.code, KeyCode::F(1..=4)) {
                    self.funnel.handle_key(key)?;
                    return Ok(true);
                }

                // Tab-switch keys and quit stay global
                match key.code {
                    KeyCode::Char('1') | KeyCode::Char(',') | KeyCode::Char('?')
                    | KeyCode::Char('q') => Ok(false),
                    _ => {
                        self.funnel.handle_key(key)?;
                        Ok(true)
                    }
                }
            }
            _ => Ok(false),
        }
    }

    pub fn update_timers(&mut self) {
        expire_flash(&mut self.flash_message);
        expire_flash(&mut self.funnel.flash_message);
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Result<()> {
        let settings_count = 2;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.settings_selected < settings_count - 1 {
                    self.settings_selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.settings_selected = self.settings_selected.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
                match self.settings_selected {
                    0 => {
                        self.config.theme = self.config.theme.next();
                        self.theme = Theme::from_name(self.config.theme);
                    }
                    // Default report path (text editable)
                    1 => {
                        self.settings_editing = true;
                        self.settings_edit_buffer =
                            self.config.default_report.clone().unwrap_or_default();
                        return Ok(());
                    }
                    _ => {}
                }
                self.save_config();
            }
            _ => {}
        }
        Ok(())
    }

    /// Handle key events while editing a settings text field.
    fn handle_settings_edit_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.settings_editing = false;
                self.settings_edit_buffer.clear();
            }
            KeyCode::Enter => {
                let value = self.settings_edit_buffer.clone();
                if self.settings_selected == 1 {
                    self.config.default_report = if value.is_empty() { None } else { Some(value) };
                }
                self.settings_editing = false;
                self.settings_edit_buffer.clear();
                self.save_config();
            }
            KeyCode::Backspace => {
                self.settings_edit_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.settings_edit_buffer.push(c);
            }
            _ => {}
        }
        Ok(())
    }

    fn save_config(&mut self) {
        if let Err(e) = self.config.save() {
            self.popup = PopupState::Error {
                title: "Save failed".into(),
                message: e.to_string(),
            };
        } else {
            self.flash_message = Some(FlashMessage::new("Settings saved".into(), false));
        }
    }
}

/// Expire a flash message after 3 seconds
fn expire_flash(msg: &mut Option<FlashMessage>) {
    if let Some(m) = msg {
        if m.is_expired(3) {
            *msg = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    static TEST_SEQ: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

    /// App with config saves redirected to a per-test temp file, so the
    /// key handlers never touch the user's real config.
    fn test_app() -> (App, std::path::PathBuf) {
        let n = TEST_SEQ.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "flowmate-app-{}-{}.toml",
            std::process::id(),
            n
        ));
        let mut config = Config::default();
        config.set_save_path(path.clone());
        (App::new(config, None, None).unwrap(), path)
    }

    #[test]
    fn test_global_tab_switching() {
        let (mut app, _) = test_app();
        assert_eq!(app.active_tab, ModuleTab::Funnel);
        app.handle_key(key(KeyCode::Char(','))).unwrap();
        assert_eq!(app.active_tab, ModuleTab::Settings);
        app.handle_key(key(KeyCode::Char('?'))).unwrap();
        assert_eq!(app.active_tab, ModuleTab::HelpAbout);
        app.handle_key(key(KeyCode::Char('1'))).unwrap();
        assert_eq!(app.active_tab, ModuleTab::Funnel);
    }

    #[test]
    fn test_quit_key() {
        let (mut app, _) = test_app();
        app.handle_key(key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_search_captures_global_keys() {
        let (mut app, _) = test_app();
        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        assert!(app.funnel.search_active);

        // 'q' goes into the search buffer instead of quitting
        app.handle_key(key(KeyCode::Char('q'))).unwrap();
        assert!(!app.should_quit);
        assert_eq!(app.funnel.opts.keyword, "q");

        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(!app.funnel.search_active);
    }

    #[test]
    fn test_settings_theme_cycle() {
        let (mut app, save_path) = test_app();
        app.active_tab = ModuleTab::Settings;
        let before = app.config.theme;
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_ne!(app.config.theme, before);

        // The save triggered by Enter lands at the injected path
        assert!(save_path.exists());
        let _ = std::fs::remove_file(&save_path);
    }

    #[test]
    fn test_settings_edit_default_report() {
        let (mut app, save_path) = test_app();
        app.active_tab = ModuleTab::Settings;
        app.handle_key(key(KeyCode::Char('j'))).unwrap();
        assert_eq!(app.settings_selected, 1);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(app.settings_editing);
        for c in "a.csv".chars() {
            app.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(!app.settings_editing);
        assert_eq!(app.config.default_report.as_deref(), Some("a.csv"));

        let saved = std::fs::read_to_string(&save_path).unwrap();
        assert!(saved.contains("a.csv"));
        let _ = std::fs::remove_file(&save_path);
    }
}
