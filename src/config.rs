//! Configuration management for flowmate
//!
//! One global config: theme and the default report file. Everything else
//! (search keyword, scale factors) is per-session interaction state and
//! deliberately not persisted.
//!
//! Config file location: ~/.config/flowmate/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: ThemeName,

    /// Report file loaded on startup when no CLI argument is given
    #[serde(default)]
    pub default_report: Option<String>,

    /// Alternative save target; when set, `save` writes here instead of
    /// the default config path.
    #[serde(skip)]
    save_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: ThemeName::Gruvbox,
            default_report: None,
            save_path: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("flowmate");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default if not exists
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Redirect saves to `path` instead of the default location.
    pub fn set_save_path(&mut self, path: PathBuf) {
        self.save_path = Some(path);
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = match &self.save_path {
            Some(path) => path.clone(),
            None => Self::path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }
}

/// Available theme names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Gruvbox,
    Nord,
    Dracula,
    Transparent,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Gruvbox => "Gruvbox",
            ThemeName::Nord => "Nord",
            ThemeName::Dracula => "Dracula",
            ThemeName::Transparent => "Transparent",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeName::Gruvbox => ThemeName::Nord,
            ThemeName::Nord => ThemeName::Dracula,
            ThemeName::Dracula => ThemeName::Transparent,
            ThemeName::Transparent => ThemeName::Gruvbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.theme, ThemeName::Gruvbox);
        assert!(config.default_report.is_none());
    }

    #[test]
    fn test_theme_cycle() {
        // Full cycle should return to start
        let mut t = ThemeName::Gruvbox;
        for _ in 0..4 {
            t = t.next();
        }
        assert_eq!(t, ThemeName::Gruvbox);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config {
            theme: ThemeName::Nord,
            default_report: Some("report.csv".into()),
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.theme, ThemeName::Nord);
        assert_eq!(parsed.default_report.as_deref(), Some("report.csv"));
    }

    #[test]
    fn test_save_honors_path_override() {
        let dir = std::env::temp_dir().join(format!("flowmate-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut config = Config::default();
        config.set_save_path(path.clone());
        config.theme = ThemeName::Dracula;
        config.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("dracula"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
