//! Configuration management for Docent

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::theme::Theme;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Selected theme name
    pub theme: String,

    /// Custom theme overrides (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_theme: Option<Theme>,

    /// Document opened when none is given on the command line (URL or path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    /// How long passive section tracking stays muted after an explicit jump
    pub scroll_suppression_ms: u64,

    /// Duration of the animated scroll to a heading
    pub scroll_animation_ms: u64,

    /// Lines kept above a heading when jumping to it
    pub header_offset: usize,

    /// Lines at the top and bottom of the viewport that do not count as visible
    pub viewport_margin: usize,

    /// Lifetime of an ordinary notification
    pub toast_duration_ms: u64,

    /// Lifetime of an achievement notification
    pub achievement_duration_ms: u64,

    /// Interval at which reading time is accumulated
    pub session_tick_secs: u64,

    /// Extra heading text to id mappings, on top of the built-in table
    pub heading_ids: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "Tokyo Night".to_string(),
            custom_theme: None,
            document: None,
            scroll_suppression_ms: 900,
            scroll_animation_ms: 450,
            header_offset: 1,
            viewport_margin: 1,
            toast_duration_ms: 3000,
            achievement_duration_ms: 5000,
            session_tick_secs: 60,
            heading_ids: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse config.json")
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "docent").context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "docent").context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Path of the persisted reader state
    pub fn state_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("state.json"))
    }

    /// Path of the log file (the terminal itself is owned by the UI)
    pub fn log_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("docent.log"))
    }

    /// Get the active theme
    pub fn active_theme(&self) -> Theme {
        self.custom_theme.clone().unwrap_or_else(Theme::tokyo_night)
    }

    pub fn scroll_suppression(&self) -> Duration {
        Duration::from_millis(self.scroll_suppression_ms)
    }

    pub fn scroll_animation(&self) -> Duration {
        Duration::from_millis(self.scroll_animation_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn achievement_duration(&self) -> Duration {
        Duration::from_millis(self.achievement_duration_ms)
    }

    pub fn session_tick(&self) -> Duration {
        Duration::from_secs(self.session_tick_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_tokyo_night_theme() {
        let config = Config::default();
        assert_eq!(config.theme, "Tokyo Night");
    }

    #[test]
    fn default_suppression_outlasts_scroll_animation() {
        let config = Config::default();
        assert!(config.scroll_suppression() > config.scroll_animation());
    }

    #[test]
    fn config_serializes_to_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("Tokyo Night"));
        assert!(json.contains("scroll_suppression_ms"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let json = r#"{"theme":"Custom","scroll_suppression_ms":1000}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.theme, "Custom");
        assert_eq!(config.scroll_suppression_ms, 1000);
        assert_eq!(config.header_offset, 1);
    }

    #[test]
    fn unknown_keys_from_older_configs_are_ignored() {
        let json = r#"{"theme":"Tokyo Night","vim_mode":false}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.theme, "Tokyo Night");
        assert!(!serde_json::to_string(&config).unwrap().contains("vim_mode"));
    }

    #[test]
    fn session_tick_is_never_zero() {
        let config = Config { session_tick_secs: 0, ..Default::default() };
        assert_eq!(config.session_tick(), Duration::from_secs(1));
    }
}
