//! Persisted configuration for siper
//!
//! The file is a flat JSON object:
//! `{"blocked_sites": [...], "is_active": bool, "theme_mode": "auto", "language": "english"}`.
//! Unknown keys are ignored and missing keys fall back to their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Color scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the desktop setting
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Auto => "auto",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(ThemeMode::Auto),
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    /// Next mode in the toggle cycle: auto -> light -> dark -> auto
    pub fn next(&self) -> Self {
        match self {
            ThemeMode::Auto => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Auto,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted siper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Blocked domains, already normalized
    #[serde(default)]
    pub blocked_sites: Vec<String>,

    /// Whether blocking was last known to be applied
    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub theme_mode: ThemeMode,

    /// Opaque locale identifier, resolved by the presentation layer
    ///
    /// A fresh install starts in `english`; an existing file without the
    /// key is read as `turkish`.
    #[serde(default = "missing_language")]
    pub language: String,
}

fn default_language() -> String {
    "english".to_string()
}

fn missing_language() -> String {
    "turkish".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocked_sites: Vec::new(),
            is_active: false,
            theme_mode: ThemeMode::default(),
            language: default_language(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to file
    ///
    /// Written to a sibling temp file, then renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write config: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.blocked_sites.is_empty());
        assert!(!config.is_active);
        assert_eq!(config.theme_mode, ThemeMode::Auto);
        assert_eq!(config.language, "turkish");
    }

    #[test]
    fn test_fresh_config_language() {
        assert_eq!(Config::default().language, "english");
        let json = r#"{"language": "german"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.language, "german");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let json = r#"{"blocked_sites": ["example.com"], "is_active": true, "window_width": 650}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.blocked_sites, vec!["example.com".to_string()]);
        assert!(config.is_active);
    }

    #[test]
    fn test_theme_cycle() {
        assert_eq!(ThemeMode::Auto.next(), ThemeMode::Light);
        assert_eq!(ThemeMode::Light.next(), ThemeMode::Dark);
        assert_eq!(ThemeMode::Dark.next(), ThemeMode::Auto);
        assert_eq!(ThemeMode::from_str("DARK"), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::from_str("sepia"), None);
    }

    #[test]
    fn test_load_absent_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_writes_expected_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.json");

        let config = Config {
            blocked_sites: vec!["example.com".to_string()],
            is_active: true,
            theme_mode: ThemeMode::Dark,
            language: "turkish".to_string(),
        };
        config.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme_mode"], "dark");
        assert_eq!(raw["is_active"], true);
        assert_eq!(raw["language"], "turkish");
        assert_eq!(Config::load(&path).unwrap(), config);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
