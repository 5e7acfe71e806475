//! Configuration for the warps system.
//!
//! Maps directly to `warps.toml`. Every field has a serde default so a
//! partial (or empty) file is valid.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarpsError};

/// Top-level warps configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct WarpsConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Warp sign gating.
    #[serde(default)]
    pub signs: SignConfig,
    /// Browsing panel settings.
    #[serde(default)]
    pub panel: PanelConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl WarpsConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `WarpsError::Config` if the TOML is invalid or fails
    /// [`validate`](Self::validate).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| WarpsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check values that serde cannot reject on its own.
    ///
    /// # Errors
    /// Returns `WarpsError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.signs.welcome_line.trim().is_empty() {
            return Err(WarpsError::Config("signs.welcome_line must not be empty".into()));
        }
        if self.panel.page_size == 0 {
            return Err(WarpsError::Config("panel.page_size must be at least 1".into()));
        }
        if StoreBackend::from_name(&self.persistence.backend).is_none() {
            return Err(WarpsError::Config(format!(
                "persistence.backend must be \"sqlite\" or \"json\", got \"{}\"",
                self.persistence.backend
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether warp signs are enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Warp sign creation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignConfig {
    /// First line a player writes to turn a sign into a warp.
    #[serde(default = "default_welcome_line")]
    pub welcome_line: String,
    /// Minimum island level needed to publish a warp.
    #[serde(default)]
    pub warp_level_restriction: i64,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            welcome_line: "[WELCOME]".to_string(),
            warp_level_restriction: 0,
        }
    }
}

/// Warp browsing panel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Warps shown per panel page.
    #[serde(default = "default_52")]
    pub page_size: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { page_size: 52 }
    }
}

/// Which [`WarpStore`](crate::persistence::WarpStore) implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `SQLite` database file.
    Sqlite,
    /// Human-readable JSON file.
    Json,
}

impl StoreBackend {
    /// Resolve a configured backend name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite" or "json".
    #[serde(default = "default_sqlite")]
    pub backend: String,
    /// Path of the database or JSON file.
    #[serde(default = "default_path")]
    pub path: String,
    /// Use WAL mode (`SQLite` only).
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Number of save backups to keep on shutdown.
    #[serde(default = "default_3")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "warps.db".to_string(),
            wal_mode: true,
            backup_count: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_welcome_line() -> String { "[WELCOME]".to_string() }
fn default_sqlite() -> String { "sqlite".to_string() }
fn default_path() -> String { "warps.db".to_string() }
fn default_3() -> u32 { 3 }
fn default_52() -> usize { 52 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = WarpsConfig::from_toml("").expect("parse");
        assert!(config.general.enabled);
        assert_eq!(config.signs.welcome_line, "[WELCOME]");
        assert_eq!(config.signs.warp_level_restriction, 0);
        assert_eq!(config.panel.page_size, 52);
        assert_eq!(config.persistence.backend, "sqlite");
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = WarpsConfig::from_toml(
            r#"
            [signs]
            warp_level_restriction = 10

            [persistence]
            backend = "JSON"
            path = "warps.json"
            "#,
        )
        .expect("parse");
        assert_eq!(config.signs.warp_level_restriction, 10);
        assert_eq!(config.signs.welcome_line, "[WELCOME]");
        assert_eq!(
            StoreBackend::from_name(&config.persistence.backend),
            Some(StoreBackend::Json)
        );
        assert_eq!(config.persistence.backup_count, 3);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = WarpsConfig::from_toml("[persistence]\nbackend = \"yaml\"")
            .expect_err("unknown backend");
        assert!(matches!(err, WarpsError::Config(_)));
    }

    #[test]
    fn rejects_blank_welcome_line_and_zero_page() {
        assert!(WarpsConfig::from_toml("[signs]\nwelcome_line = \"  \"").is_err());
        assert!(WarpsConfig::from_toml("[panel]\npage_size = 0").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(WarpsConfig::from_toml("[signs\nwelcome_line = 1").is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warps.toml");
        std::fs::write(&path, "[signs]\nwelcome_line = \"[WARP]\"\n").expect("write");
        let config = WarpsConfig::from_file(&path).expect("load");
        assert_eq!(config.signs.welcome_line, "[WARP]");
    }
}
