//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use icarus_core::PatternPolicy;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Thresholds for session-pattern classification.
    #[serde(default)]
    pub patterns: PatternPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("icarus.db"),
            patterns: PatternPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, the platform config file, `config_path`,
    /// then `ICARUS_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // ICARUS_DATABASE_PATH, ICARUS_PATTERNS__HIGH_FOCUS, ...
        figment = figment.merge(Env::prefixed("ICARUS_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for icarus.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("icarus"))
}

/// Returns the platform-specific data directory for icarus.
///
/// On Linux: `~/.local/share/icarus`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("icarus"))
}
