//! `mill.toml` settings and their override layers.
//!
//! Values resolve as CLI flag, then environment, then file, then default.

use std::path::{Path, PathBuf};

use mill_core::NumberLocale;
use mill_core::calculations::ZeroSamplePolicy;
use mill_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mill.toml";

/// Overrides `database.connection_string`.
pub const DATABASE_URL_ENV: &str = "MILL_DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub calculation: CalculationSettings,
    pub display: DisplaySettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub backend: String,
    /// For SQLite a file path, a `sqlite:` URL or `:memory:`.
    pub connection_string: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "mill.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationSettings {
    pub zero_samples: ZeroSamplePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub locale: NumberLocale,
}

/// Sign-in policy and an optional pre-resolved operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub enabled: bool,
    /// Where this client runs; must appear in `authorized_origins`.
    pub origin: String,
    pub authorized_origins: Vec<String>,
    /// Skips the interactive prompt when set.
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: "localhost".to_string(),
            authorized_origins: vec!["localhost".to_string()],
            user_id: None,
            display_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: crate::logging::DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub backend: Option<String>,
    pub db: Option<String>,
    pub user: Option<String>,
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn from_toml_str(
        text: &str,
        origin: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads `path`, or [`DEFAULT_CONFIG_FILE`] when `path` is `None`.
    ///
    /// An explicitly named file must exist; a missing default file yields
    /// the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::from_toml_str(&text, &path)?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Applies environment overrides through `lookup` (normally
    /// `std::env::var`).
    pub fn apply_env<F>(
        &mut self,
        lookup: F,
    ) where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.database.connection_string = url;
        }
    }

    pub fn apply_cli(
        &mut self,
        overrides: &CliOverrides,
    ) {
        if let Some(backend) = &overrides.backend {
            self.database.backend = backend.clone();
        }
        if let Some(db) = &overrides.db {
            self.database.connection_string = db.clone();
        }
        if let Some(user) = &overrides.user {
            self.auth.user_id = Some(user.clone());
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(
            self.database.backend.as_str(),
            self.database.connection_string.as_str(),
        )
    }
}
