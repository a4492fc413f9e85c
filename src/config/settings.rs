//! Settings file handling.
//!
//! A `lexica.toml` file tunes the cache and points at the catalog store.
//! Values may reference environment variables with `${VAR}`, and the cache
//! durations are written as human-readable strings:
//!
//! ```toml
//! [cache]
//! sweep_interval = "20m"
//! dataset_expiry = "4h"
//! request_timeout = "30s"
//!
//! [store]
//! path = "${LEXICA_DATA_DIR}/catalog.db"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheOptions;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("unterminated variable reference in {0:?}")]
    UnterminatedVar(String),

    #[error("invalid duration format: {0:?}")]
    InvalidDuration(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Cache tunables.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Catalog store location.
    #[serde(default)]
    pub store: StoreSettings,
}

/// Cache tunables as written in the settings file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// How often the expiration sweeper runs (e.g. "20m").
    pub sweep_interval: String,

    /// Idle time after which a cached dataset expires (e.g. "4h").
    pub dataset_expiry: String,

    /// Deadline for producers waiting on a coordinator reply (e.g. "30s").
    pub request_timeout: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sweep_interval: "20m".to_string(),
            dataset_expiry: "4h".to_string(),
            request_timeout: "30s".to_string(),
        }
    }
}

impl CacheSettings {
    /// Resolve the duration strings into [`CacheOptions`].
    pub fn options(&self) -> Result<CacheOptions, SettingsError> {
        Ok(CacheOptions {
            sweep_interval: parse_duration(&self.sweep_interval)?,
            dataset_expiry: parse_duration(&self.dataset_expiry)?,
            request_timeout: parse_duration(&self.request_timeout)?,
        })
    }
}

/// Catalog store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the catalog database (supports `${VAR}` expansion).
    /// Absent means the embedding application decides.
    pub path: Option<String>,
}

impl StoreSettings {
    /// The store path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SettingsError::FileNotFound(path.to_path_buf())
            } else {
                SettingsError::Read(err)
            }
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from the default locations, falling back to defaults
    /// when no file exists.
    ///
    /// `LEXICA_CONFIG` wins when set; otherwise the first existing file of
    /// `./lexica.toml` and `<config dir>/lexica/config.toml` is used.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("LEXICA_CONFIG") {
            return Self::from_file(path);
        }

        let mut candidates = vec![PathBuf::from("lexica.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("lexica").join("config.toml"));
        }

        match candidates.into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(path),
            None => Ok(Settings::default()),
        }
    }
}

/// Parse a duration string like "30s", "20m" or "4h".
pub fn parse_duration(s: &str) -> Result<Duration, SettingsError> {
    let s = s.trim();
    let invalid = || SettingsError::InvalidDuration(s.to_string());

    let (value, unit) = s.split_at(s.len().saturating_sub(1));
    let value: u64 = value.parse().map_err(|_| invalid())?;
    match unit {
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(invalid()),
    }
}

/// Expand `${VAR}` references in a settings value.
///
/// Every referenced variable must be set; an unclosed `${` is an error
/// rather than silently kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let reference = &rest[start + 2..];
        let end = reference
            .find('}')
            .ok_or_else(|| SettingsError::UnterminatedVar(rest[start..].to_string()))?;
        let name = &reference[..end];
        let value =
            env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))?;
        result.push_str(&value);
        rest = &reference[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
