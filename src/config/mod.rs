//! Configuration for lexica.
//!
//! Handles the settings file, environment variable expansion, and the cache
//! tunables.

mod settings;

pub use settings::{
    expand_env_vars, parse_duration, CacheSettings, Settings, SettingsError, StoreSettings,
};
