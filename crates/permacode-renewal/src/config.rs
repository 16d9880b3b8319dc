//! # Renewal Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PERMACODE_ON_NON_INDIVIDUAL=skip_item                              │
//! │     PERMACODE_SERIALIZE_PER_CODE=false                                 │
//! │     PERMACODE_DB_PATH=/var/lib/permacode.db                            │
//! │     PERMACODE_DB_MAX_CONNECTIONS=8                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/permacode/renewal.toml (Linux)                           │
//! │     ~/Library/Application Support/com.permacode.permacode/… (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     abort_order, per-code locks on, ./permacode.db                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [renewal]
//! on_non_individual = "abort_order"   # abort_order | skip_item
//! serialize_per_code = true
//!
//! [database]
//! path = "permacode.db"
//! max_connections = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or unparseable.
    #[error("Invalid renewal configuration: {0}")]
    Invalid(String),

    /// Reading or writing the config file failed.
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    /// The file isn't valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serializing the config failed.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No platform config directory could be determined.
    #[error("No config path available")]
    NoConfigPath,
}

// =============================================================================
// Non-Individual Policy
// =============================================================================

/// What to do when an order redeemed a code that isn't individually issued
/// (a global code, or one no record exists for).
///
/// ```text
/// Order: [SAVE10 (individual), WELCOME (global), VIP7 (individual)]
///
/// ABORT_ORDER (default)          SKIP_ITEM
/// ─────────────────────          ─────────
/// nothing renewed                SAVE10 renewed
/// report.stopped = WELCOME       WELCOME skipped
///                                VIP7 renewed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonIndividualPolicy {
    /// Leave the whole order untouched.
    #[default]
    AbortOrder,

    /// Ignore that item and renew the rest.
    SkipItem,
}

impl std::fmt::Display for NonIndividualPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonIndividualPolicy::AbortOrder => write!(f, "abort_order"),
            NonIndividualPolicy::SkipItem => write!(f, "skip_item"),
        }
    }
}

impl std::str::FromStr for NonIndividualPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort_order" | "abort" => Ok(NonIndividualPolicy::AbortOrder),
            "skip_item" | "skip" => Ok(NonIndividualPolicy::SkipItem),
            other => Err(ConfigError::Invalid(format!(
                "Unknown non-individual policy: '{}'. Valid options: abort_order, skip_item",
                other
            ))),
        }
    }
}

// =============================================================================
// Renewal Settings
// =============================================================================

/// Handler behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalSettings {
    /// Policy for global or unknown codes.
    #[serde(default)]
    pub on_non_individual: NonIndividualPolicy,

    /// Hold a lock per (tenant, code) across lookup and renewal.
    #[serde(default = "default_true")]
    pub serialize_per_code: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RenewalSettings {
    fn default() -> Self {
        RenewalSettings {
            on_non_individual: NonIndividualPolicy::default(),
            serialize_per_code: true,
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where the SQLite store lives. Handed to `permacode_db::DbConfig` by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("permacode.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete renewal configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalConfig {
    /// Handler behavior.
    #[serde(default)]
    pub renewal: RenewalSettings,

    /// Store location.
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl RenewalConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (renewal.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading renewal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load renewal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Renewal config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `PERMACODE_*` environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup.
    ///
    /// Unparseable values are errors rather than silently ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("PERMACODE_ON_NON_INDIVIDUAL") {
            debug!(policy = %policy, "Overriding non-individual policy from environment");
            self.renewal.on_non_individual = policy.parse()?;
        }

        if let Some(flag) = lookup("PERMACODE_SERIALIZE_PER_CODE") {
            self.renewal.serialize_per_code = parse_bool(&flag).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "PERMACODE_SERIALIZE_PER_CODE must be true or false, got '{}'",
                    flag
                ))
            })?;
        }

        if let Some(path) = lookup("PERMACODE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("PERMACODE_DB_MAX_CONNECTIONS") {
            self.database.max_connections = max.parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "PERMACODE_DB_MAX_CONNECTIONS must be a number, got '{}'",
                    max
                ))
            })?;
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "permacode", "permacode")
            .map(|dirs| dirs.config_dir().join("renewal.toml"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "abort_order".parse::<NonIndividualPolicy>().unwrap(),
            NonIndividualPolicy::AbortOrder
        );
        assert_eq!(
            "SKIP".parse::<NonIndividualPolicy>().unwrap(),
            NonIndividualPolicy::SkipItem
        );
        assert!("retry".parse::<NonIndividualPolicy>().is_err());
        assert_eq!(NonIndividualPolicy::SkipItem.to_string(), "skip_item");
    }

    #[test]
    fn test_defaults() {
        let config = RenewalConfig::default();
        assert_eq!(config.renewal.on_non_individual, NonIndividualPolicy::AbortOrder);
        assert!(config.renewal.serialize_per_code);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RenewalConfig::from_toml(
            r#"
            [renewal]
            on_non_individual = "skip_item"
            "#,
        )
        .unwrap();

        assert_eq!(config.renewal.on_non_individual, NonIndividualPolicy::SkipItem);
        assert!(config.renewal.serialize_per_code);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_unknown_policy_in_toml_rejected() {
        let err = RenewalConfig::from_toml("[renewal]\non_non_individual = \"maybe\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RenewalConfig::default();
        config
            .apply_overrides(env(&[
                ("PERMACODE_ON_NON_INDIVIDUAL", "skip_item"),
                ("PERMACODE_SERIALIZE_PER_CODE", "off"),
                ("PERMACODE_DB_PATH", "/tmp/codes.db"),
                ("PERMACODE_DB_MAX_CONNECTIONS", "8"),
            ]))
            .unwrap();

        assert_eq!(config.renewal.on_non_individual, NonIndividualPolicy::SkipItem);
        assert!(!config.renewal.serialize_per_code);
        assert_eq!(config.database.path, PathBuf::from("/tmp/codes.db"));
        assert_eq!(config.database.max_connections, 8);
    }

    #[test]
    fn test_bad_env_override_rejected() {
        let mut config = RenewalConfig::default();
        let err = config
            .apply_overrides(env(&[("PERMACODE_SERIALIZE_PER_CODE", "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = RenewalConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.database.path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("permacode-{}", uuid::Uuid::new_v4()))
            .join("renewal.toml");

        let mut config = RenewalConfig::default();
        config.renewal.on_non_individual = NonIndividualPolicy::SkipItem;
        config.save(Some(path.clone())).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("[renewal]"));
        assert!(saved.contains("skip_item"));

        let loaded = RenewalConfig::from_toml(&saved).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
