// Checkpoint subsystem configuration.
//
// Loaded once at startup from a TOML file or from CPS_* environment
// variables. Every field has a default, so an empty file is valid.

use crate::network::Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Max 4 hours between a checkpoint candidate and the latest block
pub const CHECKPOINT_MAX_SPAN: u64 = 60 * 60 * 4;

/// Confirmations under the tip before a block counts as mature
pub const DEFAULT_MATURITY_DEPTH: u64 = 6;

/// Age after which a checkpoint counts as mature regardless of depth (30 days)
pub const DEFAULT_MATURE_AGE_SECS: u64 = 60 * 60 * 24 * 30;

/// Checkpoint age that raises the stale-authority warning (10 days)
pub const DEFAULT_STALE_WARNING_SECS: u64 = 60 * 60 * 24 * 10;

const DEFAULT_DB_PATH: &str = "cps_checkpoint_db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub network: Network,
    /// Reject conflicting blocks (true) or only warn about them (false)
    pub enforce: bool,
    /// Hex-encoded Ed25519 seed. Present only on checkpoint authority nodes.
    pub master_private_key: Option<String>,
    pub db_path: PathBuf,
    pub maturity_depth: u64,
    pub mature_age_secs: u64,
    pub max_span_secs: u64,
    pub stale_warning_secs: u64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            enforce: true,
            master_private_key: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            maturity_depth: DEFAULT_MATURITY_DEPTH,
            mature_age_secs: DEFAULT_MATURE_AGE_SECS,
            max_span_secs: CHECKPOINT_MAX_SPAN,
            stale_warning_secs: DEFAULT_STALE_WARNING_SECS,
        }
    }
}

/// SECURITY: never print the master key.
impl fmt::Debug for CheckpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckpointConfig")
            .field("network", &self.network)
            .field("enforce", &self.enforce)
            .field(
                "master_private_key",
                &self.master_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("db_path", &self.db_path)
            .field("maturity_depth", &self.maturity_depth)
            .field("mature_age_secs", &self.mature_age_secs)
            .field("max_span_secs", &self.max_span_secs)
            .field("stale_warning_secs", &self.stale_warning_secs)
            .finish()
    }
}

impl CheckpointConfig {
    /// Load checkpoint config from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CheckpointConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load checkpoint config from environment variables.
    /// Useful for containerized deployments.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::load_from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`load_from_env`](Self::load_from_env) with an explicit lookup.
    ///
    /// Recognized: CPS_NETWORK, CPS_CHECKPOINT_ENFORCE, CPS_CHECKPOINT_KEY,
    /// CPS_DATA_DIR, CPS_MATURITY_DEPTH, CPS_MATURE_AGE_SECS,
    /// CPS_MAX_SPAN_SECS, CPS_STALE_WARNING_SECS.
    pub fn load_from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("CPS_NETWORK") {
            config.network = v.parse()?;
        }
        if let Some(v) = lookup("CPS_CHECKPOINT_ENFORCE") {
            config.enforce = parse_bool("CPS_CHECKPOINT_ENFORCE", &v)?;
        }
        if let Some(v) = lookup("CPS_CHECKPOINT_KEY") {
            if !v.trim().is_empty() {
                config.master_private_key = Some(v);
            }
        }
        if let Some(v) = lookup("CPS_DATA_DIR") {
            config.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CPS_MATURITY_DEPTH") {
            config.maturity_depth = parse_u64("CPS_MATURITY_DEPTH", &v)?;
        }
        if let Some(v) = lookup("CPS_MATURE_AGE_SECS") {
            config.mature_age_secs = parse_u64("CPS_MATURE_AGE_SECS", &v)?;
        }
        if let Some(v) = lookup("CPS_MAX_SPAN_SECS") {
            config.max_span_secs = parse_u64("CPS_MAX_SPAN_SECS", &v)?;
        }
        if let Some(v) = lookup("CPS_STALE_WARNING_SECS") {
            config.stale_warning_secs = parse_u64("CPS_STALE_WARNING_SECS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_span_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_span_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.stale_warning_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stale_warning_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
