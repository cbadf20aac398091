//! collectivex configuration file handling
//!
//! Provides default configuration generation and loading for the operator CLI.
//! Configuration files are TOML format and live in the collectivex data
//! directory next to the ledger and the default key.
//!
//! ## Operator vs Multisig Configuration
//!
//! This file contains OPERATOR configuration only: where the ledger lives,
//! which key signs by default, logging, and which invocation targets this
//! host accepts.
//!
//! Owners and threshold belong to each multisig account and change only
//! through executed proposals. They can never be set here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectivexConfig {
    /// Ledger storage
    pub ledger: LedgerConfig,

    /// Signing keys
    #[serde(default)]
    pub keys: KeysConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Invocation dispatch
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory holding one file per multisig account
    pub path: PathBuf,
}

/// Key configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeysConfig {
    /// Key used when a command gets no `--key`
    pub default_key: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

/// Dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DispatchConfig {
    /// Invocation targets accepted by executed proposals
    #[serde(default)]
    pub targets: Vec<String>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl CollectivexConfig {
    /// Create a configuration rooted at `data_dir`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            ledger: LedgerConfig {
                path: default_ledger_path(data_dir),
            },
            keys: KeysConfig {
                default_key: Some(default_key_path(data_dir)),
            },
            logging: LoggingConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: CollectivexConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Load the config at `path`, generating a default one first if missing
    pub fn load_or_create(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            let data_dir = path.parent().unwrap_or_else(|| Path::new("."));
            Self::create_default(path, data_dir)?;
        }
        Self::load(path)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        format!(
            r#"# collectivex Configuration (Operator Settings)
#
# This file contains OPERATOR configuration only: storage, keys, logging and
# the invocation targets this host accepts.
#
# OWNERS AND THRESHOLD are stored in each multisig account and change only
# through proposals approved by the owners. They cannot be set here.

[ledger]
# Directory holding one CBOR file per multisig account
path = '{ledger_path}'

[keys]
# Key used when a command is run without --key
default_key = '{key_path}'

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/collectivex/collectivex.log"

[dispatch]
# Invocation targets that executed proposals may call
targets = []
"#,
            ledger_path = default_ledger_path(data_dir).display(),
            key_path = default_key_path(data_dir).display(),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        data_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(data_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default data directory
///
/// - Linux: ~/.local/share/collectivex/
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("collectivex")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Ledger directory inside a data directory
pub fn default_ledger_path(data_dir: &Path) -> PathBuf {
    data_dir.join("ledger")
}

/// Default signing key inside a data directory
pub fn default_key_path(data_dir: &Path) -> PathBuf {
    data_dir.join("owner.key")
}
