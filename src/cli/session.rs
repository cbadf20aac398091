//! Shared command context: configuration, ledger-backed program, keys.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use collectivex::crypto::{Ed25519Verifier, OwnerKeypair};
use collectivex::ledger::FileLedger;
use collectivex::multisig::{MultisigAddress, Outcome, Request};
use collectivex::program::MultisigProgram;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::{default_config_path, CollectivexConfig, LoggingConfig};

pub type Program = MultisigProgram<FileLedger, Ed25519Verifier>;

/// Loaded configuration for one CLI invocation.
pub struct Session {
    pub config: CollectivexConfig,
    pub config_path: PathBuf,
}

impl Session {
    /// Load (or create) the config and install logging.
    pub fn open(config_path: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_path
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);
        let config = CollectivexConfig::load_or_create(&config_path)?;
        init_tracing(&config.logging)?;

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Program over the configured ledger and dispatch targets.
    pub fn program(&self) -> Program {
        MultisigProgram::new(FileLedger::new(&self.config.ledger.path), Ed25519Verifier)
            .with_targets(self.config.dispatch.targets.iter().cloned())
    }

    /// Key path from `--key`, falling back to the configured default.
    pub fn key_path(&self, key: Option<String>) -> Result<PathBuf, Box<dyn std::error::Error>> {
        key.map(PathBuf::from)
            .or_else(|| self.config.keys.default_key.clone())
            .ok_or_else(|| "No key given: pass --key or set [keys] default_key".into())
    }

    pub fn load_key(&self, key: Option<String>) -> Result<OwnerKeypair, Box<dyn std::error::Error>> {
        let path = self.key_path(key)?;
        OwnerKeypair::load(&path)
            .map_err(|e| format!("Failed to load key '{}': {}", path.display(), e).into())
    }
}

/// Sign `request` with the owner's current nonce and submit it.
pub async fn submit_signed(
    program: &Program,
    address: &MultisigAddress,
    keypair: &OwnerKeypair,
    request: Request,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let nonce = program.nonce(address, &keypair.owner_id()).await?;
    let signed = keypair.sign_request(address, nonce, request)?;
    Ok(program.submit(address, &signed).await?)
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let writer = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .compact(),
        )
        .try_init()?;
    Ok(())
}
