//! Configuration loading.
//!
//! All settings come from two TOML files named on the command line: a
//! plaintext config and a secrets file holding the signing key. They are
//! parsed and validated once at startup into a [`Ctx`]; nothing reads the
//! environment after that.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use alloy::primitives::Bytes;
use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use serde::Deserialize;
use tracing::Level;

use crate::fee::FeeParams;
use crate::history::Namespace;
use crate::registry::{
    ChainContracts, ChainEntry, ChainRegistry, ConfigurationError, DuplicateDomainError,
};
use crate::usdc::Usdc;

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long)]
    pub config: PathBuf,
    /// Path to TOML secrets file holding the signing key
    #[clap(long)]
    pub secrets: PathBuf,
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
struct Config {
    home_chain: String,
    log_level: Option<LogLevel>,
    history_file: Option<PathBuf>,
    min_transfer: Option<Usdc>,
    min_finality_threshold: Option<u32>,
    base_hook_payload: Option<Bytes>,
    fee: FeeConfig,
    chains: BTreeMap<String, ChainEntry>,
}

#[derive(Deserialize)]
struct FeeConfig {
    bps: u32,
    floor_to_home: Usdc,
    floor_to_external: Usdc,
    cap: Option<Usdc>,
    buffer_bps: Option<u32>,
}

/// Secret credentials deserialized from the secrets TOML.
#[derive(Deserialize)]
struct Secrets {
    private_key: String,
}

/// Combined runtime context, assembled from config and secrets.
#[derive(Debug)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub home_key: String,
    pub registry: ChainRegistry,
    pub fee: FeeParams,
    pub min_transfer: Usdc,
    pub min_finality_threshold: u32,
    pub base_hook_payload: Bytes,
    pub history_file: PathBuf,
    pub signer: PrivateKeySigner,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    DuplicateDomain(#[from] DuplicateDomainError),
    #[error("home chain {key:?} has no [chains.{key}] entry")]
    MissingHomeChain { key: String },
    #[error("failed to parse private_key from secrets")]
    PrivateKey(#[source] alloy::signers::local::LocalSignerError),
}

impl Ctx {
    pub fn load_files(config: &Path, secrets: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        let secrets_str = std::fs::read_to_string(secrets)?;
        Self::from_toml(&config_str, &secrets_str)
    }

    pub fn from_toml(config_toml: &str, secrets_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        let secrets: Secrets = toml::from_str(secrets_toml)?;

        if !config.chains.contains_key(&config.home_chain) {
            return Err(ConfigError::MissingHomeChain {
                key: config.home_chain,
            });
        }

        let registry = ChainRegistry::from_entries(&config.home_chain, &config.chains)?;

        let signer: PrivateKeySigner = secrets
            .private_key
            .parse()
            .map_err(ConfigError::PrivateKey)?;

        Ok(Self {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            home_key: config.home_chain,
            registry,
            fee: FeeParams {
                fee_bps: config.fee.bps,
                floor_to_home: config.fee.floor_to_home,
                floor_to_external: config.fee.floor_to_external,
                cap: config.fee.cap,
                buffer_bps: config.fee.buffer_bps.unwrap_or(1000),
            },
            min_transfer: config.min_transfer.unwrap_or(Usdc::ZERO),
            min_finality_threshold: config.min_finality_threshold.unwrap_or(1000),
            base_hook_payload: config.base_hook_payload.unwrap_or_default(),
            history_file: config
                .history_file
                .unwrap_or_else(|| PathBuf::from("arc-bridge-history.json")),
            signer,
        })
    }

    /// History namespace for this deployment, derived from the home
    /// chain's network id and router address.
    pub fn namespace(&self) -> Result<Namespace, ConfigurationError> {
        let home = self.registry.resolve(&self.home_key)?;
        match home.contracts {
            ChainContracts::Home { router } => Ok(Namespace {
                network_id: home.network_id,
                router,
            }),
            ChainContracts::External { .. } => Err(ConfigurationError::MissingRouter {
                key: self.home_key.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("arc_bridge={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
