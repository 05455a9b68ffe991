//! Chain catalogue for the bridge.
//!
//! The registry is built once at startup from the `[chains]` table of the
//! configuration TOML. Entries that are missing a required value (network
//! id, RPC URL, or the contract addresses the transfer path needs) are not
//! rejected at load time; they are kept aside and reported as a
//! [`ConfigurationError`] only when a transfer actually references them, so
//! one misconfigured chain does not take the others down with it. Domain
//! ids are the exception: a duplicate domain is a load-time error because
//! it poisons every transfer that could route through either chain.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use serde::Deserialize;
use tracing::warn;
use url::Url;

/// Raw per-chain entry as deserialized from the `[chains]` config table.
///
/// All fields except `domain` are optional so that an incomplete entry can
/// still be loaded and reported lazily.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainEntry {
    pub display_name: Option<String>,
    pub domain: u32,
    pub network_id: Option<u64>,
    pub rpc_url: Option<Url>,
    pub explorer_url: Option<Url>,
    pub native_symbol: Option<String>,
    /// Home chain only: the bridge router contract.
    pub router: Option<Address>,
    /// External chains only: the chain's USDC token contract.
    pub usdc: Option<Address>,
    /// External chains only: the protocol messenger contract.
    pub token_messenger: Option<Address>,
}

/// Per-chain contract addresses, split by the chain's role.
///
/// The home chain carries a router whose on-chain configuration supplies
/// the asset and messenger addresses; external chains have those addresses
/// pinned in configuration instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainContracts {
    Home { router: Address },
    External { usdc: Address, token_messenger: Address },
}

/// A fully resolved chain descriptor. Immutable once built.
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    pub key: String,
    pub display_name: String,
    /// Protocol domain id, unique across the registry.
    pub domain: u32,
    pub network_id: u64,
    pub rpc_url: Url,
    pub explorer_url: Option<Url>,
    pub native_symbol: String,
    pub contracts: ChainContracts,
}

impl ChainDescriptor {
    pub fn is_home(&self) -> bool {
        matches!(self.contracts, ChainContracts::Home { .. })
    }
}

/// Errors raised when a referenced chain cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown chain {key:?}: add a [chains.{key}] entry to the configuration")]
    UnknownChain { key: String },
    #[error("chain {key:?} has no network_id configured")]
    MissingNetworkId { key: String },
    #[error("chain {key:?} has no rpc_url configured")]
    MissingRpcUrl { key: String },
    #[error("home chain {key:?} has no router address configured")]
    MissingRouter { key: String },
    #[error("external chain {key:?} has no usdc address configured")]
    MissingUsdc { key: String },
    #[error("external chain {key:?} has no token_messenger address configured")]
    MissingTokenMessenger { key: String },
}

/// Load-time registry error. Unlike [`ConfigurationError`] this is fatal:
/// a duplicate domain id would misroute burns between the two chains.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chains {first:?} and {second:?} share protocol domain {domain}")]
pub struct DuplicateDomainError {
    pub first: String,
    pub second: String,
    pub domain: u32,
}

/// Catalogue of chain descriptors keyed by logical chain key.
#[derive(Debug)]
pub struct ChainRegistry {
    complete: BTreeMap<String, ChainDescriptor>,
    broken: BTreeMap<String, ConfigurationError>,
}

impl ChainRegistry {
    /// Builds the registry from raw config entries.
    ///
    /// `home_key` names the chain whose contracts come from the router;
    /// every other entry is treated as an external chain.
    pub fn from_entries(
        home_key: &str,
        entries: &BTreeMap<String, ChainEntry>,
    ) -> Result<Self, DuplicateDomainError> {
        let mut complete = BTreeMap::new();
        let mut broken = BTreeMap::new();
        let mut seen_domains: BTreeMap<u32, String> = BTreeMap::new();

        for (key, entry) in entries {
            if let Some(first) = seen_domains.insert(entry.domain, key.clone()) {
                return Err(DuplicateDomainError {
                    first,
                    second: key.clone(),
                    domain: entry.domain,
                });
            }

            match build_descriptor(key, entry, key == home_key) {
                Ok(descriptor) => {
                    complete.insert(key.clone(), descriptor);
                }
                Err(error) => {
                    warn!(chain = %key, %error, "Chain entry incomplete, deferring");
                    broken.insert(key.clone(), error);
                }
            }
        }

        Ok(Self { complete, broken })
    }

    /// Resolves a chain key to its descriptor.
    pub fn resolve(&self, key: &str) -> Result<&ChainDescriptor, ConfigurationError> {
        if let Some(descriptor) = self.complete.get(key) {
            return Ok(descriptor);
        }
        if let Some(error) = self.broken.get(key) {
            return Err(error.clone());
        }
        Err(ConfigurationError::UnknownChain {
            key: key.to_string(),
        })
    }

    /// Returns the protocol domain id for a chain key.
    pub fn domain_of(&self, key: &str) -> Result<u32, ConfigurationError> {
        self.resolve(key).map(|descriptor| descriptor.domain)
    }

    /// Iterates over the usable descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.complete.values()
    }
}

fn build_descriptor(
    key: &str,
    entry: &ChainEntry,
    is_home: bool,
) -> Result<ChainDescriptor, ConfigurationError> {
    let missing = |error: fn(String) -> ConfigurationError| error(key.to_string());

    let network_id = entry
        .network_id
        .ok_or_else(|| missing(|key| ConfigurationError::MissingNetworkId { key }))?;
    let rpc_url = entry
        .rpc_url
        .clone()
        .ok_or_else(|| missing(|key| ConfigurationError::MissingRpcUrl { key }))?;

    let contracts = if is_home {
        let router = entry
            .router
            .ok_or_else(|| missing(|key| ConfigurationError::MissingRouter { key }))?;
        ChainContracts::Home { router }
    } else {
        let usdc = entry
            .usdc
            .ok_or_else(|| missing(|key| ConfigurationError::MissingUsdc { key }))?;
        let token_messenger = entry
            .token_messenger
            .ok_or_else(|| missing(|key| ConfigurationError::MissingTokenMessenger { key }))?;
        ChainContracts::External {
            usdc,
            token_messenger,
        }
    };

    Ok(ChainDescriptor {
        key: key.to_string(),
        display_name: entry.display_name.clone().unwrap_or_else(|| key.to_string()),
        domain: entry.domain,
        network_id,
        rpc_url,
        explorer_url: entry.explorer_url.clone(),
        native_symbol: entry.native_symbol.clone().unwrap_or_else(|| "ETH".to_string()),
        contracts,
    })
}
