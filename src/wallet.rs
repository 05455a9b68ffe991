//! Wallet port: the bridge's only write path onto any chain.
//!
//! The orchestrator never talks to a signer directly. Everything that
//! needs user authority (switching the active network, registering an
//! unknown network, submitting a transaction) goes through [`WalletPort`],
//! so "user declined" is an ordinary returned error rather than a dropped
//! callback. [`LocalWallet`] is the production implementation: a local
//! signer that keeps a catalogue of known networks and reconnects its
//! provider when asked to switch.

use std::collections::HashMap;
use std::sync::RwLock;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::registry::ChainDescriptor;

/// Errors surfaced by wallet interactions.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("the wallet declined the {action} request")]
    Declined { action: &'static str },
    #[error("the wallet does not know network {network_id}")]
    UnknownNetwork { network_id: u64 },
    #[error("the wallet requires a direct user interaction for this request")]
    GestureRequired,
    #[error("transaction submission failed: {0}")]
    Submission(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    #[error("wallet is locked behind a poisoned lock")]
    Poisoned,
}

/// External wallet collaborator.
///
/// Mirrors what a connected wallet session can do: report its active
/// network, switch or register networks, and submit signed transactions.
/// `submit` returns as soon as the transaction is accepted by the node;
/// inclusion is tracked separately by the confirmation tracker.
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// The address this wallet signs from.
    fn address(&self) -> Address;

    /// Network id of the wallet's currently active network.
    async fn network_id(&self) -> Result<u64, WalletError>;

    /// Requests a switch to the given network.
    async fn switch_network(&self, network_id: u64) -> Result<(), WalletError>;

    /// Requests registration of a network the wallet does not know yet.
    async fn add_network(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError>;

    /// Submits a signed contract call and returns its transaction hash.
    ///
    /// `note` is a human-readable description of the operation, used for
    /// logging and wallet prompts.
    async fn submit(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TxHash, WalletError>;
}

struct ActiveNetwork {
    network_id: u64,
    provider: DynProvider,
}

/// Local signing wallet backed by per-network RPC connections.
///
/// Holds a private-key signer plus a map of known networks. Switching
/// networks reconnects the wallet-enabled provider to the target RPC
/// endpoint; a switch to an unregistered network fails with
/// [`WalletError::UnknownNetwork`] until `add_network` registers it.
pub struct LocalWallet {
    signer_address: Address,
    wallet: EthereumWallet,
    networks: RwLock<HashMap<u64, Url>>,
    active: RwLock<ActiveNetwork>,
}

impl LocalWallet {
    /// Creates a wallet connected to an initial network.
    pub fn new(signer: PrivateKeySigner, network_id: u64, rpc_url: Url) -> Self {
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet.clone())
            .connect_http(rpc_url.clone())
            .erased();

        Self {
            signer_address,
            wallet,
            networks: RwLock::new(HashMap::from([(network_id, rpc_url)])),
            active: RwLock::new(ActiveNetwork {
                network_id,
                provider,
            }),
        }
    }

    /// Registers an additional known network without switching to it.
    pub fn register_network(&self, network_id: u64, rpc_url: Url) -> Result<(), WalletError> {
        self.networks
            .write()
            .map_err(|_| WalletError::Poisoned)?
            .insert(network_id, rpc_url);
        Ok(())
    }

    fn active_provider(&self) -> Result<DynProvider, WalletError> {
        Ok(self
            .active
            .read()
            .map_err(|_| WalletError::Poisoned)?
            .provider
            .clone())
    }
}

#[async_trait]
impl WalletPort for LocalWallet {
    fn address(&self) -> Address {
        self.signer_address
    }

    async fn network_id(&self) -> Result<u64, WalletError> {
        Ok(self
            .active
            .read()
            .map_err(|_| WalletError::Poisoned)?
            .network_id)
    }

    async fn switch_network(&self, network_id: u64) -> Result<(), WalletError> {
        let rpc_url = self
            .networks
            .read()
            .map_err(|_| WalletError::Poisoned)?
            .get(&network_id)
            .cloned()
            .ok_or(WalletError::UnknownNetwork { network_id })?;

        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect_http(rpc_url)
            .erased();

        *self.active.write().map_err(|_| WalletError::Poisoned)? = ActiveNetwork {
            network_id,
            provider,
        };

        info!(network_id, "Switched wallet network");
        Ok(())
    }

    async fn add_network(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError> {
        debug!(
            chain = %descriptor.key,
            network_id = descriptor.network_id,
            "Registering network with wallet"
        );
        self.register_network(descriptor.network_id, descriptor.rpc_url.clone())
    }

    async fn submit(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TxHash, WalletError> {
        let provider = self.active_provider()?;

        info!(%contract, note, "Submitting contract call");

        let tx = alloy::rpc::types::TransactionRequest::default()
            .to(contract)
            .input(calldata.into());

        let pending = provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();

        info!(%tx_hash, note, "Transaction submitted");
        Ok(tx_hash)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted wallet for tests. Records every request it receives so
    //! tests can assert on exactly which prompts would have been shown.

    use std::sync::Mutex;

    use alloy::primitives::B256;

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct MockWalletState {
        pub(crate) network_id: u64,
        pub(crate) known_networks: Vec<u64>,
        pub(crate) switch_requests: Vec<u64>,
        pub(crate) add_requests: Vec<u64>,
        pub(crate) submissions: Vec<(Address, Bytes, String)>,
    }

    pub(crate) struct MockWallet {
        pub(crate) address: Address,
        pub(crate) state: Mutex<MockWalletState>,
        /// When set, every switch request is declined.
        pub(crate) decline_switch: bool,
        /// When set, every add-network request is declined.
        pub(crate) decline_add: bool,
        /// When set, every switch request demands a fresh user gesture,
        /// as browser wallets do for switches outside a click handler.
        pub(crate) gesture_required: bool,
    }

    impl MockWallet {
        pub(crate) fn on_network(network_id: u64) -> Self {
            Self {
                address: Address::repeat_byte(0xAA),
                state: Mutex::new(MockWalletState {
                    network_id,
                    known_networks: vec![network_id],
                    ..Default::default()
                }),
                decline_switch: false,
                decline_add: false,
                gesture_required: false,
            }
        }

        pub(crate) fn knowing(mut self, network_id: u64) -> Self {
            self.state
                .get_mut()
                .unwrap()
                .known_networks
                .push(network_id);
            self
        }

        pub(crate) fn declining_switch(mut self) -> Self {
            self.decline_switch = true;
            self
        }

        pub(crate) fn declining_add(mut self) -> Self {
            self.decline_add = true;
            self
        }

        pub(crate) fn requiring_gesture(mut self) -> Self {
            self.gesture_required = true;
            self
        }

        pub(crate) fn switch_requests(&self) -> Vec<u64> {
            self.state.lock().unwrap().switch_requests.clone()
        }

        pub(crate) fn add_requests(&self) -> Vec<u64> {
            self.state.lock().unwrap().add_requests.clone()
        }

        pub(crate) fn submissions(&self) -> Vec<(Address, Bytes, String)> {
            self.state.lock().unwrap().submissions.clone()
        }
    }

    #[async_trait]
    impl WalletPort for MockWallet {
        fn address(&self) -> Address {
            self.address
        }

        async fn network_id(&self) -> Result<u64, WalletError> {
            Ok(self.state.lock().unwrap().network_id)
        }

        async fn switch_network(&self, network_id: u64) -> Result<(), WalletError> {
            let mut state = self.state.lock().unwrap();
            state.switch_requests.push(network_id);

            if self.decline_switch {
                return Err(WalletError::Declined {
                    action: "network switch",
                });
            }
            if self.gesture_required {
                return Err(WalletError::GestureRequired);
            }
            if !state.known_networks.contains(&network_id) {
                return Err(WalletError::UnknownNetwork { network_id });
            }

            state.network_id = network_id;
            Ok(())
        }

        async fn add_network(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError> {
            let mut state = self.state.lock().unwrap();
            state.add_requests.push(descriptor.network_id);

            if self.decline_add {
                return Err(WalletError::Declined {
                    action: "add network",
                });
            }

            state.known_networks.push(descriptor.network_id);
            Ok(())
        }

        async fn submit(
            &self,
            contract: Address,
            calldata: Bytes,
            note: &str,
        ) -> Result<TxHash, WalletError> {
            let mut state = self.state.lock().unwrap();
            state
                .submissions
                .push((contract, calldata, note.to_string()));
            let n = u8::try_from(state.submissions.len()).unwrap_or(u8::MAX);
            Ok(B256::with_last_byte(n))
        }
    }
}
