//! Wallet network negotiation.
//!
//! Before any transaction is built, the wallet's active network must match
//! the transfer's source chain. The reconciler is the sole writer of that
//! shared piece of wallet state and must run to completion before the
//! executor is allowed to proceed.

use tracing::{debug, info};

use crate::registry::ChainDescriptor;
use crate::wallet::{WalletError, WalletPort};

/// Errors from network switch negotiation. None of these are retried
/// automatically; each failure needs a fresh user decision.
#[derive(Debug, thiserror::Error)]
pub enum ChainSwitchError {
    #[error(
        "switch to {chain} (network {network_id}) was declined; approve the \
         network switch in the wallet and resubmit the transfer"
    )]
    Declined { chain: String, network_id: u64 },
    #[error(
        "switching to {chain} requires a direct user interaction; retry the \
         transfer from a user-initiated action"
    )]
    GestureRequired { chain: String },
    #[error("registering {chain} with the wallet failed")]
    AddNetworkFailed {
        chain: String,
        #[source]
        source: WalletError,
    },
    #[error("switch to {chain} failed")]
    SwitchFailed {
        chain: String,
        #[source]
        source: WalletError,
    },
    #[error("could not read the wallet's active network")]
    NetworkRead(#[source] WalletError),
}

/// Ensures the wallet is on a transfer's required source chain.
pub struct NetworkReconciler<'a> {
    wallet: &'a dyn WalletPort,
}

impl<'a> NetworkReconciler<'a> {
    pub fn new(wallet: &'a dyn WalletPort) -> Self {
        Self { wallet }
    }

    /// Puts the wallet on `target`'s network.
    ///
    /// No-op (zero wallet requests) when the wallet already reports the
    /// target network id. Otherwise issues one switch request; if the
    /// wallet does not know the network, registers it and retries the
    /// switch exactly once.
    pub async fn ensure_on_chain(&self, target: &ChainDescriptor) -> Result<(), ChainSwitchError> {
        let current = self
            .wallet
            .network_id()
            .await
            .map_err(ChainSwitchError::NetworkRead)?;

        if current == target.network_id {
            debug!(chain = %target.key, network_id = current, "Wallet already on target network");
            return Ok(());
        }

        info!(
            chain = %target.key,
            from = current,
            to = target.network_id,
            "Requesting wallet network switch"
        );

        match self.wallet.switch_network(target.network_id).await {
            Ok(()) => Ok(()),
            Err(WalletError::UnknownNetwork { .. }) => {
                info!(chain = %target.key, "Network unknown to wallet, registering");

                self.wallet
                    .add_network(target)
                    .await
                    .map_err(|source| self.classify(target, source, true))?;

                self.wallet
                    .switch_network(target.network_id)
                    .await
                    .map_err(|source| self.classify(target, source, false))
            }
            Err(source) => Err(self.classify(target, source, false)),
        }
    }

    fn classify(
        &self,
        target: &ChainDescriptor,
        source: WalletError,
        during_add: bool,
    ) -> ChainSwitchError {
        match source {
            WalletError::Declined { .. } => ChainSwitchError::Declined {
                chain: target.key.clone(),
                network_id: target.network_id,
            },
            WalletError::GestureRequired => ChainSwitchError::GestureRequired {
                chain: target.key.clone(),
            },
            source if during_add => ChainSwitchError::AddNetworkFailed {
                chain: target.key.clone(),
                source,
            },
            source => ChainSwitchError::SwitchFailed {
                chain: target.key.clone(),
                source,
            },
        }
    }
}
