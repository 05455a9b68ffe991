//! Burn-sequence confirmation tracking.
//!
//! Every transaction in the transfer sequence is confirmed before the next
//! step runs, so a revert can be attributed to the exact leg that failed.
//! Receipt polling uses a constant backoff; once a transaction is
//! submitted it cannot be withdrawn, so the tracker only ever observes.

use std::time::Duration;

use alloy::primitives::TxHash;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionReceipt;
use backon::{ConstantBuilder, Retryable};
use tracing::{debug, info};

use crate::transfer::TransferStep;

const MAX_ATTEMPTS: usize = 60;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("the {step} transaction reverted on-chain: {tx_hash}")]
    Reverted { step: TransferStep, tx_hash: TxHash },
    #[error("no receipt for the {step} transaction {tx_hash} after {attempts} attempts")]
    Timeout {
        step: TransferStep,
        tx_hash: TxHash,
        attempts: usize,
    },
    #[error("receipt lookup failed: {0}")]
    Rpc(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
}

enum PollError {
    NotFound,
    Rpc(alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
}

/// Waits for a submitted transaction's inclusion and validates its status.
pub struct ConfirmationTracker {
    provider: DynProvider,
    max_attempts: usize,
    poll_interval: Duration,
}

impl ConfirmationTracker {
    pub fn new(provider: DynProvider) -> Self {
        Self {
            provider,
            max_attempts: MAX_ATTEMPTS,
            poll_interval: POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_schedule(
        provider: DynProvider,
        max_attempts: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            max_attempts,
            poll_interval,
        }
    }

    /// Blocks until the transaction has a receipt, then checks its status.
    ///
    /// A receipt with a failure status surfaces as
    /// [`ConfirmError::Reverted`] tagged with the step that submitted the
    /// transaction, so the caller can report precisely which leg of the
    /// sequence failed.
    pub async fn await_inclusion(
        &self,
        tx_hash: TxHash,
        step: TransferStep,
    ) -> Result<TransactionReceipt, ConfirmError> {
        // max_times counts retries after the initial lookup, so the total
        // number of receipt lookups equals max_attempts.
        let backoff = ConstantBuilder::default()
            .with_delay(self.poll_interval)
            .with_max_times(self.max_attempts.saturating_sub(1));

        let fetch_receipt = || async {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => Ok(receipt),
                Ok(None) => Err(PollError::NotFound),
                Err(error) => Err(PollError::Rpc(error)),
            }
        };

        let receipt = fetch_receipt
            .retry(backoff)
            .when(|error| matches!(error, PollError::NotFound))
            .notify(|_, dur| debug!(%tx_hash, %step, ?dur, "Receipt not yet available, retrying"))
            .await
            .map_err(|error| match error {
                PollError::NotFound => ConfirmError::Timeout {
                    step,
                    tx_hash,
                    attempts: self.max_attempts,
                },
                PollError::Rpc(error) => ConfirmError::Rpc(error),
            })?;

        if !receipt.status() {
            return Err(ConfirmError::Reverted { step, tx_hash });
        }

        info!(%tx_hash, %step, "Transaction confirmed");
        Ok(receipt)
    }
}
