//! The bridge pipeline.
//!
//! One entry point, [`Orchestrator::transfer`], runs the whole sequence:
//! validate, resolve both chains, put the wallet on the source network,
//! quote the fee, encode the hook payload, execute the burn sequence, and
//! record the result. Stages run strictly in order and the first failure
//! aborts the attempt; nothing is persisted for a failed transfer.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use tracing::{debug, info};

use crate::fee::{FeeCalculator, FeeConstraintError};
use crate::history::{HistoryError, HistoryLedger, TransferRecord};
use crate::memo::encode_hook_data;
use crate::reconcile::{ChainSwitchError, NetworkReconciler};
use crate::registry::{ChainDescriptor, ChainRegistry, ConfigurationError};
use crate::transfer::evm::Evm;
use crate::transfer::{
    ChainError, SourceChain, TransferError, TransferExecutor, TransferRequest, ValidationError,
};
use crate::usdc::Usdc;
use crate::wallet::WalletPort;

/// Top-level error for one transfer attempt.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    ChainSwitch(#[from] ChainSwitchError),
    #[error(transparent)]
    Fee(#[from] FeeConstraintError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Opens a [`SourceChain`] connection for a resolved chain descriptor.
/// Injectable so the pipeline is testable without an RPC endpoint.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        descriptor: &ChainDescriptor,
        wallet: Arc<dyn WalletPort>,
    ) -> Arc<dyn SourceChain>;
}

struct EvmConnector;

impl Connector for EvmConnector {
    fn connect(
        &self,
        descriptor: &ChainDescriptor,
        wallet: Arc<dyn WalletPort>,
    ) -> Arc<dyn SourceChain> {
        Arc::new(Evm::connect(descriptor, wallet))
    }
}

/// Pipeline-wide settings that do not vary per transfer.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub home_key: String,
    pub min_transfer: Usdc,
    pub min_finality_threshold: u32,
    /// Prefix every hook payload carries before the optional memo.
    pub base_hook_payload: Bytes,
}

pub struct Orchestrator {
    registry: ChainRegistry,
    wallet: Arc<dyn WalletPort>,
    fees: FeeCalculator,
    ledger: HistoryLedger,
    options: BridgeOptions,
    connector: Box<dyn Connector>,
}

impl Orchestrator {
    pub fn new(
        registry: ChainRegistry,
        wallet: Arc<dyn WalletPort>,
        fees: FeeCalculator,
        ledger: HistoryLedger,
        options: BridgeOptions,
    ) -> Self {
        Self {
            registry,
            wallet,
            fees,
            ledger,
            options,
            connector: Box::new(EvmConnector),
        }
    }

    #[cfg(test)]
    fn with_connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Builds a request between two chain keys, inferring the direction
    /// from which endpoint is the home chain.
    pub fn request(
        &self,
        source: &str,
        destination: &str,
        amount: Usdc,
        recipient: Address,
        memo: Option<String>,
    ) -> Result<TransferRequest, ValidationError> {
        TransferRequest::between(
            &self.options.home_key,
            source,
            destination,
            amount,
            recipient,
            memo,
        )
    }

    /// Runs one transfer end to end and returns its history record.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferRecord, BridgeError> {
        request.validate(self.options.min_transfer)?;

        let source = self.registry.resolve(&request.source)?;
        let destination_domain = self.registry.domain_of(&request.destination)?;
        info!(
            source = %request.source,
            destination = %request.destination,
            amount = %request.amount,
            direction = ?request.direction,
            "Starting transfer"
        );

        NetworkReconciler::new(self.wallet.as_ref())
            .ensure_on_chain(source)
            .await?;

        let chain = self.connector.connect(source, self.wallet.clone());

        // The source context is read once here and shared by the quote and
        // the executor, so all steps see the same fee terms.
        let context = chain.transfer_context().await?;
        let protocol_min = chain
            .protocol_min_fee(context.token_messenger, request.amount.0)
            .await?;

        let quote = self.fees.quote(
            request.amount.0,
            request.direction,
            protocol_min,
            context.service_fee,
        )?;
        debug!(?quote, "Fee quote accepted");

        let hook_data = encode_hook_data(
            &self.options.base_hook_payload,
            request.memo.as_deref(),
        )
        .map_err(ValidationError::Memo)?;

        let executed = TransferExecutor::new(self.options.min_finality_threshold)
            .execute(
                self.wallet.as_ref(),
                chain.as_ref(),
                &context,
                request,
                &quote,
                hook_data,
                destination_domain,
            )
            .await?;

        let record = TransferRecord {
            timestamp: TransferRecord::now(),
            sender: self.wallet.address(),
            recipient: request.recipient,
            amount: request.amount,
            tx_hash: executed.burn_tx,
            memo: request.memo.clone(),
            direction: request.direction,
        };
        self.ledger.append(record.clone()).await?;

        Ok(record)
    }

    /// One page of completed transfers, newest first.
    pub async fn history(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<TransferRecord>, BridgeError> {
        Ok(self.ledger.list(page, page_size).await?)
    }

    pub async fn clear_history(&self) -> Result<(), BridgeError> {
        Ok(self.ledger.clear().await?)
    }
}
