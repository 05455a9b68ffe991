//! Completed-transfer history.
//!
//! Records are appended only after the burn receipt confirms, never
//! mutated, and removed only by an explicit clear. The backing store is a
//! port so tests run in memory while the binary persists to a JSON file.

pub mod file;
pub mod memory;

use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::transfer::Direction;
use crate::usdc::Usdc;

/// One confirmed transfer, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Unix timestamp in seconds, taken when the burn confirmed.
    pub timestamp: u64,
    pub sender: Address,
    pub recipient: Address,
    pub amount: Usdc,
    pub tx_hash: TxHash,
    pub memo: Option<String>,
    pub direction: Direction,
}

impl TransferRecord {
    pub(crate) fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

/// Composite key isolating one deployment's history from another's.
///
/// Two deployments can share a browser profile or data directory, so
/// records are namespaced by home network id and router address rather
/// than stored in a single flat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace {
    pub network_id: u64,
    pub router: Address,
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.network_id, self.router)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read history store: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write history store: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to encode history document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Persistence port for the ledger. Implementations load and save whole
/// namespaced record lists; ordering and pagination live in the ledger.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self, namespace: Namespace) -> Result<Vec<TransferRecord>, HistoryError>;

    async fn save(
        &self,
        namespace: Namespace,
        records: Vec<TransferRecord>,
    ) -> Result<(), HistoryError>;

    async fn clear(&self, namespace: Namespace) -> Result<(), HistoryError>;
}

/// Append-only, paginated view over one namespace's records.
pub struct HistoryLedger {
    store: Box<dyn HistoryStore>,
    namespace: Namespace,
}

impl HistoryLedger {
    pub fn new(store: Box<dyn HistoryStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub async fn append(&self, record: TransferRecord) -> Result<(), HistoryError> {
        let mut records = self.store.load(self.namespace).await?;
        records.push(record);
        self.store.save(self.namespace, records).await
    }

    /// Returns one page of records, newest first. Pages are zero-indexed;
    /// a page past the end is empty, not an error.
    pub async fn list(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<TransferRecord>, HistoryError> {
        let records = self.store.load(self.namespace).await?;
        Ok(records
            .into_iter()
            .rev()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect())
    }

    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.store.clear(self.namespace).await
    }
}
