//! JSON-file-backed history store.
//!
//! The file holds one JSON object mapping namespace keys to record
//! arrays. A missing file and an unparseable or legacy document both read
//! as empty; history is a convenience surface and must never block a
//! transfer.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use super::{HistoryError, HistoryStore, Namespace, TransferRecord};

type Document = BTreeMap<String, Vec<TransferRecord>>;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_document(&self) -> Result<Document, HistoryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Document::new());
            }
            Err(error) => return Err(HistoryError::Read(error)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(document) => Ok(document),
            // Legacy or corrupt documents read as empty rather than fail.
            Err(error) => {
                warn!(path = %self.path.display(), %error, "Unreadable history document, starting empty");
                Ok(Document::new())
            }
        }
    }

    async fn write_document(&self, document: &Document) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(HistoryError::Write)?;
        }
        let bytes = serde_json::to_vec_pretty(document).map_err(HistoryError::Encode)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(HistoryError::Write)
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn load(&self, namespace: Namespace) -> Result<Vec<TransferRecord>, HistoryError> {
        let document = self.read_document().await?;
        Ok(document.get(&namespace.to_string()).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        namespace: Namespace,
        records: Vec<TransferRecord>,
    ) -> Result<(), HistoryError> {
        let mut document = self.read_document().await?;
        document.insert(namespace.to_string(), records);
        self.write_document(&document).await
    }

    async fn clear(&self, namespace: Namespace) -> Result<(), HistoryError> {
        let mut document = self.read_document().await?;
        if document.remove(&namespace.to_string()).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }
}
