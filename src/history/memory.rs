//! In-memory history store. Clones share the same storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{HistoryError, HistoryStore, Namespace, TransferRecord};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<TransferRecord>>>>,
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn load(&self, namespace: Namespace) -> Result<Vec<TransferRecord>, HistoryError> {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(inner.get(&namespace.to_string()).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        namespace: Namespace,
        records: Vec<TransferRecord>,
    ) -> Result<(), HistoryError> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.insert(namespace.to_string(), records);
        Ok(())
    }

    async fn clear(&self, namespace: Namespace) -> Result<(), HistoryError> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.remove(&namespace.to_string());
        Ok(())
    }
}
