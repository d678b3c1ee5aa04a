use crate::domain::commit::IdempotencyRecord;
use crate::domain::order::OrderId;
use crate::domain::ports::IdempotencyStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for per-order commit state.
///
/// Uses `Arc<RwLock<HashMap<OrderId, IdempotencyRecord>>>` to allow shared
/// concurrent access. State is lost on restart, so a redelivery after a
/// restart would commit again; use the RocksDB store where that matters.
#[derive(Default, Clone)]
pub struct InMemoryIdempotencyStore {
    records: Arc<RwLock<HashMap<OrderId, IdempotencyRecord>>>,
}

impl InMemoryIdempotencyStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn store(&self, record: IdempotencyRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.order_id.clone(), record);
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<IdempotencyRecord>> {
        let records = self.records.read().await;
        Ok(records.get(order_id).cloned())
    }
}
