use crate::domain::commit::IdempotencyRecord;
use crate::domain::order::OrderId;
use crate::domain::ports::IdempotencyStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing per-order commit records.
pub const CF_COMMITS: &str = "commits";

/// A persistent idempotency store backed by RocksDB.
///
/// Records are kept as JSON in the `commits` column family, keyed by the
/// order id bytes, so commit state survives restarts.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_commits = ColumnFamilyDescriptor::new(CF_COMMITS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_commits])?;

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl IdempotencyStore for RocksDBStore {
    async fn store(&self, record: IdempotencyRecord) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_COMMITS)
            .ok_or_else(|| PaymentError::StoreError("Commits column family not found".to_string()))?;

        let value = serde_json::to_vec(&record)
            .map_err(|e| PaymentError::StoreError(format!("Serialization error: {e}")))?;

        self.db.put_cf(&cf, record.order_id.as_str().as_bytes(), value)?;

        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<IdempotencyRecord>> {
        let cf = self
            .db
            .cf_handle(CF_COMMITS)
            .ok_or_else(|| PaymentError::StoreError("Commits column family not found".to_string()))?;

        match self.db.get_cf(&cf, order_id.as_str().as_bytes())? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| PaymentError::StoreError(format!("Deserialization error: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
