use crate::domain::ports::TransactionLedger;
use crate::domain::transaction::{TransactionId, TransactionRecord};
use crate::error::{ObserverError, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing unacknowledged transactions.
pub const CF_PENDING: &str = "pending";

impl From<rocksdb::Error> for ObserverError {
    fn from(e: rocksdb::Error) -> Self {
        ObserverError::Storage(Box::new(e))
    }
}

/// A persistent pending set using RocksDB.
///
/// Transactions are keyed by id and stored as JSON, so anything left
/// unacknowledged when the process exits is redelivered on the next launch.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
}

impl RocksDbLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_pending = ColumnFamilyDescriptor::new(CF_PENDING, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_pending])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn with_pending<T>(&self, f: impl FnOnce(&rocksdb::ColumnFamily) -> Result<T>) -> Result<T> {
        let cf = self.db.cf_handle(CF_PENDING).ok_or_else(|| {
            ObserverError::Storage(Box::new(std::io::Error::other(
                "Pending column family not found",
            )))
        })?;
        f(cf)
    }
}

impl TransactionLedger for RocksDbLedger {
    fn store(&self, transaction: TransactionRecord) -> Result<()> {
        self.with_pending(|cf| {
            let value = serde_json::to_vec(&transaction)?;
            self.db.put_cf(cf, transaction.id.as_str(), value)?;
            Ok(())
        })
    }

    fn remove(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        self.with_pending(|cf| {
            let Some(bytes) = self.db.get_cf(cf, id.as_str())? else {
                return Ok(None);
            };
            self.db.delete_cf(cf, id.as_str())?;
            let transaction: TransactionRecord = serde_json::from_slice(&bytes)?;
            Ok(Some(transaction))
        })
    }

    fn pending(&self) -> Result<Vec<TransactionRecord>> {
        self.with_pending(|cf| {
            let mut transactions: Vec<TransactionRecord> = Vec::new();
            for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
                let (_key, value) = item?;
                transactions.push(serde_json::from_slice(&value)?);
            }
            Ok(transactions)
        })
    }
}
