use crate::domain::ports::TransactionLedger;
use crate::domain::transaction::{TransactionId, TransactionRecord};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A thread-safe in-memory pending set for the payment queue.
///
/// Uses `Arc<RwLock<BTreeMap<TransactionId, TransactionRecord>>>` so clones
/// share state. Pending transactions come back ordered by id. Nothing
/// survives the process, so redelivery only happens within one run.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    transactions: Arc<RwLock<BTreeMap<TransactionId, TransactionRecord>>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionLedger for InMemoryLedger {
    fn store(&self, transaction: TransactionRecord) -> Result<()> {
        let mut transactions = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        transactions.insert(transaction.id.clone(), transaction);
        Ok(())
    }

    fn remove(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        let mut transactions = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(transactions.remove(id))
    }

    fn pending(&self) -> Result<Vec<TransactionRecord>> {
        let transactions = self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(transactions.values().cloned().collect())
    }
}
