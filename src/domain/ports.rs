use super::purchase::{Purchase, PurchaseSource, RestoreResult, StoreIntentResponse};
use super::transaction::{TransactionError, TransactionId, TransactionRecord};
use crate::application::completion::CompletionToken;
use crate::error::Result;
use std::sync::{Arc, Weak};

/// Business-layer capabilities the observer reports into.
///
/// Every method is invoked on the queue's dispatch context and must return
/// promptly; slow work belongs on another task.
pub trait ObserverDelegate: Send + Sync {
    fn will_update_purchases(&self);
    fn did_update_purchases(&self);

    fn did_finish_restoring_purchases(&self, result: RestoreResult);

    /// The transaction stays unacknowledged until `completion` is invoked.
    fn did_purchase_product(&self, product_id: &str, completion: CompletionToken);
    fn did_fail_to_purchase_product(&self, product_id: &str, error: &TransactionError);
    fn did_restore_purchase(&self, product_id: &str);

    fn purchase_for(&self, source: PurchaseSource) -> Option<Purchase>;
    fn response_for_store_intent(&self, purchase: &Purchase) -> StoreIntentResponse;
}

/// The queue's acknowledgment operation. Must tolerate repeated calls.
pub trait TransactionAcknowledger: Send + Sync {
    /// An `Err` means the transaction is still pending in the queue.
    fn finish_transaction(&self, transaction: &TransactionRecord) -> Result<()>;
}

/// Persisted pending set of the payment queue.
pub trait TransactionLedger: Send + Sync {
    fn store(&self, transaction: TransactionRecord) -> Result<()>;
    fn remove(&self, id: &TransactionId) -> Result<Option<TransactionRecord>>;
    fn pending(&self) -> Result<Vec<TransactionRecord>>;
}

pub type DelegateRef = Weak<dyn ObserverDelegate>;
pub type AcknowledgerRef = Arc<dyn TransactionAcknowledger>;
pub type LedgerBox = Box<dyn TransactionLedger>;
