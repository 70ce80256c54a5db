use crate::application::observer::{BatchOutcome, TransactionObserver};
use crate::domain::ports::{LedgerBox, TransactionAcknowledger};
use crate::domain::purchase::{Product, RestoreResult, StorePayment};
use crate::domain::transaction::TransactionRecord;
use crate::error::Result;

/// Stand-in for the platform payment queue.
///
/// Every delivered transaction is written to the ledger first and only
/// leaves it when acknowledged. Whatever is still in the ledger gets
/// redelivered by [`SimulatedPaymentQueue::redeliver_pending`], the way the
/// real queue replays unfinished transactions on launch.
pub struct SimulatedPaymentQueue {
    ledger: LedgerBox,
}

impl SimulatedPaymentQueue {
    pub fn new(ledger: LedgerBox) -> Self {
        Self { ledger }
    }

    /// Records the batch as pending and hands it to the observer.
    pub fn deliver(
        &self,
        observer: &TransactionObserver,
        transactions: Vec<TransactionRecord>,
    ) -> Result<BatchOutcome> {
        for transaction in &transactions {
            self.ledger.store(transaction.clone())?;
        }
        Ok(observer.on_queue_update(&transactions))
    }

    /// Replays every unacknowledged transaction as one batch.
    /// Returns `None` when nothing is pending.
    pub fn redeliver_pending(&self, observer: &TransactionObserver) -> Result<Option<BatchOutcome>> {
        let pending = self.ledger.pending()?;
        if pending.is_empty() {
            return Ok(None);
        }
        tracing::info!(count = pending.len(), "Redelivering pending transactions");
        Ok(Some(observer.on_queue_update(&pending)))
    }

    /// Asks the observer whether a store-initiated purchase may proceed.
    pub fn propose_store_payment(&self, observer: &TransactionObserver, product: Product) -> bool {
        let payment = StorePayment::for_product(&product);
        observer.on_store_initiated_payment(product, payment)
    }

    pub fn finish_restore(&self, observer: &TransactionObserver, result: RestoreResult) {
        match result {
            Ok(()) => observer.restore_completed_transactions_finished(),
            Err(e) => observer.restore_completed_transactions_failed(e),
        }
    }

    pub fn pending(&self) -> Result<Vec<TransactionRecord>> {
        self.ledger.pending()
    }
}

impl TransactionAcknowledger for SimulatedPaymentQueue {
    fn finish_transaction(&self, transaction: &TransactionRecord) -> Result<()> {
        match self.ledger.remove(&transaction.id)? {
            Some(_) => tracing::debug!(transaction = %transaction.id, "Transaction finished"),
            None => {
                tracing::debug!(transaction = %transaction.id, "Transaction already finished")
            }
        }
        Ok(())
    }
}
