use crate::domain::ports::AcknowledgerRef;
use crate::domain::transaction::{TransactionId, TransactionRecord};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-use handle that acknowledges a purchased transaction.
///
/// Handed to the delegate alongside a purchase notification. The delegate
/// calls [`CompletionToken::complete`] once the purchase is durably recorded,
/// from any thread or task. Clones share state: only the first `complete`
/// across all clones reaches the queue, later calls are no-ops.
///
/// Dropping every clone without completing leaves the transaction pending in
/// the queue, which redelivers it on the next launch.
#[derive(Clone)]
pub struct CompletionToken {
    inner: Arc<Inner>,
}

struct Inner {
    transaction: TransactionRecord,
    acknowledger: AcknowledgerRef,
    completed: AtomicBool,
}

impl CompletionToken {
    pub(crate) fn new(transaction: TransactionRecord, acknowledger: AcknowledgerRef) -> Self {
        Self {
            inner: Arc::new(Inner {
                transaction,
                acknowledger,
                completed: AtomicBool::new(false),
            }),
        }
    }

    /// Acknowledges the transaction. Returns `true` only for the call that
    /// actually acknowledged it.
    ///
    /// If the queue fails to acknowledge, the token stays usable and a later
    /// `complete` retries.
    pub fn complete(&self) -> bool {
        if self
            .inner
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(
                transaction = %self.inner.transaction.id,
                "Purchase completion invoked more than once, ignoring"
            );
            return false;
        }

        if let Err(e) = self
            .inner
            .acknowledger
            .finish_transaction(&self.inner.transaction)
        {
            self.inner.completed.store(false, Ordering::Release);
            tracing::error!(
                transaction = %self.inner.transaction.id,
                %e,
                "Failed to acknowledge purchased transaction"
            );
            return false;
        }
        tracing::info!(
            transaction = %self.inner.transaction.id,
            product = %self.inner.transaction.product_id,
            "Purchased transaction acknowledged"
        );
        true
    }

    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.inner.transaction.id
    }

    pub fn product_id(&self) -> &str {
        &self.inner.transaction.product_id
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("transaction", &self.inner.transaction.id)
            .field("completed", &self.is_completed())
            .finish()
    }
}
