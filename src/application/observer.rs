use super::completion::CompletionToken;
use crate::domain::ports::{AcknowledgerRef, DelegateRef, ObserverDelegate};
use crate::domain::purchase::{Product, PurchaseSource, RestoreResult, StorePayment};
use crate::domain::transaction::{TransactionError, TransactionRecord, TransactionState};
use crate::error::{ObserverError, Result};
use std::sync::Arc;

/// Summary of one `on_queue_update` call.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Restored and failed records acknowledged before the call returned.
    pub acknowledged: usize,
    /// Purchased records handed to the delegate with a completion token.
    pub awaiting_completion: usize,
    /// Purchased records left pending because no delegate was attached.
    pub unclaimed: usize,
    /// Purchasing, deferred and unrecognized records.
    pub ignored: usize,
    /// Restored and failed records the queue refused to acknowledge. They
    /// stay pending and are redelivered.
    pub unacknowledged: usize,
    /// Records the queue delivered in a malformed shape. They receive no
    /// notification and no acknowledgment.
    pub violations: Vec<ObserverError>,
}

/// Observes the payment queue and reports significant updates to a delegate.
///
/// The queue invokes the entry points serially on its own dispatch context.
/// The delegate is held weakly; once it is dropped, notifications are
/// silently skipped.
pub struct TransactionObserver {
    delegate: Option<DelegateRef>,
    acknowledger: AcknowledgerRef,
}

impl TransactionObserver {
    /// Creates an observer without a delegate.
    ///
    /// # Arguments
    ///
    /// * `acknowledger` - The queue's acknowledgment operation.
    pub fn new(acknowledger: AcknowledgerRef) -> Self {
        Self {
            delegate: None,
            acknowledger,
        }
    }

    pub fn set_delegate<D: ObserverDelegate + 'static>(&mut self, delegate: &Arc<D>) {
        let delegate: Arc<dyn ObserverDelegate> = delegate.clone();
        self.delegate = Some(Arc::downgrade(&delegate));
    }

    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    fn delegate(&self) -> Option<Arc<dyn ObserverDelegate>> {
        self.delegate.as_ref().and_then(|delegate| delegate.upgrade())
    }

    /// Handles one batch of transaction state changes.
    ///
    /// Emits `will_update_purchases` before the first record and
    /// `did_update_purchases` after the last, then reports what happened.
    pub fn on_queue_update(&self, transactions: &[TransactionRecord]) -> BatchOutcome {
        if let Some(delegate) = self.delegate() {
            delegate.will_update_purchases();
        }

        let mut outcome = BatchOutcome::default();
        for transaction in transactions {
            tracing::debug!(
                transaction = %transaction.id,
                product = %transaction.product_id,
                state = ?transaction.state,
                "Dispatching transaction update"
            );

            let result = match transaction.state {
                TransactionState::Purchased => {
                    if self.complete_purchase(transaction) {
                        outcome.awaiting_completion += 1;
                    } else {
                        outcome.unclaimed += 1;
                    }
                    continue;
                }
                TransactionState::Restored => self.complete_restore(transaction),
                TransactionState::Failed => self.fail_purchase(transaction),
                TransactionState::Purchasing
                | TransactionState::Deferred
                | TransactionState::Unknown => {
                    outcome.ignored += 1;
                    continue;
                }
            };

            match result {
                Ok(()) => outcome.acknowledged += 1,
                Err(e @ ObserverError::ContractViolation { .. }) => {
                    tracing::error!(%e, "Skipping malformed transaction");
                    outcome.violations.push(e);
                }
                Err(e) => {
                    tracing::error!(
                        transaction = %transaction.id,
                        %e,
                        "Failed to acknowledge transaction"
                    );
                    outcome.unacknowledged += 1;
                }
            }
        }

        if let Some(delegate) = self.delegate() {
            delegate.did_update_purchases();
        }

        tracing::info!(
            records = transactions.len(),
            acknowledged = outcome.acknowledged,
            awaiting_completion = outcome.awaiting_completion,
            unclaimed = outcome.unclaimed,
            ignored = outcome.ignored,
            unacknowledged = outcome.unacknowledged,
            violations = outcome.violations.len(),
            "Processed transaction batch"
        );
        outcome
    }

    /// Decides whether a purchase started outside the application should be
    /// committed now. Returns `true` to let the queue proceed.
    pub fn on_store_initiated_payment(&self, product: Product, payment: StorePayment) -> bool {
        let source = PurchaseSource::PendingStorePayment(product, payment);

        let response = self
            .delegate()
            .and_then(|delegate| {
                delegate
                    .purchase_for(source)
                    .map(|purchase| delegate.response_for_store_intent(&purchase))
            })
            .unwrap_or_default();

        if !response.should_commit() {
            tracing::warn!("Store-initiated payment deferred by delegate");
        }
        response.should_commit()
    }

    /// Relays the terminal result of a restore-all request.
    pub fn on_restore_completed(&self, result: RestoreResult) {
        if let Err(e) = &result {
            tracing::warn!(%e, "Restoring purchases failed");
        }
        if let Some(delegate) = self.delegate() {
            delegate.did_finish_restoring_purchases(result);
        }
    }

    pub fn restore_completed_transactions_finished(&self) {
        self.on_restore_completed(Ok(()));
    }

    pub fn restore_completed_transactions_failed(&self, error: TransactionError) {
        self.on_restore_completed(Err(error));
    }

    /// Returns whether a delegate took ownership of the acknowledgment.
    fn complete_purchase(&self, transaction: &TransactionRecord) -> bool {
        let Some(delegate) = self.delegate() else {
            return false;
        };
        let completion = CompletionToken::new(transaction.clone(), self.acknowledger.clone());
        delegate.did_purchase_product(&transaction.product_id, completion);
        true
    }

    fn complete_restore(&self, transaction: &TransactionRecord) -> Result<()> {
        let original = transaction
            .original
            .as_deref()
            .ok_or_else(|| ObserverError::ContractViolation {
                transaction: transaction.id.clone(),
                reason: "restored transaction has no original transaction".to_string(),
            })?;

        if let Some(delegate) = self.delegate() {
            delegate.did_restore_purchase(&original.product_id);
        }
        self.acknowledger.finish_transaction(transaction)
    }

    fn fail_purchase(&self, transaction: &TransactionRecord) -> Result<()> {
        let error = transaction
            .error
            .as_ref()
            .ok_or_else(|| ObserverError::ContractViolation {
                transaction: transaction.id.clone(),
                reason: "failed transaction has no error".to_string(),
            })?;

        if let Some(delegate) = self.delegate() {
            delegate.did_fail_to_purchase_product(&transaction.product_id, error);
        }
        self.acknowledger.finish_transaction(transaction)
    }
}
