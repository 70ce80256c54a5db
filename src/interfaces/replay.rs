//! Replays a scripted sequence of queue events through the observer.
//!
//! [`ReplayDelegate`] plays the business layer: it records every
//! notification and completes purchases from spawned tasks, so the deferred
//! acknowledgment path runs off the queue's dispatch context. Outside a tokio
//! runtime it completes them inline instead.

use super::csv::event_reader::QueueEvent;
use crate::application::completion::CompletionToken;
use crate::application::observer::{BatchOutcome, TransactionObserver};
use crate::domain::ports::{LedgerBox, ObserverDelegate};
use crate::domain::purchase::{Purchase, PurchaseSource, RestoreResult, StoreIntentResponse};
use crate::domain::transaction::{TransactionError, TransactionId, TransactionRecord};
use crate::error::Result;
use crate::infrastructure::queue::SimulatedPaymentQueue;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayConfig {
    /// Never complete purchase tokens, leaving purchases pending.
    pub hold_purchases: bool,
    /// Answer every store-initiated payment with `Defer`.
    pub defer_store_payments: bool,
}

/// Something the business layer observed during a replay.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    WillUpdate,
    DidUpdate,
    Purchased {
        product_id: String,
    },
    PurchaseFailed {
        product_id: String,
        error: TransactionError,
    },
    Restored {
        product_id: String,
    },
    RestoreFinished(RestoreResult),
    StoreIntent {
        product_id: String,
        response: StoreIntentResponse,
    },
    /// A purchase completion acknowledged its transaction.
    PurchaseCompleted {
        transaction: TransactionId,
        product_id: String,
    },
}

#[derive(Default)]
pub struct ReplayDelegate {
    config: ReplayConfig,
    notifications: Mutex<Vec<Notification>>,
    completions: Mutex<Vec<JoinHandle<Option<(TransactionId, String)>>>>,
    held: Mutex<Vec<CompletionToken>>,
}

impl ReplayDelegate {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn push(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }

    /// Waits for every spawned purchase completion and records the ones that
    /// acknowledged their transaction, in spawn order.
    pub async fn settle(&self) {
        let handles = mem::take(
            &mut *self
                .completions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            match handle.await {
                Ok(Some((transaction, product_id))) => {
                    self.push(Notification::PurchaseCompleted {
                        transaction,
                        product_id,
                    })
                }
                Ok(None) => {}
                Err(e) => tracing::error!(%e, "Purchase completion task failed"),
            }
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn held_purchases(&self) -> usize {
        self.held.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn acknowledge(completion: &CompletionToken) -> Option<(TransactionId, String)> {
    completion.complete().then(|| {
        (
            completion.transaction_id().clone(),
            completion.product_id().to_string(),
        )
    })
}

impl ObserverDelegate for ReplayDelegate {
    fn will_update_purchases(&self) {
        self.push(Notification::WillUpdate);
    }

    fn did_update_purchases(&self) {
        self.push(Notification::DidUpdate);
    }

    fn did_finish_restoring_purchases(&self, result: RestoreResult) {
        self.push(Notification::RestoreFinished(result));
    }

    fn did_purchase_product(&self, product_id: &str, completion: CompletionToken) {
        self.push(Notification::Purchased {
            product_id: product_id.to_string(),
        });

        if self.config.hold_purchases {
            self.held
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(completion);
            return;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(async move { acknowledge(&completion) });
                self.completions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle);
            }
            Err(_) => {
                tracing::debug!("No async runtime, completing purchase inline");
                if let Some((transaction, product_id)) = acknowledge(&completion) {
                    self.push(Notification::PurchaseCompleted {
                        transaction,
                        product_id,
                    });
                }
            }
        }
    }

    fn did_fail_to_purchase_product(&self, product_id: &str, error: &TransactionError) {
        self.push(Notification::PurchaseFailed {
            product_id: product_id.to_string(),
            error: error.clone(),
        });
    }

    fn did_restore_purchase(&self, product_id: &str) {
        self.push(Notification::Restored {
            product_id: product_id.to_string(),
        });
    }

    fn purchase_for(&self, source: PurchaseSource) -> Option<Purchase> {
        Some(Purchase::from_source(source))
    }

    fn response_for_store_intent(&self, purchase: &Purchase) -> StoreIntentResponse {
        let response = if self.config.defer_store_payments {
            StoreIntentResponse::Defer
        } else {
            StoreIntentResponse::AutomaticallyCommit
        };
        self.push(Notification::StoreIntent {
            product_id: purchase.product.identifier.clone(),
            response,
        });
        response
    }
}

/// Final state of a replay.
#[derive(Debug)]
pub struct ReplayReport {
    pub notifications: Vec<Notification>,
    /// Transactions the queue still considers unfinished.
    pub pending: Vec<TransactionRecord>,
    pub violations: usize,
}

/// Drives queue events through a simulated queue and an observer.
pub struct ReplaySession {
    queue: Arc<SimulatedPaymentQueue>,
    observer: TransactionObserver,
    delegate: Arc<ReplayDelegate>,
    batch: Vec<TransactionRecord>,
    violations: usize,
}

impl ReplaySession {
    pub fn new(ledger: LedgerBox, config: ReplayConfig) -> Self {
        let queue = Arc::new(SimulatedPaymentQueue::new(ledger));
        let delegate = Arc::new(ReplayDelegate::new(config));
        let mut observer = TransactionObserver::new(queue.clone());
        observer.set_delegate(&delegate);

        Self {
            queue,
            observer,
            delegate,
            batch: Vec::new(),
            violations: 0,
        }
    }

    /// Redelivers whatever an earlier run left unacknowledged.
    pub async fn launch(&mut self) -> Result<()> {
        if let Some(outcome) = self.queue.redeliver_pending(&self.observer)? {
            self.absorb(outcome).await;
        }
        Ok(())
    }

    pub async fn apply(&mut self, event: QueueEvent) -> Result<()> {
        // Anything that is not a transaction closes the batch being assembled.
        match event {
            QueueEvent::Transaction(transaction) => self.batch.push(transaction),
            QueueEvent::Flush => self.flush().await?,
            QueueEvent::StorePayment(product) => {
                self.flush().await?;
                let committed = self.queue.propose_store_payment(&self.observer, product);
                tracing::info!(committed, "Store-initiated payment answered");
            }
            QueueEvent::RestoreFinished => {
                self.flush().await?;
                self.queue.finish_restore(&self.observer, Ok(()));
            }
            QueueEvent::RestoreFailed(error) => {
                self.flush().await?;
                self.queue.finish_restore(&self.observer, Err(error));
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = mem::take(&mut self.batch);
        let outcome = self.queue.deliver(&self.observer, batch)?;
        self.absorb(outcome).await;
        Ok(())
    }

    async fn absorb(&mut self, outcome: BatchOutcome) {
        self.violations += outcome.violations.len();
        if outcome.unacknowledged > 0 {
            tracing::warn!(
                count = outcome.unacknowledged,
                "Transactions left pending after failed acknowledgment"
            );
        }
        self.delegate.settle().await;
    }

    /// Delivers any trailing batch and reports the final state.
    pub async fn finish(mut self) -> Result<ReplayReport> {
        self.flush().await?;
        if self.delegate.held_purchases() > 0 {
            tracing::warn!(
                held = self.delegate.held_purchases(),
                "Purchases left without completion"
            );
        }
        Ok(ReplayReport {
            notifications: self.delegate.notifications(),
            pending: self.queue.pending()?,
            violations: self.violations,
        })
    }
}
