#![allow(dead_code)]

use iap_observer::application::completion::CompletionToken;
use iap_observer::application::observer::TransactionObserver;
use iap_observer::domain::ports::{ObserverDelegate, TransactionAcknowledger};
use iap_observer::domain::purchase::{
    Purchase, PurchaseSource, RestoreResult, StoreIntentResponse,
};
use iap_observer::domain::transaction::{TransactionError, TransactionId, TransactionRecord};
use iap_observer::error::Result;
use std::sync::{Arc, Mutex};

/// Everything the delegate and the queue observed, in one ordered log.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    WillUpdate,
    DidUpdate,
    RestoreFinished(RestoreResult),
    Purchased(String),
    Failed(String, TransactionError),
    Restored(String),
    PurchaseFor(PurchaseSource),
    StoreIntent(String),
    Acknowledged(TransactionId),
    /// The delegate itself was deallocated.
    Released,
}

pub type Journal = Arc<Mutex<Vec<Entry>>>;

pub struct RecordingAcknowledger {
    journal: Journal,
}

impl RecordingAcknowledger {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl TransactionAcknowledger for RecordingAcknowledger {
    fn finish_transaction(&self, transaction: &TransactionRecord) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(Entry::Acknowledged(transaction.id.clone()));
        Ok(())
    }
}

pub struct RecordingDelegate {
    journal: Journal,
    /// `None` makes `purchase_for` decline to build a purchase.
    pub store_intent: Option<StoreIntentResponse>,
    pub tokens: Mutex<Vec<CompletionToken>>,
}

impl RecordingDelegate {
    fn push(&self, entry: Entry) {
        self.journal.lock().unwrap().push(entry);
    }

    pub fn take_tokens(&self) -> Vec<CompletionToken> {
        std::mem::take(&mut *self.tokens.lock().unwrap())
    }
}

impl ObserverDelegate for RecordingDelegate {
    fn will_update_purchases(&self) {
        self.push(Entry::WillUpdate);
    }

    fn did_update_purchases(&self) {
        self.push(Entry::DidUpdate);
    }

    fn did_finish_restoring_purchases(&self, result: RestoreResult) {
        self.push(Entry::RestoreFinished(result));
    }

    fn did_purchase_product(&self, product_id: &str, completion: CompletionToken) {
        self.push(Entry::Purchased(product_id.to_string()));
        self.tokens.lock().unwrap().push(completion);
    }

    fn did_fail_to_purchase_product(&self, product_id: &str, error: &TransactionError) {
        self.push(Entry::Failed(product_id.to_string(), error.clone()));
    }

    fn did_restore_purchase(&self, product_id: &str) {
        self.push(Entry::Restored(product_id.to_string()));
    }

    fn purchase_for(&self, source: PurchaseSource) -> Option<Purchase> {
        self.push(Entry::PurchaseFor(source.clone()));
        self.store_intent.map(|_| Purchase::from_source(source))
    }

    fn response_for_store_intent(&self, purchase: &Purchase) -> StoreIntentResponse {
        self.push(Entry::StoreIntent(purchase.product.identifier.clone()));
        self.store_intent.unwrap_or_default()
    }
}

pub struct Harness {
    pub observer: TransactionObserver,
    pub delegate: Arc<RecordingDelegate>,
    pub journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store_intent(Some(StoreIntentResponse::AutomaticallyCommit))
    }

    pub fn with_store_intent(store_intent: Option<StoreIntentResponse>) -> Self {
        let journal: Journal = Arc::default();
        let acknowledger = Arc::new(RecordingAcknowledger::new(journal.clone()));
        let delegate = Arc::new(RecordingDelegate {
            journal: journal.clone(),
            store_intent,
            tokens: Mutex::new(Vec::new()),
        });
        let mut observer = TransactionObserver::new(acknowledger);
        observer.set_delegate(&delegate);

        Self {
            observer,
            delegate,
            journal,
        }
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.journal.lock().unwrap().clone()
    }

    pub fn acknowledged(&self) -> Vec<TransactionId> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Acknowledged(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

pub fn ack(id: &str) -> Entry {
    Entry::Acknowledged(TransactionId::from(id))
}

pub fn ids(ids: &[&str]) -> Vec<TransactionId> {
    ids.iter().copied().map(TransactionId::from).collect()
}
