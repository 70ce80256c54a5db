use crate::domain::purchase::Product;
use crate::domain::transaction::{
    ErrorCode, TransactionError, TransactionRecord, TransactionState,
};
use crate::error::{ObserverError, Result};
use serde::Deserialize;
use std::io::Read;

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// Adds a transaction to the batch being assembled.
    Transaction(TransactionRecord),
    /// Delivers the assembled batch.
    Flush,
    /// A purchase started from the external storefront.
    StorePayment(Product),
    RestoreFinished,
    RestoreFailed(TransactionError),
}

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum EventKind {
    Transaction,
    Flush,
    StorePayment,
    RestoreFinished,
    RestoreFailed,
}

#[derive(Debug, Deserialize)]
struct EventRow {
    event: EventKind,
    #[serde(default)]
    tx: Option<String>,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    state: Option<TransactionState>,
    #[serde(default)]
    original_tx: Option<String>,
    #[serde(default)]
    original_product: Option<String>,
    #[serde(default)]
    error: Option<ErrorCode>,
}

impl TryFrom<EventRow> for QueueEvent {
    type Error = ObserverError;

    fn try_from(row: EventRow) -> Result<Self> {
        match row.event {
            EventKind::Transaction => {
                let (Some(tx), Some(product), Some(state)) = (row.tx, row.product, row.state)
                else {
                    return Err(ObserverError::InvalidEvent(
                        "transaction requires tx, product and state".to_string(),
                    ));
                };
                let mut record = TransactionRecord::new(tx.as_str(), product, state);
                record.error = row.error.map(TransactionError::from);
                record.original = row.original_product.map(|original_product| {
                    let original_tx = row.original_tx.unwrap_or_else(|| tx.clone());
                    Box::new(TransactionRecord::purchased(original_tx, original_product))
                });
                Ok(Self::Transaction(record))
            }
            EventKind::Flush => Ok(Self::Flush),
            EventKind::StorePayment => row
                .product
                .map(|product| Self::StorePayment(Product::new(product)))
                .ok_or_else(|| {
                    ObserverError::InvalidEvent("store_payment requires product".to_string())
                }),
            EventKind::RestoreFinished => Ok(Self::RestoreFinished),
            EventKind::RestoreFailed => Ok(Self::RestoreFailed(
                row.error.unwrap_or_default().into(),
            )),
        }
    }
}

/// Reads queue events from a CSV replay script.
///
/// Columns are `event, tx, product, state, original_tx, original_product,
/// error`; trailing columns may be left out when unused.
pub struct QueueEventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> QueueEventReader<R> {
    /// Creates a new `QueueEventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates events.
    pub fn events(self) -> impl Iterator<Item = Result<QueueEvent>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(ObserverError::from)
                .and_then(|row: EventRow| QueueEvent::try_from(row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "event, tx, product, state, original_tx, original_product, error\n";

    fn read(body: &str) -> Vec<Result<QueueEvent>> {
        let data = format!("{HEADER}{body}");
        QueueEventReader::new(data.as_bytes()).events().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "transaction, t-1, pro, purchased\n\
             transaction, t-2, gems, failed, , , payment_cancelled\n\
             transaction, t-3, pro.restore, restored, t-0, pro\n\
             flush\n\
             store_payment, , coins\n\
             restore_failed, , , , , , timeout\n\
             restore_finished\n",
        );

        assert_eq!(results.len(), 7);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &QueueEvent::Transaction(TransactionRecord::purchased("t-1", "pro"))
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &QueueEvent::Transaction(TransactionRecord::failed(
                "t-2",
                "gems",
                ErrorCode::PaymentCancelled.into()
            ))
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &QueueEvent::Transaction(TransactionRecord::restored(
                "t-3",
                "pro.restore",
                TransactionRecord::purchased("t-0", "pro")
            ))
        );
        assert_eq!(results[3].as_ref().unwrap(), &QueueEvent::Flush);
        assert_eq!(
            results[4].as_ref().unwrap(),
            &QueueEvent::StorePayment(Product::new("coins"))
        );
        assert_eq!(
            results[5].as_ref().unwrap(),
            &QueueEvent::RestoreFailed(ErrorCode::Timeout.into())
        );
        assert_eq!(results[6].as_ref().unwrap(), &QueueEvent::RestoreFinished);
    }

    #[test]
    fn test_reader_unknown_state_is_kept() {
        let results = read("transaction, t-1, pro, refunded\n");

        let QueueEvent::Transaction(record) = results[0].as_ref().unwrap() else {
            panic!("expected a transaction");
        };
        assert_eq!(record.state, TransactionState::Unknown);
    }

    #[test]
    fn test_reader_malformed_lines() {
        let results = read(
            "invalid, t-1, pro, purchased\n\
             transaction, t-2, , purchased\n\
             store_payment\n",
        );

        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(ObserverError::Csv(_))));
        assert!(matches!(results[1], Err(ObserverError::InvalidEvent(_))));
        assert!(matches!(results[2], Err(ObserverError::InvalidEvent(_))));
    }
}
