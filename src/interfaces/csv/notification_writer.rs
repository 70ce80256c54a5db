use crate::error::Result;
use crate::interfaces::replay::Notification;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct NotificationRow<'a> {
    seq: usize,
    notification: &'static str,
    product: &'a str,
    detail: String,
}

impl<'a> NotificationRow<'a> {
    fn from_notification(seq: usize, notification: &'a Notification) -> Self {
        let (kind, product, detail) = match notification {
            Notification::WillUpdate => ("will_update", "", String::new()),
            Notification::DidUpdate => ("did_update", "", String::new()),
            Notification::Purchased { product_id } => {
                ("purchased", product_id.as_str(), String::new())
            }
            Notification::PurchaseFailed { product_id, error } => {
                ("purchase_failed", product_id.as_str(), error.to_string())
            }
            Notification::Restored { product_id } => {
                ("restored", product_id.as_str(), String::new())
            }
            Notification::RestoreFinished(Ok(())) => {
                ("restore_finished", "", "success".to_string())
            }
            Notification::RestoreFinished(Err(e)) => ("restore_finished", "", e.to_string()),
            Notification::StoreIntent {
                product_id,
                response,
            } => ("store_intent", product_id.as_str(), format!("{response:?}")),
            Notification::PurchaseCompleted {
                transaction,
                product_id,
            } => ("purchase_completed", product_id.as_str(), transaction.to_string()),
        };
        Self {
            seq,
            notification: kind,
            product,
            detail,
        }
    }
}

/// Writes replay notifications as CSV.
///
/// Output columns are `seq, notification, product, detail`. The header is
/// written even when there is nothing to report.
pub struct NotificationWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> NotificationWriter<W> {
    /// Creates a new `NotificationWriter` wrapping any `Write` destination.
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(destination),
        }
    }

    pub fn write_notifications<'a>(
        &mut self,
        notifications: impl IntoIterator<Item = &'a Notification>,
    ) -> Result<()> {
        self.writer
            .write_record(["seq", "notification", "product", "detail"])?;
        for (seq, notification) in notifications.into_iter().enumerate() {
            self.writer
                .serialize(NotificationRow::from_notification(seq + 1, notification))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::purchase::StoreIntentResponse;
    use crate::domain::transaction::{ErrorCode, TransactionError};

    #[test]
    fn test_write_notifications() {
        let notifications = vec![
            Notification::WillUpdate,
            Notification::PurchaseFailed {
                product_id: "gems".to_string(),
                error: TransactionError::new(ErrorCode::PaymentCancelled, "cancelled"),
            },
            Notification::StoreIntent {
                product_id: "coins".to_string(),
                response: StoreIntentResponse::Defer,
            },
            Notification::RestoreFinished(Err(ErrorCode::Timeout.into())),
        ];

        let mut buffer = Vec::new();
        {
            let mut writer = NotificationWriter::new(&mut buffer);
            writer.write_notifications(&notifications).unwrap();
        }

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "seq,notification,product,detail");
        assert_eq!(lines[1], "1,will_update,,");
        assert_eq!(lines[2], "2,purchase_failed,gems,PaymentCancelled: cancelled");
        assert_eq!(lines[3], "3,store_intent,coins,Defer");
        assert_eq!(lines[4], "4,restore_finished,,Timeout: Timeout");
    }

    #[test]
    fn test_header_without_notifications() {
        let mut buffer = Vec::new();
        NotificationWriter::new(&mut buffer)
            .write_notifications(&[])
            .unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "seq,notification,product,detail\n");
    }
}
