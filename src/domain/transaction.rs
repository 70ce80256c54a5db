use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier the payment queue assigns to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lifecycle state of a transaction as reported by the payment queue.
///
/// `Unknown` absorbs states this crate does not know about yet; they are
/// handled exactly like `Purchasing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Purchasing,
    Purchased,
    Failed,
    Restored,
    Deferred,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    #[default]
    Unknown,
    ClientInvalid,
    PaymentCancelled,
    PaymentInvalid,
    PaymentNotAllowed,
    ProductNotAvailable,
    NetworkFailure,
    Timeout,
}

/// Error the payment queue attaches to a failed transaction or a failed
/// restore. Forwarded verbatim; this crate never interprets it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct TransactionError {
    pub code: ErrorCode,
    pub message: String,
}

impl TransactionError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ErrorCode> for TransactionError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code, format!("{code:?}"))
    }
}

/// One unit of purchase state owned by the payment queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub product_id: String,
    pub state: TransactionState,
    pub error: Option<TransactionError>,
    /// Only set on restores: the transaction being re-delivered.
    pub original: Option<Box<TransactionRecord>>,
}

impl TransactionRecord {
    pub fn new(
        id: impl Into<TransactionId>,
        product_id: impl Into<String>,
        state: TransactionState,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            state,
            error: None,
            original: None,
        }
    }

    pub fn purchasing(id: impl Into<TransactionId>, product_id: impl Into<String>) -> Self {
        Self::new(id, product_id, TransactionState::Purchasing)
    }

    pub fn purchased(id: impl Into<TransactionId>, product_id: impl Into<String>) -> Self {
        Self::new(id, product_id, TransactionState::Purchased)
    }

    pub fn deferred(id: impl Into<TransactionId>, product_id: impl Into<String>) -> Self {
        Self::new(id, product_id, TransactionState::Deferred)
    }

    pub fn failed(
        id: impl Into<TransactionId>,
        product_id: impl Into<String>,
        error: TransactionError,
    ) -> Self {
        Self {
            error: Some(error),
            ..Self::new(id, product_id, TransactionState::Failed)
        }
    }

    pub fn restored(
        id: impl Into<TransactionId>,
        product_id: impl Into<String>,
        original: TransactionRecord,
    ) -> Self {
        Self {
            original: Some(Box::new(original)),
            ..Self::new(id, product_id, TransactionState::Restored)
        }
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
