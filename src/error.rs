use crate::domain::transaction::TransactionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("Contract violation on transaction {transaction}: {reason}")]
    ContractViolation {
        transaction: TransactionId,
        reason: String,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid queue event: {0}")]
    InvalidEvent(String),
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, ObserverError>;
