//! Application layer containing the queue observer.
//!
//! [`observer::TransactionObserver`] turns payment queue callbacks into
//! delegate notifications and owns the acknowledgment protocol.
//! [`completion::CompletionToken`] carries the deferred acknowledgment of
//! purchased transactions.

pub mod completion;
pub mod observer;
