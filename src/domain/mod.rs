//! Domain types and ports shared by the observer and its collaborators.
//!
//! Nothing in here talks to the payment queue directly; the traits in
//! [`ports`] are the seams through which the queue and the business layer
//! are reached.

pub mod ports;
pub mod purchase;
pub mod transaction;
