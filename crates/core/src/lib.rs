//! Shared domain types for review-change email notification.
//!
//! Everything here is plain data plus the read-only lookup traits in
//! [`backend`] that the recipient engine consumes. No I/O happens in this
//! crate.

pub mod account;
pub mod address;
pub mod backend;
pub mod change;
pub mod error;
pub mod group;
pub mod notify;
pub mod project;
pub mod types;
