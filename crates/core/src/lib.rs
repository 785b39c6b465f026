//! Domain logic for the NaotY note workflow.
//!
//! This crate has no database or HTTP dependencies. Callers load rows, hand
//! them to the functions here as plain values, and persist whatever comes
//! back (new status, history record, notification drafts).

pub mod access;
pub mod comments;
pub mod dashboard;
pub mod error;
pub mod notes;
pub mod notifications;
pub mod roles;
pub mod types;
pub mod workflow;
