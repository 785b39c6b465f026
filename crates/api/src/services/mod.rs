//! Glue between HTTP handlers and the transactional workflow in `naoty_db`.
//!
//! Handlers call into [`notes`] rather than `naoty_db::transitions` so that
//! every committed mutation is retried on transient failures, logged, and
//! announced on the event bus in one place.

pub mod notes;
