//! Platform events for the note workflow.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope published after each committed
//!   note mutation.
//! - [`EventPersistence`]: background service writing every event to the
//!   `events` table, which doubles as the audit trail for transitions that
//!   have no validation history entry.
//! - [`DispatchRelay`]: forwards `note.sent` events to the external
//!   dispatcher over HTTP.

pub mod bus;
pub mod dispatch;
pub mod persistence;

pub use bus::{event_names, EventBus, PlatformEvent};
pub use dispatch::{DispatchRelay, WebhookDelivery, WebhookError};
pub use persistence::EventPersistence;
