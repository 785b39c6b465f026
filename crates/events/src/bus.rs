//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Share it via `Arc<EventBus>`. Events are published only after the
//! transaction that caused them has committed.

use chrono::{DateTime, Utc};
use naoty_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type names. Persisted verbatim in `events.event_type`.
pub mod event_names {
    pub const NOTE_CREATED: &str = "note.created";
    pub const NOTE_UPDATED: &str = "note.updated";
    pub const NOTE_SUBMITTED: &str = "note.submitted";
    pub const NOTE_VALIDATED: &str = "note.validated";
    pub const NOTE_SCHEDULED: &str = "note.scheduled";
    pub const NOTE_SENT: &str = "note.sent";
    pub const NOTE_COMMENT_ADDED: &str = "note.comment_added";
    pub const NOTE_RECEPTION_CHANGED: &str = "note.reception_changed";
}

/// Entity kind used for every note event source.
pub const NOTE_ENTITY: &str = "note";

/// A domain event that occurred in the workflow.
///
/// Built with [`PlatformEvent::new`] (or [`PlatformEvent::for_note`]) and
/// the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, see [`event_names`].
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    /// `None` for system-initiated events such as timed dispatch.
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for an event whose source is a note.
    pub fn for_note(event_type: &str, note_id: DbId) -> Self {
        Self::new(event_type).with_source(NOTE_ENTITY, note_id)
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    /// Attach the acting user. `None` leaves the event system-initiated.
    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// The note id when this is a note event.
    pub fn note_id(&self) -> Option<DbId> {
        match self.source_entity_type.as_deref() {
            Some(NOTE_ENTITY) => self.source_entity_id,
            _ => None,
        }
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Every subscriber independently receives each published event. When the
/// buffer is full the oldest unconsumed events are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody listens.
    pub fn publish(&self, event: PlatformEvent) {
        tracing::debug!(
            event_type = %event.event_type,
            note_id = ?event.note_id(),
            "Publishing event"
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn note_event_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut persist_rx = bus.subscribe();
        let mut relay_rx = bus.subscribe();

        bus.publish(
            PlatformEvent::for_note(event_names::NOTE_SENT, 42)
                .with_actor(Some(7))
                .with_payload(serde_json::json!({"recipient_ids": [20, 21]})),
        );

        for rx in [&mut persist_rx, &mut relay_rx] {
            let received = rx.recv().await.expect("should receive the event");
            assert_eq!(received.event_type, "note.sent");
            assert_eq!(received.note_id(), Some(42));
            assert_eq!(received.actor_user_id, Some(7));
            assert_eq!(received.payload["recipient_ids"][1], 21);
        }
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(PlatformEvent::new("orphan.event"));
    }

    #[test]
    fn non_note_source_has_no_note_id() {
        let event = PlatformEvent::new("template.created").with_source("template", 3);
        assert_eq!(event.note_id(), None);
        assert!(PlatformEvent::new("bare").payload.is_object());
    }

    #[test]
    fn system_events_have_no_actor() {
        let event = PlatformEvent::for_note(event_names::NOTE_SENT, 1).with_actor(None);
        assert!(event.actor_user_id.is_none());
    }
}
