//! Hand-off of sent notes to the external dispatcher.
//!
//! Delivering a SENT note to its recipients' mailboxes is somebody else's
//! job. [`DispatchRelay`] listens for `note.sent` and POSTs the event to the
//! configured URL through [`WebhookDelivery`], retrying with backoff.
//!
//! When the relay falls behind the bus it replays recently sent notes from
//! the `notes` table, skipping the ones it already handed over.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use naoty_core::types::{DbId, Timestamp};
use naoty_db::models::note::SentNote;
use naoty_db::repositories::NoteRepo;
use naoty_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::{event_names, PlatformEvent};

/// Default retry delays (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Network, DNS or timeout failure, or the client could not be built.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

/// POSTs events as JSON to an external endpoint.
pub struct WebhookDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    pub fn new() -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        })
    }

    /// Override the backoff schedule. The event is tried `delays.len() + 1` times.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Body sent for an event.
    pub fn payload(event: &PlatformEvent) -> serde_json::Value {
        serde_json::json!({
            "event_type": event.event_type,
            "note_id": event.note_id(),
            "actor_user_id": event.actor_user_id,
            "payload": event.payload,
            "timestamp": event.timestamp,
        })
    }

    /// Deliver with retry. Returns the last error when every attempt failed.
    pub async fn deliver(&self, url: &str, event: &PlatformEvent) -> Result<(), WebhookError> {
        let payload = Self::payload(event);

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Dispatch attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        self.try_send(url, &payload).await.inspect_err(|e| {
            tracing::error!(url, error = %e, "Dispatch failed after all retries");
        })
    }

    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// How far before the last relayed note a replay starts looking.
const REPLAY_MARGIN_SECS: i64 = 60;

/// Number of relayed note ids remembered for replay dedup.
const RECENT_CAPACITY: usize = 256;

/// Maximum number of notes replayed after a single lag.
const REPLAY_LIMIT: i64 = 500;

/// Tracks what the relay has handed over so a lag can be replayed.
#[derive(Debug)]
struct RelayCursor {
    since: Timestamp,
    recent: VecDeque<DbId>,
}

impl RelayCursor {
    fn new(start: Timestamp) -> Self {
        Self {
            since: start,
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
        }
    }

    fn record(&mut self, note_id: DbId, sent_at: Timestamp) {
        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(note_id);
        self.since = self.since.max(sent_at);
    }

    fn seen(&self, note_id: DbId) -> bool {
        self.recent.contains(&note_id)
    }

    fn replay_from(&self) -> Timestamp {
        self.since - chrono::Duration::seconds(REPLAY_MARGIN_SECS)
    }
}

/// Rebuild the `note.sent` event of a note found in the database.
fn replayed_event(note: &SentNote) -> PlatformEvent {
    PlatformEvent::for_note(event_names::NOTE_SENT, note.id).with_payload(serde_json::json!({
        "recipient_ids": note.recipient_ids,
        "sent_at": note.sent_at,
        "replayed": true,
    }))
}

/// `sent_at` carried by a live event, falling back to its publish time.
fn sent_at_of(event: &PlatformEvent) -> Timestamp {
    serde_json::from_value(event.payload["sent_at"].clone()).unwrap_or(event.timestamp)
}

/// Background task forwarding `note.sent` events to the dispatcher.
pub struct DispatchRelay;

impl DispatchRelay {
    /// Run until the bus closes. Delivery failures are logged, not fatal.
    pub async fn run(
        pool: DbPool,
        url: String,
        delivery: WebhookDelivery,
        mut receiver: broadcast::Receiver<PlatformEvent>,
    ) {
        tracing::info!(url = %url, "Dispatch relay started");
        let mut cursor = RelayCursor::new(Utc::now());
        loop {
            match receiver.recv().await {
                Ok(event) if event.event_type == event_names::NOTE_SENT => {
                    let Some(note_id) = event.note_id() else {
                        continue;
                    };
                    Self::relay(&url, &delivery, &event, note_id).await;
                    cursor.record(note_id, sent_at_of(&event));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Dispatch relay lagged, replaying sent notes");
                    Self::replay(&pool, &url, &delivery, &mut cursor).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, dispatch relay shutting down");
                    break;
                }
            }
        }
    }

    async fn relay(url: &str, delivery: &WebhookDelivery, event: &PlatformEvent, note_id: DbId) {
        if delivery.deliver(url, event).await.is_ok() {
            tracing::info!(note_id, "Note handed to dispatcher");
        }
    }

    /// Hand over every note sent since the cursor that was not relayed yet.
    async fn replay(
        pool: &DbPool,
        url: &str,
        delivery: &WebhookDelivery,
        cursor: &mut RelayCursor,
    ) {
        let notes = match NoteRepo::sent_since(pool, cursor.replay_from(), REPLAY_LIMIT).await {
            Ok(notes) => notes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load sent notes for replay");
                return;
            }
        };

        let mut replayed = 0usize;
        for note in notes.iter() {
            if cursor.seen(note.id) {
                continue;
            }
            Self::relay(url, delivery, &replayed_event(note), note.id).await;
            cursor.record(note.id, note.sent_at);
            replayed += 1;
        }
        tracing::info!(replayed, "Dispatch relay replay finished");
    }
}
