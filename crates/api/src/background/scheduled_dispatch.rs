//! Timed dispatch of SCHEDULED notes.
//!
//! Polls for notes whose `scheduled_at` has passed and moves each one to
//! SENT in its own transaction. A note dispatched manually in the meantime
//! fails the state check and is skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use naoty_core::error::CoreError;
use naoty_db::repositories::NoteRepo;
use naoty_db::{DbPool, StoreError};
use naoty_events::EventBus;
use tokio_util::sync::CancellationToken;

use crate::services::notes as service;

/// Maximum notes handled per cycle; the rest wait for the next tick.
const BATCH_SIZE: i64 = 100;

pub struct ScheduledDispatcher {
    pool: DbPool,
    event_bus: Arc<EventBus>,
    poll_interval: Duration,
}

impl ScheduledDispatcher {
    pub fn new(pool: DbPool, event_bus: Arc<EventBus>, poll_interval: Duration) -> Self {
        Self {
            pool,
            event_bus,
            poll_interval,
        }
    }

    /// Run the dispatch loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Scheduled dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduled dispatcher stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(0) => tracing::debug!("Scheduled dispatcher: nothing due"),
                        Ok(sent) => tracing::info!(sent, "Scheduled dispatcher: notes sent"),
                        Err(e) => tracing::error!(error = %e, "Scheduled dispatch cycle failed"),
                    }
                }
            }
        }
    }

    /// One cycle. Returns the number of notes moved to SENT.
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let due = NoteRepo::due_for_dispatch(&self.pool, Utc::now(), BATCH_SIZE).await?;

        let mut sent = 0;
        for note_id in due {
            match service::dispatch_due(&self.pool, &self.event_bus, note_id).await {
                Ok(_) => sent += 1,
                Err(StoreError::Core(
                    e @ (CoreError::InvalidState { .. } | CoreError::InvalidAction(_)),
                )) => {
                    tracing::debug!(note_id, error = %e, "Skipping note no longer due");
                }
                Err(e) => {
                    tracing::error!(note_id, error = %e, "Failed to dispatch scheduled note");
                }
            }
        }
        Ok(sent)
    }
}
