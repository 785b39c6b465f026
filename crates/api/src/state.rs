use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every request reads fresh rows through `pool`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: naoty_db::DbPool,
    /// Server configuration, including the workflow settings.
    pub config: Arc<ServerConfig>,
    /// Event bus notes are announced on after each committed mutation.
    pub event_bus: Arc<naoty_events::EventBus>,
}
