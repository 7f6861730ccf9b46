//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::SessionRegistry;
use crate::ws::router::ActionRouter;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dispatcher for every inbound envelope.
    pub router: Arc<ActionRouter>,
    /// Registry of live sessions, used by the connection lifecycle.
    pub registry: Arc<SessionRegistry>,
    /// Capacity of each session's bounded outbound queue.
    pub session_queue_capacity: usize,
}
