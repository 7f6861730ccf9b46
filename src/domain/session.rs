//! Per-connection session record.

use tokio::sync::mpsc;

use super::SessionId;

/// Registry entry for one live connection.
///
/// The `outbound` sender enqueues serialized frames onto the connection's
/// bounded queue; the socket sink itself is owned exclusively by the
/// connection's writer task for the lifetime of the session. A session
/// starts with no subscription (`workspace: None`) and moves to
/// `Some(workspace)` after each successful channel-list request; the
/// entry is removed on disconnect, which is the only terminal transition.
#[derive(Debug)]
pub struct Session {
    /// Sender half of the connection's bounded outbound frame queue.
    pub outbound: mpsc::Sender<String>,
    /// User bound to this session, if any.
    pub user: Option<String>,
    /// Workspace of the most recent successful channel-list request.
    /// Best-effort cache used only to scope channel-update broadcasts.
    pub workspace: Option<String>,
}

impl Session {
    /// Creates a fresh, unsubscribed session around an outbound queue.
    #[must_use]
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            outbound,
            user: None,
            workspace: None,
        }
    }
}

/// Snapshot of one live session, handed out by
/// [`super::SessionRegistry::snapshot`] for lock-free fan-out.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Session identifier.
    pub id: SessionId,
    /// Clone of the session's outbound queue sender.
    pub outbound: mpsc::Sender<String>,
    /// Subscription at snapshot time.
    pub workspace: Option<String>,
}
