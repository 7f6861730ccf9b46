//! Concurrent registry of live sessions.
//!
//! [`SessionRegistry`] tracks every connected client and its subscription
//! state behind a single `tokio::sync::RwLock`. The lock scope never
//! contains network I/O: the only "send" primitive associated with a
//! session is a `try_send` onto its bounded outbound queue, and fan-out
//! operates on a snapshot taken under the read lock.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use super::SessionId;
use super::session::{Session, SessionHandle};

/// Central store of live connections.
///
/// # Concurrency
///
/// - Membership and subscription mutations are mutually exclusive.
/// - [`snapshot`](Self::snapshot) clones the live handles so iteration
///   tolerates concurrent unregistration without holding the lock.
/// - A send failure during broadcast never removes the session here;
///   cleanup happens on the connection's own close path.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its session id.
    pub async fn register(&self, outbound: mpsc::Sender<String>) -> SessionId {
        let id = SessionId::new();
        let mut map = self.sessions.write().await;
        map.insert(id, Session::new(outbound));
        tracing::debug!(session_id = %id, live = map.len(), "session registered");
        id
    }

    /// Removes a session. Called exactly once, from the connection's
    /// close path; a second call for the same id is a programming error.
    pub async fn unregister(&self, id: SessionId) {
        let mut map = self.sessions.write().await;
        let removed = map.remove(&id);
        debug_assert!(removed.is_some(), "double unregister of session {id}");
        if removed.is_none() {
            tracing::warn!(session_id = %id, "unregister of unknown session");
        } else {
            tracing::debug!(session_id = %id, live = map.len(), "session unregistered");
        }
    }

    /// Records the workspace of the session's most recent successful
    /// channel-list request.
    pub async fn set_subscription(&self, id: SessionId, workspace: &str) {
        let mut map = self.sessions.write().await;
        if let Some(session) = map.get_mut(&id) {
            session.workspace = Some(workspace.to_string());
        }
    }

    /// Binds a user name to the session.
    pub async fn bind_user(&self, id: SessionId, user: &str) {
        let mut map = self.sessions.write().await;
        if let Some(session) = map.get_mut(&id) {
            session.user = Some(user.to_string());
        }
    }

    /// Returns the user currently bound to the session, if any.
    pub async fn user(&self, id: SessionId) -> Option<String> {
        let map = self.sessions.read().await;
        map.get(&id).and_then(|s| s.user.clone())
    }

    /// Returns the session's current subscription, if any.
    pub async fn subscription(&self, id: SessionId) -> Option<String> {
        let map = self.sessions.read().await;
        map.get(&id).and_then(|s| s.workspace.clone())
    }

    /// Returns cloned handles for every live session.
    pub async fn snapshot(&self) -> Vec<SessionHandle> {
        let map = self.sessions.read().await;
        map.iter()
            .map(|(id, session)| SessionHandle {
                id: *id,
                outbound: session.outbound.clone(),
                workspace: session.workspace.clone(),
            })
            .collect()
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn queue() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn register_and_unregister() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = queue();

        let id = registry.register(tx).await;
        assert_eq!(registry.len().await, 1);

        registry.unregister(id).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn subscription_updates_are_repeatable() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = queue();
        let id = registry.register(tx).await;

        assert_eq!(registry.subscription(id).await, None);

        registry.set_subscription(id, "acme").await;
        assert_eq!(registry.subscription(id).await, Some("acme".to_string()));

        registry.set_subscription(id, "umbrella").await;
        assert_eq!(
            registry.subscription(id).await,
            Some("umbrella".to_string())
        );
    }

    #[tokio::test]
    async fn bind_user_sticks() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = queue();
        let id = registry.register(tx).await;

        registry.bind_user(id, "ana").await;
        assert_eq!(registry.user(id).await, Some("ana".to_string()));
    }

    #[tokio::test]
    async fn snapshot_tolerates_concurrent_unregister() {
        let registry = SessionRegistry::new();
        let (tx_a, _rx_a) = queue();
        let (tx_b, mut rx_b) = queue();

        let a = registry.register(tx_a).await;
        let _b = registry.register(tx_b).await;

        let handles = registry.snapshot().await;
        assert_eq!(handles.len(), 2);

        // Unregistering after the snapshot must not invalidate iteration.
        registry.unregister(a).await;
        for handle in &handles {
            let _ = handle.outbound.try_send("frame".to_string());
        }
        assert_eq!(rx_b.recv().await, Some("frame".to_string()));
    }

    #[tokio::test]
    async fn mutations_on_unknown_session_are_noops() {
        let registry = SessionRegistry::new();
        registry.set_subscription(SessionId::new(), "acme").await;
        registry.bind_user(SessionId::new(), "ana").await;
        assert!(registry.is_empty().await);
    }
}
