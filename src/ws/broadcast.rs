//! Broadcast engine: envelope fan-out to live sessions.
//!
//! Delivery means enqueueing the serialized frame onto each recipient's
//! bounded outbound queue; the per-connection writer task drains the
//! queue to the socket. A failed enqueue (queue full or connection gone)
//! is isolated to that recipient: it is logged, collected into the
//! returned failure list, and never aborts delivery to the rest.

use std::sync::Arc;

use crate::domain::{SessionId, SessionRegistry};

use super::messages::Envelope;

/// Fan-out engine over the live-session registry.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given registry.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Delivers `envelope` to every live session except `exclude`.
    ///
    /// Used for chat messages (excluding the sender) and for global
    /// structural updates (no exclusion). Returns the ids of sessions
    /// whose delivery failed.
    pub async fn broadcast_all(
        &self,
        envelope: &Envelope,
        exclude: Option<SessionId>,
    ) -> Vec<SessionId> {
        self.fan_out(envelope, |handle| Some(handle.id) != exclude)
            .await
    }

    /// Delivers `envelope` only to sessions whose current subscription
    /// equals `workspace`. Returns the ids of sessions whose delivery
    /// failed.
    pub async fn broadcast_scoped(&self, envelope: &Envelope, workspace: &str) -> Vec<SessionId> {
        self.fan_out(envelope, |handle| {
            handle.workspace.as_deref() == Some(workspace)
        })
        .await
    }

    async fn fan_out<F>(&self, envelope: &Envelope, include: F) -> Vec<SessionId>
    where
        F: Fn(&crate::domain::SessionHandle) -> bool,
    {
        let frame = match serde_json::to_string(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(action = %envelope.action, error = %e, "envelope serialization failed");
                return Vec::new();
            }
        };

        let handles = self.registry.snapshot().await;
        let mut failed = Vec::new();
        let mut delivered = 0usize;
        for handle in &handles {
            if !include(handle) {
                continue;
            }
            match handle.outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %handle.id,
                        action = %envelope.action,
                        error = %e,
                        "dropping frame for recipient"
                    );
                    failed.push(handle.id);
                }
            }
        }
        tracing::debug!(
            action = %envelope.action,
            delivered,
            failed = failed.len(),
            "broadcast complete"
        );
        failed
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn setup() -> (Broadcaster, Arc<SessionRegistry>) {
        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        (broadcaster, registry)
    }

    fn envelope() -> Envelope {
        Envelope::server("workspace_update", serde_json::json!({}))
    }

    #[tokio::test]
    async fn broadcast_all_excludes_sender() {
        let (broadcaster, registry) = setup().await;
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = registry.register(tx_a).await;
        let _b = registry.register(tx_b).await;

        let failed = broadcaster.broadcast_all(&envelope(), Some(a)).await;
        assert!(failed.is_empty());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_all_without_exclusion_reaches_everyone() {
        let (broadcaster, registry) = setup().await;
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let _a = registry.register(tx_a).await;
        let _b = registry.register(tx_b).await;

        let failed = broadcaster.broadcast_all(&envelope(), None).await;
        assert!(failed.is_empty());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn scoped_broadcast_reaches_only_subscribers() {
        let (broadcaster, registry) = setup().await;
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let (tx_c, mut rx_c) = mpsc::channel(8);
        let a = registry.register(tx_a).await;
        let b = registry.register(tx_b).await;
        let _c = registry.register(tx_c).await;

        registry.set_subscription(a, "acme").await;
        registry.set_subscription(b, "umbrella").await;
        // c never subscribed

        let failed = broadcaster.broadcast_scoped(&envelope(), "acme").await;
        assert!(failed.is_empty());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_recipient_does_not_abort_fanout() {
        let (broadcaster, registry) = setup().await;
        let (tx_a, rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = registry.register(tx_a).await;
        let _b = registry.register(tx_b).await;

        // a's connection is gone but the session has not unregistered yet.
        drop(rx_a);

        let failed = broadcaster.broadcast_all(&envelope(), None).await;
        assert_eq!(failed, vec![a]);
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn full_queue_counts_as_delivery_failure() {
        let (broadcaster, registry) = setup().await;
        let (tx, mut rx) = mpsc::channel(1);
        let id = registry.register(tx).await;

        let none = broadcaster.broadcast_all(&envelope(), None).await;
        assert!(none.is_empty());
        // Queue capacity 1 is now exhausted; the next frame drops.
        let failed = broadcaster.broadcast_all(&envelope(), None).await;
        assert_eq!(failed, vec![id]);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
