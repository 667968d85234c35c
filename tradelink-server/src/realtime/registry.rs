//! Connection registry for chat subscriptions
//!
//! Maps (user, link) to the sender half of that connection's outbound
//! queue. Owned by `AppState` and injected into the WebSocket handler;
//! lifecycle is process lifetime, with `shutdown` dropping every sender
//! so the per-connection forward tasks wind down.

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::events::ServerEvent;

/// Outbound queue depth per connection. A peer that falls this far
/// behind is treated as dead and deregistered.
pub const CONNECTION_QUEUE_DEPTH: usize = 64;

/// Registry of live chat connections.
#[derive(Debug, Default)]
pub struct ChatRegistry {
    connections: DashMap<(i64, i64), mpsc::Sender<ServerEvent>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for (user, link). A reconnect replaces the
    /// previous sender, which closes the old forward task.
    pub fn subscribe(&self, user_id: i64, link_id: i64, tx: mpsc::Sender<ServerEvent>) {
        if self.connections.insert((user_id, link_id), tx).is_some() {
            tracing::debug!(user_id, link_id, "replaced existing chat subscription");
        }
    }

    /// Remove a connection. Idempotent: removing an absent entry is a
    /// no-op.
    pub fn unsubscribe(&self, user_id: i64, link_id: i64) {
        self.connections.remove(&(user_id, link_id));
    }

    /// Push an event to one subscriber of a link, if connected.
    pub fn send_to(&self, user_id: i64, link_id: i64, event: ServerEvent) {
        if let Some(entry) = self.connections.get(&(user_id, link_id)) {
            if let Err(e) = entry.value().try_send(event) {
                tracing::warn!(user_id, link_id, error = %e, "dropping dead chat connection");
                drop(entry);
                self.unsubscribe(user_id, link_id);
            }
        }
    }

    /// Push an event to every subscriber of a link except `exclude_user`.
    ///
    /// A peer whose queue is closed or full does not block the others:
    /// the failed send is logged and the connection is deregistered, and
    /// the loop continues.
    pub fn broadcast_to_link(&self, link_id: i64, event: &ServerEvent, exclude_user: Option<i64>) {
        let mut dead = Vec::new();
        for entry in self.connections.iter() {
            let (user, link) = *entry.key();
            if link != link_id || Some(user) == exclude_user {
                continue;
            }
            if let Err(e) = entry.value().try_send(event.clone()) {
                tracing::warn!(user_id = user, link_id, error = %e, "dropping dead chat connection");
                dead.push((user, link));
            }
        }
        for key in dead {
            self.connections.remove(&key);
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop every sender, closing all outbound queues.
    pub fn shutdown(&self) {
        let count = self.connections.len();
        self.connections.clear();
        if count > 0 {
            tracing::info!(connections = count, "closed chat connections on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(CONNECTION_QUEUE_DEPTH)
    }

    #[tokio::test]
    async fn broadcast_excludes_sender() {
        let registry = ChatRegistry::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        registry.subscribe(1, 100, tx_a);
        registry.subscribe(2, 100, tx_b);

        registry.broadcast_to_link(100, &ServerEvent::Pong, Some(1));

        assert!(matches!(rx_b.try_recv(), Ok(ServerEvent::Pong)));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_scoped_to_link() {
        let registry = ChatRegistry::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        registry.subscribe(1, 100, tx_a);
        registry.subscribe(1, 200, tx_b);

        registry.broadcast_to_link(200, &ServerEvent::Pong, None);

        assert!(rx_a.try_recv().is_err());
        assert!(matches!(rx_b.try_recv(), Ok(ServerEvent::Pong)));
    }

    #[tokio::test]
    async fn dead_peer_is_removed_without_blocking_others() {
        let registry = ChatRegistry::new();
        let (tx_dead, rx_dead) = channel();
        drop(rx_dead); // peer went away
        let (tx_live, mut rx_live) = channel();
        registry.subscribe(1, 100, tx_dead);
        registry.subscribe(2, 100, tx_live);

        registry.broadcast_to_link(100, &ServerEvent::Pong, None);

        assert_eq!(registry.len(), 1, "dead connection deregistered");
        assert!(matches!(rx_live.try_recv(), Ok(ServerEvent::Pong)));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let registry = ChatRegistry::new();
        let (tx, _rx) = channel();
        registry.subscribe(1, 100, tx);
        registry.unsubscribe(1, 100);
        registry.unsubscribe(1, 100);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn reconnect_replaces_previous_sender() {
        let registry = ChatRegistry::new();
        let (tx_old, mut rx_old) = channel();
        let (tx_new, mut rx_new) = channel();
        registry.subscribe(1, 100, tx_old);
        registry.subscribe(1, 100, tx_new);
        assert_eq!(registry.len(), 1);

        registry.send_to(1, 100, ServerEvent::Pong);
        assert!(rx_old.try_recv().is_err());
        assert!(matches!(rx_new.try_recv(), Ok(ServerEvent::Pong)));
    }

    #[tokio::test]
    async fn shutdown_closes_all_queues() {
        let registry = ChatRegistry::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        registry.subscribe(1, 100, tx_a);
        registry.subscribe(2, 200, tx_b);

        registry.shutdown();

        assert!(registry.is_empty());
        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());
    }
}
