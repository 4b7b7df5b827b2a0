//! services/api/src/web/notifications.rs
//!
//! The per-user push registry. Each live WebSocket registers an outbound queue here;
//! `publish` fans one event out to every queue the user currently has.
//!
//! Delivery is best-effort and at-most-once: a queue that is full or closed is skipped,
//! and publishing to a user with no connections drops the event. The stored dream
//! remains the source of truth a client can re-fetch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::web::protocol::PushMessage;

/// Outbound frames buffered per connection before it counts as not writable.
pub const CONNECTION_QUEUE_CAPACITY: usize = 64;

/// Identifies one registered connection of a user.
pub type ConnectionId = Uuid;

/// Manages live push connections, keyed by user.
#[derive(Clone, Default)]
pub struct NotificationRegistry {
    inner: Arc<RwLock<HashMap<Uuid, HashMap<ConnectionId, mpsc::Sender<String>>>>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the user's set and returns its id.
    pub async fn register(&self, user_id: Uuid, connection: mpsc::Sender<String>) -> ConnectionId {
        let conn_id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id, connection);
        debug!(%user_id, %conn_id, "push connection registered");
        conn_id
    }

    /// Creates a queue for a new connection, registers it, and hands back the receiving end.
    pub async fn connect(&self, user_id: Uuid) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        let conn_id = self.register(user_id, tx).await;
        (conn_id, rx)
    }

    /// Removes a connection. The user entry goes away with its last connection.
    /// Returns whether the connection was registered.
    pub async fn unregister(&self, user_id: Uuid, conn_id: ConnectionId) -> bool {
        let mut users = self.inner.write().await;
        let Some(connections) = users.get_mut(&user_id) else {
            return false;
        };
        let removed = connections.remove(&conn_id).is_some();
        if connections.is_empty() {
            users.remove(&user_id);
        }
        debug!(%user_id, %conn_id, removed, "push connection unregistered");
        removed
    }

    /// Sends `{event, data}` to every writable connection of the user.
    /// Returns how many connections accepted the frame.
    pub async fn publish<T: Serialize>(&self, user_id: Uuid, event: &str, data: &T) -> usize {
        let frame = match serde_json::to_value(data).and_then(|data| {
            serde_json::to_string(&PushMessage {
                event: event.to_string(),
                data,
            })
        }) {
            Ok(frame) => frame,
            Err(e) => {
                error!(%user_id, event, "failed to serialize push event: {}", e);
                return 0;
            }
        };

        let users = self.inner.read().await;
        let Some(connections) = users.get(&user_id) else {
            debug!(%user_id, event, "no live connections; event dropped");
            return 0;
        };

        let mut delivered = 0;
        for (conn_id, connection) in connections {
            match connection.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%user_id, %conn_id, event, "push queue full; event skipped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(%user_id, %conn_id, event, "push connection closed; event skipped");
                }
            }
        }
        delivered
    }

    /// Number of live connections the user has.
    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .get(&user_id)
            .map_or(0, |connections| connections.len())
    }

    /// Number of users with at least one live connection.
    pub async fn user_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(frame: &str) -> PushMessage {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn publish_fans_out_to_every_connection_of_the_user() {
        let registry = NotificationRegistry::new();
        let user = Uuid::new_v4();
        let (first_id, mut first) = registry.connect(user).await;
        let (_second_id, mut second) = registry.connect(user).await;

        let delivered = registry.publish(user, "imageReady", &json!({"dreamId": "d1"})).await;
        assert_eq!(delivered, 2);

        let a = decode(&first.recv().await.unwrap());
        let b = decode(&second.recv().await.unwrap());
        assert_eq!(a, b);
        assert_eq!(a.event, "imageReady");
        assert_eq!(a.data, json!({"dreamId": "d1"}));

        // After dropping one connection only the other one receives.
        assert!(registry.unregister(user, first_id).await);
        assert_eq!(registry.publish(user, "ping", &json!({})).await, 1);
        assert!(second.recv().await.is_some());
        assert!(first.try_recv().is_err());
    }

    #[tokio::test]
    async fn last_unregister_prunes_the_user_entry() {
        let registry = NotificationRegistry::new();
        let user = Uuid::new_v4();
        let (a, _rx_a) = registry.connect(user).await;
        let (b, _rx_b) = registry.connect(user).await;
        assert_eq!(registry.user_count().await, 1);
        assert_eq!(registry.connection_count(user).await, 2);

        registry.unregister(user, a).await;
        assert_eq!(registry.user_count().await, 1);
        registry.unregister(user, b).await;
        assert_eq!(registry.user_count().await, 0);
        assert_eq!(registry.connection_count(user).await, 0);

        // Unknown connections are a no-op.
        assert!(!registry.unregister(user, a).await);
    }

    #[tokio::test]
    async fn publish_without_connections_is_a_silent_no_op() {
        let registry = NotificationRegistry::new();
        assert_eq!(registry.publish(Uuid::new_v4(), "imageReady", &json!({})).await, 0);
        assert_eq!(registry.user_count().await, 0);
    }

    #[tokio::test]
    async fn closed_and_full_connections_are_skipped() {
        let registry = NotificationRegistry::new();
        let user = Uuid::new_v4();

        let (_closed_id, closed_rx) = registry.connect(user).await;
        drop(closed_rx);

        let (full_tx, _full_rx) = mpsc::channel(1);
        full_tx.try_send("backlog".to_string()).unwrap();
        registry.register(user, full_tx).await;

        let (_live_id, mut live_rx) = registry.connect(user).await;

        assert_eq!(registry.publish(user, "imageReady", &json!({})).await, 1);
        assert!(live_rx.recv().await.is_some());
        // Skipped connections stay registered until their socket disconnects.
        assert_eq!(registry.connection_count(user).await, 3);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let registry = NotificationRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (_, mut alice_rx) = registry.connect(alice).await;
        let (_, mut bob_rx) = registry.connect(bob).await;

        registry.publish(alice, "imageReady", &json!({})).await;
        assert!(alice_rx.recv().await.is_some());
        assert!(bob_rx.try_recv().is_err());
    }
}
