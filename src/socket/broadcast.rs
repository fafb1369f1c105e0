use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::socket::protocol::ServerEvent;
use crate::socket::registry::RoomRegistry;

/// Sender half of a connection's outbound frame queue.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

/// Connection registry - maps connection ids to their websocket senders.
type ConnectionMap = Arc<RwLock<HashMap<String, ConnectionSender>>>;

/// Fan-out seam. Handlers never touch the transport directly; they emit to
/// one of the three scopes and the implementation resolves delivery. Tests
/// substitute a recording double.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn to_connection(&self, conn_id: &str, event: ServerEvent);
    async fn to_room(&self, room_id: &str, event: ServerEvent, exclude: Option<&str>);
    async fn to_all(&self, event: ServerEvent);
}

/// Delivery over the live WebSocket connections.
pub struct WsBroadcaster {
    connections: ConnectionMap,
    registry: RoomRegistry,
}

impl WsBroadcaster {
    pub fn new(registry: RoomRegistry) -> Self {
        WsBroadcaster {
            connections: Arc::new(RwLock::new(HashMap::new())),
            registry,
        }
    }

    pub async fn register(&self, conn_id: &str, sender: ConnectionSender) {
        let mut connections = self.connections.write().await;
        connections.insert(conn_id.to_string(), sender);
    }

    pub async fn unregister(&self, conn_id: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(conn_id);
    }

    async fn send(&self, conn_id: &str, frame: &str) {
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(conn_id) {
            if sender.send(frame.to_string()).is_err() {
                tracing::warn!("Failed to queue frame for connection {}", conn_id);
            }
        }
    }
}

#[async_trait]
impl Broadcaster for WsBroadcaster {
    async fn to_connection(&self, conn_id: &str, event: ServerEvent) {
        self.send(conn_id, &event.encode()).await;
    }

    async fn to_room(&self, room_id: &str, event: ServerEvent, exclude: Option<&str>) {
        let frame = event.encode();
        for conn_id in self.registry.members_of(room_id).await {
            if Some(conn_id.as_str()) == exclude {
                continue;
            }
            self.send(&conn_id, &frame).await;
        }
    }

    async fn to_all(&self, event: ServerEvent) {
        let frame = event.encode();
        let connections = self.connections.read().await;
        for (conn_id, sender) in connections.iter() {
            if sender.send(frame.clone()).is_err() {
                tracing::warn!("Failed to queue frame for connection {}", conn_id);
            }
        }
    }
}
