/// In-memory bookkeeping of which connections belong to which room.
///
/// Membership is kept symmetric between the two maps: a connection appears
/// in `members_of(r)` exactly when `r` is in its joined set. Both maps are
/// only touched from async handler context under the write locks.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::socket::context::ConnectionContext;

struct SessionEntry {
    ctx: ConnectionContext,
    rooms: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct RoomRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    rooms: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a connection. Must precede any join for that connection.
    pub async fn register(&self, ctx: ConnectionContext) {
        let mut sessions = self.sessions.write().await;
        let conn_id = ctx.conn_id.clone();
        sessions.insert(
            conn_id.clone(),
            SessionEntry {
                ctx,
                rooms: HashSet::new(),
            },
        );
        tracing::debug!("Registered connection {}", conn_id);
    }

    /// Detaches a connection entirely. Callers run `leave_all` first so
    /// departure events can still be fanned out.
    pub async fn unregister(&self, conn_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(conn_id).is_some() {
            tracing::debug!("Unregistered connection {}", conn_id);
        }
    }

    /// Adds the connection to a room's membership set. Idempotent. Room
    /// existence is the caller's concern, checked before this point.
    pub async fn join(&self, conn_id: &str, room_id: &str) {
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.get_mut(conn_id) else {
            tracing::warn!("Join from unknown connection {}", conn_id);
            return;
        };
        entry.rooms.insert(room_id.to_string());
        drop(sessions);

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id.to_string());

        tracing::debug!("Connection {} joined room {}", conn_id, room_id);
    }

    /// Removes membership. Idempotent; a no-op without a prior join.
    pub async fn leave(&self, conn_id: &str, room_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(conn_id) {
            entry.rooms.remove(room_id);
        }
        drop(sessions);

        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room_id) {
            members.remove(conn_id);
            if members.is_empty() {
                rooms.remove(room_id);
            }
        }

        tracing::debug!("Connection {} left room {}", conn_id, room_id);
    }

    /// Disconnect path: removes the connection from every room it was a
    /// member of and returns the affected room ids for departure fan-out.
    pub async fn leave_all(&self, conn_id: &str) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let joined: Vec<String> = match sessions.get_mut(conn_id) {
            Some(entry) => entry.rooms.drain().collect(),
            None => return Vec::new(),
        };
        drop(sessions);

        let mut rooms = self.rooms.write().await;
        for room_id in &joined {
            if let Some(members) = rooms.get_mut(room_id) {
                members.remove(conn_id);
                if members.is_empty() {
                    rooms.remove(room_id);
                }
            }
        }

        joined
    }

    /// Room-deletion path: evicts every member of the room.
    pub async fn drop_room(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        let members = rooms.remove(room_id).unwrap_or_default();
        drop(rooms);

        let mut sessions = self.sessions.write().await;
        for conn_id in members {
            if let Some(entry) = sessions.get_mut(&conn_id) {
                entry.rooms.remove(room_id);
            }
        }
    }

    pub async fn members_of(&self, room_id: &str) -> Vec<String> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolves a room's members to their attached profiles.
    pub async fn contexts_of(&self, room_id: &str) -> Vec<ConnectionContext> {
        let members = self.members_of(room_id).await;
        let sessions = self.sessions.read().await;
        members
            .iter()
            .filter_map(|conn_id| sessions.get(conn_id).map(|entry| entry.ctx.clone()))
            .collect()
    }

    /// (connections, occupied rooms) — for the health surface.
    pub async fn counts(&self) -> (usize, usize) {
        let sessions = self.sessions.read().await;
        let rooms = self.rooms.read().await;
        (sessions.len(), rooms.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;

    fn ctx(conn_id: &str) -> ConnectionContext {
        ConnectionContext::new(
            conn_id.to_string(),
            User {
                id: format!("user-{conn_id}"),
                name: "Test User".to_string(),
                email: format!("{conn_id}@example.com"),
                created_at: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_join_and_leave_lifecycle() {
        let registry = RoomRegistry::new();
        registry.register(ctx("c-1")).await;
        registry.register(ctx("c-2")).await;

        registry.join("c-1", "room-a").await;
        registry.join("c-2", "room-a").await;
        assert_eq!(registry.members_of("room-a").await.len(), 2);

        registry.leave("c-1", "room-a").await;
        assert_eq!(registry.members_of("room-a").await, vec!["c-2"]);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let registry = RoomRegistry::new();
        registry.register(ctx("c-1")).await;

        registry.join("c-1", "room-a").await;
        registry.join("c-1", "room-a").await;

        assert_eq!(registry.members_of("room-a").await.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_without_join_is_noop() {
        let registry = RoomRegistry::new();
        registry.register(ctx("c-1")).await;

        registry.leave("c-1", "room-a").await;
        assert!(registry.members_of("room-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_leave_all_reports_affected_rooms() {
        let registry = RoomRegistry::new();
        registry.register(ctx("c-1")).await;
        registry.register(ctx("c-2")).await;

        registry.join("c-1", "room-a").await;
        registry.join("c-1", "room-b").await;
        registry.join("c-2", "room-b").await;

        let mut affected = registry.leave_all("c-1").await;
        affected.sort();
        assert_eq!(affected, vec!["room-a", "room-b"]);

        assert!(registry.members_of("room-a").await.is_empty());
        assert_eq!(registry.members_of("room-b").await, vec!["c-2"]);

        // A second disconnect has nothing left to report.
        assert!(registry.leave_all("c-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_drop_room_evicts_members() {
        let registry = RoomRegistry::new();
        registry.register(ctx("c-1")).await;
        registry.register(ctx("c-2")).await;

        registry.join("c-1", "room-a").await;
        registry.join("c-2", "room-a").await;
        registry.join("c-2", "room-b").await;

        registry.drop_room("room-a").await;

        assert!(registry.members_of("room-a").await.is_empty());
        // Memberships elsewhere survive, and leave_all no longer reports
        // the dropped room.
        assert_eq!(registry.leave_all("c-2").await, vec!["room-b"]);
    }

    #[tokio::test]
    async fn test_contexts_resolve_profiles() {
        let registry = RoomRegistry::new();
        registry.register(ctx("c-1")).await;
        registry.join("c-1", "room-a").await;

        let contexts = registry.contexts_of("room-a").await;
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].user.id, "user-c-1");
    }
}
