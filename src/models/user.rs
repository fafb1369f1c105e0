use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

/// Presence entry broadcast on join/leave and returned by `users:get`.
/// `id` is the connection-scoped presence identifier, not the durable
/// user identifier.
#[derive(Debug, Clone, Serialize)]
pub struct UserPresenceResponse {
    pub id: String,
    pub name: String,
    pub safe_name: String,
    pub avatar: String,
    pub room: String,
}
