use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub last_active: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoomForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoomUpdateForm {
    pub id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub last_active: i64,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        RoomResponse {
            id: room.id,
            name: room.name,
            description: room.description,
            last_active: room.last_active,
        }
    }
}

/// Room metadata returned on a join acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<Room> for RoomInfo {
    fn from(room: Room) -> Self {
        RoomInfo {
            id: room.id,
            name: room.name,
            description: room.description,
        }
    }
}

/// Lightweight recency update pushed to every client when a room receives
/// a message, so room lists can re-sort without joining the room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomActivity {
    pub id: String,
    pub last_active: i64,
}
