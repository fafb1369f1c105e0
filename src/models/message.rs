use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub user_id: Option<String>,
    pub content: String,
    pub posted: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MessageForm {
    pub room: String,
    #[validate(length(min = 1))]
    pub text: String,
}

/// History filter: all bounds optional. `from` is an exclusive lower bound
/// on the message identifier, `since` an inclusive lower bound on `posted`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageQuery {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub since: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub room: String,
    pub text: String,
    pub posted: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<Message> for MessageResponse {
    fn from(msg: Message) -> Self {
        MessageResponse {
            id: msg.id,
            room: msg.room_id,
            text: msg.content,
            posted: msg.posted,
            owner: msg.user_id,
            name: None,
            safe_name: None,
            avatar: None,
        }
    }
}
