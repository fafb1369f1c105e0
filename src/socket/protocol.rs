/// Wire protocol for the socket channel.
///
/// One JSON object per text frame. Inbound frames carry a named event, its
/// payload, and an optional acknowledgement id:
///
///   {"event": "rooms:join", "data": "<room id>", "ack": 3}
///
/// Outbound frames are either events (`{"event", "data"}`) or ack replies
/// (`{"ack", "ok", "data"|"error"}`). Exactly one ack reply is sent per
/// requested ack id.
///
/// Each inbound event name has a fixed payload schema; unknown names and
/// mismatched shapes are rejected here, before any handler runs.
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::message::{MessageForm, MessageQuery};
use crate::models::room::{RoomForm, RoomUpdateForm};

/// Outbound event names.
pub mod server_events {
    pub const ROOMS_NEW: &str = "rooms:new";
    pub const ROOMS_UPDATE: &str = "rooms:update";
    /// Global list-cleanup notification for a deleted room.
    pub const ROOMS_REMOVE: &str = "rooms:remove";
    /// Room-scoped notification to the members of a deleted room.
    pub const ROOM_REMOVE: &str = "room:remove";
    pub const MESSAGES_NEW: &str = "messages:new";
    pub const USERS_NEW: &str = "users:new";
    pub const USERS_LEAVE: &str = "users:leave";
    pub const FILES_NEW: &str = "files:new";
}

/// Payload scoping a request to one room.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomScope {
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "rooms:create")]
    RoomsCreate(RoomForm),
    #[serde(rename = "rooms:get", alias = "rooms:list")]
    RoomsGet,
    #[serde(rename = "rooms:join")]
    RoomsJoin(String),
    #[serde(rename = "rooms:leave")]
    RoomsLeave(String),
    #[serde(rename = "rooms:update")]
    RoomsUpdate(RoomUpdateForm),
    #[serde(rename = "rooms:delete")]
    RoomsDelete(String),
    #[serde(rename = "messages:new")]
    MessagesNew(MessageForm),
    #[serde(rename = "messages:get")]
    MessagesGet(MessageQuery),
    #[serde(rename = "users:get")]
    UsersGet(RoomScope),
    #[serde(rename = "files:get")]
    FilesGet(RoomScope),
}

impl ClientEvent {
    /// Event name, for dispatch logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RoomsCreate(_) => "rooms:create",
            ClientEvent::RoomsGet => "rooms:get",
            ClientEvent::RoomsJoin(_) => "rooms:join",
            ClientEvent::RoomsLeave(_) => "rooms:leave",
            ClientEvent::RoomsUpdate(_) => "rooms:update",
            ClientEvent::RoomsDelete(_) => "rooms:delete",
            ClientEvent::MessagesNew(_) => "messages:new",
            ClientEvent::MessagesGet(_) => "messages:get",
            ClientEvent::UsersGet(_) => "users:get",
            ClientEvent::FilesGet(_) => "files:get",
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: ClientEvent,
    pub ack: Option<u64>,
}

/// Decodes one inbound text frame. On failure the caller still gets the
/// frame's ack id when one could be read, so the sender can be told.
pub fn decode_frame(text: &str) -> Result<Envelope, (Option<u64>, AppError)> {
    let mut value: JsonValue = serde_json::from_str(text)
        .map_err(|e| (None, AppError::InvalidInput(format!("malformed frame: {e}"))))?;

    let ack = value.get("ack").and_then(JsonValue::as_u64);
    if let Some(map) = value.as_object_mut() {
        map.remove("ack");
    }

    let event = serde_json::from_value::<ClientEvent>(value)
        .map_err(|e| (ack, AppError::InvalidInput(format!("unrecognized event: {e}"))))?;

    Ok(Envelope { event, ack })
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub event: &'static str,
    pub data: JsonValue,
}

impl ServerEvent {
    pub fn new(event: &'static str, data: impl Serialize) -> Self {
        ServerEvent {
            event,
            data: serde_json::to_value(data).unwrap_or(JsonValue::Null),
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AckError {
    pub code: &'static str,
    pub detail: String,
}

/// Reply for a request/response exchange.
#[derive(Debug, Clone, Serialize)]
pub struct AckReply {
    pub ack: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AckError>,
}

impl AckReply {
    pub fn ok(ack: u64, data: Option<JsonValue>) -> Self {
        AckReply {
            ack,
            ok: true,
            data,
            error: None,
        }
    }

    pub fn err(ack: u64, error: &AppError) -> Self {
        AckReply {
            ack,
            ok: false,
            data: None,
            error: Some(AckError {
                code: error.code(),
                detail: error.public_detail(),
            }),
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_event_with_ack() {
        let frame = r#"{"event": "rooms:join", "data": "r-42", "ack": 7}"#;
        let envelope = decode_frame(frame).unwrap();
        assert_eq!(envelope.ack, Some(7));
        assert!(matches!(envelope.event, ClientEvent::RoomsJoin(ref id) if id == "r-42"));
    }

    #[test]
    fn test_decode_event_without_data() {
        let frame = r#"{"event": "rooms:get"}"#;
        let envelope = decode_frame(frame).unwrap();
        assert!(envelope.ack.is_none());
        assert!(matches!(envelope.event, ClientEvent::RoomsGet));
    }

    #[test]
    fn test_rooms_list_alias_accepted() {
        let envelope = decode_frame(r#"{"event": "rooms:list"}"#).unwrap();
        assert!(matches!(envelope.event, ClientEvent::RoomsGet));
    }

    #[test]
    fn test_decode_message_form() {
        let frame = r#"{"event": "messages:new", "data": {"room": "r-1", "text": "hi"}}"#;
        let envelope = decode_frame(frame).unwrap();
        match envelope.event {
            ClientEvent::MessagesNew(form) => {
                assert_eq!(form.room, "r-1");
                assert_eq!(form.text, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_rejected_with_ack() {
        let frame = r#"{"event": "rooms:destroy", "data": "r-1", "ack": 2}"#;
        let (ack, err) = decode_frame(frame).unwrap_err();
        assert_eq!(ack, Some(2));
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_payload_rejected() {
        let frame = r#"{"event": "messages:new", "data": {"room": "r-1"}}"#;
        assert!(decode_frame(frame).is_err());
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let (ack, err) = decode_frame("not json").unwrap_err();
        assert!(ack.is_none());
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_ack_reply_encoding() {
        let reply = AckReply::err(5, &AppError::NotFound("room not found".to_string()));
        let encoded = reply.encode();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["ack"], 5);
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "not_found");
    }
}
