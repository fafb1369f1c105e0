/// Chat event handlers.
///
/// Each handler validates its payload, talks to the persistence services,
/// and instructs the broadcaster which scope hears about it. Failures are
/// returned to the caller on the ack channel when one exists; other
/// connections are never affected by one failed request.
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::config::S3Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::file::{File, FileResponse};
use crate::models::message::{MessageForm, MessageQuery, MessageResponse};
use crate::models::room::{RoomActivity, RoomForm, RoomInfo, RoomResponse, RoomUpdateForm};
use crate::models::user::UserPresenceResponse;
use crate::services::file::FileService;
use crate::services::message::MessageService;
use crate::services::room::RoomService;
use crate::socket::broadcast::Broadcaster;
use crate::socket::context::ConnectionContext;
use crate::socket::protocol::{server_events, ClientEvent, RoomScope, ServerEvent};
use crate::socket::registry::RoomRegistry;
use crate::utils::time::current_timestamp_millis;

/// Deadline for any single store call made from a handler. A stalled
/// store fails the one request instead of stalling it forever.
const STORE_DEADLINE: Duration = Duration::from_secs(5);

/// History window applied when `messages:get` carries no `since` bound.
const HISTORY_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;

const HISTORY_LIMIT: i64 = 500;

async fn with_deadline<T>(fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
    match tokio::time::timeout(STORE_DEADLINE, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::StoreUnavailable(
            "store call exceeded deadline".to_string(),
        )),
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

pub struct ChatServer {
    db: Database,
    registry: RoomRegistry,
    broadcaster: Arc<dyn Broadcaster>,
    s3: Option<S3Config>,
}

impl ChatServer {
    pub fn new(
        db: Database,
        registry: RoomRegistry,
        broadcaster: Arc<dyn Broadcaster>,
        s3: Option<S3Config>,
    ) -> Self {
        ChatServer {
            db,
            registry,
            broadcaster,
            s3,
        }
    }

    /// Routes one decoded event to its handler. The return value is the
    /// ack payload for request/response exchanges; `has_ack` tells
    /// handlers whose reply channel varies (`messages:get`) which one the
    /// caller asked for.
    pub async fn dispatch(
        &self,
        ctx: &ConnectionContext,
        event: ClientEvent,
        has_ack: bool,
    ) -> AppResult<Option<JsonValue>> {
        tracing::debug!(
            "Dispatching {} for connection {}",
            event.name(),
            ctx.conn_id
        );

        match event {
            ClientEvent::RoomsCreate(form) => self.handle_rooms_create(form).await,
            ClientEvent::RoomsGet => self.handle_rooms_get(ctx).await,
            ClientEvent::RoomsJoin(id) => self.handle_rooms_join(ctx, &id).await,
            ClientEvent::RoomsLeave(id) => self.handle_rooms_leave(ctx, &id).await,
            ClientEvent::RoomsUpdate(form) => self.handle_rooms_update(form).await,
            ClientEvent::RoomsDelete(id) => self.handle_rooms_delete(&id).await,
            ClientEvent::MessagesNew(form) => self.handle_messages_new(ctx, form).await,
            ClientEvent::MessagesGet(query) => {
                self.handle_messages_get(ctx, query, has_ack).await
            }
            ClientEvent::UsersGet(scope) => self.handle_users_get(ctx, scope).await,
            ClientEvent::FilesGet(scope) => self.handle_files_get(ctx, scope).await,
        }
    }

    async fn handle_rooms_create(&self, form: RoomForm) -> AppResult<Option<JsonValue>> {
        form.validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let room = with_deadline(
            RoomService::new(&self.db).create_room(&form.name, form.description.as_deref()),
        )
        .await?;

        tracing::info!("Created room {} ({})", room.name, room.id);

        let response = RoomResponse::from(room);
        self.broadcaster
            .to_all(ServerEvent::new(server_events::ROOMS_NEW, &response))
            .await;

        Ok(Some(to_json(&response)?))
    }

    async fn handle_rooms_get(&self, ctx: &ConnectionContext) -> AppResult<Option<JsonValue>> {
        let rooms = with_deadline(RoomService::new(&self.db).get_all_rooms()).await?;

        let responses: Vec<RoomResponse> = rooms.into_iter().map(RoomResponse::from).collect();
        for response in &responses {
            self.broadcaster
                .to_connection(
                    &ctx.conn_id,
                    ServerEvent::new(server_events::ROOMS_NEW, response),
                )
                .await;
        }

        Ok(Some(to_json(&responses)?))
    }

    async fn handle_rooms_join(
        &self,
        ctx: &ConnectionContext,
        id: &str,
    ) -> AppResult<Option<JsonValue>> {
        let room = with_deadline(RoomService::new(&self.db).get_room_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound("room not found".to_string()))?;

        self.registry.join(&ctx.conn_id, &room.id).await;
        self.broadcaster
            .to_room(
                &room.id,
                ServerEvent::new(server_events::USERS_NEW, ctx.presence(&room.id)),
                None,
            )
            .await;

        Ok(Some(to_json(&RoomInfo::from(room))?))
    }

    async fn handle_rooms_leave(
        &self,
        ctx: &ConnectionContext,
        id: &str,
    ) -> AppResult<Option<JsonValue>> {
        self.registry.leave(&ctx.conn_id, id).await;
        self.broadcaster
            .to_room(
                id,
                ServerEvent::new(server_events::USERS_LEAVE, ctx.presence(id)),
                None,
            )
            .await;

        Ok(None)
    }

    async fn handle_rooms_update(&self, form: RoomUpdateForm) -> AppResult<Option<JsonValue>> {
        form.validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let room = with_deadline(RoomService::new(&self.db).update_room(
            &form.id,
            &form.name,
            form.description.as_deref(),
        ))
        .await?;

        let response = RoomResponse::from(room);
        self.broadcaster
            .to_all(ServerEvent::new(server_events::ROOMS_UPDATE, &response))
            .await;

        Ok(Some(to_json(&response)?))
    }

    async fn handle_rooms_delete(&self, id: &str) -> AppResult<Option<JsonValue>> {
        let service = RoomService::new(&self.db);
        let room = with_deadline(service.get_room_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound("room not found".to_string()))?;

        // Members first, then everyone for list cleanup; the row is only
        // removed once clients have been told.
        self.broadcaster
            .to_room(
                &room.id,
                ServerEvent::new(server_events::ROOM_REMOVE, &room.id),
                None,
            )
            .await;
        self.broadcaster
            .to_all(ServerEvent::new(server_events::ROOMS_REMOVE, &room.id))
            .await;

        self.registry.drop_room(&room.id).await;
        with_deadline(service.delete_room(&room.id)).await?;

        tracing::info!("Deleted room {} ({})", room.name, room.id);
        Ok(None)
    }

    async fn handle_messages_new(
        &self,
        ctx: &ConnectionContext,
        form: MessageForm,
    ) -> AppResult<Option<JsonValue>> {
        form.validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let room = with_deadline(RoomService::new(&self.db).get_room_by_id(&form.room))
            .await?
            .ok_or_else(|| AppError::NotFound("room not found".to_string()))?;

        let message = with_deadline(MessageService::new(&self.db).create_message(
            &room.id,
            Some(&ctx.user.id),
            &form.text,
        ))
        .await?;

        let posted = message.posted;
        with_deadline(RoomService::new(&self.db).touch_last_active(&room.id, posted)).await?;

        let mut response = MessageResponse::from(message);
        response.name = Some(ctx.user.name.clone());
        response.safe_name = Some(ctx.safe_name.clone());
        response.avatar = Some(ctx.avatar.clone());

        self.broadcaster
            .to_room(
                &room.id,
                ServerEvent::new(server_events::MESSAGES_NEW, &response),
                None,
            )
            .await;
        // Everyone hears the recency change so room lists can re-sort
        // without joining the room.
        self.broadcaster
            .to_all(ServerEvent::new(
                server_events::ROOMS_UPDATE,
                RoomActivity {
                    id: room.id.clone(),
                    last_active: posted,
                },
            ))
            .await;

        Ok(Some(to_json(&response)?))
    }

    async fn handle_messages_get(
        &self,
        ctx: &ConnectionContext,
        mut query: MessageQuery,
        has_ack: bool,
    ) -> AppResult<Option<JsonValue>> {
        if query.since.is_none() {
            query.since = Some(current_timestamp_millis() - HISTORY_WINDOW_MS);
        }

        let messages =
            with_deadline(MessageService::new(&self.db).list_messages(&query, HISTORY_LIMIT))
                .await?;

        // The store hands back newest-first; clients read chronologically.
        let mut responses: Vec<MessageResponse> =
            messages.into_iter().map(MessageResponse::from).collect();
        responses.reverse();

        if has_ack {
            Ok(Some(to_json(&responses)?))
        } else {
            self.broadcaster
                .to_connection(
                    &ctx.conn_id,
                    ServerEvent::new(server_events::MESSAGES_NEW, &responses),
                )
                .await;
            Ok(None)
        }
    }

    async fn handle_users_get(
        &self,
        ctx: &ConnectionContext,
        scope: RoomScope,
    ) -> AppResult<Option<JsonValue>> {
        let contexts = self.registry.contexts_of(&scope.room).await;
        let entries: Vec<UserPresenceResponse> = contexts
            .iter()
            .map(|member| member.presence(&scope.room))
            .collect();

        for entry in &entries {
            self.broadcaster
                .to_connection(
                    &ctx.conn_id,
                    ServerEvent::new(server_events::USERS_NEW, entry),
                )
                .await;
        }

        Ok(Some(to_json(&entries)?))
    }

    async fn handle_files_get(
        &self,
        ctx: &ConnectionContext,
        scope: RoomScope,
    ) -> AppResult<Option<JsonValue>> {
        let files =
            with_deadline(FileService::new(&self.db).get_files_by_room_id(&scope.room)).await?;

        let responses: Vec<FileResponse> = files
            .into_iter()
            .map(|file| FileResponse::from_file(file, self.s3.as_ref()))
            .collect();

        for response in &responses {
            self.broadcaster
                .to_connection(
                    &ctx.conn_id,
                    ServerEvent::new(server_events::FILES_NEW, response),
                )
                .await;
        }

        Ok(Some(to_json(&responses)?))
    }

    /// Fan-out hook for the upload collaborator: announces a freshly
    /// persisted file to the members of its room.
    #[allow(dead_code)]
    pub async fn send_file(&self, file: File) {
        let room = file.room_id.clone();
        let response = FileResponse::from_file(file, self.s3.as_ref());
        self.broadcaster
            .to_room(
                &room,
                ServerEvent::new(server_events::FILES_NEW, &response),
                None,
            )
            .await;
    }

    /// Disconnect path: departs every joined room, announcing each
    /// departure, then drops the connection's bookkeeping.
    pub async fn disconnect(&self, ctx: &ConnectionContext) {
        let affected = self.registry.leave_all(&ctx.conn_id).await;
        for room_id in &affected {
            self.broadcaster
                .to_room(
                    room_id,
                    ServerEvent::new(server_events::USERS_LEAVE, ctx.presence(room_id)),
                    None,
                )
                .await;
        }
        self.registry.unregister(&ctx.conn_id).await;

        tracing::info!(
            "Connection {} disconnected from {} room(s)",
            ctx.conn_id,
            affected.len()
        );
    }
}
