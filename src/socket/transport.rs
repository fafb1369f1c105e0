use actix_web::{http::header, web, Error, HttpRequest, HttpResponse};
use actix_ws::Message as WsMessage;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::services::user::UserService;
use crate::socket::context::ConnectionContext;
use crate::socket::protocol::{self, AckReply};
use crate::utils::auth::verify_jwt;
use crate::AppState;

/// WebSocket endpoint. Identity is attached before the upgrade: token from
/// the `Authorization` header or the `token` cookie, verified and resolved
/// to a stored profile. Resolution failure rejects the connection attempt
/// entirely.
pub async fn socket_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let token = bearer_token(&req)
        .or_else(|| req.cookie("token").map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = verify_jwt(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("JWT verification failed: {:?}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let user = UserService::new(&state.db)
        .get_user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    let conn_id = uuid::Uuid::new_v4().to_string();
    let ctx = ConnectionContext::new(conn_id.clone(), user);

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    state.registry.register(ctx.clone()).await;
    state.connections.register(&conn_id, tx.clone()).await;

    tracing::info!(
        "WebSocket connection established for {} ({})",
        ctx.user.name,
        conn_id
    );

    actix_web::rt::spawn(run_connection(state, ctx, session, msg_stream, tx, rx));

    Ok(response)
}

async fn run_connection(
    state: web::Data<AppState>,
    ctx: ConnectionContext,
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    tx: mpsc::UnboundedSender<String>,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    // Writer half: everything emitted at this connection goes through its
    // queue so broadcasts and ack replies cannot interleave mid-frame.
    let mut writer = session.clone();
    let mut write_task = actix_web::rt::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if writer.text(frame).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut write_task => break,
            msg = msg_stream.next() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    WsMessage::Text(text) => {
                        handle_frame(&state, &ctx, &tx, &text).await;
                    }
                    WsMessage::Ping(bytes) => {
                        let _ = session.pong(&bytes).await;
                    }
                    WsMessage::Close(reason) => {
                        tracing::debug!("WebSocket close: {:?}", reason);
                        let _ = session.close(reason).await;
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    write_task.abort();

    // Disconnect during an in-flight handler does not abort it; it only
    // departs the rooms and drops the connection's bookkeeping.
    state.chat.disconnect(&ctx).await;
    state.connections.unregister(&ctx.conn_id).await;

    tracing::info!("WebSocket connection closed ({})", ctx.conn_id);
}

/// Decodes one frame and dispatches it. A failed frame is reported to its
/// sender when an ack was requested and logged otherwise; nobody else
/// hears about it.
async fn handle_frame(
    state: &web::Data<AppState>,
    ctx: &ConnectionContext,
    tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let envelope = match protocol::decode_frame(text) {
        Ok(envelope) => envelope,
        Err((ack, err)) => {
            tracing::warn!("Rejected frame from {}: {}", ctx.conn_id, err);
            if let Some(ack) = ack {
                let _ = tx.send(AckReply::err(ack, &err).encode());
            }
            return;
        }
    };

    let ack = envelope.ack;
    match state.chat.dispatch(ctx, envelope.event, ack.is_some()).await {
        Ok(data) => {
            if let Some(ack) = ack {
                let _ = tx.send(AckReply::ok(ack, data).encode());
            }
        }
        Err(err) => {
            tracing::warn!("Handler failure for {}: {}", ctx.conn_id, err);
            if let Some(ack) = ack {
                let _ = tx.send(AckReply::err(ack, &err).encode());
            }
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}
