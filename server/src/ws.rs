use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;

use crate::session::{Outbound, SessionHandle};
use crate::state::World;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub world: Arc<World>,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

/// Liveness probe
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "Healthy" }))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let world = app_state.world;
    let (mut sink, mut stream) = socket.split();

    let (handle, mut outbox) = SessionHandle::channel(world.config.session_queue_capacity);
    let player = world.connect(handle);
    let my_id = player.id;

    // Server -> Client: drain the session queue until it asks to close.
    let mut writer = tokio::spawn(async move {
        while let Some(item) = outbox.next().await {
            match item {
                Outbound::Text(text) => {
                    if sink.send(Message::Text(text.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: "Collided".into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    // Client -> Server
    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => world.handle_text(my_id, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(player_id = my_id, error = %e, "websocket read failed");
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }
            _ = &mut writer => break,
        }
    }

    writer.abort();
    world.disconnect(my_id);
}
