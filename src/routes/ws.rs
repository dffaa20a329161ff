//! WebSocket upgrade + session loop. Each connection owns one game session.
//! Client messages are parsed as JSON and forwarded to the session runtime; timer
//! and narration events from the runtime are pushed to the client as they happen.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::runtime::SessionRuntime;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "phepcong_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(session_id = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let live = state.session_opened();
  info!(target: "phepcong_backend", live, "WebSocket connected; game session created");

  let mut runtime = SessionRuntime::new(state.clone(), None);
  if send(&mut socket, &runtime.state_message()).await.is_ok() {
    loop {
      let outgoing = tokio::select! {
        incoming = socket.recv() => match incoming {
          Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(msg) => {
              debug!(target: "phepcong_backend", "WS received: {:?}", &msg);
              runtime.handle(msg)
            }
            Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
          },
          Some(Ok(Message::Ping(payload))) => {
            let _ = socket.send(Message::Pong(payload)).await;
            continue;
          }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => continue,
          Some(Err(e)) => {
            error!(target: "phepcong_backend", error = %e, "WS receive error");
            break;
          }
        },
        event = runtime.next_event() => match event {
          Some(msg) => msg,
          None => break,
        },
      };

      if send(&mut socket, &outgoing).await.is_err() {
        break;
      }
    }
  }

  let live = state.session_closed();
  info!(target: "phepcong_backend", live, "WebSocket disconnected; game session dropped");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "phepcong_backend", error = %e, "WS send error");
    e
  })
}
