//! Em học phép cộng · addition game backend
//!
//! - Axum HTTP + WebSocket API; one game session per WebSocket connection
//! - Gemini proxy for encouragement text and speech (optional, via environment)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   GAME_CONFIG_PATH  : path to TOML config (ranges, timings, phrases, prompts, themes)
//!   GEMINI_API_KEY    : enables Gemini if present
//!   GEMINI_BASE_URL   : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_TEXT_MODEL : default "gemini-2.5-flash"
//!   GEMINI_TTS_MODEL  : default "gemini-2.5-flash-preview-tts"
//!   GEMINI_VOICE      : default "Kore"
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default), "compact" or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod generator;
mod teaching;
mod session;
mod audio;
mod gemini;
mod state;
mod logic;
mod narrator;
mod protocol;
mod runtime;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let log_format = telemetry::init_tracing();

  // Shared application state (game config, optional Gemini client).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "phepcong_backend", %addr, ?log_format, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "phepcong_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "phepcong_backend", error = %e, "Failed to listen for Ctrl+C");
    std::future::pending::<()>().await;
  }
  info!(target: "phepcong_backend", "Shutdown signal received");
}
