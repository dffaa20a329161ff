//! HTTP endpoint handlers. These are thin wrappers that forward to narration logic
//! or straight to Gemini (the proxy endpoint).

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, error, instrument};

use crate::protocol::*;
use crate::state::AppState;
use crate::logic::{encouragement, speech};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(ErrorOut { error: message.into() })).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, gemini: state.gemini.is_some(), sessions: state.active_sessions() })
}

/// Server-side proxy so the browser never sees the API key.
/// `mode: "tts"` returns `{audio}` (base64 PCM as produced by Gemini), anything else `{text}`.
#[instrument(level = "info", skip(state, body), fields(mode = ?body.mode, prompt_len = body.prompt.len()))]
pub async fn http_post_gemini(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GeminiIn>,
) -> Response {
  if body.prompt.trim().is_empty() {
    return error_response(StatusCode::BAD_REQUEST, "Prompt is required");
  }
  let Some(gemini) = &state.gemini else {
    return error_response(StatusCode::SERVICE_UNAVAILABLE, "GEMINI_API_KEY is not configured");
  };

  let result = match body.mode {
    GeminiMode::Tts => gemini.synthesize_speech(&body.prompt).await.map(|audio| GeminiOut { audio: Some(audio), ..Default::default() }),
    GeminiMode::Text => gemini.generate_text(&body.prompt).await.map(|text| GeminiOut { text: Some(text), ..Default::default() }),
  };
  match result {
    Ok(out) => {
      info!(target: "narration", mode = ?body.mode, "Gemini proxy served");
      Json(out).into_response()
    }
    Err(e) => {
      error!(target: "narration", mode = ?body.mode, error = %e, "Gemini proxy failed");
      error_response(StatusCode::BAD_GATEWAY, e)
    }
  }
}

#[instrument(level = "info", skip(state), fields(success = q.success))]
pub async fn http_get_encouragement(
  State(state): State<Arc<AppState>>,
  Query(q): Query<EncouragementQuery>,
) -> impl IntoResponse {
  let text = encouragement(&state, q.success).await;
  Json(EncouragementOut { text })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_speech(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SpeechIn>,
) -> impl IntoResponse {
  let audio = speech(&state, &body.text).await;
  info!(target: "narration", has_audio = audio.is_some(), "HTTP speech served");
  Json(SpeechOut { audio })
}
