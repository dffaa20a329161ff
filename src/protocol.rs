//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::Difficulty;
use crate::session::SessionSnapshot;

/// Input events the presentation layer forwards over WebSocket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetState,
    StartGame,
    SelectAnswer {
        value: u32,
    },
    CheckAnswer,
    SetDifficulty {
        difficulty: Difficulty,
    },
    ContinueAfterSuccess,
    AdvanceLevel,
    GoHome,
}

/// Messages the server pushes over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    State {
        state: SessionSnapshot,
    },
    /// `audio` is a base64 WAV; `null` asks the browser to use its own speech synthesis.
    Speak {
        text: String,
        audio: Option<String>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

/// Body of the Gemini proxy endpoint.
#[derive(Debug, Deserialize)]
pub struct GeminiIn {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub mode: GeminiMode,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum GeminiMode {
    #[default]
    Text,
    Tts,
}

#[derive(Debug, Serialize, Default)]
pub struct GeminiOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct EncouragementQuery {
    #[serde(default)]
    pub success: bool,
}
#[derive(Debug, Serialize)]
pub struct EncouragementOut {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechIn {
    pub text: String,
}
#[derive(Debug, Serialize)]
pub struct SpeechOut {
    pub audio: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub gemini: bool,
    pub sessions: usize,
}
