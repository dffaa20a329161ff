//! Application state shared by every handler: game configuration and the optional
//! Gemini client. Game sessions themselves are owned by their WebSocket task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_game_config_from_env, GameConfig};
use crate::domain::Difficulty;
use crate::gemini::Gemini;

pub struct AppState {
    pub config: Arc<GameConfig>,
    pub gemini: Option<Gemini>,
    active_sessions: AtomicUsize,
}

impl AppState {
    /// Build state from env: load config, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_game_config_from_env().unwrap_or_default();
        for difficulty in Difficulty::ALL {
            info!(target: "phepcong_backend", %difficulty, max_sum = config.max_sum(difficulty), "Difficulty range");
        }
        info!(
            target: "phepcong_backend",
            question_variants = config.question_variants,
            themes = config.themes.len(),
            teaching_step_ms = config.timing.teaching_step_ms,
            "Game rules"
        );

        let gemini = Gemini::from_env();
        if let Some(g) = &gemini {
            info!(target: "phepcong_backend", base_url = %g.base_url, text_model = %g.text_model, tts_model = %g.tts_model, voice = %g.voice, "Gemini enabled.");
        } else {
            info!(target: "phepcong_backend", "Gemini disabled (no GEMINI_API_KEY). Using local phrases and on-device speech.");
        }

        Self::with_parts(config, gemini)
    }

    pub fn with_parts(config: GameConfig, gemini: Option<Gemini>) -> Self {
        Self { config: Arc::new(config), gemini, active_sessions: AtomicUsize::new(0) }
    }

    /// Register a new game session; returns the number of live sessions.
    pub fn session_opened(&self) -> usize {
        self.active_sessions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn session_closed(&self) -> usize {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }
}
