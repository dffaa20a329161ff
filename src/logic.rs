//! Narration behaviors shared by HTTP handlers and the session narrator.
//!
//! Both calls always produce something usable: when Gemini is missing or fails we
//! return the local phrase (encouragement) or `None` (speech), which tells the
//! browser to fall back to on-device speech synthesis.

use tracing::{debug, error, instrument};

use crate::audio::gemini_pcm_base64_to_wav_base64;
use crate::state::AppState;
use crate::util::fill_template;

/// Short encouraging phrase for a correct (`success`) or wrong answer.
#[instrument(level = "info", skip(state))]
pub async fn encouragement(state: &AppState, success: bool) -> String {
  let phrases = &state.config.phrases;
  let Some(gemini) = &state.gemini else {
    return fallback_encouragement(state, success);
  };

  let prompt = if success {
    &state.config.prompts.encouragement_success
  } else {
    &state.config.prompts.encouragement_failure
  };
  match gemini.generate_text(prompt).await {
    Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
    Ok(_) => {
      debug!(target: "narration", success, "Empty encouragement; using short phrase");
      if success { phrases.success_short.clone() } else { phrases.failure_short.clone() }
    }
    Err(e) => {
      error!(target: "narration", error = %e, "Gemini encouragement failed; using local phrase.");
      fallback_encouragement(state, success)
    }
  }
}

pub fn fallback_encouragement(state: &AppState, success: bool) -> String {
  let phrases = &state.config.phrases;
  if success { phrases.success_fallback.clone() } else { phrases.failure_fallback.clone() }
}

/// Spoken rendition of `text` as a base64 WAV, or `None` for on-device speech.
#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn speech(state: &AppState, text: &str) -> Option<String> {
  let text = text.trim();
  if text.is_empty() {
    return None;
  }
  let gemini = state.gemini.as_ref()?;
  let prompt = fill_template(&state.config.prompts.speech_template, &[("text", text)]);
  match gemini.synthesize_speech(&prompt).await {
    Ok(pcm) => match gemini_pcm_base64_to_wav_base64(&pcm) {
      Ok(wav) => Some(wav),
      Err(e) => {
        error!(target: "narration", error = %e, "Unusable Gemini audio; falling back to on-device speech.");
        None
      }
    },
    Err(e) => {
      error!(target: "narration", error = %e, "Gemini speech failed; falling back to on-device speech.");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GameConfig;

  fn offline() -> AppState {
    AppState::with_parts(GameConfig::default(), None)
  }

  #[tokio::test]
  async fn offline_encouragement_uses_local_phrases() {
    let state = offline();
    assert_eq!(encouragement(&state, true).await, state.config.phrases.success_fallback);
    assert_eq!(encouragement(&state, false).await, state.config.phrases.failure_fallback);
  }

  #[tokio::test]
  async fn offline_speech_defers_to_the_device() {
    let state = offline();
    assert_eq!(speech(&state, "1").await, None);
    assert_eq!(speech(&state, "   ").await, None);
  }
}
