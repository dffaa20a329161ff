//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent`, either for a short text reply or for
//! speech (AUDIO modality, prebuilt voice). Calls are instrumented and log model names,
//! latencies and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub tts_model: String,
  pub voice: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let text_model = std::env::var("GEMINI_TEXT_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into());
    let tts_model =
      std::env::var("GEMINI_TTS_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".into());
    let voice = std::env::var("GEMINI_VOICE").unwrap_or_else(|_| "Kore".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, text_model, tts_model, voice })
  }

  async fn generate(&self, model: &str, req: &GenerateRequest) -> Result<GenerateResponse, String> {
    let url = format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), model);
    let res = self.client.post(&url)
      .header(USER_AGENT, "phepcong-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(format!("Gemini HTTP {}: {}", status, msg));
    }

    let body: GenerateResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    Ok(body)
  }

  /// Plain text completion for a single prompt. Used for encouragement phrases.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.text_model, prompt_len = prompt.len()))]
  pub async fn generate_text(&self, prompt: &str) -> Result<String, String> {
    let start = std::time::Instant::now();
    let req = GenerateRequest::text(prompt);
    let result = self.generate(&self.text_model, &req).await;
    let elapsed = start.elapsed();
    match result {
      Ok(body) => {
        let text = body.first_text().unwrap_or_default().trim().to_string();
        info!(?elapsed, text_len = text.len(), "Gemini text received");
        Ok(text)
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Gemini text call failed");
        Err(e)
      }
    }
  }

  /// Speech synthesis. Returns Gemini's base64 PCM (16-bit LE, mono, 24 kHz).
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.tts_model, voice = %self.voice, prompt_len = prompt.len()))]
  pub async fn synthesize_speech(&self, prompt: &str) -> Result<String, String> {
    let start = std::time::Instant::now();
    let req = GenerateRequest::speech(prompt, &self.voice);
    let result = self.generate(&self.tts_model, &req).await;
    let elapsed = start.elapsed();
    match result {
      Ok(body) => match body.first_audio() {
        Some(audio) => {
          info!(?elapsed, audio_b64_len = audio.len(), "Gemini audio received");
          Ok(audio)
        }
        None => Err("Gemini returned no audio".into()),
      },
      Err(e) => {
        error!(?elapsed, error = %e, "Gemini speech call failed");
        Err(e)
      }
    }
  }
}

// --- generateContent DTOs ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  contents: Vec<ContentReq>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
  fn text(prompt: &str) -> Self {
    Self { contents: vec![ContentReq::user(prompt)], generation_config: None }
  }

  fn speech(prompt: &str, voice: &str) -> Self {
    Self {
      contents: vec![ContentReq::user(prompt)],
      generation_config: Some(GenerationConfig {
        response_modalities: vec!["AUDIO".into()],
        speech_config: SpeechConfig {
          voice_config: VoiceConfig { prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice.into() } },
        },
      }),
    }
  }
}

#[derive(Serialize, Debug)]
struct ContentReq { parts: Vec<PartReq> }
impl ContentReq {
  fn user(text: &str) -> Self { Self { parts: vec![PartReq { text: text.into() }] } }
}
#[derive(Serialize, Debug)]
struct PartReq { text: String }

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_modalities: Vec<String>,
  speech_config: SpeechConfig,
}
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig { voice_config: VoiceConfig }
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig { prebuilt_voice_config: PrebuiltVoiceConfig }
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig { voice_name: String }

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
  fn parts(&self) -> impl Iterator<Item = &PartResp> {
    self.candidates.first().and_then(|c| c.content.as_ref()).into_iter().flat_map(|c| c.parts.iter())
  }

  /// Concatenated text parts of the first candidate.
  fn first_text(&self) -> Option<String> {
    let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
    if text.is_empty() { None } else { Some(text) }
  }

  fn first_audio(&self) -> Option<String> {
    self.parts().find_map(|p| p.inline_data.as_ref()).map(|d| d.data.clone()).filter(|d| !d.is_empty())
  }
}

#[derive(Deserialize, Debug)]
struct Candidate { #[serde(default)] content: Option<ContentResp> }
#[derive(Deserialize, Debug)]
struct ContentResp { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PartResp {
  #[serde(default)] text: Option<String>,
  #[serde(default)] inline_data: Option<InlineData>,
}
#[derive(Deserialize, Debug)]
struct InlineData { data: String }
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn speech_request_shape_matches_gemini_api() {
    let v = serde_json::to_value(GenerateRequest::speech("Xin chào", "Kore")).unwrap();
    assert_eq!(
      v,
      json!({
        "contents": [{ "parts": [{ "text": "Xin chào" }] }],
        "generationConfig": {
          "responseModalities": ["AUDIO"],
          "speechConfig": { "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } } }
        }
      })
    );
    let text = serde_json::to_value(GenerateRequest::text("hi")).unwrap();
    assert!(text.get("generationConfig").is_none());
  }

  #[test]
  fn parses_text_and_audio_candidates() {
    let text: GenerateResponse = serde_json::from_value(json!({
      "candidates": [{ "content": { "parts": [{ "text": "Giỏi " }, { "text": "quá!" }], "role": "model" } }],
      "usageMetadata": { "promptTokenCount": 12, "totalTokenCount": 20 }
    }))
    .unwrap();
    assert_eq!(text.first_text().as_deref(), Some("Giỏi quá!"));
    assert!(text.first_audio().is_none());

    let audio: GenerateResponse = serde_json::from_value(json!({
      "candidates": [{ "content": { "parts": [{ "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAAA" } }] } }]
    }))
    .unwrap();
    assert_eq!(audio.first_audio().as_deref(), Some("AAAA"));
    assert!(audio.first_text().is_none());
  }

  #[test]
  fn empty_response_has_nothing() {
    let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
    assert!(empty.first_text().is_none());
    assert!(empty.first_audio().is_none());
  }

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
    assert_eq!(extract_gemini_error(body).as_deref(), Some("API key not valid."));
    assert!(extract_gemini_error("<html>").is_none());
  }
}
