//! Loading game configuration (difficulty ranges, timings, phrases, prompts, themes) from TOML.
//!
//! Every section is optional; see `GameConfig` for the schema. Example:
//!
//! ```toml
//! question_variants = false
//!
//! [ranges]
//! easy = 5
//! moderate = 8
//! hard = 10
//!
//! [timing]
//! teaching_step_ms = 800
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Difficulty, Theme};
use crate::seeds::seed_themes;

#[derive(Clone, Debug, Deserialize)]
pub struct GameConfig {
  /// When false every problem asks for the sum.
  #[serde(default = "default_true")]
  pub question_variants: bool,
  #[serde(default)]
  pub ranges: DifficultyRanges,
  #[serde(default)]
  pub timing: Timing,
  #[serde(default)]
  pub phrases: Phrases,
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub themes: Vec<Theme>,
}

fn default_true() -> bool { true }

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      question_variants: true,
      ranges: DifficultyRanges::default(),
      timing: Timing::default(),
      phrases: Phrases::default(),
      prompts: Prompts::default(),
      themes: seed_themes(),
    }
  }
}

impl GameConfig {
  /// Parse a TOML document and repair anything unusable: an invalid range table
  /// is replaced by the default one and an empty theme list by the built-in themes.
  pub fn from_toml_str(s: &str) -> Result<Self, String> {
    let mut cfg = toml::from_str::<GameConfig>(s).map_err(|e| e.to_string())?;
    if let Err(e) = cfg.ranges.validate() {
      warn!(target: "phepcong_backend", error = %e, "Invalid difficulty ranges; using defaults");
      cfg.ranges = DifficultyRanges::default();
    }
    if cfg.themes.is_empty() {
      cfg.themes = seed_themes();
    }
    Ok(cfg)
  }

  pub fn max_sum(&self, difficulty: Difficulty) -> u32 {
    self.ranges.max_sum(difficulty)
  }
}

/// Maximum sum per difficulty. Must strictly increase and start at 2 or more.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct DifficultyRanges {
  pub easy: u32,
  pub moderate: u32,
  pub hard: u32,
}

impl Default for DifficultyRanges {
  fn default() -> Self {
    Self { easy: 5, moderate: 10, hard: 20 }
  }
}

impl DifficultyRanges {
  pub fn max_sum(&self, difficulty: Difficulty) -> u32 {
    match difficulty {
      Difficulty::Easy => self.easy,
      Difficulty::Moderate => self.moderate,
      Difficulty::Hard => self.hard,
    }
  }

  pub fn validate(&self) -> Result<(), String> {
    if self.easy < 2 {
      return Err(format!("easy range must be at least 2, got {}", self.easy));
    }
    if !(self.easy < self.moderate && self.moderate < self.hard) {
      return Err(format!(
        "ranges must strictly increase, got easy={} moderate={} hard={}",
        self.easy, self.moderate, self.hard
      ));
    }
    Ok(())
  }
}

/// Delays for the session's scheduled callbacks, in milliseconds.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
  pub merge_delay_ms: u64,
  pub teaching_intro_ms: u64,
  pub teaching_step_ms: u64,
  pub level_up_delay_ms: u64,
}

impl Default for Timing {
  fn default() -> Self {
    Self { merge_delay_ms: 1500, teaching_intro_ms: 1000, teaching_step_ms: 1500, level_up_delay_ms: 3000 }
  }
}

impl Timing {
  pub fn merge_delay(&self) -> Duration { Duration::from_millis(self.merge_delay_ms) }
  pub fn teaching_intro(&self) -> Duration { Duration::from_millis(self.teaching_intro_ms) }
  pub fn teaching_step(&self) -> Duration { Duration::from_millis(self.teaching_step_ms) }
  pub fn level_up_delay(&self) -> Duration { Duration::from_millis(self.level_up_delay_ms) }
}

/// Everything the assistant says that is not generated remotely.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Phrases {
  pub greeting: String,
  pub welcome: String,
  pub teaching_intro: String,
  pub teaching_outro: String,
  pub level_up_suggestion: String,
  /// `{encouragement}` and `{equation}` are substituted.
  pub success_feedback_template: String,
  // Used when the remote reply is empty.
  pub success_short: String,
  pub failure_short: String,
  // Used when the remote call fails or is not configured.
  pub success_fallback: String,
  pub failure_fallback: String,
}

impl Default for Phrases {
  fn default() -> Self {
    Self {
      greeting: "Chào bé! Tớ là người bạn toán học của cậu!".into(),
      welcome: "Chào mừng bé đến với trò chơi Em học phép cộng! Cùng chơi nhé!".into(),
      teaching_intro: "Đừng lo, cùng đếm với tớ nào!".into(),
      teaching_outro: "Vậy tất cả có bao nhiêu nhỉ? Bé chọn đáp án nhé!".into(),
      level_up_suggestion: "Bé đã làm đúng 3 câu liên tiếp rồi! Mình thử mức độ khó hơn nhé?".into(),
      success_feedback_template: "{encouragement}. {equation}, quá chính xác!".into(),
      success_short: "Giỏi quá!".into(),
      failure_short: "Cố lên con nhé!".into(),
      success_fallback: "Con thật là tuyệt vời!".into(),
      failure_fallback: "Đừng buồn, cùng đếm lại nhé!".into(),
    }
  }
}

/// Prompts sent to Gemini. Override in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub encouragement_success: String,
  pub encouragement_failure: String,
  /// `{text}` is substituted with the line to speak.
  pub speech_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      encouragement_success: "Tạo một câu khen ngợi ngắn gọn, vui vẻ cho bé vừa làm đúng phép tính cộng (dưới 10 chữ).".into(),
      encouragement_failure: "Tạo một câu động viên nhẹ nhàng cho bé khi làm sai phép tính, bảo bé thử lại hoặc cùng đếm (dưới 10 chữ).".into(),
      speech_template: "Say in a warm, encouraging, child-friendly Vietnamese voice: {text}".into(),
    }
  }
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match GameConfig::from_toml_str(&s) {
      Ok(cfg) => {
        info!(target: "phepcong_backend", %path, "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "phepcong_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "phepcong_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_yields_defaults() {
    let cfg = GameConfig::from_toml_str("").unwrap();
    assert!(cfg.question_variants);
    assert_eq!(cfg.ranges, DifficultyRanges::default());
    assert_eq!(cfg.timing.teaching_step_ms, 1500);
    assert_eq!(cfg.themes.len(), seed_themes().len());
  }

  #[test]
  fn alternative_range_table_and_partial_timing() {
    let cfg = GameConfig::from_toml_str(
      r#"
      question_variants = false
      [ranges]
      easy = 5
      moderate = 8
      hard = 10
      [timing]
      teaching_step_ms = 800
      "#,
    )
    .unwrap();
    assert!(!cfg.question_variants);
    assert_eq!(cfg.max_sum(Difficulty::Moderate), 8);
    assert_eq!(cfg.max_sum(Difficulty::Hard), 10);
    assert_eq!(cfg.timing.teaching_step(), Duration::from_millis(800));
    assert_eq!(cfg.timing.teaching_intro_ms, 1000);
  }

  #[test]
  fn non_increasing_ranges_fall_back_to_default() {
    let cfg = GameConfig::from_toml_str("[ranges]\neasy = 10\nmoderate = 8\nhard = 20\n").unwrap();
    assert_eq!(cfg.ranges, DifficultyRanges::default());
  }

  #[test]
  fn range_validation_rejects_tiny_easy() {
    let r = DifficultyRanges { easy: 1, moderate: 4, hard: 9 };
    assert!(r.validate().is_err());
    assert!(DifficultyRanges::default().validate().is_ok());
  }

  #[test]
  fn custom_themes_replace_builtins() {
    let cfg = GameConfig::from_toml_str(
      r#"
      [[themes]]
      id = "space"
      name = "Vũ trụ"
      background = "bg-black"
      emoji = "🚀"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.themes.len(), 1);
    assert_eq!(cfg.themes[0].emoji, "🚀");
  }

  #[test]
  fn malformed_toml_is_an_error() {
    assert!(GameConfig::from_toml_str("ranges = [").is_err());
  }
}
