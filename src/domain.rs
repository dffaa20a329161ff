//! Domain models for the addition game: difficulty, themes, question variants,
//! problems, option sets and the session phase tag.

use serde::{Deserialize, Serialize};

/// Difficulty levels, ordered from easiest to hardest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Easy,
  Moderate,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Moderate, Difficulty::Hard];

  /// One step up, saturating at `Hard`.
  pub fn next(self) -> Difficulty {
    match self {
      Difficulty::Easy => Difficulty::Moderate,
      Difficulty::Moderate | Difficulty::Hard => Difficulty::Hard,
    }
  }

  pub fn is_hardest(self) -> bool {
    self == Difficulty::Hard
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Moderate => "moderate",
      Difficulty::Hard => "hard",
    }
  }
}

impl std::fmt::Display for Difficulty {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Cosmetic descriptor used by the frontend to dress a problem.
/// Carries no game logic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
  pub id: String,
  pub name: String,
  pub background: String,
  pub emoji: String,
  #[serde(default)] pub accent: String,
  #[serde(default)] pub box_background: String,
  #[serde(default)] pub box_border: String,
  #[serde(default)] pub text_color: String,
}

/// Which of the three quantities in `a + b = s` is hidden.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionVariant {
  #[default]
  FindSum,
  FindAddend1,
  FindAddend2,
}

impl QuestionVariant {
  pub const ALL: [QuestionVariant; 3] =
    [QuestionVariant::FindSum, QuestionVariant::FindAddend1, QuestionVariant::FindAddend2];
}

/// One addition fact. Built by the generator, never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
  pub addend1: u32,
  pub addend2: u32,
  pub sum: u32,
  pub theme: Theme,
  pub variant: QuestionVariant,
}

impl Problem {
  /// Build a problem from its two addends. Both must be at least 1.
  pub fn new(addend1: u32, addend2: u32, theme: Theme, variant: QuestionVariant) -> Self {
    Self { addend1, addend2, sum: addend1 + addend2, theme, variant }
  }

  /// The value the player has to supply.
  pub fn target(&self) -> u32 {
    match self.variant {
      QuestionVariant::FindSum => self.sum,
      QuestionVariant::FindAddend1 => self.addend1,
      QuestionVariant::FindAddend2 => self.addend2,
    }
  }

  pub fn is_correct(&self, answer: u32) -> bool {
    answer == self.target()
  }

  /// Spoken question for this problem, e.g. "2 cộng mấy bằng 3?".
  pub fn prompt(&self) -> String {
    match self.variant {
      QuestionVariant::FindSum => format!("{} cộng {} bằng mấy?", self.addend1, self.addend2),
      QuestionVariant::FindAddend1 => format!("Mấy cộng {} bằng {}?", self.addend2, self.sum),
      QuestionVariant::FindAddend2 => format!("{} cộng mấy bằng {}?", self.addend1, self.sum),
    }
  }

  /// The full equation, always spelled out from left to right.
  pub fn equation(&self) -> String {
    format!("{} cộng {} bằng {}", self.addend1, self.addend2, self.sum)
  }
}

/// Exactly three distinct candidate answers. Order carries no meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionSet([u32; 3]);

impl OptionSet {
  pub(crate) fn new(values: [u32; 3]) -> Self {
    Self(values)
  }

  pub fn values(&self) -> &[u32; 3] {
    &self.0
  }

  pub fn contains(&self, value: u32) -> bool {
    self.0.contains(&value)
  }
}

/// State-machine tag of a game session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  #[default]
  Idle,
  Playing,
  Teaching,
  Success,
}
