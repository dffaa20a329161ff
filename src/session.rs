//! Game session state machine: Idle / Playing / Teaching / Success.
//!
//! A `GameSession` is owned by exactly one driver (see `runtime.rs`). Every input
//! method mutates the state synchronously and returns the `Effect`s the outside
//! world should carry out: narration, encouragement requests and delayed callbacks.
//! Delayed callbacks come back through `on_timer`; remote encouragement comes back
//! through `on_encouragement`. Both are checked against the token that was current
//! when they were issued and are dropped when stale. Spoken lines carry the round
//! token too, so narration that outlives its round is never played.
//!
//! Invalid inputs (checking with nothing selected, selecting while teaching, ...)
//! are ignored and produce no effects.

use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::GameConfig;
use crate::domain::{Difficulty, OptionSet, Phase, Problem};
use crate::generator::{generate_options, generate_problem, search_range};
use crate::teaching::{TeachingSequencer, TeachingStep, Token};
use crate::util::fill_template;

/// Consecutive correct answers before a harder level is offered.
pub const STREAK_FOR_LEVEL_UP: u32 = 3;
/// Wrong answers in one round before the counting walkthrough starts.
pub const WRONG_ATTEMPTS_FOR_TEACHING: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
  /// The two groups slide together on screen.
  Merge,
  TeachingStep,
  LevelUpSuggestion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
  pub kind: TimerKind,
  pub token: Token,
}

/// One line of narration, tied to the round it was spoken in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
  pub text: String,
  pub round: Token,
  /// Count-aloud numbers and echoed picks: worthless once a later line is ready.
  pub transient: bool,
}

/// Side effects requested by a transition. None of them gate the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
  /// Say this line out loud (fire-and-forget). Dropped if its round has ended.
  Speak(Line),
  /// Fetch an encouragement phrase and hand it back via `on_encouragement(token, ..)`.
  Encourage { success: bool, token: Token },
  /// Call `on_timer(timer)` after `after`.
  Schedule { timer: Timer, after: Duration },
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionState {
  pub difficulty: Difficulty,
  pub problem: Option<Problem>,
  pub options: Option<OptionSet>,
  pub selected_answer: Option<u32>,
  pub phase: Phase,
  pub wrong_attempts: u32,
  pub correct_streak: u32,
  pub highlight_index: Option<u32>,
  pub assistant_message: String,
  pub merged: bool,
}

/// What the presentation layer renders.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
  #[serde(flatten)]
  pub state: SessionState,
  pub can_advance: bool,
  pub max_sum: u32,
}

pub struct GameSession {
  config: Arc<GameConfig>,
  rng: StdRng,
  state: SessionState,
  teaching: TeachingSequencer,
  round: Token,
  feedback: Token,
}

impl GameSession {
  /// New idle session. `seed` makes problem generation reproducible.
  pub fn new(config: Arc<GameConfig>, seed: Option<u64>) -> Self {
    let rng = match seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let state = SessionState { assistant_message: config.phrases.greeting.clone(), ..SessionState::default() };
    Self { config, rng, state, teaching: TeachingSequencer::default(), round: Token::default(), feedback: Token::default() }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    SessionSnapshot {
      state: self.state.clone(),
      can_advance: self.can_advance(),
      max_sum: self.config.max_sum(self.state.difficulty),
    }
  }

  /// Whether "advance level" is currently on offer.
  pub fn can_advance(&self) -> bool {
    self.state.phase == Phase::Success
      && self.state.correct_streak >= STREAK_FOR_LEVEL_UP
      && !self.state.difficulty.is_hardest()
  }

  // ---- presentation inputs ----

  #[instrument(level = "debug", skip(self))]
  pub fn start_game(&mut self) -> Vec<Effect> {
    if self.state.phase != Phase::Idle {
      debug!(target: "game", phase = ?self.state.phase, "start_game ignored outside idle");
      return vec![];
    }
    let round = self.start_round();
    let mut effects = vec![self.say(self.config.phrases.welcome.clone())];
    effects.extend(round);
    effects
  }

  #[instrument(level = "debug", skip(self))]
  pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Vec<Effect> {
    info!(target: "game", from = %self.state.difficulty, to = %difficulty, "Difficulty changed");
    self.state.difficulty = difficulty;
    self.start_round()
  }

  #[instrument(level = "debug", skip(self))]
  pub fn select_answer(&mut self, value: u32) -> Vec<Effect> {
    if self.state.phase != Phase::Playing || self.state.problem.is_none() {
      debug!(target: "game", phase = ?self.state.phase, value, "select_answer ignored");
      return vec![];
    }
    if !self.state.options.is_some_and(|o| o.contains(value)) {
      debug!(target: "game", value, "Selected value is not one of the offered options");
    }
    self.state.selected_answer = Some(value);
    vec![self.cue(value.to_string())]
  }

  #[instrument(level = "debug", skip(self))]
  pub fn check_answer(&mut self) -> Vec<Effect> {
    if self.state.phase != Phase::Playing {
      debug!(target: "game", phase = ?self.state.phase, "check_answer ignored outside playing");
      return vec![];
    }
    let (Some(problem), Some(answer)) = (self.state.problem.as_ref(), self.state.selected_answer) else {
      debug!(target: "game", "check_answer ignored without problem or selection");
      return vec![];
    };
    let correct = problem.is_correct(answer);
    self.feedback = self.feedback.next();

    if correct {
      self.state.phase = Phase::Success;
      self.state.correct_streak += 1;
      self.state.wrong_attempts = 0;
      info!(target: "game", answer, streak = self.state.correct_streak, "Correct answer");

      let mut effects = vec![Effect::Encourage { success: true, token: self.feedback }];
      if self.state.correct_streak >= STREAK_FOR_LEVEL_UP && !self.state.difficulty.is_hardest() {
        effects.push(Effect::Schedule {
          timer: Timer { kind: TimerKind::LevelUpSuggestion, token: self.round },
          after: self.config.timing.level_up_delay(),
        });
      }
      return effects;
    }

    self.state.wrong_attempts += 1;
    self.state.correct_streak = 0;
    self.state.selected_answer = None;
    info!(target: "game", answer, wrong_attempts = self.state.wrong_attempts, "Wrong answer");

    let mut effects = vec![Effect::Encourage { success: false, token: self.feedback }];
    if self.state.wrong_attempts >= WRONG_ATTEMPTS_FOR_TEACHING {
      effects.extend(self.start_teaching());
    }
    effects
  }

  #[instrument(level = "debug", skip(self))]
  pub fn continue_after_success(&mut self) -> Vec<Effect> {
    if self.state.phase != Phase::Success {
      debug!(target: "game", phase = ?self.state.phase, "continue ignored outside success");
      return vec![];
    }
    self.start_round()
  }

  #[instrument(level = "debug", skip(self))]
  pub fn advance_level(&mut self) -> Vec<Effect> {
    if !self.can_advance() {
      debug!(target: "game", phase = ?self.state.phase, streak = self.state.correct_streak, "advance_level not offered");
      return vec![];
    }
    let next = self.state.difficulty.next();
    info!(target: "game", from = %self.state.difficulty, to = %next, "Level up");
    self.state.difficulty = next;
    self.state.correct_streak = 0;
    self.start_round()
  }

  /// Back to the welcome screen. Difficulty and streak are kept.
  #[instrument(level = "debug", skip(self))]
  pub fn go_home(&mut self) -> Vec<Effect> {
    if self.teaching.is_active() {
      info!(target: "game", "Teaching abandoned");
    }
    self.teaching.cancel();
    self.round = self.round.next();
    self.feedback = self.feedback.next();
    self.state.phase = Phase::Idle;
    self.state.selected_answer = None;
    self.state.highlight_index = None;
    self.state.assistant_message = self.config.phrases.greeting.clone();
    vec![]
  }

  // ---- callbacks ----

  /// Apply a delayed callback. `None` when the timer is stale.
  pub fn on_timer(&mut self, timer: Timer) -> Option<Vec<Effect>> {
    match timer.kind {
      TimerKind::Merge => {
        if timer.token != self.round || self.state.phase == Phase::Idle {
          return None;
        }
        self.state.merged = true;
        Some(vec![])
      }
      TimerKind::LevelUpSuggestion => {
        if timer.token != self.round || !self.can_advance() {
          return None;
        }
        let line = self.config.phrases.level_up_suggestion.clone();
        self.state.assistant_message = line.clone();
        Some(vec![self.say(line)])
      }
      TimerKind::TeachingStep => {
        if self.state.phase != Phase::Teaching {
          return None;
        }
        match self.teaching.advance(timer.token)? {
          TeachingStep::Highlight { index } => {
            self.state.highlight_index = Some(index);
            Some(vec![
              self.cue((index + 1).to_string()),
              Effect::Schedule { timer, after: self.config.timing.teaching_step() },
            ])
          }
          TeachingStep::Finished => {
            info!(target: "game", "Teaching finished");
            self.state.highlight_index = None;
            self.state.selected_answer = None;
            self.state.phase = Phase::Playing;
            let line = self.config.phrases.teaching_outro.clone();
            self.state.assistant_message = line.clone();
            Some(vec![self.say(line)])
          }
        }
      }
    }
  }

  /// Show an encouragement phrase fetched for the check identified by `token`.
  /// `None` when another check, round or phase change happened in between.
  pub fn on_encouragement(&mut self, token: Token, success: bool, text: &str) -> Option<Vec<Effect>> {
    if token != self.feedback {
      debug!(target: "game", "Dropping stale encouragement");
      return None;
    }
    let message = if success {
      let equation = self.state.problem.as_ref().map(Problem::equation).unwrap_or_default();
      fill_template(
        &self.config.phrases.success_feedback_template,
        &[("encouragement", text.trim_end_matches(&['.', '!'][..])), ("equation", equation.as_str())],
      )
    } else {
      text.to_string()
    };
    self.state.assistant_message = message.clone();
    Some(vec![self.say(message)])
  }

  /// Whether narration tagged with `round` still belongs to the current round.
  pub fn is_current(&self, round: Token) -> bool {
    round == self.round
  }

  // ---- internals ----

  fn say(&self, text: String) -> Effect {
    Effect::Speak(Line { text, round: self.round, transient: false })
  }

  fn cue(&self, text: String) -> Effect {
    Effect::Speak(Line { text, round: self.round, transient: true })
  }

  fn start_round(&mut self) -> Vec<Effect> {
    let problem = generate_problem(
      &mut self.rng,
      self.config.max_sum(self.state.difficulty),
      &self.config.themes,
      self.config.question_variants,
    );
    self.begin_round(problem)
  }

  /// Round-start action for an already generated problem.
  pub(crate) fn begin_round(&mut self, problem: Problem) -> Vec<Effect> {
    self.teaching.cancel();
    self.round = self.round.next();
    self.feedback = self.feedback.next();

    let range = search_range(self.config.max_sum(self.state.difficulty));
    let options = generate_options(&mut self.rng, problem.target(), range);
    let prompt = problem.prompt();
    info!(
      target: "game",
      difficulty = %self.state.difficulty,
      addend1 = problem.addend1,
      addend2 = problem.addend2,
      variant = ?problem.variant,
      theme = %problem.theme.id,
      options = ?options.values(),
      "New round"
    );

    self.state.problem = Some(problem);
    self.state.options = Some(options);
    self.state.selected_answer = None;
    self.state.highlight_index = None;
    self.state.wrong_attempts = 0;
    self.state.phase = Phase::Playing;
    self.state.merged = false;
    self.state.assistant_message = prompt.clone();

    vec![
      self.say(prompt),
      Effect::Schedule {
        timer: Timer { kind: TimerKind::Merge, token: self.round },
        after: self.config.timing.merge_delay(),
      },
    ]
  }

  fn start_teaching(&mut self) -> Vec<Effect> {
    let Some(problem) = self.state.problem.as_ref() else {
      return vec![];
    };
    let token = self.teaching.start(problem);
    info!(target: "game", total = problem.sum, "Teaching started");

    self.state.phase = Phase::Teaching;
    self.state.highlight_index = None;
    self.state.selected_answer = None;
    let line = self.config.phrases.teaching_intro.clone();
    self.state.assistant_message = line.clone();

    vec![
      self.say(line),
      Effect::Schedule {
        timer: Timer { kind: TimerKind::TeachingStep, token },
        after: self.config.timing.teaching_intro(),
      },
    ]
  }
}
