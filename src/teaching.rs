//! Counting walkthrough shown after repeated wrong answers.
//!
//! The sequencer only keeps the position and a token; waiting between steps is the
//! caller's job. Every scheduled step carries the token it was scheduled with, and
//! `advance` ignores tokens that are no longer current, so a cancelled or restarted
//! sequence never produces late highlights.

use serde::Serialize;

use crate::domain::Problem;

/// Identity of a scheduled callback. Strictly increasing per issuer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Token(u64);

impl Token {
  pub fn next(self) -> Token {
    Token(self.0 + 1)
  }
}

/// What the current step asks the session to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeachingStep {
  /// Highlight unit `index` (0-based) and count `index + 1` aloud.
  Highlight { index: u32 },
  /// All units have been counted.
  Finished,
}

#[derive(Debug)]
struct Active {
  token: Token,
  total: u32,
  next: u32,
}

#[derive(Debug, Default)]
pub struct TeachingSequencer {
  last_token: Token,
  active: Option<Active>,
}

impl TeachingSequencer {
  /// Begin counting up to `addend1 + addend2`, replacing any running sequence.
  /// The full sum is counted whichever quantity the problem hides.
  pub fn start(&mut self, problem: &Problem) -> Token {
    self.cancel();
    let token = self.last_token;
    self.active = Some(Active { token, total: problem.addend1 + problem.addend2, next: 0 });
    token
  }

  /// Invalidate the running sequence, if any.
  pub fn cancel(&mut self) {
    self.active = None;
    self.last_token = self.last_token.next();
  }

  pub fn is_active(&self) -> bool {
    self.active.is_some()
  }

  /// Run one step of the sequence scheduled with `token`. Stale tokens yield `None`.
  pub fn advance(&mut self, token: Token) -> Option<TeachingStep> {
    let active = self.active.as_mut().filter(|a| a.token == token)?;
    if active.next < active.total {
      let index = active.next;
      active.next += 1;
      return Some(TeachingStep::Highlight { index });
    }
    self.active = None;
    self.last_token = self.last_token.next();
    Some(TeachingStep::Finished)
  }
}
