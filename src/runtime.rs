//! Drives one `GameSession`: turns its `Effect`s into tokio timers and narration
//! requests, and feeds timer firings and narration results back into it.
//!
//! The runtime lives on a single task (the WebSocket handler), so the session is only
//! ever touched from one place. Timers are plain sleeps posting back on a channel;
//! the session decides whether a firing is still current.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::narrator::{NarrationEvent, Narrator};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{Effect, GameSession, Timer};
use crate::state::AppState;

pub struct SessionRuntime {
  session: GameSession,
  narrator: Narrator,
  narration_rx: mpsc::UnboundedReceiver<NarrationEvent>,
  timer_tx: mpsc::UnboundedSender<Timer>,
  timer_rx: mpsc::UnboundedReceiver<Timer>,
}

impl SessionRuntime {
  pub fn new(state: Arc<AppState>, seed: Option<u64>) -> Self {
    let session = GameSession::new(state.config.clone(), seed);
    let (narrator, narration_rx) = Narrator::spawn(state);
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    Self { session, narrator, narration_rx, timer_tx, timer_rx }
  }

  pub fn state_message(&self) -> ServerWsMessage {
    ServerWsMessage::State { state: self.session.snapshot() }
  }

  /// Apply one presentation event and return the reply to send.
  #[instrument(level = "debug", skip(self))]
  pub fn handle(&mut self, msg: ClientWsMessage) -> ServerWsMessage {
    let effects = match msg {
      ClientWsMessage::Ping => return ServerWsMessage::Pong,
      ClientWsMessage::GetState => return self.state_message(),
      ClientWsMessage::StartGame => self.session.start_game(),
      ClientWsMessage::SelectAnswer { value } => self.session.select_answer(value),
      ClientWsMessage::CheckAnswer => self.session.check_answer(),
      ClientWsMessage::SetDifficulty { difficulty } => self.session.set_difficulty(difficulty),
      ClientWsMessage::ContinueAfterSuccess => self.session.continue_after_success(),
      ClientWsMessage::AdvanceLevel => self.session.advance_level(),
      ClientWsMessage::GoHome => self.session.go_home(),
    };
    debug!(target: "game", phase = ?self.session.state().phase, effects = effects.len(), "Input applied");
    self.apply(effects);
    self.state_message()
  }

  /// Wait for the next thing worth telling the client: a state change caused by a
  /// timer or an encouragement, or a line of speech. Stale callbacks and lines from
  /// rounds that have ended are swallowed.
  pub async fn next_event(&mut self) -> Option<ServerWsMessage> {
    loop {
      tokio::select! {
        Some(timer) = self.timer_rx.recv() => {
          if let Some(effects) = self.session.on_timer(timer) {
            self.apply(effects);
            return Some(self.state_message());
          }
          debug!(target: "game", ?timer, "Stale timer ignored");
        }
        Some(event) = self.narration_rx.recv() => match event {
          NarrationEvent::Speech { round, text, audio } => {
            if self.session.is_current(round) {
              return Some(ServerWsMessage::Speak { text, audio });
            }
            debug!(target: "narration", %text, "Line from an ended round dropped");
          }
          NarrationEvent::Encouragement { token, success, text } => {
            if let Some(effects) = self.session.on_encouragement(token, success, &text) {
              self.apply(effects);
              return Some(self.state_message());
            }
          }
        },
        else => return None,
      }
    }
  }

  fn apply(&mut self, effects: Vec<Effect>) {
    for effect in effects {
      match effect {
        Effect::Speak(line) => self.narrator.speak(line),
        Effect::Encourage { success, token } => self.narrator.encourage(success, token),
        Effect::Schedule { timer, after } => {
          let tx = self.timer_tx.clone();
          tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(timer);
          });
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GameConfig;
  use crate::domain::{Phase, Problem, QuestionVariant, Theme};
  use std::time::Duration;

  fn runtime() -> SessionRuntime {
    SessionRuntime::new(Arc::new(AppState::with_parts(GameConfig::default(), None)), Some(1))
  }

  fn snapshot_of(msg: &ServerWsMessage) -> Option<&crate::session::SessionSnapshot> {
    match msg {
      ServerWsMessage::State { state } => Some(state),
      _ => None,
    }
  }

  #[tokio::test(start_paused = true)]
  async fn teaching_runs_to_completion_on_real_timers() {
    let mut rt = runtime();
    rt.handle(ClientWsMessage::StartGame);
    let effects = rt.session.begin_round(Problem::new(2, 1, Theme::default(), QuestionVariant::FindSum));
    rt.apply(effects);

    for _ in 0..2 {
      rt.handle(ClientWsMessage::SelectAnswer { value: 5 });
      rt.handle(ClientWsMessage::CheckAnswer);
    }
    assert_eq!(rt.session.state().phase, Phase::Teaching);

    let mut highlights: Vec<u32> = vec![];
    let mut spoken: Vec<String> = vec![];
    let finished = tokio::time::timeout(Duration::from_secs(60), async {
      while let Some(msg) = rt.next_event().await {
        if let ServerWsMessage::Speak { text, .. } = &msg {
          spoken.push(text.clone());
        }
        if let Some(snap) = snapshot_of(&msg) {
          if let Some(i) = snap.state.highlight_index {
            if highlights.last() != Some(&i) {
              highlights.push(i);
            }
          }
          if snap.state.phase == Phase::Playing {
            return snap.state.highlight_index;
          }
        }
      }
      Some(u32::MAX)
    })
    .await
    .unwrap();

    assert_eq!(finished, None);
    assert_eq!(highlights, vec![0, 1, 2]);
    assert!(["1", "2", "3"].iter().all(|n| spoken.iter().any(|s| s == n)));
  }

  #[tokio::test(start_paused = true)]
  async fn correct_answer_gets_local_encouragement() {
    let mut rt = runtime();
    rt.handle(ClientWsMessage::StartGame);
    let effects = rt.session.begin_round(Problem::new(1, 2, Theme::default(), QuestionVariant::FindSum));
    rt.apply(effects);
    rt.handle(ClientWsMessage::SelectAnswer { value: 3 });
    let reply = rt.handle(ClientWsMessage::CheckAnswer);
    assert_eq!(snapshot_of(&reply).map(|s| s.state.phase), Some(Phase::Success));

    let expected = "Con thật là tuyệt vời. 1 cộng 2 bằng 3, quá chính xác!";
    let message = tokio::time::timeout(Duration::from_secs(10), async {
      loop {
        if let Some(ServerWsMessage::State { state }) = rt.next_event().await {
          if state.state.assistant_message == expected {
            return state.state.assistant_message;
          }
        }
      }
    })
    .await
    .unwrap();
    assert_eq!(message, expected);
  }

  #[tokio::test(start_paused = true)]
  async fn going_home_silences_pending_teaching_steps() {
    let mut rt = runtime();
    rt.handle(ClientWsMessage::StartGame);
    let effects = rt.session.begin_round(Problem::new(3, 3, Theme::default(), QuestionVariant::FindSum));
    rt.apply(effects);
    for _ in 0..2 {
      rt.handle(ClientWsMessage::SelectAnswer { value: 1 });
      rt.handle(ClientWsMessage::CheckAnswer);
    }
    rt.handle(ClientWsMessage::GoHome);

    // Drain everything that is still in flight; no highlight and no line of the
    // abandoned round may reach the client.
    let mut spoken: Vec<String> = vec![];
    let _ = tokio::time::timeout(Duration::from_secs(30), async {
      while let Some(msg) = rt.next_event().await {
        if let ServerWsMessage::Speak { text, .. } = &msg {
          spoken.push(text.clone());
        }
        if let Some(snap) = snapshot_of(&msg) {
          assert_eq!(snap.state.highlight_index, None);
        }
      }
    })
    .await;
    assert_eq!(rt.session.state().phase, Phase::Idle);
    assert!(spoken.is_empty(), "stale narration delivered: {spoken:?}");
  }

  #[tokio::test(start_paused = true)]
  async fn new_difficulty_only_narrates_the_new_round() {
    let mut rt = runtime();
    rt.handle(ClientWsMessage::StartGame);
    rt.handle(ClientWsMessage::SetDifficulty { difficulty: crate::domain::Difficulty::Hard });
    let new_prompt = rt.session.state().problem.as_ref().map(Problem::prompt).unwrap();

    let first_line = tokio::time::timeout(Duration::from_secs(10), async {
      loop {
        if let Some(ServerWsMessage::Speak { text, .. }) = rt.next_event().await {
          return text;
        }
      }
    })
    .await
    .unwrap();
    // The welcome line and the first prompt belong to the replaced round.
    assert_eq!(first_line, new_prompt);
  }

  #[tokio::test]
  async fn ping_and_get_state_do_not_touch_the_session() {
    let mut rt = runtime();
    assert!(matches!(rt.handle(ClientWsMessage::Ping), ServerWsMessage::Pong));
    let reply = rt.handle(ClientWsMessage::GetState);
    assert_eq!(snapshot_of(&reply).map(|s| s.state.phase), Some(Phase::Idle));
  }
}
