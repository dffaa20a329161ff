//! Per-session narration actor.
//!
//! The session never waits on narration. Requests are posted to background tasks and
//! results come back on a channel the runtime polls:
//!   - every speech line is synthesized on its own task, then released in the order it
//!     was requested. A transient line (a count cue, an echoed pick) that is still
//!     synthesizing when a later line is ready is skipped rather than played late;
//!   - encouragement requests run concurrently, each tagged with the feedback token of
//!     the check that asked for it.
//!
//! Speech events keep the round token of their line; the runtime drops them when the
//! round is over. Both workers stop when the `Narrator` handle is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::logic::{encouragement, speech};
use crate::session::Line;
use crate::state::AppState;
use crate::teaching::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
  /// `audio` is a base64 WAV; `None` means "speak it on the device".
  Speech { round: Token, text: String, audio: Option<String> },
  Encouragement { token: Token, success: bool, text: String },
}

struct Slot {
  line: Line,
  /// `Some` once synthesis finished (the inner `None` is "no audio, use the device").
  audio: Option<Option<String>>,
}

/// Reorders concurrently synthesized lines back into request order.
#[derive(Default)]
struct SpeechQueue {
  next_seq: u64,
  slots: BTreeMap<u64, Slot>,
}

impl SpeechQueue {
  fn push(&mut self, line: Line) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.slots.insert(seq, Slot { line, audio: None });
    seq
  }

  /// Record a finished synthesis and return every line that may now be played.
  fn complete(&mut self, seq: u64, audio: Option<String>) -> Vec<(Line, Option<String>)> {
    match self.slots.get_mut(&seq) {
      Some(slot) => slot.audio = Some(audio),
      // Skipped while it was still synthesizing.
      None => return vec![],
    }

    let mut ready = vec![];
    while let Some((&head_seq, head)) = self.slots.first_key_value() {
      if head.audio.is_none() {
        let overtaken = head.line.transient && self.slots.values().any(|s| s.audio.is_some());
        if !overtaken {
          break;
        }
        let skipped = self.slots.remove(&head_seq).map(|s| s.line.text);
        debug!(target: "narration", ?skipped, "Transient line overtaken; skipped");
        continue;
      }
      if let Some(Slot { line, audio: Some(audio) }) = self.slots.remove(&head_seq) {
        ready.push((line, audio));
      }
    }
    ready
  }
}

pub struct Narrator {
  speech_tx: mpsc::UnboundedSender<Line>,
  encourage_tx: mpsc::UnboundedSender<(bool, Token)>,
}

impl Narrator {
  #[instrument(level = "debug", skip_all)]
  pub fn spawn(state: Arc<AppState>) -> (Narrator, mpsc::UnboundedReceiver<NarrationEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (speech_tx, mut speech_rx) = mpsc::unbounded_channel::<Line>();
    let (encourage_tx, mut encourage_rx) = mpsc::unbounded_channel::<(bool, Token)>();

    {
      let state = state.clone();
      let events = events_tx.clone();
      tokio::spawn(async move {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, Option<String>)>();
        let mut queue = SpeechQueue::default();
        loop {
          tokio::select! {
            line = speech_rx.recv() => {
              let Some(line) = line else { break };
              let text = line.text.clone();
              let seq = queue.push(line);
              let state = state.clone();
              let done = done_tx.clone();
              tokio::spawn(async move {
                let audio = speech(&state, &text).await;
                let _ = done.send((seq, audio));
              });
            }
            Some((seq, audio)) = done_rx.recv() => {
              for (line, audio) in queue.complete(seq, audio) {
                let event = NarrationEvent::Speech { round: line.round, text: line.text, audio };
                if events.send(event).is_err() {
                  return;
                }
              }
            }
          }
        }
        debug!(target: "narration", "Speech worker stopped");
      });
    }

    tokio::spawn(async move {
      while let Some((success, token)) = encourage_rx.recv().await {
        let state = state.clone();
        let events = events_tx.clone();
        tokio::spawn(async move {
          let text = encouragement(&state, success).await;
          let _ = events.send(NarrationEvent::Encouragement { token, success, text });
        });
      }
      debug!(target: "narration", "Encouragement worker stopped");
    });

    (Narrator { speech_tx, encourage_tx }, events_rx)
  }

  pub fn speak(&self, line: Line) {
    if self.speech_tx.send(line).is_err() {
      debug!(target: "narration", "Speech worker gone; line dropped");
    }
  }

  pub fn encourage(&self, success: bool, token: Token) {
    if self.encourage_tx.send((success, token)).is_err() {
      debug!(target: "narration", "Encouragement worker gone; request dropped");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GameConfig;

  fn line(text: &str, transient: bool) -> Line {
    Line { text: text.into(), round: Token::default(), transient }
  }

  fn texts(ready: Vec<(Line, Option<String>)>) -> Vec<String> {
    ready.into_iter().map(|(l, _)| l.text).collect()
  }

  #[test]
  fn queue_releases_lines_in_request_order() {
    let mut q = SpeechQueue::default();
    let intro = q.push(line("Cùng đếm nào", false));
    let one = q.push(line("1", false));
    assert!(q.complete(one, Some("wav".into())).is_empty());
    let ready = q.complete(intro, None);
    assert_eq!(ready[1].1.as_deref(), Some("wav"));
    assert_eq!(texts(ready), vec!["Cùng đếm nào", "1"]);
  }

  #[test]
  fn slow_count_cue_is_skipped_once_a_later_line_is_ready() {
    let mut q = SpeechQueue::default();
    let one = q.push(line("1", true));
    let two = q.push(line("2", true));
    let outro = q.push(line("Bây giờ con chọn nhé", false));

    assert_eq!(texts(q.complete(two, None)), vec!["2"]);
    // "1" was overtaken; its late audio is ignored.
    assert!(q.complete(one, Some("late".into())).is_empty());
    assert_eq!(texts(q.complete(outro, None)), vec!["Bây giờ con chọn nhé"]);
  }

  #[test]
  fn slow_regular_line_holds_back_later_ones() {
    let mut q = SpeechQueue::default();
    let prompt = q.push(line("2 cộng 1 bằng mấy?", false));
    let pick = q.push(line("3", true));
    assert!(q.complete(pick, None).is_empty());
    assert_eq!(texts(q.complete(prompt, None)), vec!["2 cộng 1 bằng mấy?", "3"]);
  }

  #[tokio::test]
  async fn offline_narrator_answers_in_order_with_fallbacks() {
    let state = Arc::new(AppState::with_parts(GameConfig::default(), None));
    let (narrator, mut events) = Narrator::spawn(state.clone());

    let round = Token::default().next();
    narrator.speak(Line { text: "1".into(), round, transient: false });
    narrator.speak(Line { text: "2".into(), round, transient: false });
    assert_eq!(events.recv().await, Some(NarrationEvent::Speech { round, text: "1".into(), audio: None }));
    assert_eq!(events.recv().await, Some(NarrationEvent::Speech { round, text: "2".into(), audio: None }));

    let token = Token::default().next();
    narrator.encourage(false, token);
    assert_eq!(
      events.recv().await,
      Some(NarrationEvent::Encouragement { token, success: false, text: state.config.phrases.failure_fallback.clone() })
    );
  }
}
