//! Character-by-character reveal of bot replies.
//!
//! [`Typewriter`] is the state machine; [`schedule_tick`] is the clock that
//! drives it. The widget owns the typewriter and steps it once per tick, then
//! schedules the next one, so at most one tick per reply is ever in flight.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::MessageId;
use crate::widget::WidgetEvent;

pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    /// The next character to reveal is at this index.
    Revealing(usize),
    Done,
}

/// One step of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Char(char),
    /// Every character has been shown; time to format the full text.
    Finished,
}

#[derive(Debug, Clone)]
pub struct Typewriter {
    chars: Vec<char>,
    state: RevealState,
}

impl Typewriter {
    pub fn new(full_text: &str) -> Self {
        Self {
            chars: full_text.chars().collect(),
            state: RevealState::Idle,
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn full_text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Number of characters revealed so far.
    pub fn revealed(&self) -> usize {
        match self.state {
            RevealState::Idle => 0,
            RevealState::Revealing(i) => i,
            RevealState::Done => self.chars.len(),
        }
    }

    pub fn start(&mut self) {
        if self.state == RevealState::Idle {
            self.state = RevealState::Revealing(0);
        }
    }

    /// Advances by one character. Yields `Finished` exactly once, then `None`.
    pub fn step(&mut self) -> Option<Reveal> {
        self.start();
        match self.state {
            RevealState::Revealing(i) if i < self.chars.len() => {
                self.state = RevealState::Revealing(i + 1);
                Some(Reveal::Char(self.chars[i]))
            }
            RevealState::Revealing(_) => {
                self.state = RevealState::Done;
                Some(Reveal::Finished)
            }
            RevealState::Idle | RevealState::Done => None,
        }
    }
}

/// Sends a single `RevealTick(target)` after `delay`, unless `token` is
/// cancelled first.
pub fn schedule_tick(
    target: MessageId,
    delay: Duration,
    events: UnboundedSender<WidgetEvent>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::trace!(%target, "typing tick cancelled");
            }
            _ = tokio::time::sleep(delay) => {
                // The widget may be gone by now.
                let _ = events.send(WidgetEvent::RevealTick(target));
            }
        }
    })
}
