//! The chat widget: one context object owning the transcript, the input
//! field, the busy state and every running animation.
//!
//! All mutation happens on the caller's task. Background work (backend
//! requests, typing ticks) only ever reports back through [`WidgetEvent`]s
//! which the surface feeds into [`ChatWidget::handle`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::client::ChatBackend;
use crate::error::ChatError;
use crate::markdown::MarkdownRenderer;
use crate::state::{Message, MessageId, Sender};
use crate::transcript::{NodeView, Transcript};
use crate::typing::{schedule_tick, Reveal, Typewriter, DEFAULT_TYPING_DELAY};
use crate::viewport::Viewport;

/// Shown for every failed exchange, whatever the cause.
pub const ERROR_MESSAGE: &str = "Sorry, there was an error processing your request.";

#[derive(Debug)]
pub enum WidgetEvent {
    /// A backend request finished.
    Reply { result: Result<String, ChatError> },
    /// Time to reveal the next character of this bot message.
    RevealTick(MessageId),
}

#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub typing_delay: Duration,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }
}

struct Animation {
    typewriter: Typewriter,
    /// Guards the one tick currently scheduled for this reply.
    token: CancellationToken,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct ChatWidget<B, R: MarkdownRenderer> {
    backend: Arc<B>,
    renderer: R,
    transcript: Transcript<R::Output>,

    // Input field
    input: String,
    cursor: usize,

    /// Requests sent but not yet answered.
    pending: usize,
    viewport: Viewport,
    animations: HashMap<MessageId, Animation>,
    typing_delay: Duration,

    events: UnboundedSender<WidgetEvent>,
    shutdown: CancellationToken,
}

impl<B: ChatBackend, R: MarkdownRenderer> ChatWidget<B, R> {
    /// Creates a widget. The returned receiver yields the events that must be
    /// passed back to [`ChatWidget::handle`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(
        backend: B,
        renderer: R,
        options: WidgetOptions,
    ) -> (Self, UnboundedReceiver<WidgetEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let widget = Self {
            backend: Arc::new(backend),
            renderer,
            transcript: Transcript::new(),
            input: String::new(),
            cursor: 0,
            pending: 0,
            viewport: Viewport::new(),
            animations: HashMap::new(),
            typing_delay: options.typing_delay,
            events,
            shutdown: CancellationToken::new(),
        };
        tracing::debug!(typing_delay = ?widget.typing_delay, "chat widget attached");
        (widget, rx)
    }

    /// Stops every in-flight request and animation.
    pub fn detach(self) {
        tracing::debug!(
            pending = self.pending,
            animations = self.animations.len(),
            "chat widget detached"
        );
        // Drop cancels the shutdown token.
    }

    /// Sends the current input. Empty or whitespace-only input is ignored.
    pub fn submit(&mut self) -> Option<MessageId> {
        let text = self.input.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();

        let id = self.push_plain(Sender::User, text.clone());
        self.input.clear();
        self.cursor = 0;

        self.pending += 1;
        self.spawn_request(text);
        Some(id)
    }

    pub fn handle(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Reply { result } => {
                self.pending = self.pending.saturating_sub(1);
                match result {
                    Ok(reply) => {
                        self.start_typing(reply);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "chat request failed");
                        self.push_plain(Sender::System, ERROR_MESSAGE.to_string());
                    }
                }
            }
            WidgetEvent::RevealTick(id) => self.reveal_next(id),
        }
    }

    fn spawn_request(&self, text: String) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let token = self.shutdown.child_token();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("chat request abandoned");
                    return;
                }
                result = backend.send(&text) => result,
            };
            // The widget may be gone by now; nothing left to update then.
            let _ = events.send(WidgetEvent::Reply { result });
        });
    }

    fn push_plain(&mut self, sender: Sender, text: String) -> MessageId {
        let id = self
            .transcript
            .append(Message::new(sender, text.clone()), NodeView::Plain(text));
        tracing::trace!(%id, sender = sender.as_str(), "message appended");
        self.viewport.scroll_to_bottom();
        id
    }

    fn start_typing(&mut self, reply: String) -> MessageId {
        let mut typewriter = Typewriter::new(&reply);
        typewriter.start();

        // The node goes in now so the transcript keeps arrival order.
        let id = self.transcript.append(
            Message::new(Sender::Bot, reply),
            NodeView::Plain(String::new()),
        );
        self.viewport.scroll_to_bottom();

        // Each handled tick schedules the next one, so a surface that stalls
        // never builds up a backlog of reveals.
        let token = self.shutdown.child_token();
        schedule_tick(id, self.typing_delay, self.events.clone(), token.clone());
        tracing::debug!(%id, chars = typewriter.len(), "typing reply");
        self.animations.insert(id, Animation { typewriter, token });
        id
    }

    fn reveal_next(&mut self, id: MessageId) {
        // Ticks can still be queued after an animation ended.
        let Some(animation) = self.animations.get_mut(&id) else {
            return;
        };

        match animation.typewriter.step() {
            Some(Reveal::Char(ch)) => {
                // Replacing the token drops any other tick still pending for
                // this reply, keeping a single chain per animation.
                animation.token.cancel();
                let token = self.shutdown.child_token();
                schedule_tick(id, self.typing_delay, self.events.clone(), token.clone());
                animation.token = token;

                if let Some(entry) = self.transcript.get_mut(id) {
                    if let NodeView::Plain(text) = &mut entry.view {
                        text.push(ch);
                    }
                }
            }
            Some(Reveal::Finished) | None => {
                if let Some(animation) = self.animations.remove(&id) {
                    animation.token.cancel();
                }
                if let Some(entry) = self.transcript.get_mut(id) {
                    let rendered = self.renderer.render(&entry.message().text);
                    entry.view = NodeView::Rendered(rendered);
                }
                tracing::trace!(%id, "reply rendered");
            }
        }
        self.viewport.scroll_to_bottom();
    }

    // Input field editing

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.cursor = self.input.chars().count();
    }

    pub fn insert_char(&mut self, ch: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // State

    pub fn transcript(&self) -> &Transcript<R::Output> {
        &self.transcript
    }

    /// True while at least one request is waiting for the backend.
    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn pending_requests(&self) -> usize {
        self.pending
    }

    pub fn is_animating(&self) -> bool {
        !self.animations.is_empty()
    }

    pub fn active_animations(&self) -> usize {
        self.animations.len()
    }

    /// `(revealed, total)` characters for a reply that is still being typed.
    pub fn reveal_progress(&self, id: MessageId) -> Option<(usize, usize)> {
        self.animations
            .get(&id)
            .map(|a| (a.typewriter.revealed(), a.typewriter.len()))
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }
}

impl<B, R: MarkdownRenderer> Drop for ChatWidget<B, R> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
