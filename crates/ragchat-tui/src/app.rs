use ragchat_core::{ChatBackend, ChatClient, ChatWidget};

use crate::markdown::TerminalMarkdown;

pub struct App<B: ChatBackend = ChatClient> {
    pub widget: ChatWidget<B, TerminalMarkdown>,
    pub should_quit: bool,

    /// Backend address shown in the title bar.
    pub endpoint: String,
    /// Frame of the busy indicator's ellipsis.
    pub animation_frame: u8,
    /// Height of the transcript pane, updated on every draw.
    pub transcript_height: u16,
}

impl<B: ChatBackend> App<B> {
    pub fn new(widget: ChatWidget<B, TerminalMarkdown>, endpoint: impl Into<String>) -> Self {
        Self {
            widget,
            should_quit: false,
            endpoint: endpoint.into(),
            animation_frame: 0,
            transcript_height: 0,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else {
            self.animation_frame = 0;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.widget.viewport_mut().scroll_up(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.widget.viewport_mut().scroll_down(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.transcript_height / 2).max(1)
    }
}
