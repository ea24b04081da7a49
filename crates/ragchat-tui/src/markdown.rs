//! Markdown to styled ratatui lines.
//!
//! Walks pulldown-cmark events and keeps a small amount of block context
//! (lists, quotes, code blocks). Wrapping is left to the paragraph widget.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use ragchat_core::markdown::{self, MarkdownRenderer};

#[derive(Debug, Clone)]
pub struct MarkdownTheme {
    pub heading: Style,
    pub bold: Style,
    pub italic: Style,
    pub strikethrough: Style,
    pub code: Style,
    pub code_block: Style,
    pub link: Style,
    pub link_url: Style,
    pub quote: Style,
    pub bullet: Style,
    pub rule: Style,
}

impl Default for MarkdownTheme {
    fn default() -> Self {
        Self {
            heading: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            bold: Style::default().add_modifier(Modifier::BOLD),
            italic: Style::default().add_modifier(Modifier::ITALIC),
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            code: Style::default().fg(Color::Green),
            code_block: Style::default().fg(Color::Green),
            link: Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
            link_url: Style::default().fg(Color::DarkGray),
            quote: Style::default().fg(Color::DarkGray),
            bullet: Style::default().fg(Color::Cyan),
            rule: Style::default().fg(Color::DarkGray),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TerminalMarkdown {
    theme: MarkdownTheme,
}

impl TerminalMarkdown {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkdownRenderer for TerminalMarkdown {
    type Output = Vec<Line<'static>>;

    fn render(&self, source: &str) -> Vec<Line<'static>> {
        let mut state = RenderState::new(&self.theme);
        for event in Parser::new_ext(source, markdown::options()) {
            state.handle_event(event);
        }
        state.finish()
    }
}

const RULE_WIDTH: usize = 24;

struct RenderState<'a> {
    theme: &'a MarkdownTheme,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// One entry per open list; `Some(n)` is the next number of an ordered list.
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    needs_blank: bool,
    link_url: Option<String>,
}

impl<'a> RenderState<'a> {
    fn new(theme: &'a MarkdownTheme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            needs_blank: false,
            link_url: None,
        }
    }

    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_span(code.to_string(), self.theme.code),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak => self.push_span(" ".to_string(), self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.block_gap();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(RULE_WIDTH),
                    self.theme.rule,
                )));
                self.needs_blank = true;
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(marker.to_string(), self.theme.bullet);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_gap();
                self.styles.push(self.theme.heading);
                self.push_span(format!("{} ", "#".repeat(level as usize)), self.theme.heading);
            }
            Tag::CodeBlock(_) => {
                self.block_gap();
                self.in_code_block = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.push_span(format!("{}{marker}", "  ".repeat(depth)), self.theme.bullet);
            }
            Tag::BlockQuote(_) => {
                self.block_gap();
                self.quote_depth += 1;
            }
            Tag::Emphasis => self.styles.push(self.theme.italic),
            Tag::Strong => self.styles.push(self.theme.bold),
            Tag::Strikethrough => self.styles.push(self.theme.strikethrough),
            Tag::Link { dest_url, .. } => {
                self.styles.push(self.theme.link);
                self.link_url = Some(dest_url.to_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                self.needs_blank = self.lists.is_empty();
            }
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.flush();
                self.needs_blank = true;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.needs_blank = true;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.needs_blank = true;
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.needs_blank = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link_url.take().filter(|u| !u.is_empty()) {
                    self.push_span(format!(" ({url})"), self.theme.link_url);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.lines() {
                self.push_span(format!("  {line}"), self.theme.code_block);
                self.flush();
            }
        } else {
            self.push_span(text.to_string(), self.style());
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s))
    }

    fn push_span(&mut self, content: String, style: Style) {
        self.current.push(Span::styled(content, style));
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.current.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled("│ ".repeat(self.quote_depth), self.theme.quote));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    /// Separates a new block from the previous one with a blank line.
    fn block_gap(&mut self) {
        self.flush();
        if self.needs_blank && !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.needs_blank = false;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
