//! Markdown rendering contract.
//!
//! Replies are only formatted once the typing animation has finished, so a
//! renderer always sees the complete source. Implementations must be pure.

use pulldown_cmark::{html, Options, Parser};

pub trait MarkdownRenderer {
    type Output;

    fn render(&self, source: &str) -> Self::Output;
}

/// Parser options shared by every renderer in the workspace.
pub fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Renders markdown to an HTML fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl MarkdownRenderer for HtmlRenderer {
    type Output = String;

    fn render(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, options());
        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}
