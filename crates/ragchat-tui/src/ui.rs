use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use ragchat_core::{ChatBackend, NodeView, Sender, Transcript};
use unicode_width::UnicodeWidthChar;

use crate::app::App;

pub fn render<B: ChatBackend>(app: &mut App<B>, frame: &mut Frame) {
    let [header_area, transcript_area, busy_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);
    render_transcript(app, frame, transcript_area);
    render_busy_indicator(app, frame, busy_area);
    render_input(app, frame, input_area);
    render_footer(frame, footer_area);
}

fn render_header<B: ChatBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" ragchat ", Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
    ]);
    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn sender_style(sender: Sender) -> Style {
    let color = match sender {
        Sender::User => Color::Cyan,
        Sender::Bot => Color::Yellow,
        Sender::System => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Flattens the transcript into display lines.
pub fn transcript_lines(transcript: &Transcript<Vec<Line<'static>>>) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for entry in transcript.iter() {
        let sender = entry.sender();
        lines.push(Line::from(Span::styled(
            format!("{}:", sender.display_name()),
            sender_style(sender),
        )));

        match &entry.view {
            NodeView::Plain(text) => {
                let style = if sender == Sender::System {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                for line in text.split('\n') {
                    lines.push(Line::from(Span::styled(line.to_string(), style)));
                }
            }
            NodeView::Rendered(rendered) => lines.extend(rendered.iter().cloned()),
        }
        lines.push(Line::default());
    }

    lines
}

fn render_transcript<B: ChatBackend>(app: &mut App<B>, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.transcript_height = inner.height;

    let transcript = app.widget.transcript();
    if transcript.is_empty() {
        let placeholder = Paragraph::new(Text::from(Span::styled(
            "Ask a question...",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(placeholder, inner);
        return;
    }

    let paragraph = Paragraph::new(transcript_lines(transcript)).wrap(Wrap { trim: false });
    let content_height = u16::try_from(paragraph.line_count(inner.width)).unwrap_or(u16::MAX);
    let offset = app.widget.viewport_mut().resolve(content_height, inner.height);

    frame.render_widget(paragraph.scroll((offset, 0)), inner);
}

fn render_busy_indicator<B: ChatBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    if !app.widget.is_busy() {
        return;
    }
    // Animated ellipsis: cycles through ".", "..", "..."
    let dots = ".".repeat(app.animation_frame as usize + 1);
    let indicator = Paragraph::new(Span::styled(
        format!(" Assistant is typing{dots}"),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    ));
    frame.render_widget(indicator, area);
}

fn render_input<B: ChatBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Message ");

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_col) =
        input_window(app.widget.input(), app.widget.cursor(), inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    let cursor_x = u16::try_from(cursor_col).unwrap_or(0);
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Horizontal scrolling for the input line, measured in terminal columns.
/// Returns the visible text and the cursor column inside it.
fn input_window(input: &str, cursor: usize, width: usize) -> (String, usize) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());

    // Scroll until the cursor, and the cell it sits on, fit
    let mut start = 0;
    let mut cursor_col: usize = chars[..cursor].iter().map(|&ch| char_width(ch)).sum();
    while start < cursor && cursor_col + 1 > width {
        cursor_col -= char_width(chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible = chars[start..]
        .iter()
        .take_while(|&&ch| {
            used += char_width(ch);
            used <= width
        })
        .collect();
    (visible, cursor_col)
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Cyan);
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Enter", key),
        Span::raw(" send  "),
        Span::styled("↑/↓ PgUp/PgDn", key),
        Span::raw(" scroll  "),
        Span::styled("Esc", key),
        Span::raw(" quit"),
    ]))
    .style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::TerminalMarkdown;
    use ragchat_core::{ChatClient, ChatWidget, WidgetOptions, ERROR_MESSAGE};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> (App, tokio::sync::mpsc::UnboundedReceiver<ragchat_core::WidgetEvent>) {
        let client = ChatClient::new("http://127.0.0.1:9").unwrap();
        let (widget, rx) = ChatWidget::attach(client, TerminalMarkdown::new(), WidgetOptions::default());
        (App::new(widget, "http://127.0.0.1:9"), rx)
    }

    #[tokio::test]
    async fn empty_chat_shows_placeholder_and_no_busy_indicator() {
        let (mut app, _rx) = app();
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("Ask a question..."));
        assert!(text.contains("http://127.0.0.1:9"));
        assert!(!text.contains("Assistant is typing"));
    }

    #[tokio::test]
    async fn busy_indicator_and_error_message() {
        let (mut app, mut rx) = app();
        let mut terminal = Terminal::new(TestBackend::new(70, 16)).unwrap();

        app.widget.set_input("hello there");
        app.widget.submit();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("You:"));
        assert!(text.contains("hello there"));
        assert!(text.contains("Assistant is typing."));

        app.widget.handle(rx.recv().await.unwrap());
        terminal.draw(|f| render(&mut app, f)).unwrap();
        let text = screen(&terminal);
        assert!(text.contains(ERROR_MESSAGE));
        assert!(!text.contains("Assistant is typing"));
    }

    #[tokio::test]
    async fn long_transcript_stays_scrolled_to_bottom() {
        let (mut app, mut rx) = app();
        let mut terminal = Terminal::new(TestBackend::new(70, 14)).unwrap();

        for n in 0..6 {
            app.widget.set_input(format!("question {n}"));
            app.widget.submit();
            app.widget.handle(rx.recv().await.unwrap());
            terminal.draw(|f| render(&mut app, f)).unwrap();
        }

        let text = screen(&terminal);
        assert!(text.contains("question 5"));
        assert!(!text.contains("question 0"));
        assert!(app.widget.viewport().offset() > 0);
    }

    #[test]
    fn input_window_scrolls_by_columns() {
        assert_eq!(input_window("abcdefghij", 10, 5), ("ghij".to_string(), 4));
        assert_eq!(input_window("abcdefghij", 2, 5), ("abcde".to_string(), 2));
        assert_eq!(input_window("你好世界", 4, 20), ("你好世界".to_string(), 8));
        assert_eq!(input_window("你好世界", 4, 5), ("世界".to_string(), 4));
        assert_eq!(input_window("你好世界", 1, 3), ("你".to_string(), 2));
        assert_eq!(input_window("abc", 3, 0), (String::new(), 0));
    }

    #[tokio::test]
    async fn cursor_sits_after_wide_characters() {
        let (mut app, _rx) = app();
        let mut terminal = Terminal::new(TestBackend::new(30, 10)).unwrap();

        app.widget.set_input("你好");
        terminal.draw(|f| render(&mut app, f)).unwrap();

        // Input box spans rows 6..=8; its text row is 7, after the left border.
        let cursor = terminal.get_cursor_position().unwrap();
        assert_eq!((cursor.x, cursor.y), (5, 7));
    }

    #[test]
    fn rendered_replies_use_markdown_lines() {
        use ragchat_core::{Message, MarkdownRenderer};

        let renderer = TerminalMarkdown::new();
        let mut transcript = Transcript::new();
        transcript.append(
            Message::new(Sender::Bot, "Hello **world**"),
            NodeView::Rendered(renderer.render("Hello **world**")),
        );
        transcript.append(
            Message::new(Sender::Bot, "Hel"),
            NodeView::Plain("Hel".to_string()),
        );

        let lines = transcript_lines(&transcript);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["AI:", "Hello world", "", "AI:", "Hel", ""]);
    }
}
