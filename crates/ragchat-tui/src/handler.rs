use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ragchat_core::ChatBackend;

use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_STEP: u16 = 3;

pub fn handle_event<B: ChatBackend>(app: &mut App<B>, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => {
            // The input is a single line
            for ch in text.chars() {
                app.widget.insert_char(if ch == '\n' || ch == '\r' { ' ' } else { ch });
            }
        }
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key<B: ChatBackend>(app: &mut App<B>, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => {
            if let Some(id) = app.widget.submit() {
                tracing::debug!(%id, "message submitted");
            }
        }
        KeyCode::Backspace => app.widget.backspace(),
        KeyCode::Delete => app.widget.delete(),
        KeyCode::Left => app.widget.cursor_left(),
        KeyCode::Right => app.widget.cursor_right(),
        KeyCode::Home => app.widget.cursor_home(),
        KeyCode::End => app.widget.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.widget.insert_char(ch);
        }
        _ => {}
    }
}

fn handle_mouse<B: ChatBackend>(app: &mut App<B>, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_STEP),
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_STEP),
        _ => {}
    }
}
