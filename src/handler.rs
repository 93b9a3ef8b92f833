use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::controller::View;
use crate::input::InputOutcome;
use crate::tui::AppEvent;

const PAGE_SCROLL: u16 = 10;
const MOUSE_SCROLL: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }

    // Replies are picked up on whatever event comes next, ticks included
    app.poll_pending().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any view
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        app.should_quit = true;
        return;
    }

    match app.view() {
        View::CredentialEntry => handle_credential_entry(app, key),
        View::Conversation => handle_conversation(app, key),
    }
}

fn handle_credential_entry(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.should_quit = true;
        return;
    }

    if let InputOutcome::Submitted(text) = app.credential_input.handle_key(key) {
        app.submit_credential(&text);
    }
}

fn handle_conversation(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.reset_credential();
        }
        KeyCode::Esc => app.dismiss_toast(),
        KeyCode::PageUp => app.scroll_up(PAGE_SCROLL),
        KeyCode::PageDown => app.scroll_down(PAGE_SCROLL),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        _ => {
            if let InputOutcome::Submitted(text) = app.input.handle_key(key) {
                app.send(&text);
            }
        }
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match app.view() {
        // Keys are single-line; drop whatever newline the clipboard carried
        View::CredentialEntry => app.credential_input.insert_str(text.trim()),
        View::Conversation => app.input.insert_str(text),
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(MOUSE_SCROLL),
        MouseEventKind::ScrollUp => app.scroll_up(MOUSE_SCROLL),
        _ => {}
    }
}
