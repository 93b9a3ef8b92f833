use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::App;
use crate::controller::View;
use crate::render::{render_message, BOT_LABEL};

const TITLE: &str = " AI Chat Assistant ";
const MAX_INPUT_ROWS: usize = 5;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view() {
        View::CredentialEntry => {
            app.chat_area = None;
            render_credential_entry(app, frame, body_area);
        }
        View::Conversation => render_conversation(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.toast.is_some() {
        render_toast(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(Color::Magenta).bold()),
        Span::styled(
            format!("{} ", app.controller.model()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode, mode_style, hints) = match app.view() {
        View::CredentialEntry => (
            " KEY ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
            " Enter: save  Esc: quit",
        ),
        View::Conversation if app.is_loading() => (
            " WAIT ",
            Style::default().bg(Color::DarkGray).fg(Color::White),
            " PgUp/PgDn: scroll  Ctrl+L: change key  Ctrl+C: quit",
        ),
        View::Conversation => (
            " CHAT ",
            Style::default().bg(Color::Blue).fg(Color::White),
            " Enter: send  Shift+Enter: newline  PgUp/PgDn: scroll  Ctrl+L: change key  Ctrl+C: quit",
        ),
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(mode, mode_style),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(footer, area);
}

fn render_credential_entry(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);
    let popup_area = Rect::new(
        area.x + area.width.saturating_sub(popup_width) / 2,
        area.y + area.height.saturating_sub(popup_height) / 2,
        popup_width,
        popup_height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Enter API Key ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 5 {
        return;
    }

    let instructions = Paragraph::new("Paste your Groq API key. Press Enter to save, Esc to quit.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let value = app.credential_input.value();
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(mask_credential(value)).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_col = masked_cursor_column(value, app.credential_input.cursor());
    let cursor_x = cursor_col.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", value.chars().count()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

/// Mask the key with asterisks, keeping the last 4 chars visible
fn mask_credential(value: &str) -> String {
    let len = value.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let masked_len = len - 4;
    let last_four: String = value.chars().skip(masked_len).collect();
    format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
}

/// Column of the char cursor within the masked key.
fn masked_cursor_column(value: &str, cursor: usize) -> usize {
    let len = value.chars().count();
    if len <= 4 {
        return cursor;
    }
    let masked_len = len - 4;
    let stars = masked_len.min(20);
    if cursor < masked_len {
        cursor.min(stars)
    } else {
        stars + "...".len() + (cursor - masked_len)
    }
}

fn render_conversation(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_rows = app.input.line_count().clamp(1, MAX_INPUT_ROWS) as u16;
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let conversation = app.controller.conversation();
    let text = if conversation.is_empty() && !app.is_loading() {
        Text::from(Span::styled(
            "Type a message to start chatting...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for msg in conversation {
            lines.extend(render_message(&msg.content, msg.is_bot));
            lines.push(Line::default());
        }

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                BOT_LABEL,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let content_height = wrapped_height(&text, inner.width);
    app.update_scroll_bounds(content_height, inner.height);

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

/// Rows the text occupies once word-wrapped to `width` columns.
pub fn wrapped_height(text: &Text, width: u16) -> u16 {
    let rows = Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(width);
    rows.min(u16::MAX as usize) as u16
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let disabled = app.input.is_disabled();
    let (border_color, title) = if disabled {
        (Color::DarkGray, " Waiting for response... ")
    } else {
        (Color::Yellow, " Message ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = app.input.cursor_row_col();

    // Keep the cursor inside the box
    let row_offset = if inner_height == 0 { 0 } else { row.saturating_sub(inner_height - 1) };
    let col_offset = if inner_width == 0 { 0 } else { col.saturating_sub(inner_width - 1) };

    let (content, style) = if app.input.value().is_empty() && !disabled {
        (
            "Type your message...".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            app.input.value().to_string(),
            Style::default().fg(if disabled { Color::DarkGray } else { Color::Cyan }),
        )
    };

    let input = Paragraph::new(content)
        .style(style)
        .block(block)
        .scroll((row_offset as u16, col_offset as u16));
    frame.render_widget(input, area);

    if !disabled {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (row - row_offset) as u16,
        ));
    }
}

fn render_toast(app: &App, frame: &mut Frame, area: Rect) {
    let Some(toast) = app.toast.as_ref() else {
        return;
    };

    let width = 50.min(area.width.saturating_sub(2));
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let body_rows = toast.description.chars().count().div_ceil(inner_width).max(1) as u16;
    let height = (body_rows + 2).min(area.height);
    let popup_area = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y + 1,
        width,
        height,
    );

    frame.render_widget(Clear, popup_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(format!(" {} ", toast.title));
    let body = Paragraph::new(toast.description.as_str())
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(body, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::MockEndpoint;
    use crate::completion::CompletionClient;
    use crate::controller::{ChatController, Notice};
    use crate::credential::MemoryCredentialStore;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app_with(credential: Option<&str>, endpoint: MockEndpoint) -> App {
        let store = match credential {
            Some(key) => MemoryCredentialStore::with_credential(key),
            None => MemoryCredentialStore::new(),
        };
        let client = CompletionClient::new(Arc::new(endpoint), "test-model");
        App::new(ChatController::new(Box::new(store), client))
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_mask_credential() {
        assert_eq!(mask_credential(""), "");
        assert_eq!(mask_credential("abc"), "***");
        assert_eq!(mask_credential("gsk_123456"), "******...3456");
    }

    #[test]
    fn test_masked_cursor_column() {
        assert_eq!(masked_cursor_column("abc", 2), 2);

        let short = "gsk_123456";
        assert_eq!(masked_cursor_column(short, 10), mask_credential(short).chars().count());
        assert_eq!(masked_cursor_column(short, 3), 3);

        let long = "gsk_".to_string() + &"x".repeat(30);
        let end = long.chars().count();
        assert_eq!(masked_cursor_column(&long, end), mask_credential(&long).chars().count());
        assert_eq!(masked_cursor_column(&long, end - 1), 26);
        assert_eq!(masked_cursor_column(&long, 25), 20);
    }

    #[test]
    fn test_wrapped_height_breaks_at_words() {
        let text = Text::from(vec![
            Line::from("a".repeat(25)),
            Line::default(),
            Line::from("short"),
            Line::from("aaaaaa bbbbbb"),
        ]);
        assert_eq!(wrapped_height(&text, 10), 3 + 1 + 1 + 2);
    }

    #[tokio::test]
    async fn test_word_wrapped_reply_scrolls_into_view() {
        let mut reply: String = (0..120)
            .map(|i| if i % 2 == 0 { "abcdefghijklmnop " } else { "xy " })
            .collect();
        reply.push_str("\n\nFINALWORD");
        let mut app = app_with(Some("gsk_test"), MockEndpoint::new().reply(&reply));
        app.controller.send("Hello").await;

        let mut terminal = Terminal::new(TestBackend::new(40, 15)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content.iter().map(|cell| cell.symbol()).collect();

        assert!(app.follow_tail);
        assert_eq!(app.chat_scroll, app.max_chat_scroll);
        assert!(screen.contains("FINALWORD"));
    }

    #[test]
    fn test_credential_view_renders_form() {
        let mut app = app_with(None, MockEndpoint::new());
        let screen = draw(&mut app);
        assert!(screen.contains("Enter API Key"));
        assert!(app.chat_area.is_none());
    }

    #[tokio::test]
    async fn test_conversation_view_renders_messages_and_toast() {
        let mut app = app_with(Some("gsk_test"), MockEndpoint::new().reply("Hi there"));
        app.controller.send("Hello").await;

        let screen = draw(&mut app);
        assert!(screen.contains("AI Chat Assistant"));
        assert!(screen.contains("Hello"));
        assert!(screen.contains("Hi there"));
        assert!(app.chat_area.is_some());

        app.toast = Some(Notice::RequestFailed.into());
        let screen = draw(&mut app);
        assert!(screen.contains("Failed to get"));
    }

    #[test]
    fn test_loading_shows_thinking_and_disabled_input() {
        let mut app = app_with(Some("gsk_test"), MockEndpoint::new());
        let _turn = app.controller.begin_send("Hello");
        app.input.set_disabled(true);

        let screen = draw(&mut app);
        assert!(screen.contains("Thinking."));
        assert!(screen.contains("Waiting for response"));
    }
}
