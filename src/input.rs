//! Pending-text input control shared by the chat box and the credential form.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press did to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Submitted(String),
    Edited,
    Ignored,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    value: String,
    cursor: usize, // in chars
    disabled: bool,
    single_line: bool,
}

impl ChatInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An input that never holds a newline, for the credential form.
    pub fn single_line() -> Self {
        Self {
            single_line: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// True when a submit would currently fire.
    pub fn can_submit(&self) -> bool {
        !self.disabled && !self.value.trim().is_empty()
    }

    /// Emits the trimmed pending text and clears it. No-op when blank or disabled.
    pub fn submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }
        let text = self.value.trim().to_string();
        self.clear();
        Some(text)
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, c: char) {
        if self.disabled || (self.single_line && c == '\n') {
            return;
        }
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        if self.disabled {
            return;
        }
        // Terminals deliver pasted newlines as \r
        let text = if self.single_line {
            text.replace(['\r', '\n'], "")
        } else {
            text.replace("\r\n", "\n").replace('\r', "\n")
        };
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert_str(byte_pos, &text);
        self.cursor += text.chars().count();
    }

    pub fn backspace(&mut self) {
        if self.disabled || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.disabled {
            return;
        }
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// (row, column) of the cursor, counting explicit newlines only.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before: String = self.value.chars().take(self.cursor).collect();
        let row = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|line| line.chars().count())
            .unwrap_or(0);
        (row, col)
    }

    pub fn line_count(&self) -> usize {
        self.value.split('\n').count()
    }

    /// Enter submits; Shift+Enter or Alt+Enter inserts a newline unless single-line.
    pub fn handle_key(&mut self, key: KeyEvent) -> InputOutcome {
        if self.disabled {
            return InputOutcome::Ignored;
        }

        match key.code {
            KeyCode::Enter
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                if self.single_line {
                    return InputOutcome::Ignored;
                }
                self.insert_char('\n');
                InputOutcome::Edited
            }
            KeyCode::Enter => match self.submit() {
                Some(text) => InputOutcome::Submitted(text),
                None => InputOutcome::Ignored,
            },
            KeyCode::Backspace => {
                self.backspace();
                InputOutcome::Edited
            }
            KeyCode::Delete => {
                self.delete();
                InputOutcome::Edited
            }
            KeyCode::Left => {
                self.move_left();
                InputOutcome::Edited
            }
            KeyCode::Right => {
                self.move_right();
                InputOutcome::Edited
            }
            KeyCode::Home => {
                self.move_home();
                InputOutcome::Edited
            }
            KeyCode::End => {
                self.move_end();
                InputOutcome::Edited
            }
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c);
                InputOutcome::Edited
            }
            _ => InputOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut ChatInput, text: &str) {
        for c in text.chars() {
            input.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_submit_emits_trimmed_text_and_clears() {
        let mut input = ChatInput::new();
        type_str(&mut input, "  Hello  ");

        assert_eq!(
            input.handle_key(key(KeyCode::Enter)),
            InputOutcome::Submitted("Hello".to_string())
        );
        assert_eq!(input.value(), "");
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn test_submit_blank_is_noop() {
        let mut input = ChatInput::new();
        assert_eq!(input.submit(), None);

        type_str(&mut input, "   ");
        assert_eq!(input.handle_key(key(KeyCode::Enter)), InputOutcome::Ignored);
        assert_eq!(input.value(), "   ");
    }

    #[test]
    fn test_submit_while_disabled_is_noop() {
        let mut input = ChatInput::new();
        type_str(&mut input, "Hello");
        input.set_disabled(true);

        assert_eq!(input.submit(), None);
        assert_eq!(input.handle_key(key(KeyCode::Enter)), InputOutcome::Ignored);
        assert_eq!(input.value(), "Hello");

        input.set_disabled(false);
        assert_eq!(input.submit().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_disabled_ignores_editing() {
        let mut input = ChatInput::new();
        input.set_disabled(true);
        type_str(&mut input, "abc");
        input.insert_str("pasted");
        assert_eq!(input.value(), "");
    }

    #[test]
    fn test_modified_enter_inserts_newline() {
        let mut input = ChatInput::new();
        type_str(&mut input, "line one");
        assert_eq!(
            input.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)),
            InputOutcome::Edited
        );
        type_str(&mut input, "line two");

        assert_eq!(input.value(), "line one\nline two");
        assert_eq!(input.line_count(), 2);
        assert_eq!(input.cursor_row_col(), (1, 8));
    }

    #[test]
    fn test_utf8_cursor_editing() {
        let mut input = ChatInput::new();
        type_str(&mut input, "héllo");
        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!(input.value(), "hélo");

        input.move_home();
        input.delete();
        assert_eq!(input.value(), "élo");

        input.move_end();
        input.insert_char('!');
        assert_eq!(input.value(), "élo!");
    }

    #[test]
    fn test_paste_normalizes_carriage_returns() {
        let mut input = ChatInput::new();
        input.insert_str("a\r\nb\rc");
        assert_eq!(input.value(), "a\nb\nc");
        assert_eq!(input.cursor(), 5);
    }

    #[test]
    fn test_control_chars_are_not_inserted() {
        let mut input = ChatInput::new();
        let outcome = input.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(outcome, InputOutcome::Ignored);
        assert_eq!(input.value(), "");
    }

    #[test]
    fn test_single_line_rejects_newlines() {
        let mut input = ChatInput::single_line();
        type_str(&mut input, "gsk");
        assert_eq!(
            input.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)),
            InputOutcome::Ignored
        );
        assert_eq!(
            input.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT)),
            InputOutcome::Ignored
        );
        input.insert_str("_ab\r\ncd\nef");

        assert_eq!(input.value(), "gsk_abcdef");
        assert_eq!(input.cursor(), 10);
        assert_eq!(input.line_count(), 1);
        assert_eq!(
            input.handle_key(key(KeyCode::Enter)),
            InputOutcome::Submitted("gsk_abcdef".to_string())
        );
    }
}
