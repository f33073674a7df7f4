use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::unicode::{
    next_grapheme_boundary, prev_grapheme_boundary, word_boundary_left, word_boundary_right,
};

/// Cursor marker drawn into field text
pub const CURSOR: char = '\u{2502}';

/// Single-line text field. The cursor is a byte offset that always sits on a
/// grapheme boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let text = normalize_single_line(&text.into());
        let cursor = text.len();
        TextInput { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set(&mut self, text: impl Into<String>) {
        *self = TextInput::with_text(text);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert_str(&mut self, s: &str) {
        let s = normalize_single_line(s);
        self.text.insert_str(self.cursor, &s);
        self.cursor += s.len();
    }

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut buf));
    }

    pub fn backspace(&mut self) {
        if let Some(prev) = prev_grapheme_boundary(&self.text, self.cursor) {
            self.text.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    pub fn delete_forward(&mut self) {
        if let Some(next) = next_grapheme_boundary(&self.text, self.cursor) {
            self.text.replace_range(self.cursor..next, "");
        }
    }

    pub fn delete_word_back(&mut self) {
        let start = word_boundary_left(&self.text, self.cursor);
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = prev_grapheme_boundary(&self.text, self.cursor) {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = next_grapheme_boundary(&self.text, self.cursor) {
            self.cursor = next;
        }
    }

    /// Apply an editing key. Returns false for keys the field does not use,
    /// so the caller can treat them as commands.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.text.len(),
            KeyCode::Char('u') if ctrl => {
                self.text.replace_range(..self.cursor, "");
                self.cursor = 0;
            }
            KeyCode::Char('k') if ctrl => self.text.truncate(self.cursor),
            KeyCode::Char('w') if ctrl => self.delete_word_back(),
            KeyCode::Char('b') if alt => self.cursor = word_boundary_left(&self.text, self.cursor),
            KeyCode::Char('f') if alt => self.cursor = word_boundary_right(&self.text, self.cursor),
            KeyCode::Char(c) if !ctrl && !alt => self.insert_char(c),
            KeyCode::Backspace if alt => self.delete_word_back(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left if alt || ctrl => {
                self.cursor = word_boundary_left(&self.text, self.cursor)
            }
            KeyCode::Right if alt || ctrl => {
                self.cursor = word_boundary_right(&self.text, self.cursor)
            }
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.text.len(),
            _ => return false,
        }
        true
    }

    /// Text with the cursor marker drawn in when `focused`.
    pub fn display(&self, focused: bool) -> String {
        if !focused {
            return self.text.clone();
        }
        let mut out = String::with_capacity(self.text.len() + 3);
        out.push_str(&self.text[..self.cursor]);
        out.push(CURSOR);
        out.push_str(&self.text[self.cursor..]);
        out
    }
}

fn normalize_single_line(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_and_backspace_on_unicode() {
        let mut input = TextInput::new();
        for c in "abλ".chars() {
            assert!(input.handle_key(&key(KeyCode::Char(c))));
        }
        assert_eq!(input.text(), "abλ");
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.text(), "ab");
        assert_eq!(input.cursor(), 2);
    }

    #[test]
    fn cursor_movement_and_mid_insert() {
        let mut input = TextInput::with_text("held");
        input.handle_key(&key(KeyCode::Left));
        input.insert_char('l');
        assert_eq!(input.text(), "helld");
        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Delete));
        assert_eq!(input.text(), "elld");
        assert_eq!(input.display(true), "\u{2502}elld");
    }

    #[test]
    fn ctrl_w_deletes_word() {
        let mut input = TextInput::with_text("fix the parser");
        input.handle_key(&KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        assert_eq!(input.text(), "fix the ");
    }

    #[test]
    fn newlines_are_flattened() {
        let input = TextInput::with_text("a\nb");
        assert_eq!(input.text(), "a b");
    }

    #[test]
    fn unhandled_keys_report_false() {
        let mut input = TextInput::new();
        assert!(!input.handle_key(&key(KeyCode::Enter)));
        assert!(!input.handle_key(&key(KeyCode::Esc)));
        assert!(!input.handle_key(&key(KeyCode::Tab)));
    }
}
