// Single-line text field with a char-indexed cursor

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    /// Cursor position in chars, not bytes
    cursor: usize,
    max_chars: Option<usize>,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input past `max` chars is refused rather than truncated.
    pub fn with_limit(max: usize) -> Self {
        Self {
            max_chars: Some(max),
            ..Self::default()
        }
    }

    pub fn with_text(text: &str) -> Self {
        let mut input = Self::new();
        input.set(text);
        input
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn has_room(&self, extra: usize) -> bool {
        self.max_chars
            .map(|max| self.char_count() + extra <= max)
            .unwrap_or(true)
    }

    /// Returns false when the limit would be exceeded.
    pub fn insert_char(&mut self, c: char) -> bool {
        if !self.has_room(1) {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
        true
    }

    /// Pastes are all-or-nothing against the limit. Newlines become spaces.
    pub fn insert_str(&mut self, s: &str) -> bool {
        let cleaned: String = s
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let added = cleaned.chars().count();
        if !self.has_room(added) {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, &cleaned);
        self.cursor += added;
        true
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn set(&mut self, text: &str) {
        self.text = match self.max_chars {
            Some(max) => text.chars().take(max).collect(),
            None => text.to_string(),
        };
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Take the contents, leaving the field empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_at_cursor() {
        let mut input = TextInput::new();
        for c in "helo".chars() {
            input.insert_char(c);
        }
        input.move_left();
        input.insert_char('l');
        assert_eq!(input.as_str(), "hello");

        input.move_home();
        input.delete();
        assert_eq!(input.as_str(), "ello");
        input.move_end();
        input.backspace();
        assert_eq!(input.as_str(), "ell");
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn multibyte_chars() {
        let mut input = TextInput::with_text("héllo");
        input.move_left();
        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!(input.as_str(), "hllo");
    }

    #[test]
    fn limit_refuses_extra_input() {
        let mut input = TextInput::with_limit(3);
        assert!(input.insert_str("abc"));
        assert!(!input.insert_char('d'));
        assert_eq!(input.as_str(), "abc");

        input.clear();
        assert!(!input.insert_str("abcd"));
        assert!(input.is_empty());
    }

    #[test]
    fn take_resets() {
        let mut input = TextInput::with_text("hi");
        assert_eq!(input.take(), "hi");
        assert!(input.is_empty());
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn paste_flattens_newlines() {
        let mut input = TextInput::new();
        input.insert_str("a\nb");
        assert_eq!(input.as_str(), "a b");
    }
}
