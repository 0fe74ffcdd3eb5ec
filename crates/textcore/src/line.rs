//! A single stored line.

/// One line of document text, without its line separator.
///
/// Columns are counted in Unicode scalar values. Pure-ASCII lines take a fast path where
/// columns equal byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    text: String,
    char_count: usize,
    is_ascii: bool,
}

impl Default for ContentLine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentLine {
    /// Create an empty line.
    pub fn new() -> Self {
        Self {
            text: String::new(),
            char_count: 0,
            is_ascii: true,
        }
    }

    /// Create a line from separator-free text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let is_ascii = text.is_ascii();
        let char_count = if is_ascii {
            text.len()
        } else {
            text.chars().count()
        };
        Self {
            text,
            char_count,
            is_ascii,
        }
    }

    /// The line text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of columns (chars) in this line.
    pub fn len(&self) -> usize {
        self.char_count
    }

    /// Returns `true` if the line has no characters.
    pub fn is_empty(&self) -> bool {
        self.char_count == 0
    }

    /// Fast path flag: whether this line is pure ASCII.
    pub fn is_ascii(&self) -> bool {
        self.is_ascii
    }

    /// Character at `column`, if any.
    pub fn char_at(&self, column: usize) -> Option<char> {
        if self.is_ascii {
            self.text.as_bytes().get(column).map(|b| *b as char)
        } else {
            self.text.chars().nth(column)
        }
    }

    /// Byte offset of `column`. `column == len()` maps to the end of the text.
    pub(crate) fn byte_offset(&self, column: usize) -> usize {
        if self.is_ascii {
            return column.min(self.text.len());
        }
        self.text
            .char_indices()
            .nth(column)
            .map(|(offset, _)| offset)
            .unwrap_or(self.text.len())
    }

    /// Borrowed text of the columns `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end);
        &self.text[from..to]
    }

    /// Insert separator-free `text` at `column`.
    pub(crate) fn insert_str(&mut self, column: usize, text: &str) {
        let at = self.byte_offset(column);
        self.text.insert_str(at, text);
        self.grow(text);
    }

    /// Append separator-free `text`.
    pub(crate) fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
        self.grow(text);
    }

    /// Remove the columns `[start, end)` and return them.
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) -> String {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end);
        let removed: String = self.text.drain(from..to).collect();
        self.char_count -= end - start;
        if !self.is_ascii {
            self.is_ascii = self.text.is_ascii();
        }
        removed
    }

    /// Split the line at `column`, keeping the head and returning the tail.
    pub(crate) fn split_off(&mut self, column: usize) -> ContentLine {
        let at = self.byte_offset(column);
        let tail = self.text.split_off(at);
        self.char_count = column;
        if !self.is_ascii {
            self.is_ascii = self.text.is_ascii();
        }
        ContentLine::from_text(tail)
    }

    fn grow(&mut self, text: &str) {
        if text.is_ascii() {
            self.char_count += text.len();
        } else {
            self.char_count += text.chars().count();
            self.is_ascii = false;
        }
    }
}

impl std::fmt::Display for ContentLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
