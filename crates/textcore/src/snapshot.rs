//! Immutable content snapshots for background readers.

use ropey::{Rope, RopeBuilder};

use crate::content::Content;
use crate::position::Position;

/// A frozen copy of a [`Content`], cheap to clone and safe to share across threads.
///
/// Analysis and formatting workers read snapshots instead of the live document, so they
/// never observe a half-applied edit.
#[derive(Debug, Clone)]
pub struct ContentSnapshot {
    rope: Rope,
    revision: u64,
}

impl ContentSnapshot {
    /// Build a snapshot from plain text (LF-separated).
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            revision: 0,
        }
    }

    /// The [`Content::modification_count`] this snapshot was taken at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Length in chars, one per line break.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Text of `line` without its line break.
    pub fn line_text(&self, line: usize) -> Option<String> {
        let slice = self.rope.get_line(line)?;
        let mut text = slice.to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Iterate line texts without line breaks.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.line_count()).filter_map(|line| self.line_text(line))
    }

    /// Linear index of `(line, column)`, if it exists.
    pub fn char_index(&self, position: Position) -> Option<usize> {
        let start = self.rope.try_line_to_char(position.line).ok()?;
        let line = self.rope.get_line(position.line)?;
        let columns = line.len_chars() - usize::from(line.chars().last() == Some('\n'));
        (position.column <= columns).then_some(start + position.column)
    }

    /// `(line, column)` of a linear index in `[0, len_chars()]`.
    pub fn position_of(&self, index: usize) -> Option<Position> {
        let line = self.rope.try_char_to_line(index).ok()?;
        let start = self.rope.line_to_char(line);
        Some(Position::new(line, index - start))
    }

    /// Underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }
}

impl std::fmt::Display for ContentSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl Content {
    /// Take an immutable snapshot of the current text.
    pub fn snapshot(&self) -> ContentSnapshot {
        let mut builder = RopeBuilder::new();
        for (i, line) in self.lines().iter().enumerate() {
            if i > 0 {
                builder.append("\n");
            }
            builder.append(line.as_str());
        }
        ContentSnapshot {
            rope: builder.finish(),
            revision: self.modification_count(),
        }
    }
}
