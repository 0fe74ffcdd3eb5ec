//! Document coordinates.

use std::cmp::Ordering;

/// Position coordinates (line and column numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Zero-based logical line index.
    pub line: usize,
    /// Zero-based column in characters within the logical line.
    pub column: usize,
}

impl Position {
    /// Create a new logical position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.line, self.column)
    }
}

impl From<(usize, usize)> for Position {
    fn from((line, column): (usize, usize)) -> Self {
        Self { line, column }
    }
}

/// A character position resolved against the current document state.
///
/// The `index` is only meaningful for the document revision it was computed on; any edit
/// before it invalidates the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharPosition {
    /// Linear character offset (one char per implicit newline).
    pub index: usize,
    /// Zero-based line.
    pub line: usize,
    /// Zero-based column.
    pub column: usize,
}

impl CharPosition {
    /// Create a new char position.
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }

    /// The `(line, column)` part of this position.
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}
