//! Error types for content, analysis and formatting operations.

use crate::position::Position;

/// Which bound an out-of-range argument violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRange {
    /// Line index past the last line.
    Line {
        /// Requested line.
        line: usize,
        /// Current line count.
        line_count: usize,
    },
    /// Column past the end of its line.
    Column {
        /// Line of the request.
        line: usize,
        /// Requested column.
        column: usize,
        /// Column count of that line.
        column_count: usize,
    },
    /// Character index past the end of the document.
    Index {
        /// Requested index.
        index: usize,
        /// Document length in characters.
        len: usize,
    },
}

impl std::fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutOfRange::Line { line, line_count } => {
                write!(f, "line {} out of range (line count {})", line, line_count)
            }
            OutOfRange::Column {
                line,
                column,
                column_count,
            } => write!(
                f,
                "column {} out of range on line {} (column count {})",
                column, line, column_count
            ),
            OutOfRange::Index { index, len } => {
                write!(f, "index {} out of range (length {})", index, len)
            }
        }
    }
}

/// Errors raised by [`Content`](crate::Content) and its indexer/undo manager.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// A line/column/index argument is outside the current document bounds.
    #[error("{0}")]
    OutOfRange(OutOfRange),
    /// The end of a range precedes its start.
    #[error("invalid range: {start} > {end}")]
    InvalidRange {
        /// Range start.
        start: Position,
        /// Range end.
        end: Position,
    },
    /// Two undo actions that cannot be merged were merged.
    #[error("undo actions cannot be merged")]
    IllegalMerge,
    /// A streaming indexer cursor was used after an edit or after it was released.
    #[error("stream cache is stale")]
    StaleCache,
    /// A configuration argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Reading or writing content failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OutOfRange> for ContentError {
    fn from(value: OutOfRange) -> Self {
        ContentError::OutOfRange(value)
    }
}

/// Errors produced while accumulating or running an analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The pass was superseded by a newer request.
    #[error("analysis cancelled")]
    Cancelled,
    /// `finish` was called before `determine`.
    #[error("analysis result was never determined")]
    NotDetermined,
    /// A span was added on a line before the last line that already has spans.
    #[error("span added on line {line} before line {last_line}")]
    InvalidSpanPosition {
        /// Line of the rejected span.
        line: usize,
        /// Last line that already holds spans.
        last_line: usize,
    },
    /// `determine` was called twice.
    #[error("analysis result determined twice")]
    DeterminedTwice,
    /// The tokenizer reported a failure.
    #[error("tokenizer failed: {0}")]
    Tokenizer(String),
}

/// Errors produced by a [`Formatter`](crate::format::Formatter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The request was superseded by a newer one.
    #[error("format cancelled")]
    Cancelled,
    /// The formatter failed.
    #[error("format failed: {0}")]
    Failed(String),
}

/// Result alias for content operations.
pub type Result<T, E = ContentError> = std::result::Result<T, E>;
