//! Offset ⇄ (line, column) translation.
//!
//! The indexer keeps a prefix-sum table of line start offsets. Only a prefix of the table is
//! valid at any time: an edit on line `L` leaves the starts of lines `0..=L` untouched, so the
//! table is truncated to `L + 1` entries and re-extended lazily by the next query that needs it.
//!
//! Every line contributes `column_count + 1` characters (its implicit newline), except the last.

use crate::error::{ContentError, OutOfRange, Result};
use crate::line::ContentLine;
use crate::position::CharPosition;

/// Cursor of a streaming scan.
#[derive(Debug, Clone, Copy)]
struct StreamCursor {
    position: CharPosition,
    revision: u64,
}

/// Lazily validated line-start table plus an optional streaming cursor.
#[derive(Debug, Default)]
pub(crate) struct Indexer {
    line_starts: Vec<usize>,
    stream: Option<StreamCursor>,
}

impl Indexer {
    pub(crate) fn new() -> Self {
        Self {
            line_starts: vec![0],
            stream: None,
        }
    }

    /// Number of line starts currently known to be exact.
    pub(crate) fn valid_len(&self) -> usize {
        self.line_starts.len()
    }

    /// Forget every line start after `line`.
    pub(crate) fn invalidate_after(&mut self, line: usize) {
        self.line_starts.truncate(line + 1);
        if self.line_starts.is_empty() {
            self.line_starts.push(0);
        }
    }

    fn extend_to(&mut self, lines: &[ContentLine], line: usize) {
        while self.line_starts.len() <= line {
            let prev = self.line_starts.len() - 1;
            let next = self.line_starts[prev] + lines[prev].len() + 1;
            self.line_starts.push(next);
        }
    }

    /// Start offset of `line`. The caller guarantees `line < lines.len()`.
    pub(crate) fn line_start(&mut self, lines: &[ContentLine], line: usize) -> usize {
        self.extend_to(lines, line);
        self.line_starts[line]
    }

    /// Resolve a linear index. The caller guarantees `index <= total_len`.
    pub(crate) fn position_of(&mut self, lines: &[ContentLine], index: usize) -> CharPosition {
        let last = lines.len() - 1;
        // Extend until the table covers `index` or reaches the last line.
        while self.line_starts.len() <= last
            && self.line_starts[self.line_starts.len() - 1] <= index
        {
            let len = self.line_starts.len();
            self.extend_to(lines, len);
        }
        let line = self
            .line_starts
            .partition_point(|start| *start <= index)
            .saturating_sub(1);
        CharPosition::new(index, line, index - self.line_starts[line])
    }

    pub(crate) fn begin_stream(&mut self, position: CharPosition, revision: u64) {
        self.stream = Some(StreamCursor { position, revision });
    }

    pub(crate) fn end_stream(&mut self) {
        self.stream = None;
    }

    /// Move the stream cursor to `index` and return the character there.
    ///
    /// Stepping by one in either direction is O(1); larger jumps walk line by line.
    pub(crate) fn stream_char_at(
        &mut self,
        lines: &[ContentLine],
        total_len: usize,
        index: usize,
        revision: u64,
    ) -> Result<char> {
        let cursor = match self.stream {
            Some(cursor) if cursor.revision == revision => cursor,
            _ => return Err(ContentError::StaleCache),
        };
        if index >= total_len {
            return Err(OutOfRange::Index {
                index,
                len: total_len,
            }
            .into());
        }

        let mut pos = cursor.position;
        while pos.index < index {
            let remaining = lines[pos.line].len() - pos.column;
            let step = index - pos.index;
            if step <= remaining {
                pos.column += step;
                pos.index += step;
            } else {
                pos.index += remaining + 1;
                pos.line += 1;
                pos.column = 0;
            }
        }
        while pos.index > index {
            let step = pos.index - index;
            if step <= pos.column {
                pos.column -= step;
                pos.index -= step;
            } else {
                pos.index -= pos.column + 1;
                pos.line -= 1;
                pos.column = lines[pos.line].len();
            }
        }

        self.stream = Some(StreamCursor {
            position: pos,
            revision,
        });
        let line = &lines[pos.line];
        if pos.column == line.len() {
            Ok('\n')
        } else {
            line.char_at(pos.column)
                .ok_or(ContentError::OutOfRange(OutOfRange::Index {
                    index,
                    len: total_len,
                }))
        }
    }
}
