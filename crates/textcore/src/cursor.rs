//! The caret and selection of one document.
//!
//! A [`Cursor`] is a cheap, cloneable handle to a [`Selection`] that stays valid while the
//! document changes. [`Content::cursor`] registers a [`CursorTracker`] that moves both ends
//! of the selection on every edit:
//!
//! - an insertion at or before an end pushes that end forward, so typing at the caret moves it
//! - a deletion pulls each end back by the deleted chars that preceded it, clamping ends that
//!   were inside the deleted range to its start

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::content::{Content, ContentListener, ListenerId};
use crate::diagnostics::offset_after_delete;
use crate::error::Result;
use crate::position::{CharPosition, Position};
use crate::text::normalized_char_count;

/// Which end of a selection the user is extending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionDirection {
    /// No selection, or the direction is unknown.
    #[default]
    None,
    /// Anchored at the left end; the right end moves.
    LeftToRight,
    /// Anchored at the right end; the left end moves.
    RightToLeft,
}

/// A selected range `left..right`, or a caret when both ends coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    left: CharPosition,
    right: CharPosition,
    direction: SelectionDirection,
}

impl Selection {
    /// A caret (empty selection) at `position`.
    pub fn caret(position: CharPosition) -> Self {
        Self {
            left: position,
            right: position,
            direction: SelectionDirection::None,
        }
    }

    /// Left end.
    pub fn left(&self) -> CharPosition {
        self.left
    }

    /// Right end.
    pub fn right(&self) -> CharPosition {
        self.right
    }

    /// Which end is being extended.
    pub fn direction(&self) -> SelectionDirection {
        self.direction
    }

    /// Returns `true` if any text is selected.
    pub fn is_selected(&self) -> bool {
        self.left.index != self.right.index
    }

    /// The selected range as `(start, end)` positions.
    pub fn range(&self) -> (Position, Position) {
        (self.left.position(), self.right.position())
    }

    /// Whether the character at `(line, column)` is selected.
    pub fn contains(&self, line: usize, column: usize) -> bool {
        let at = Position::new(line, column);
        at >= self.left.position() && at < self.right.position()
    }

    fn shift_on_insert(&mut self, content: &Content, at: usize, len: usize) -> Result<()> {
        if self.left.index >= at {
            self.left = content.char_position(self.left.index + len)?;
        }
        if self.right.index >= at {
            self.right = content.char_position(self.right.index + len)?;
        }
        Ok(())
    }

    fn shift_on_delete(&mut self, content: &Content, start: usize, end: usize) -> Result<()> {
        if start > self.right.index {
            return Ok(());
        }
        if self.left.index > start {
            self.left = content.char_position(offset_after_delete(self.left.index, start, end))?;
        }
        self.right = content.char_position(offset_after_delete(self.right.index, start, end))?;
        Ok(())
    }
}

/// Shared handle to the selection of one document.
///
/// Obtain one from [`Content::cursor`]; clones observe the same selection. Dropping every
/// handle does not unregister the tracker; use [`Content::remove_listener`] with
/// [`Cursor::listener_id`] for that.
#[derive(Debug, Clone)]
pub struct Cursor {
    selection: Arc<RwLock<Selection>>,
    listener: ListenerId,
}

impl Cursor {
    /// Copy of the current selection.
    pub fn selection(&self) -> Selection {
        *self.selection.read()
    }

    /// Left end of the selection.
    pub fn left(&self) -> CharPosition {
        self.selection.read().left
    }

    /// Right end of the selection.
    pub fn right(&self) -> CharPosition {
        self.selection.read().right
    }

    /// Returns `true` if any text is selected.
    pub fn is_selected(&self) -> bool {
        self.selection.read().is_selected()
    }

    /// Listener that keeps this cursor in step with its document.
    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }

    /// Collapse the selection to a caret at `(line, column)`.
    pub fn set(&self, content: &Content, line: usize, column: usize) -> Result<()> {
        let position = content.char_position_at(line, column)?;
        *self.selection.write() = Selection::caret(position);
        Ok(())
    }

    /// Move only the left end.
    pub fn set_left(&self, content: &Content, line: usize, column: usize) -> Result<()> {
        let position = content.char_position_at(line, column)?;
        self.selection.write().left = position;
        Ok(())
    }

    /// Move only the right end.
    pub fn set_right(&self, content: &Content, line: usize, column: usize) -> Result<()> {
        let position = content.char_position_at(line, column)?;
        self.selection.write().right = position;
        Ok(())
    }

    /// Select from `anchor` to `focus`, in either order.
    ///
    /// The ends are stored sorted and the direction records which way the user selected.
    pub fn select(&self, content: &Content, anchor: Position, focus: Position) -> Result<()> {
        let anchor_at = content.char_position_at(anchor.line, anchor.column)?;
        let focus_at = content.char_position_at(focus.line, focus.column)?;
        let selection = if anchor_at.index <= focus_at.index {
            Selection {
                left: anchor_at,
                right: focus_at,
                direction: SelectionDirection::LeftToRight,
            }
        } else {
            Selection {
                left: focus_at,
                right: anchor_at,
                direction: SelectionDirection::RightToLeft,
            }
        };
        let selection = if selection.is_selected() {
            selection
        } else {
            Selection::caret(anchor_at)
        };
        *self.selection.write() = selection;
        Ok(())
    }

    /// Record which end of the selection is being extended.
    pub fn set_direction(&self, direction: SelectionDirection) {
        self.selection.write().direction = direction;
    }

    /// Position one character left of `position`, wrapping to the end of the previous line.
    pub fn left_of(content: &Content, position: Position) -> Position {
        match (position.column, position.line) {
            (0, 0) => position,
            (0, line) => Position::new(line - 1, content.column_count(line - 1).unwrap_or(0)),
            (column, line) => Position::new(line, column - 1),
        }
    }

    /// Position one character right of `position`, wrapping to the start of the next line.
    pub fn right_of(content: &Content, position: Position) -> Position {
        let columns = content.column_count(position.line).unwrap_or(0);
        if position.column < columns {
            Position::new(position.line, position.column + 1)
        } else if position.line + 1 < content.line_count() {
            Position::new(position.line + 1, 0)
        } else {
            Position::new(position.line, columns)
        }
    }
}

/// Moves a [`Cursor`]'s selection across the edits of its document.
pub struct CursorTracker {
    selection: Arc<RwLock<Selection>>,
}

impl CursorTracker {
    fn start_index(content: &Content, start: Position) -> Option<usize> {
        match content.char_index(start.line, start.column) {
            Ok(index) => Some(index),
            Err(err) => {
                warn!(%err, "cannot resolve edit start for cursor");
                None
            }
        }
    }
}

impl ContentListener for CursorTracker {
    fn after_insert(&mut self, content: &Content, start: Position, _end: Position, text: &str) {
        let Some(index) = Self::start_index(content, start) else {
            return;
        };
        let mut selection = self.selection.write();
        if let Err(err) = selection.shift_on_insert(content, index, normalized_char_count(text)) {
            warn!(%err, "cursor fell outside the document");
        }
    }

    fn after_delete(&mut self, content: &Content, start: Position, _end: Position, text: &str) {
        let Some(index) = Self::start_index(content, start) else {
            return;
        };
        let end = index + normalized_char_count(text);
        let mut selection = self.selection.write();
        if let Err(err) = selection.shift_on_delete(content, index, end) {
            warn!(%err, "cursor fell outside the document");
        }
    }
}

impl Content {
    /// Create a caret at the start of the document that follows every later edit.
    pub fn cursor(&mut self) -> Cursor {
        let selection = Arc::new(RwLock::new(Selection::default()));
        let listener = self.add_listener(Box::new(CursorTracker {
            selection: Arc::clone(&selection),
        }));
        Cursor {
            selection,
            listener,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ends(cursor: &Cursor) -> (usize, usize) {
        (cursor.left().index, cursor.right().index)
    }

    #[test]
    fn test_left_of_and_right_of_wrap_lines() {
        let content = Content::from_text("ab\ncd");
        assert_eq!(
            Cursor::left_of(&content, Position::new(1, 0)),
            Position::new(0, 2)
        );
        assert_eq!(
            Cursor::left_of(&content, Position::new(0, 0)),
            Position::new(0, 0)
        );
        assert_eq!(
            Cursor::right_of(&content, Position::new(0, 2)),
            Position::new(1, 0)
        );
        assert_eq!(
            Cursor::right_of(&content, Position::new(1, 2)),
            Position::new(1, 2)
        );
    }

    #[test]
    fn test_select_sorts_ends() {
        let mut content = Content::from_text("hello world");
        let cursor = content.cursor();
        cursor
            .select(&content, Position::new(0, 8), Position::new(0, 2))
            .unwrap();
        assert_eq!(ends(&cursor), (2, 8));
        assert_eq!(
            cursor.selection().direction(),
            SelectionDirection::RightToLeft
        );
        assert!(cursor.selection().contains(0, 2));
        assert!(!cursor.selection().contains(0, 8));
    }

    #[test]
    fn test_removed_tracker_stops_following() {
        let mut content = Content::from_text("abc");
        let cursor = content.cursor();
        cursor.set(&content, 0, 1).unwrap();
        assert!(content.remove_listener(cursor.listener_id()));
        content.insert(0, 0, "xx").unwrap();
        assert_eq!(ends(&cursor), (1, 1));
    }
}
