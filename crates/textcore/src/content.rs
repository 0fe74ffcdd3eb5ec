//! The line store.
//!
//! [`Content`] owns the document as a vector of [`ContentLine`]s (at least one). All structural
//! mutations go through [`Content::insert`], [`Content::delete`] and [`Content::replace`]; each
//! one invalidates the indexer from the edited line on, records an undo action and then
//! notifies the registered [`ContentListener`]s synchronously, in edit order.

use std::cell::RefCell;

use tracing::{debug, trace};

use crate::config::ContentConfig;
use crate::error::{ContentError, OutOfRange, Result};
use crate::indexer::Indexer;
use crate::line::ContentLine;
use crate::line_ending::LineEnding;
use crate::position::{CharPosition, Position};
use crate::text::{normalized_char_count, split_lines};
use crate::undo::UndoManager;

/// Observer of content mutations.
///
/// Callbacks run on the editing thread right after the mutation is applied and receive the
/// document read-only; they must not try to edit it.
pub trait ContentListener {
    /// Called once before the delete+insert pair of a [`Content::replace`].
    fn before_replace(&mut self, _content: &Content) {}

    /// Called after `text` was inserted, now spanning `start..end`.
    fn after_insert(&mut self, content: &Content, start: Position, end: Position, text: &str);

    /// Called after `text`, which spanned `start..end`, was deleted.
    fn after_delete(&mut self, content: &Content, start: Position, end: Position, text: &str);

    /// Called for each whole line a delete removed, before [`ContentListener::after_delete`].
    ///
    /// `line` is the index the removed line had before the edit.
    fn after_line_removed(&mut self, _content: &Content, _line: usize, _removed: &ContentLine) {}

    /// Called when the outermost batch edit closes.
    fn after_batch_edit(&mut self, _content: &Content) {}
}

/// Handle returned by [`Content::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A mutable, line-indexed text document.
pub struct Content {
    lines: Vec<ContentLine>,
    text_len: usize,
    line_ending: LineEnding,
    indexer: RefCell<Indexer>,
    undo: UndoManager,
    listeners: Vec<(ListenerId, Box<dyn ContentListener + Send>)>,
    next_listener_id: u64,
    batch_depth: usize,
    modification_count: u64,
    config: ContentConfig,
}

impl Content {
    /// Create an empty document (one empty line).
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create a document from `text` with the default config.
    pub fn from_text(text: &str) -> Self {
        Self::build(text, ContentConfig::default())
    }

    /// Create a document from `text` with `config`.
    pub fn with_config(text: &str, config: ContentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(text, config))
    }

    fn build(text: &str, config: ContentConfig) -> Self {
        let segments = split_lines(text);
        let mut lines = Vec::with_capacity(config.initial_line_capacity.max(segments.len()));
        lines.extend(segments.iter().map(|s| ContentLine::from_text(*s)));
        Self::from_lines(lines, LineEnding::detect_in_text(text), config)
    }

    /// Assemble a document from already split lines. An empty `lines` yields one empty line.
    pub(crate) fn from_lines(
        mut lines: Vec<ContentLine>,
        line_ending: LineEnding,
        config: ContentConfig,
    ) -> Self {
        if lines.is_empty() {
            lines.push(ContentLine::new());
        }
        let text_len = lines.iter().map(ContentLine::len).sum::<usize>() + lines.len() - 1;

        Self {
            lines,
            text_len,
            line_ending,
            indexer: RefCell::new(Indexer::new()),
            undo: UndoManager::new(&config),
            listeners: Vec::new(),
            next_listener_id: 0,
            batch_depth: 0,
            modification_count: 0,
            config,
        }
    }

    /// The config this document was created with.
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    // ---------------------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------------------

    /// Number of lines (always at least 1).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total length in chars, counting one char per line break.
    pub fn len(&self) -> usize {
        self.text_len
    }

    /// Returns `true` if the document holds a single empty line.
    pub fn is_empty(&self) -> bool {
        self.text_len == 0
    }

    /// Structural edit counter. Increases on every applied insert or delete.
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    /// Line ending used by [`Content::text_for_saving`].
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Override the line ending used for saving.
    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    /// The stored line at `line`.
    pub fn line(&self, line: usize) -> Result<&ContentLine> {
        self.lines.get(line).ok_or(ContentError::OutOfRange(OutOfRange::Line {
            line,
            line_count: self.lines.len(),
        }))
    }

    /// All stored lines.
    pub fn lines(&self) -> &[ContentLine] {
        &self.lines
    }

    /// Text of `line`, without separator.
    pub fn line_text(&self, line: usize) -> Result<&str> {
        self.line(line).map(ContentLine::as_str)
    }

    /// Column count of `line`.
    pub fn column_count(&self, line: usize) -> Result<usize> {
        self.line(line).map(ContentLine::len)
    }

    /// Character at `(line, column)`.
    ///
    /// The column right after the last character of a non-last line is its line break and
    /// yields `'\n'`.
    pub fn char_at(&self, line: usize, column: usize) -> Result<char> {
        let stored = self.line(line)?;
        if column < stored.len() {
            if let Some(ch) = stored.char_at(column) {
                return Ok(ch);
            }
        } else if column == stored.len() && line + 1 < self.lines.len() {
            return Ok('\n');
        }
        Err(OutOfRange::Column {
            line,
            column,
            column_count: stored.len(),
        }
        .into())
    }

    /// Character at a linear index.
    pub fn char_at_index(&self, index: usize) -> Result<char> {
        if index >= self.text_len {
            return Err(OutOfRange::Index {
                index,
                len: self.text_len,
            }
            .into());
        }
        let pos = self.char_position(index)?;
        self.char_at(pos.line, pos.column)
    }

    /// Validate that `position` addresses an existing line and column.
    pub fn check_position(&self, position: Position) -> Result<()> {
        let stored = self.line(position.line)?;
        if position.column > stored.len() {
            return Err(OutOfRange::Column {
                line: position.line,
                column: position.column,
                column_count: stored.len(),
            }
            .into());
        }
        Ok(())
    }

    fn check_range(&self, start: Position, end: Position) -> Result<()> {
        self.check_position(start)?;
        self.check_position(end)?;
        if start > end {
            return Err(ContentError::InvalidRange { start, end });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index > self.text_len {
            return Err(OutOfRange::Index {
                index,
                len: self.text_len,
            }
            .into());
        }
        Ok(())
    }

    /// LF-joined text of `start..end`. The range must be valid.
    fn text_between(&self, start: Position, end: Position) -> String {
        if start.line == end.line {
            return self.lines[start.line]
                .slice(start.column, end.column)
                .to_string();
        }
        let first = &self.lines[start.line];
        let mut out = String::from(first.slice(start.column, first.len()));
        for line in &self.lines[start.line + 1..end.line] {
            out.push('\n');
            out.push_str(line.as_str());
        }
        out.push('\n');
        out.push_str(self.lines[end.line].slice(0, end.column));
        out
    }

    /// Independent copy of `start..end`, preserving line structure.
    pub fn sub_content(&self, start: Position, end: Position) -> Result<Content> {
        self.check_range(start, end)?;
        let mut content = Self::build(&self.text_between(start, end), self.config.clone());
        content.line_ending = self.line_ending;
        Ok(content)
    }

    /// LF-joined text between two linear indices.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Result<String> {
        let (start, end) = self.positions_of(start, end)?;
        Ok(self.text_between(start, end))
    }

    /// The whole text joined with the document line ending.
    pub fn text_for_saving(&self) -> String {
        self.line_ending.apply_to_text(&self.to_string())
    }

    // ---------------------------------------------------------------------------------------
    // Indexer
    // ---------------------------------------------------------------------------------------

    /// Linear index of `(line, column)`.
    pub fn char_index(&self, line: usize, column: usize) -> Result<usize> {
        self.check_position(Position::new(line, column))?;
        Ok(self.indexer.borrow_mut().line_start(&self.lines, line) + column)
    }

    /// Resolve a linear index in `[0, len()]`.
    pub fn char_position(&self, index: usize) -> Result<CharPosition> {
        self.check_index(index)?;
        Ok(self.indexer.borrow_mut().position_of(&self.lines, index))
    }

    /// Resolve `(line, column)` into a full char position.
    pub fn char_position_at(&self, line: usize, column: usize) -> Result<CharPosition> {
        let index = self.char_index(line, column)?;
        Ok(CharPosition::new(index, line, column))
    }

    /// Line containing a linear index.
    pub fn char_line(&self, index: usize) -> Result<usize> {
        self.char_position(index).map(|pos| pos.line)
    }

    /// Column of a linear index.
    pub fn char_column(&self, index: usize) -> Result<usize> {
        self.char_position(index).map(|pos| pos.column)
    }

    fn positions_of(&self, start: usize, end: usize) -> Result<(Position, Position)> {
        let start = self.char_position(start)?.position();
        let end = self.char_position(end)?.position();
        if start > end {
            return Err(ContentError::InvalidRange { start, end });
        }
        Ok((start, end))
    }

    /// Start a sequential scan at `index`.
    ///
    /// [`Content::stream_char_at`] is O(1) for neighbouring indices until the next edit.
    pub fn begin_stream_char_getting(&self, index: usize) -> Result<()> {
        let position = self.char_position(index)?;
        self.indexer
            .borrow_mut()
            .begin_stream(position, self.modification_count);
        Ok(())
    }

    /// Character at `index` through the stream cursor.
    ///
    /// Fails with [`ContentError::StaleCache`] when no stream is active or an edit happened
    /// since [`Content::begin_stream_char_getting`].
    pub fn stream_char_at(&self, index: usize) -> Result<char> {
        self.indexer.borrow_mut().stream_char_at(
            &self.lines,
            self.text_len,
            index,
            self.modification_count,
        )
    }

    /// Release the stream cursor.
    pub fn end_stream_char_getting(&self) {
        self.indexer.borrow_mut().end_stream();
    }

    // ---------------------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------------------

    /// Insert `text` at `(line, column)` and return the end of the inserted text.
    ///
    /// `text` may contain any mix of `\n`, `\r\n` and `\r`; they are stored as line breaks.
    pub fn insert(&mut self, line: usize, column: usize, text: &str) -> Result<Position> {
        let start = Position::new(line, column);
        self.check_position(start)?;
        if text.is_empty() {
            return Ok(start);
        }

        let segments = split_lines(text);
        let end = if let [single] = segments.as_slice() {
            self.lines[line].insert_str(column, single);
            Position::new(line, column + single.chars().count())
        } else {
            let tail = self.lines[line].split_off(column);
            self.lines[line].push_str(segments[0]);
            let last_index = segments.len() - 1;
            let mut last = ContentLine::from_text(segments[last_index]);
            let end_column = last.len();
            last.push_str(tail.as_str());
            let inserted = segments[1..last_index]
                .iter()
                .map(|s| ContentLine::from_text(*s))
                .chain(std::iter::once(last));
            self.lines.splice(line + 1..line + 1, inserted);
            Position::new(line + last_index, end_column)
        };

        let normalized = segments.join("\n");
        self.text_len += normalized_char_count(&normalized);
        self.after_mutation(line);
        trace!(line, column, end_line = end.line, end_column = end.column, "insert");

        self.undo.record_insert(start, end, &normalized);
        self.dispatch(|listener, content| {
            listener.after_insert(content, start, end, &normalized)
        });
        Ok(end)
    }

    /// Insert `text` at a linear index.
    pub fn insert_at(&mut self, index: usize, text: &str) -> Result<Position> {
        let pos = self.char_position(index)?;
        self.insert(pos.line, pos.column, text)
    }

    /// Delete `start..end`.
    ///
    /// Fails with [`ContentError::InvalidRange`] if `end` precedes `start`. An empty range is
    /// a no-op.
    pub fn delete(&mut self, start: Position, end: Position) -> Result<()> {
        self.check_range(start, end)?;
        if start == end {
            return Ok(());
        }

        let deleted = self.text_between(start, end);
        let mut removed = Vec::new();
        if start.line == end.line {
            self.lines[start.line].remove_range(start.column, end.column);
        } else {
            let end_line = &self.lines[end.line];
            let tail = end_line.slice(end.column, end_line.len()).to_string();
            let head = &mut self.lines[start.line];
            let head_len = head.len();
            head.remove_range(start.column, head_len);
            head.push_str(&tail);
            let drained = self.lines.drain(start.line + 1..=end.line);
            if !self.listeners.is_empty() {
                removed = drained.collect();
            }
        }

        self.text_len -= normalized_char_count(&deleted);
        self.after_mutation(start.line);
        trace!(
            line = start.line,
            column = start.column,
            end_line = end.line,
            end_column = end.column,
            "delete"
        );

        self.undo.record_delete(start, end, &deleted);
        for (offset, line) in removed.iter().enumerate() {
            let index = start.line + 1 + offset;
            self.dispatch(|listener, content| listener.after_line_removed(content, index, line));
        }
        self.dispatch(|listener, content| listener.after_delete(content, start, end, &deleted));
        Ok(())
    }

    /// Delete between two linear indices.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<()> {
        let (start, end) = self.positions_of(start, end)?;
        self.delete(start, end)
    }

    /// Replace `start..end` with `text`, recorded as one undo action.
    pub fn replace(&mut self, start: Position, end: Position, text: &str) -> Result<Position> {
        self.check_range(start, end)?;
        if start == end && text.is_empty() {
            return Ok(start);
        }
        self.dispatch(|listener, content| listener.before_replace(content));

        self.undo.begin_replace();
        let result = self
            .delete(start, end)
            .and_then(|()| self.insert(start.line, start.column, text));
        self.undo.end_replace();
        result
    }

    /// Replace between two linear indices.
    pub fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<Position> {
        let (start, end) = self.positions_of(start, end)?;
        self.replace(start, end, text)
    }

    fn after_mutation(&mut self, line: usize) {
        self.indexer.get_mut().invalidate_after(line);
        self.modification_count += 1;
    }

    // ---------------------------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------------------------

    /// Register a listener. Listeners are notified in registration order.
    pub fn add_listener(&mut self, listener: Box<dyn ContentListener + Send>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn dispatch<F>(&mut self, mut notify: F)
    where
        F: FnMut(&mut dyn ContentListener, &Content),
    {
        if self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            notify(listener.as_mut(), self);
        }
        self.listeners = listeners;
    }

    // ---------------------------------------------------------------------------------------
    // Batch edits and undo
    // ---------------------------------------------------------------------------------------

    /// Open a (nestable) batch edit. Returns `true` while a batch is open.
    pub fn begin_batch_edit(&mut self) -> bool {
        self.batch_depth += 1;
        if self.batch_depth == 1 {
            self.undo.begin_batch();
        }
        true
    }

    /// Close a batch edit. The outermost close commits one undo entry and fires
    /// [`ContentListener::after_batch_edit`]. Returns whether a batch is still open.
    pub fn end_batch_edit(&mut self) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.undo.end_batch();
            self.dispatch(|listener, content| listener.after_batch_edit(content));
        }
        self.batch_depth > 0
    }

    /// Close every open batch level at once, for callers that lost track of a matching
    /// [`Content::end_batch_edit`]. Does nothing when no batch is open.
    pub fn reset_batch_edit(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        debug!(depth = self.batch_depth, "reset batch edit");
        self.batch_depth = 0;
        self.undo.end_batch();
        self.dispatch(|listener, content| listener.after_batch_edit(content));
    }

    /// Whether a batch edit is open.
    pub fn is_in_batch_edit(&self) -> bool {
        self.batch_depth > 0
    }

    /// The undo history.
    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    /// Whether [`Content::undo`] would revert something.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Whether [`Content::redo`] would re-apply something.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Enable or disable undo recording. Disabling clears the history.
    pub fn set_undo_enabled(&mut self, enabled: bool) {
        self.undo.set_enabled(enabled);
    }

    /// Whether undo recording is enabled.
    pub fn is_undo_enabled(&self) -> bool {
        self.undo.is_enabled()
    }

    /// Bound the undo history. Zero is rejected.
    pub fn set_max_undo_stack_size(&mut self, max_size: usize) -> Result<()> {
        self.undo.set_max_size(max_size)
    }

    /// Whether an undo or redo is being applied right now.
    pub fn is_modifying_content(&self) -> bool {
        self.undo.is_modifying()
    }

    /// Revert the last undo entry. Returns `false` if nothing was undone.
    pub fn undo(&mut self) -> Result<bool> {
        if self.is_in_batch_edit() {
            return Ok(false);
        }
        let Some(action) = self.undo.pop_undo() else {
            return Ok(false);
        };

        self.undo.set_modifying(true);
        let applied = action.undo(self);
        self.undo.set_modifying(false);
        applied?;

        self.undo.push_undone(action);
        debug!(
            undo_depth = self.undo.undo_depth(),
            redo_depth = self.undo.redo_depth(),
            "undo"
        );
        Ok(true)
    }

    /// Re-apply the last undone entry. Returns `false` if nothing was redone.
    pub fn redo(&mut self) -> Result<bool> {
        if self.is_in_batch_edit() {
            return Ok(false);
        }
        let Some(action) = self.undo.pop_redo() else {
            return Ok(false);
        };

        self.undo.set_modifying(true);
        let applied = action.redo(self);
        self.undo.set_modifying(false);
        applied?;

        self.undo.push_redone(action);
        debug!(
            undo_depth = self.undo.undo_depth(),
            redo_depth = self.undo.redo_depth(),
            "redo"
        );
        Ok(true)
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("line_count", &self.lines.len())
            .field("len", &self.text_len)
            .field("line_ending", &self.line_ending)
            .field("modification_count", &self.modification_count)
            .field("batch_depth", &self.batch_depth)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl std::fmt::Display for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line.as_str())?;
        }
        Ok(())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}
