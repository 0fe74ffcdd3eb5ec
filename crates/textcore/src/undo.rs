//! Undo/redo history.
//!
//! Every structural edit on a [`Content`] is recorded as a [`ContentAction`]. Adjacent typing
//! or deleting coalesces into one action, batch edits collapse into a single
//! [`MultiAction`], and the history is bounded by [`ContentConfig::max_undo_stack_size`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ContentConfig;
use crate::content::Content;
use crate::error::{ContentError, Result};
use crate::position::Position;

/// Limits applied when coalescing two actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeLimits {
    /// Maximum gap between the two actions.
    pub time_limit: Duration,
    /// Maximum char length of the merged text.
    pub text_limit: usize,
}

impl MergeLimits {
    /// Limits taken from a content config.
    pub fn from_config(config: &ContentConfig) -> Self {
        Self {
            time_limit: Duration::from_millis(config.merge_time_limit_ms),
            text_limit: config.merge_text_limit,
        }
    }
}

impl Default for MergeLimits {
    fn default() -> Self {
        Self::from_config(&ContentConfig::default())
    }
}

/// An insertion of `text` spanning `start..end` in the post-edit document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertAction {
    /// Insertion point.
    pub start: Position,
    /// End of the inserted text.
    pub end: Position,
    /// Inserted text, LF-separated.
    pub text: String,
    created: Instant,
}

/// A deletion of `text` that spanned `start..end` in the pre-edit document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAction {
    /// Start of the deleted range.
    pub start: Position,
    /// End of the deleted range.
    pub end: Position,
    /// Deleted text, LF-separated.
    pub text: String,
    created: Instant,
}

/// A replace: the deletion followed by the insertion at the same start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceAction {
    /// Removed part.
    pub delete: DeleteAction,
    /// Inserted part.
    pub insert: InsertAction,
}

/// Actions collected during one batch edit, applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiAction {
    /// Collected actions.
    pub actions: Vec<ContentAction>,
}

/// A recorded, invertible content edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentAction {
    /// Pure insertion.
    Insert(InsertAction),
    /// Pure deletion.
    Delete(DeleteAction),
    /// Deletion plus insertion at the same point.
    Replace(ReplaceAction),
    /// Batch of actions undone and redone together.
    Multi(MultiAction),
}

/// End position of `text` inserted at `start`.
pub(crate) fn end_of(start: Position, text: &str) -> Position {
    match text.rfind('\n') {
        None => Position::new(start.line, start.column + text.chars().count()),
        Some(last) => Position::new(
            start.line + text.matches('\n').count(),
            text[last + 1..].chars().count(),
        ),
    }
}

impl InsertAction {
    /// Create an insert action stamped now.
    pub fn new(start: Position, end: Position, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            created: Instant::now(),
        }
    }

    fn can_merge(&self, newer: &InsertAction, limits: &MergeLimits) -> bool {
        newer.start == self.end
            && newer.created.saturating_duration_since(self.created) < limits.time_limit
            && self.text.chars().count() + newer.text.chars().count() < limits.text_limit
    }
}

impl DeleteAction {
    /// Create a delete action stamped now.
    pub fn new(start: Position, end: Position, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            created: Instant::now(),
        }
    }

    fn can_merge(&self, newer: &DeleteAction, limits: &MergeLimits) -> bool {
        (newer.end == self.start || newer.start == self.start)
            && newer.created.saturating_duration_since(self.created) < limits.time_limit
            && self.text.chars().count() + newer.text.chars().count() < limits.text_limit
    }
}

impl ContentAction {
    /// Whether `newer` can be folded into `self`.
    pub fn can_merge(&self, newer: &ContentAction, limits: &MergeLimits) -> bool {
        match (self, newer) {
            (ContentAction::Insert(prev), ContentAction::Insert(next)) => {
                prev.can_merge(next, limits)
            }
            (ContentAction::Delete(prev), ContentAction::Delete(next)) => {
                prev.can_merge(next, limits)
            }
            _ => false,
        }
    }

    /// Fold `newer` into `self`.
    ///
    /// Fails with [`ContentError::IllegalMerge`] unless [`ContentAction::can_merge`] holds.
    pub fn merge(&mut self, newer: ContentAction, limits: &MergeLimits) -> Result<()> {
        self.try_merge(newer, limits).map_err(|_| ContentError::IllegalMerge)
    }

    /// Fold `newer` into `self`, handing it back untouched when the two cannot merge.
    pub(crate) fn try_merge(
        &mut self,
        newer: ContentAction,
        limits: &MergeLimits,
    ) -> std::result::Result<(), ContentAction> {
        if !self.can_merge(&newer, limits) {
            return Err(newer);
        }
        match (self, newer) {
            (ContentAction::Insert(prev), ContentAction::Insert(next)) => {
                prev.text.push_str(&next.text);
                prev.end = next.end;
                prev.created = next.created;
            }
            (ContentAction::Delete(prev), ContentAction::Delete(next)) => {
                if next.end == prev.start {
                    // Backspace run: the new text precedes the old one.
                    let mut text = next.text;
                    text.push_str(&prev.text);
                    prev.text = text;
                    prev.start = next.start;
                } else {
                    prev.text.push_str(&next.text);
                }
                prev.end = end_of(prev.start, &prev.text);
                prev.created = next.created;
            }
            (_, newer) => return Err(newer),
        }
        Ok(())
    }

    /// Revert this action on `content`.
    pub(crate) fn undo(&self, content: &mut Content) -> Result<()> {
        match self {
            ContentAction::Insert(action) => content.delete(action.start, action.end),
            ContentAction::Delete(action) => insert_at(content, action.start, &action.text),
            ContentAction::Replace(action) => {
                content.delete(action.insert.start, action.insert.end)?;
                insert_at(content, action.delete.start, &action.delete.text)
            }
            ContentAction::Multi(multi) => {
                for action in multi.actions.iter().rev() {
                    action.undo(content)?;
                }
                Ok(())
            }
        }
    }

    /// Re-apply this action on `content`.
    pub(crate) fn redo(&self, content: &mut Content) -> Result<()> {
        match self {
            ContentAction::Insert(action) => insert_at(content, action.start, &action.text),
            ContentAction::Delete(action) => content.delete(action.start, action.end),
            ContentAction::Replace(action) => {
                content.delete(action.delete.start, action.delete.end)?;
                insert_at(content, action.insert.start, &action.insert.text)
            }
            ContentAction::Multi(multi) => {
                for action in &multi.actions {
                    action.redo(content)?;
                }
                Ok(())
            }
        }
    }
}

fn insert_at(content: &mut Content, start: Position, text: &str) -> Result<()> {
    content.insert(start.line, start.column, text).map(|_| ())
}

impl MultiAction {
    /// Append an action, merging it into the last one when possible.
    pub fn push(&mut self, action: ContentAction, limits: &MergeLimits) {
        let action = match self.actions.last_mut() {
            Some(last) => match last.try_merge(action, limits) {
                Ok(()) => return,
                Err(action) => action,
            },
            None => action,
        };
        self.actions.push(action);
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, Default)]
struct PendingReplace {
    delete: Option<DeleteAction>,
    insert: Option<InsertAction>,
}

/// Undo/redo stacks of one document.
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: VecDeque<ContentAction>,
    redo_stack: VecDeque<ContentAction>,
    enabled: bool,
    max_size: usize,
    limits: MergeLimits,
    batch: Option<MultiAction>,
    replace: Option<PendingReplace>,
    modifying: bool,
}

impl UndoManager {
    /// Create a manager from a validated config.
    pub fn new(config: &ContentConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            enabled: config.undo_enabled,
            max_size: config.max_undo_stack_size.max(1),
            limits: MergeLimits::from_config(config),
            batch: None,
            replace: None,
            modifying: false,
        }
    }

    /// Whether edits are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable recording. Disabling clears both stacks.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.clear();
        }
    }

    /// Drop all history, including a pending batch.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        if let Some(batch) = self.batch.as_mut() {
            batch.actions.clear();
        }
        self.replace = None;
    }

    /// Maximum number of undo entries.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Bound the undo stack, evicting the oldest entries immediately.
    pub fn set_max_size(&mut self, max_size: usize) -> Result<()> {
        if max_size == 0 {
            return Err(ContentError::InvalidArgument(
                "max undo stack size must be greater than zero",
            ));
        }
        self.max_size = max_size;
        self.evict();
        Ok(())
    }

    /// Merge limits in effect.
    pub fn limits(&self) -> MergeLimits {
        self.limits
    }

    /// Number of undoable entries.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable entries.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether [`Content::undo`] would do something.
    pub fn can_undo(&self) -> bool {
        self.enabled && self.batch.is_none() && !self.undo_stack.is_empty()
    }

    /// Whether [`Content::redo`] would do something.
    pub fn can_redo(&self) -> bool {
        self.enabled && self.batch.is_none() && !self.redo_stack.is_empty()
    }

    /// Top of the undo stack.
    pub fn peek_undo(&self) -> Option<&ContentAction> {
        self.undo_stack.back()
    }

    /// Whether an undo or redo is currently being applied.
    pub fn is_modifying(&self) -> bool {
        self.modifying
    }

    fn recording(&self) -> bool {
        self.enabled && !self.modifying
    }

    pub(crate) fn set_modifying(&mut self, modifying: bool) {
        self.modifying = modifying;
    }

    pub(crate) fn begin_batch(&mut self) {
        if self.batch.is_none() {
            self.batch = Some(MultiAction::default());
        }
    }

    pub(crate) fn end_batch(&mut self) {
        let Some(mut batch) = self.batch.take() else {
            return;
        };
        let action = match batch.actions.len() {
            0 => return,
            1 => batch.actions.pop(),
            _ => Some(ContentAction::Multi(batch)),
        };
        if let Some(action) = action {
            debug!(depth = self.undo_stack.len() + 1, "commit batch edit");
            self.push_entry(action);
        }
    }

    pub(crate) fn begin_replace(&mut self) {
        if self.recording() {
            self.replace = Some(PendingReplace::default());
        }
    }

    pub(crate) fn end_replace(&mut self) {
        let Some(pending) = self.replace.take() else {
            return;
        };
        let action = match (pending.delete, pending.insert) {
            (Some(delete), Some(insert)) => {
                ContentAction::Replace(ReplaceAction { delete, insert })
            }
            (Some(delete), None) => ContentAction::Delete(delete),
            (None, Some(insert)) => ContentAction::Insert(insert),
            (None, None) => return,
        };
        self.record(action);
    }

    pub(crate) fn record_insert(&mut self, start: Position, end: Position, text: &str) {
        if !self.recording() {
            return;
        }
        let action = InsertAction::new(start, end, text);
        match self.replace.as_mut() {
            Some(pending) => pending.insert = Some(action),
            None => self.record(ContentAction::Insert(action)),
        }
    }

    pub(crate) fn record_delete(&mut self, start: Position, end: Position, text: &str) {
        if !self.recording() {
            return;
        }
        let action = DeleteAction::new(start, end, text);
        match self.replace.as_mut() {
            Some(pending) => pending.delete = Some(action),
            None => self.record(ContentAction::Delete(action)),
        }
    }

    fn record(&mut self, action: ContentAction) {
        if let Some(batch) = self.batch.as_mut() {
            batch.push(action, &self.limits);
            return;
        }
        self.redo_stack.clear();
        let action = match self.undo_stack.back_mut() {
            Some(top) => match top.try_merge(action, &self.limits) {
                Ok(()) => return,
                Err(action) => action,
            },
            None => action,
        };
        self.undo_stack.push_back(action);
        self.evict();
    }

    fn push_entry(&mut self, action: ContentAction) {
        self.redo_stack.clear();
        self.undo_stack.push_back(action);
        self.evict();
    }

    fn evict(&mut self) {
        while self.undo_stack.len() > self.max_size {
            self.undo_stack.pop_front();
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<ContentAction> {
        if !self.can_undo() {
            return None;
        }
        self.undo_stack.pop_back()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<ContentAction> {
        if !self.can_redo() {
            return None;
        }
        self.redo_stack.pop_back()
    }

    pub(crate) fn push_undone(&mut self, action: ContentAction) {
        self.redo_stack.push_back(action);
    }

    pub(crate) fn push_redone(&mut self, action: ContentAction) {
        self.undo_stack.push_back(action);
        self.evict();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn insert(line: usize, column: usize, text: &str) -> ContentAction {
        let start = Position::new(line, column);
        ContentAction::Insert(InsertAction::new(start, end_of(start, text), text))
    }

    fn delete(start: (usize, usize), end: (usize, usize), text: &str) -> ContentAction {
        ContentAction::Delete(DeleteAction::new(start.into(), end.into(), text))
    }

    #[test]
    fn test_end_of_multiline_text() {
        assert_eq!(end_of(Position::new(2, 3), "ab"), Position::new(2, 5));
        assert_eq!(end_of(Position::new(2, 3), "ab\ncd\nx"), Position::new(4, 1));
        assert_eq!(end_of(Position::new(0, 0), "\n"), Position::new(1, 0));
    }

    #[test]
    fn test_insert_merge_requires_adjacency() {
        let limits = MergeLimits::default();
        let mut prev = insert(0, 0, "a");
        assert!(prev.can_merge(&insert(0, 1, "b"), &limits));
        assert!(!prev.can_merge(&insert(0, 5, "b"), &limits));
        prev.merge(insert(0, 1, "b"), &limits).unwrap();
        match &prev {
            ContentAction::Insert(action) => {
                assert_eq!(action.text, "ab");
                assert_eq!(action.end, Position::new(0, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_backspace_and_forward_delete_runs() {
        let limits = MergeLimits::default();
        let mut backspace = delete((0, 4), (0, 5), "e");
        backspace.merge(delete((0, 3), (0, 4), "d"), &limits).unwrap();
        let ContentAction::Delete(action) = &backspace else {
            unreachable!()
        };
        assert_eq!(action.text, "de");
        assert_eq!(action.start, Position::new(0, 3));
        assert_eq!(action.end, Position::new(0, 5));

        let mut forward = delete((1, 0), (1, 1), "x");
        forward.merge(delete((1, 0), (2, 0), "\n"), &limits).unwrap();
        let ContentAction::Delete(action) = &forward else {
            unreachable!()
        };
        assert_eq!(action.text, "x\n");
        assert_eq!(action.end, Position::new(2, 0));
    }

    #[test]
    fn test_illegal_merge() {
        let limits = MergeLimits::default();
        let mut prev = insert(0, 0, "a");
        let err = prev.merge(delete((0, 0), (0, 1), "a"), &limits).unwrap_err();
        assert!(matches!(err, ContentError::IllegalMerge));
    }

    #[test]
    fn test_merge_respects_text_limit() {
        let limits = MergeLimits {
            time_limit: Duration::from_secs(60),
            text_limit: 3,
        };
        let prev = insert(0, 0, "ab");
        assert!(!prev.can_merge(&insert(0, 2, "c"), &limits));
    }

    #[test]
    fn test_eviction_and_zero_bound() {
        let mut manager = UndoManager::new(&ContentConfig::default());
        manager.set_max_size(2).unwrap();
        for line in 0..4 {
            manager.record_insert(Position::new(line, 0), Position::new(line, 1), "x");
        }
        assert_eq!(manager.undo_depth(), 2);
        assert!(matches!(
            manager.set_max_size(0),
            Err(ContentError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_batch_records_nothing() {
        let mut manager = UndoManager::new(&ContentConfig::default());
        manager.begin_batch();
        assert!(!manager.can_undo());
        manager.end_batch();
        assert_eq!(manager.undo_depth(), 0);
    }

    #[test]
    fn test_rejected_merge_hands_action_back() {
        let limits = MergeLimits::default();
        let mut prev = insert(0, 0, "a");
        match prev.try_merge(insert(0, 7, "b"), &limits) {
            Err(ContentAction::Insert(action)) => {
                assert_eq!(action.text, "b");
                assert_eq!(action.start, Position::new(0, 7));
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut multi = MultiAction::default();
        multi.push(insert(0, 0, "a"), &limits);
        multi.push(insert(0, 1, "b"), &limits);
        multi.push(delete((0, 0), (0, 1), "a"), &limits);
        assert_eq!(multi.actions.len(), 2);
    }
}
