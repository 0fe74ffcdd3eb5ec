//! Diagnostics anchored to character offsets.
//!
//! Diagnostics come from an external source (compiler, linter, language server) and are not
//! regenerated by analysis. Instead, each region is shifted in place as edits land:
//!
//! - an insertion inside a region grows it; an insertion before it moves it
//! - a deletion shrinks the overlapped part and moves what follows; regions that collapse to
//!   nothing are dropped
//!
//! Shifts are not commutative, so they must be applied in edit order. [`DiagnosticsShifter`]
//! does that as a [`ContentListener`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::content::{Content, ContentListener};
use crate::position::Position;
use crate::text::normalized_char_count;

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    /// Error diagnostics.
    Error,
    /// Warning diagnostics.
    Warning,
    /// Informational diagnostics.
    Information,
    /// Hint diagnostics.
    Hint,
}

/// A half-open character-offset range (`start..end`) carrying a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRegion {
    /// Range start offset (inclusive), in chars from the start of the document.
    pub start: usize,
    /// Range end offset (exclusive).
    pub end: usize,
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// Caller-assigned identifier.
    pub id: u64,
}

impl DiagnosticRegion {
    /// Create a new region.
    pub fn new(start: usize, end: usize, severity: DiagnosticSeverity, id: u64) -> Self {
        Self {
            start,
            end,
            severity,
            id,
        }
    }

    /// Returns `true` if the region covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    fn shift_on_insert(&mut self, insert_start: usize, len: usize) {
        if self.start > insert_start {
            self.start += len;
            self.end += len;
        } else if self.end > insert_start {
            self.end += len;
        }
    }

    /// Returns `false` if the region collapsed and should be dropped.
    fn shift_on_delete(&mut self, delete_start: usize, delete_end: usize) -> bool {
        let was_empty = self.is_empty();
        self.start = offset_after_delete(self.start, delete_start, delete_end);
        self.end = offset_after_delete(self.end, delete_start, delete_end);
        was_empty || !self.is_empty()
    }
}

/// Where `offset` lands once the chars `delete_start..delete_end` are gone.
pub(crate) fn offset_after_delete(offset: usize, delete_start: usize, delete_end: usize) -> usize {
    offset - (offset.clamp(delete_start, delete_end) - delete_start)
}

/// A set of diagnostic regions, safe to query and shift from several threads.
///
/// Every operation runs under one lock, so readers never see a partially shifted set.
#[derive(Debug, Default)]
pub struct DiagnosticsContainer {
    regions: RwLock<Vec<DiagnosticRegion>>,
}

impl DiagnosticsContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one region.
    pub fn add_diagnostic(&self, region: DiagnosticRegion) {
        self.regions.write().push(region);
    }

    /// Add several regions.
    pub fn add_diagnostics(&self, regions: impl IntoIterator<Item = DiagnosticRegion>) {
        self.regions.write().extend(regions);
    }

    /// Replace every region.
    pub fn set_diagnostics(&self, regions: Vec<DiagnosticRegion>) {
        *self.regions.write() = regions;
    }

    /// Remove all regions with `id`. Returns how many were removed.
    pub fn remove(&self, id: u64) -> usize {
        let mut regions = self.regions.write();
        let before = regions.len();
        regions.retain(|region| region.id != id);
        before - regions.len()
    }

    /// Drop every region.
    pub fn reset(&self) {
        self.regions.write().clear();
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.read().len()
    }

    /// Returns `true` if there are no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.read().is_empty()
    }

    /// Copy of every region.
    pub fn all(&self) -> Vec<DiagnosticRegion> {
        self.regions.read().clone()
    }

    /// Regions overlapping `start..end`, sorted by start offset.
    ///
    /// Empty regions match when they sit inside the queried range.
    pub fn query_range(&self, start: usize, end: usize) -> Vec<DiagnosticRegion> {
        let mut hits: Vec<DiagnosticRegion> = self
            .regions
            .read()
            .iter()
            .filter(|region| {
                if region.is_empty() {
                    region.start >= start && region.start <= end
                } else {
                    region.start < end && region.end > start
                }
            })
            .copied()
            .collect();
        hits.sort_by_key(|region| (region.start, region.end));
        hits
    }

    /// Adjust regions for `insert_end - insert_start` chars inserted at `insert_start`.
    pub fn shift_on_insert(&self, insert_start: usize, insert_end: usize) {
        let len = insert_end.saturating_sub(insert_start);
        if len == 0 {
            return;
        }
        let mut regions = self.regions.write();
        for region in regions.iter_mut() {
            region.shift_on_insert(insert_start, len);
        }
    }

    /// Adjust regions for the chars `delete_start..delete_end` being deleted.
    pub fn shift_on_delete(&self, delete_start: usize, delete_end: usize) {
        if delete_end <= delete_start {
            return;
        }
        let mut regions = self.regions.write();
        let before = regions.len();
        regions.retain_mut(|region| region.shift_on_delete(delete_start, delete_end));
        let dropped = before - regions.len();
        if dropped > 0 {
            trace!(dropped, delete_start, delete_end, "collapsed diagnostics dropped");
        }
    }
}

/// Keeps a [`DiagnosticsContainer`] in sync with the edits of one document.
pub struct DiagnosticsShifter {
    container: Arc<DiagnosticsContainer>,
}

impl DiagnosticsShifter {
    /// Shift `container` on every edit of the document this listener is added to.
    pub fn new(container: Arc<DiagnosticsContainer>) -> Self {
        Self { container }
    }

    fn start_index(content: &Content, start: Position) -> Option<usize> {
        match content.char_index(start.line, start.column) {
            Ok(index) => Some(index),
            Err(err) => {
                warn!(%err, "cannot resolve edit start for diagnostics");
                None
            }
        }
    }
}

impl ContentListener for DiagnosticsShifter {
    fn after_insert(&mut self, content: &Content, start: Position, _end: Position, text: &str) {
        if let Some(index) = Self::start_index(content, start) {
            self.container
                .shift_on_insert(index, index + normalized_char_count(text));
        }
    }

    fn after_delete(&mut self, content: &Content, start: Position, _end: Position, text: &str) {
        if let Some(index) = Self::start_index(content, start) {
            self.container
                .shift_on_delete(index, index + normalized_char_count(text));
        }
    }
}

/// Diagnostics containers keyed by document URI.
///
/// An external source publishes regions per URI; documents attach a [`DiagnosticsShifter`]
/// to the container of their URI.
#[derive(Debug, Default)]
pub struct DiagnosticsFeed {
    containers: RwLock<HashMap<String, Arc<DiagnosticsContainer>>>,
}

impl DiagnosticsFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Container for `uri`, created on first use.
    pub fn container(&self, uri: &str) -> Arc<DiagnosticsContainer> {
        if let Some(container) = self.containers.read().get(uri) {
            return Arc::clone(container);
        }
        Arc::clone(
            self.containers
                .write()
                .entry(uri.to_string())
                .or_default(),
        )
    }

    /// Replace the regions published for `uri`.
    pub fn publish(&self, uri: &str, regions: Vec<DiagnosticRegion>) {
        self.container(uri).set_diagnostics(regions);
    }

    /// Forget `uri`. Containers already handed out keep their regions.
    pub fn clear(&self, uri: &str) -> bool {
        self.containers.write().remove(uri).is_some()
    }

    /// URIs with a container.
    pub fn uris(&self) -> Vec<String> {
        self.containers.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn region(start: usize, end: usize) -> DiagnosticRegion {
        DiagnosticRegion::new(start, end, DiagnosticSeverity::Error, 1)
    }

    #[test]
    fn test_insert_inside_extends_end() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostic(region(5, 10));
        container.shift_on_insert(7, 10);
        assert_eq!(container.all(), vec![region(5, 13)]);
    }

    #[test]
    fn test_insert_at_region_start_extends() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostic(region(5, 10));
        container.shift_on_insert(5, 6);
        assert_eq!(container.all(), vec![region(5, 11)]);
    }

    #[test]
    fn test_insert_before_and_after() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostics([region(5, 10), region(20, 22)]);
        container.shift_on_insert(2, 4);
        container.shift_on_insert(30, 35);
        assert_eq!(container.all(), vec![region(7, 12), region(22, 24)]);
    }

    #[test]
    fn test_delete_inside_shrinks() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostic(region(5, 10));
        container.shift_on_delete(6, 9);
        assert_eq!(container.all(), vec![region(5, 7)]);
    }

    #[test]
    fn test_delete_overlapping_start_and_before() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostics([region(5, 10), region(20, 25)]);
        container.shift_on_delete(3, 7);
        assert_eq!(container.all(), vec![region(3, 6), region(16, 21)]);
    }

    #[test]
    fn test_delete_covering_region_drops_it() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostics([region(5, 10), region(12, 14)]);
        container.shift_on_delete(4, 11);
        assert_eq!(container.all(), vec![region(5, 7)]);
    }

    #[test]
    fn test_query_and_remove() {
        let container = DiagnosticsContainer::new();
        container.add_diagnostics([
            DiagnosticRegion::new(10, 12, DiagnosticSeverity::Warning, 2),
            DiagnosticRegion::new(0, 3, DiagnosticSeverity::Hint, 3),
        ]);
        let hits = container.query_range(2, 11);
        assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
        assert!(container.query_range(3, 10).is_empty());
        assert_eq!(container.remove(2), 1);
        assert_eq!(container.len(), 1);
        container.reset();
        assert!(container.is_empty());
    }

    #[test]
    fn test_feed_shares_containers_per_uri() {
        let feed = DiagnosticsFeed::new();
        let container = feed.container("file:///a.rs");
        feed.publish("file:///a.rs", vec![region(1, 2)]);
        assert_eq!(container.len(), 1);
        assert!(feed.clear("file:///a.rs"));
        assert!(!feed.clear("file:///a.rs"));
        assert_eq!(feed.container("file:///a.rs").len(), 0);
    }
}
