//! Per-document and per-worker configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};

/// Configuration of a [`Content`](crate::Content) and its undo history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Whether edits are recorded for undo.
    pub undo_enabled: bool,
    /// Maximum number of undo entries kept. Must be non-zero.
    pub max_undo_stack_size: usize,
    /// Two typing actions further apart than this are never merged.
    pub merge_time_limit_ms: u64,
    /// Merged actions never exceed this many characters.
    pub merge_text_limit: usize,
    /// Line capacity reserved when a document is created.
    pub initial_line_capacity: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            undo_enabled: true,
            max_undo_stack_size: 500,
            merge_time_limit_ms: 8000,
            merge_text_limit: 10000,
            initial_line_capacity: 1000,
        }
    }
}

impl ContentConfig {
    /// Reject values the undo manager cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_undo_stack_size == 0 {
            return Err(ContentError::InvalidArgument(
                "max_undo_stack_size must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Configuration of a background analysis worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            thread_name: "textcore-analyzer".to_string(),
        }
    }
}
