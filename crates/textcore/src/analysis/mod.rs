//! Incremental analysis pipeline.
//!
//! Analysis turns a [`ContentSnapshot`] into [`Styles`]. Two analyzer shapes plug in:
//!
//! - [`CodeAnalyzer`]: consumes the whole snapshot per pass. Run it on a [`TextAnalyzer`],
//!   which re-analyzes after edits with wake-and-replace semantics.
//! - [`IncrementalAnalyzer`]: tokenizes one line at a time from a lexer state. Run it on an
//!   [`IncrementalAnalyzeManager`], which only re-tokenizes lines until the state converges.
//!
//! Both are cooperative: long passes poll [`AnalyzeDelegate::should_analyze`] and give up
//! when a newer request superseded them. The last complete result stays published.

mod incremental;
mod lexer;
mod result;
mod text_analyzer;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::content::Content;
use crate::error::AnalysisError;
use crate::snapshot::ContentSnapshot;
use crate::styles::{CodeBlock, NavigationItem, Span, Styles};

pub use incremental::{IncrementalAnalyzeManager, IncrementalTrigger};
pub use lexer::{LanguageAnalyzer, LexState};
pub use result::AnalyzeResult;
pub use text_analyzer::{AnalysisTrigger, StylesCallback, TextAnalyzer};

/// Cancellation token handed to analyzers and formatters.
///
/// A delegate belongs to one request generation; it reports `false` from
/// [`AnalyzeDelegate::should_analyze`] once a newer request was submitted.
#[derive(Debug, Clone)]
pub struct AnalyzeDelegate {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl AnalyzeDelegate {
    /// A delegate that is never cancelled.
    pub fn always() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            generation: 0,
        }
    }

    pub(crate) fn new(current: Arc<AtomicU64>, generation: u64) -> Self {
        Self {
            current,
            generation,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the request this delegate belongs to is still the latest one.
    pub fn should_analyze(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    /// `Err(Cancelled)` once superseded.
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.should_analyze() {
            Ok(())
        } else {
            Err(AnalysisError::Cancelled)
        }
    }
}

/// A full-text analyzer.
///
/// Implementations feed spans and metadata into `result` and must call
/// [`AnalyzeResult::determine`] exactly once when they complete normally.
pub trait CodeAnalyzer: Send + Sync {
    /// Analyze `content` into `result`, polling `delegate` between tokens or lines.
    fn analyze(
        &self,
        content: &ContentSnapshot,
        result: &mut AnalyzeResult,
        delegate: &AnalyzeDelegate,
    ) -> Result<(), AnalysisError>;
}

/// Output of [`IncrementalAnalyzer::tokenize_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens<S> {
    /// Spans of the line, ordered by column.
    pub spans: Vec<Span>,
    /// Lexer state at the end of the line.
    pub state: S,
}

/// A line-at-a-time analyzer carrying lexer state between lines.
pub trait IncrementalAnalyzer: Send + Sync + 'static {
    /// Lexer state carried from the end of one line to the start of the next.
    type State: Clone + PartialEq + Send + 'static;

    /// State at the start of the document.
    fn initial_state(&self) -> Self::State;

    /// Tokenize one line starting in `state`.
    fn tokenize_line(&self, line: &str, state: &Self::State) -> LineTokens<Self::State>;

    /// Code blocks of the whole document. Called after each incremental pass.
    fn compute_blocks(
        &self,
        _content: &Content,
        _delegate: &AnalyzeDelegate,
    ) -> Result<BlockScan, AnalysisError> {
        Ok(BlockScan::default())
    }
}

/// Blocks and related metadata computed in one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockScan {
    /// Blocks spanning more than one line.
    pub blocks: Vec<CodeBlock>,
    /// Suppress-switch bound.
    pub suppress_switch: usize,
    /// Navigation labels.
    pub navigation: Vec<NavigationItem>,
}

impl Default for BlockScan {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            suppress_switch: usize::MAX,
            navigation: Vec::new(),
        }
    }
}

/// Run `analyzer` synchronously over `snapshot`.
pub fn run_analyzer(
    analyzer: &dyn CodeAnalyzer,
    snapshot: &ContentSnapshot,
    delegate: &AnalyzeDelegate,
) -> Result<Styles, AnalysisError> {
    let mut result = AnalyzeResult::new();
    analyzer.analyze(snapshot, &mut result, delegate)?;
    delegate.check()?;
    result.finish()
}
