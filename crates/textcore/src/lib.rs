#![warn(missing_docs)]
//! Textcore - Mutable Text-Content Engine for Code Editors
//!
//! # Overview
//!
//! `textcore` is the headless core of a source-code editing widget. It owns the document text
//! and everything that must stay consistent with it while the user types: position transforms,
//! undo history, syntax styles and externally reported diagnostics. It does not render anything;
//! a view layer reads [`Styles`] and [`DiagnosticRegion`]s and draws them.
//!
//! # Core Features
//!
//! - **Line Store**: one [`ContentLine`] per line, O(1) line access, CR/LF/CRLF input
//! - **Indexer**: cached `index <-> (line, column)` transforms plus a streaming cursor for
//!   sequential scans
//! - **Undo/Redo**: merging of typing and backspace runs, batch edits as one step, bounded
//!   history
//! - **Analysis**: cancellable background passes, full-text or line-incremental
//! - **Diagnostics**: offset ranges shifted in place across edits
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Analysis / Format workers (background)     │  ← Styles, formatted text
//! ├─────────────────────────────────────────────┤
//! │  Listeners (analysis trigger, diagnostics)  │  ← Edit notifications
//! ├─────────────────────────────────────────────┤
//! │  Undo Manager                               │  ← History
//! ├─────────────────────────────────────────────┤
//! │  Indexer (line-start cache, stream cursor)  │  ← Position transforms
//! ├─────────────────────────────────────────────┤
//! │  Line Store (Content)                       │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use textcore::{Content, Position};
//!
//! let mut content = Content::from_text("abc\ndef");
//! let end = content.insert(0, 3, "\nXY").unwrap();
//! assert_eq!(end, Position::new(1, 2));
//! assert_eq!(content.to_string(), "abc\nXY\ndef");
//!
//! assert_eq!(content.char_index(2, 0).unwrap(), 7);
//!
//! content.undo().unwrap();
//! assert_eq!(content.to_string(), "abc\ndef");
//! ```
//!
//! # Module Description
//!
//! - [`content`] - The line store and its listener protocol
//! - [`cursor`] - Caret and selection that follow edits
//! - [`undo`] - Undo actions and the undo manager
//! - [`analysis`] - Analyzer traits, background analysis workers and the built-in lexer
//! - [`styles`] - Published analysis results
//! - [`diagnostics`] - Shiftable diagnostic regions
//! - [`format`] - Background formatting
//! - [`snapshot`] - Immutable text snapshots handed to workers

pub mod analysis;
pub mod config;
pub mod content;
pub mod cursor;
pub mod diagnostics;
pub mod error;
pub mod format;
mod indexer;
mod io;
pub mod line;
pub mod line_ending;
pub mod position;
pub mod snapshot;
pub mod styles;
mod text;
pub mod undo;
mod worker;

pub use analysis::{
    AnalysisTrigger, AnalyzeDelegate, AnalyzeResult, BlockScan, CodeAnalyzer,
    IncrementalAnalyzeManager, IncrementalAnalyzer, IncrementalTrigger, LanguageAnalyzer,
    LexState, LineTokens, StylesCallback, TextAnalyzer, run_analyzer,
};
pub use config::{AnalysisConfig, ContentConfig};
pub use content::{Content, ContentListener, ListenerId};
pub use cursor::{Cursor, CursorTracker, Selection, SelectionDirection};
pub use diagnostics::{
    DiagnosticRegion, DiagnosticSeverity, DiagnosticsContainer, DiagnosticsFeed,
    DiagnosticsShifter,
};
pub use error::{AnalysisError, ContentError, FormatError, OutOfRange, Result};
pub use format::{AsyncFormatter, FormatOutcome, Formatter, ReindentFormatter};
pub use line::ContentLine;
pub use line_ending::LineEnding;
pub use position::{CharPosition, Position};
pub use snapshot::ContentSnapshot;
pub use styles::{CodeBlock, NavigationItem, Span, StyleId, Styles};
pub use textcore_lang::{CommentConfig, Language, LanguageDescriptor};
pub use undo::{
    ContentAction, DeleteAction, InsertAction, MergeLimits, MultiAction, ReplaceAction,
    UndoManager,
};
