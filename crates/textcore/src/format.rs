//! Asynchronous document formatting.
//!
//! A [`Formatter`] turns the full document text into its formatted form. [`AsyncFormatter`]
//! runs one on a background thread; a newer request cancels the one in flight. The result is
//! parked until the editing thread collects it with [`AsyncFormatter::take_outcome`] and applies
//! it with [`FormatOutcome::apply_to`].

use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use textcore_lang::{Language, LanguageDescriptor};
use tracing::{debug, trace};

use crate::analysis::AnalyzeDelegate;
use crate::config::AnalysisConfig;
use crate::content::Content;
use crate::error::{ContentError, FormatError, Result};
use crate::position::Position;
use crate::worker::{ReplaceWorker, WorkerHandle};

/// A document formatter.
pub trait Formatter: Send + Sync {
    /// Format `text`, restricted to the lines of `range` when given, and return the full
    /// resulting text. Long formatters should poll `delegate` and return
    /// [`FormatError::Cancelled`] once it reports a newer request.
    fn format(
        &self,
        text: &str,
        range: Option<(Position, Position)>,
        delegate: &AnalyzeDelegate,
    ) -> std::result::Result<String, FormatError>;
}

/// Result of one format request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    /// The formatter produced `text` for the document at `revision`.
    Succeeded {
        /// Full formatted text.
        text: String,
        /// [`Content::modification_count`] at request time.
        revision: u64,
    },
    /// The formatter failed.
    Failed(FormatError),
}

impl FormatOutcome {
    /// Replace the whole document with the formatted text as one undo step.
    ///
    /// Returns `Ok(false)` for a failed outcome and [`ContentError::StaleCache`] when `content`
    /// was edited after the request was made.
    pub fn apply_to(self, content: &mut Content) -> Result<bool> {
        let (text, revision) = match self {
            FormatOutcome::Succeeded { text, revision } => (text, revision),
            FormatOutcome::Failed(_) => return Ok(false),
        };
        if content.modification_count() != revision {
            return Err(ContentError::StaleCache);
        }
        if content.to_string() == text {
            return Ok(true);
        }

        let last_line = content.line_count() - 1;
        let end = Position::new(last_line, content.column_count(last_line)?);
        content.begin_batch_edit();
        let result = content.replace(Position::default(), end, &text);
        content.end_batch_edit();
        result.map(|_| true)
    }
}

struct FormatRequest {
    text: String,
    range: Option<(Position, Position)>,
    revision: u64,
}

type NotifyCallback = Box<dyn FnMut() + Send>;

struct FormatState {
    outcome: Mutex<Option<FormatOutcome>>,
    notify: Mutex<Option<NotifyCallback>>,
}

/// Runs a [`Formatter`] on a dedicated thread.
pub struct AsyncFormatter {
    state: Arc<FormatState>,
    worker: ReplaceWorker<FormatRequest>,
}

impl AsyncFormatter {
    /// Spawn a formatter thread named `textcore-formatter`.
    pub fn new(formatter: Arc<dyn Formatter>) -> io::Result<Self> {
        Self::with_config(
            formatter,
            AnalysisConfig {
                thread_name: "textcore-formatter".to_string(),
            },
        )
    }

    /// Spawn a formatter thread.
    pub fn with_config(
        formatter: Arc<dyn Formatter>,
        config: AnalysisConfig,
    ) -> io::Result<Self> {
        let state = Arc::new(FormatState {
            outcome: Mutex::new(None),
            notify: Mutex::new(None),
        });

        let job_state = Arc::clone(&state);
        let worker = ReplaceWorker::spawn(
            &config.thread_name,
            move |request: FormatRequest, delegate, handle: &WorkerHandle<FormatRequest>| {
                let outcome = match formatter.format(&request.text, request.range, delegate) {
                    Ok(text) => FormatOutcome::Succeeded {
                        text,
                        revision: request.revision,
                    },
                    Err(FormatError::Cancelled) => {
                        trace!(revision = request.revision, "format cancelled");
                        return;
                    }
                    Err(err) => FormatOutcome::Failed(err),
                };
                let published = handle.publish_if_current(delegate.generation(), || {
                    *job_state.outcome.lock() = Some(outcome);
                });
                if published {
                    debug!(revision = request.revision, "format finished");
                    if let Some(notify) = job_state.notify.lock().as_mut() {
                        notify();
                    }
                }
            },
        )?;

        Ok(Self { state, worker })
    }

    /// Request formatting of the whole document.
    pub fn format(&self, content: &Content) -> u64 {
        self.submit(content, None)
    }

    /// Request formatting of the lines of `start..end`.
    pub fn format_range(&self, content: &Content, start: Position, end: Position) -> u64 {
        self.submit(content, Some((start, end)))
    }

    fn submit(&self, content: &Content, range: Option<(Position, Position)>) -> u64 {
        let handle = self.worker.handle();
        handle.invalidate(|| *self.state.outcome.lock() = None);
        handle.submit(FormatRequest {
            text: content.to_string(),
            range,
            revision: content.modification_count(),
        })
    }

    /// Take the parked outcome of the latest request, if it finished.
    pub fn take_outcome(&self) -> Option<FormatOutcome> {
        self.state.outcome.lock().take()
    }

    /// Whether a request is pending or running.
    pub fn is_running(&self) -> bool {
        self.worker.handle().is_busy()
    }

    /// Install a callback run on the formatter thread when an outcome is parked.
    pub fn set_notify(&self, notify: impl FnMut() + Send + 'static) {
        *self.state.notify.lock() = Some(Box::new(notify));
    }

    /// Block until no request is pending or running. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.worker.handle().wait_idle(timeout)
    }

    /// Drop the pending request and cancel the running one.
    pub fn cancel(&self) {
        self.worker.handle().cancel();
    }

    /// Stop the formatter thread.
    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }
}

impl std::fmt::Debug for AsyncFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFormatter")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Re-indents brace-delimited code from the language's block delimiters.
///
/// Each line is indented one level deeper than the previous line per unclosed opener on it; a
/// line starting with a closer is pulled back one level. Blank lines lose their whitespace.
#[derive(Debug, Clone)]
pub struct ReindentFormatter {
    descriptor: LanguageDescriptor,
}

impl ReindentFormatter {
    /// Formatter for `language`.
    pub fn new(language: &Language) -> Self {
        Self {
            descriptor: language.descriptor(),
        }
    }

    /// Formatter for a descriptor.
    pub fn from_descriptor(descriptor: LanguageDescriptor) -> Self {
        Self { descriptor }
    }

    fn strip_leading_closers<'a>(&self, line: &'a str) -> (&'a str, usize) {
        let mut closers = 0;
        let rest = line.trim_start_matches(|ch: char| {
            if self.descriptor.is_block_end(ch) {
                closers += 1;
                true
            } else {
                false
            }
        });
        (rest, closers)
    }
}

impl Formatter for ReindentFormatter {
    fn format(
        &self,
        text: &str,
        range: Option<(Position, Position)>,
        delegate: &AnalyzeDelegate,
    ) -> std::result::Result<String, FormatError> {
        if !self.descriptor.indent_suffixes.is_empty() {
            return Err(FormatError::Failed(format!(
                "indentation is significant in {}",
                self.descriptor.name
            )));
        }
        let (first, last) = match range {
            Some((start, end)) if start.line > end.line => {
                return Err(FormatError::Failed("range end precedes start".to_string()));
            }
            Some((start, end)) => (start.line, end.line),
            None => (0, usize::MAX),
        };
        let width = self.descriptor.indent_width().max(1);

        let mut out = String::with_capacity(text.len());
        let mut level = 0usize;
        for (index, line) in text.split('\n').enumerate() {
            if delegate.check().is_err() {
                return Err(FormatError::Cancelled);
            }
            if index > 0 {
                out.push('\n');
            }
            let trimmed = line.trim_start();
            let (after_closers, closers) = self.strip_leading_closers(trimmed);
            let line_level = level.saturating_sub(closers.min(1));

            if (first..=last).contains(&index) {
                if !trimmed.is_empty() {
                    for _ in 0..line_level {
                        out.push_str(&self.descriptor.indent_unit);
                    }
                    out.push_str(trimmed.trim_end());
                }
            } else {
                out.push_str(line);
            }

            let net_closers = closers.saturating_sub(1);
            level = (line_level + self.descriptor.indent_advance(after_closers) / width)
                .saturating_sub(net_closers);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reindent(text: &str) -> String {
        ReindentFormatter::new(&Language::Java)
            .format(text, None, &AnalyzeDelegate::always())
            .unwrap()
    }

    #[test]
    fn test_reindent_nested_blocks() {
        let text = "class A {\nvoid f() {\nif (x) {\ny();\n} else {\nz();\n}\n}\n}";
        let expected = [
            "class A {",
            "    void f() {",
            "        if (x) {",
            "            y();",
            "        } else {",
            "            z();",
            "        }",
            "    }",
            "}",
        ];
        assert_eq!(reindent(text), expected.join("\n"));
    }

    #[test]
    fn test_reindent_clears_blank_lines_and_keeps_out_of_range_lines() {
        let formatter = ReindentFormatter::new(&Language::Java);
        let text = "f() {\n      \n        a();\n   b();\n}";
        let range = Some((Position::new(0, 0), Position::new(2, 0)));
        let formatted = formatter
            .format(text, range, &AnalyzeDelegate::always())
            .unwrap();
        assert_eq!(formatted, "f() {\n\n    a();\n   b();\n}");
    }

    #[test]
    fn test_indentation_sensitive_language_is_rejected() {
        let formatter = ReindentFormatter::new(&Language::Python);
        assert!(matches!(
            formatter.format("if x:\n  y", None, &AnalyzeDelegate::always()),
            Err(FormatError::Failed(_))
        ));
    }

    #[test]
    fn test_outcome_applies_as_one_undo_step() {
        let mut content = Content::from_text("f() {\nx();\n}");
        let outcome = FormatOutcome::Succeeded {
            text: "f() {\n    x();\n}".to_string(),
            revision: content.modification_count(),
        };
        assert!(outcome.apply_to(&mut content).unwrap());
        assert_eq!(content.to_string(), "f() {\n    x();\n}");
        assert_eq!(content.undo_manager().undo_depth(), 1);
        content.undo().unwrap();
        assert_eq!(content.to_string(), "f() {\nx();\n}");
    }

    #[test]
    fn test_stale_outcome_is_rejected() {
        let mut content = Content::from_text("a");
        let outcome = FormatOutcome::Succeeded {
            text: "b".to_string(),
            revision: content.modification_count(),
        };
        content.insert(0, 1, "c").unwrap();
        assert!(matches!(
            outcome.apply_to(&mut content),
            Err(ContentError::StaleCache)
        ));
    }

    #[test]
    fn test_async_formatter_parks_outcome() {
        let java = Arc::new(ReindentFormatter::new(&Language::Java));
        let formatter = AsyncFormatter::new(java).unwrap();
        let mut content = Content::from_text("f() {\nx();\n}");
        formatter.format(&content);
        assert!(formatter.wait_idle(Duration::from_secs(5)));
        let outcome = formatter.take_outcome().unwrap();
        assert!(outcome.apply_to(&mut content).unwrap());
        assert_eq!(content.to_string(), "f() {\n    x();\n}");
        assert_eq!(formatter.take_outcome(), None);
    }
}
