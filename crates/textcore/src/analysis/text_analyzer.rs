use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{CodeAnalyzer, run_analyzer};
use crate::config::AnalysisConfig;
use crate::content::{Content, ContentListener};
use crate::error::AnalysisError;
use crate::position::Position;
use crate::snapshot::ContentSnapshot;
use crate::styles::Styles;
use crate::worker::{ReplaceWorker, WorkerHandle};

/// Callback invoked on the analysis thread whenever new styles are published.
pub type StylesCallback = Box<dyn FnMut(&Arc<Styles>) + Send>;

struct AnalyzerState {
    styles: ArcSwap<Styles>,
    callback: Mutex<Option<StylesCallback>>,
    completed: AtomicU64,
}

impl AnalyzerState {
    fn notify(&self, styles: &Arc<Styles>) {
        if let Some(callback) = self.callback.lock().as_mut() {
            callback(styles);
        }
    }
}

/// Runs a [`CodeAnalyzer`] on a dedicated thread.
///
/// Each request replaces the pending one; the pass in flight is cancelled through its
/// delegate. [`TextAnalyzer::result`] always returns the last complete result, shifted for
/// edits that happened since.
pub struct TextAnalyzer {
    state: Arc<AnalyzerState>,
    worker: ReplaceWorker<ContentSnapshot>,
}

impl TextAnalyzer {
    /// Spawn an analyzer thread with the default [`AnalysisConfig`].
    pub fn new(analyzer: Arc<dyn CodeAnalyzer>) -> io::Result<Self> {
        Self::with_config(analyzer, AnalysisConfig::default())
    }

    /// Spawn an analyzer thread.
    pub fn with_config(
        analyzer: Arc<dyn CodeAnalyzer>,
        config: AnalysisConfig,
    ) -> io::Result<Self> {
        let state = Arc::new(AnalyzerState {
            styles: ArcSwap::from_pointee(Styles::default()),
            callback: Mutex::new(None),
            completed: AtomicU64::new(0),
        });

        let job_state = Arc::clone(&state);
        let worker = ReplaceWorker::spawn(
            &config.thread_name,
            move |snapshot: ContentSnapshot, delegate, handle: &WorkerHandle<ContentSnapshot>| {
                let revision = snapshot.revision();
                match run_analyzer(analyzer.as_ref(), &snapshot, delegate) {
                    Ok(styles) => {
                        let styles = Arc::new(styles);
                        let published = handle.publish_if_current(delegate.generation(), || {
                            job_state.styles.store(Arc::clone(&styles));
                        });
                        if published {
                            job_state.completed.fetch_add(1, Ordering::AcqRel);
                            debug!(revision, lines = styles.line_count(), "analysis published");
                            job_state.notify(&styles);
                        } else {
                            trace!(revision, "analysis result superseded");
                        }
                    }
                    Err(AnalysisError::Cancelled) => trace!(revision, "analysis cancelled"),
                    Err(err) => warn!(revision, %err, "analysis failed, keeping previous result"),
                }
            },
        )?;

        Ok(Self { state, worker })
    }

    /// Request analysis of the current text of `content`. Returns the request generation.
    pub fn analyze(&self, content: &Content) -> u64 {
        self.analyze_snapshot(content.snapshot())
    }

    /// Request analysis of `snapshot`.
    pub fn analyze_snapshot(&self, snapshot: ContentSnapshot) -> u64 {
        self.worker.handle().submit(snapshot)
    }

    /// The last published styles.
    pub fn result(&self) -> Arc<Styles> {
        self.state.styles.load_full()
    }

    /// Install a callback run after every published result.
    pub fn set_callback(&self, callback: impl FnMut(&Arc<Styles>) + Send + 'static) {
        *self.state.callback.lock() = Some(Box::new(callback));
    }

    /// A listener that keeps this analyzer in sync with a [`Content`].
    ///
    /// Register it with [`Content::add_listener`]. Each edit shifts the published styles and
    /// re-submits the document; edits inside a batch are submitted once the batch closes.
    pub fn trigger(&self) -> AnalysisTrigger {
        AnalysisTrigger {
            state: Arc::clone(&self.state),
            handle: self.worker.handle().clone(),
        }
    }

    /// Whether a pass is pending or running.
    pub fn is_running(&self) -> bool {
        self.worker.handle().is_busy()
    }

    /// Block until no pass is pending or running. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.worker.handle().wait_idle(timeout)
    }

    /// Number of results published so far.
    pub fn completed_passes(&self) -> u64 {
        self.state.completed.load(Ordering::Acquire)
    }

    /// Drop the pending request and cancel the running pass.
    pub fn cancel(&self) {
        self.worker.handle().cancel();
    }

    /// Stop the analysis thread. Further requests are ignored.
    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }
}

impl std::fmt::Debug for TextAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextAnalyzer")
            .field("completed_passes", &self.completed_passes())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Content listener created by [`TextAnalyzer::trigger`].
pub struct AnalysisTrigger {
    state: Arc<AnalyzerState>,
    handle: WorkerHandle<ContentSnapshot>,
}

impl AnalysisTrigger {
    fn shift(&self, adjust: impl Fn(&mut Styles)) {
        self.handle.invalidate(|| {
            self.state.styles.rcu(|current| {
                let mut shifted = Styles::clone(current);
                adjust(&mut shifted);
                shifted
            });
        });
    }
}

impl ContentListener for AnalysisTrigger {
    fn after_insert(&mut self, content: &Content, start: Position, end: Position, _text: &str) {
        self.shift(|styles| styles.adjust_on_insert(start, end));
        if !content.is_in_batch_edit() {
            self.handle.submit(content.snapshot());
        }
    }

    fn after_delete(&mut self, content: &Content, start: Position, end: Position, _text: &str) {
        self.shift(|styles| styles.adjust_on_delete(start, end));
        if !content.is_in_batch_edit() {
            self.handle.submit(content.snapshot());
        }
    }

    fn after_batch_edit(&mut self, content: &Content) {
        self.handle.submit(content.snapshot());
    }
}
