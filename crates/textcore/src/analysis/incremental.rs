use std::collections::VecDeque;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use super::{AnalyzeDelegate, IncrementalAnalyzer, LineTokens, StylesCallback};
use crate::config::AnalysisConfig;
use crate::content::{Content, ContentListener};
use crate::error::{AnalysisError, ContentError};
use crate::position::Position;
use crate::styles::{Span, Styles, normalize};
use crate::worker::panic_message;

#[derive(Debug)]
enum Message {
    Reset(String),
    Insert {
        start: Position,
        end: Position,
        text: String,
    },
    Delete {
        start: Position,
        end: Position,
    },
}

struct Queue {
    messages: VecDeque<Message>,
    running: bool,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
    idle: Condvar,
    generation: Arc<AtomicU64>,
    styles: ArcSwap<Styles>,
    callback: Mutex<Option<StylesCallback>>,
}

impl Shared {
    fn enqueue(&self, message: Message) {
        let mut queue = self.queue.lock();
        if queue.shutdown {
            return;
        }
        match &message {
            Message::Reset(_) => queue.messages.clear(),
            Message::Insert { start, end, .. } => {
                let (start, end) = (*start, *end);
                self.styles.rcu(|current| {
                    let mut shifted = Styles::clone(current);
                    shifted.adjust_on_insert(start, end);
                    shifted
                });
            }
            Message::Delete { start, end } => {
                let (start, end) = (*start, *end);
                self.styles.rcu(|current| {
                    let mut shifted = Styles::clone(current);
                    shifted.adjust_on_delete(start, end);
                    shifted
                });
            }
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        queue.messages.push_back(message);
        self.wake.notify_one();
    }
}

/// Shadow document plus per-line tokenizer output, owned by the manager thread.
struct LineStates<A: IncrementalAnalyzer> {
    shadow: Content,
    tokens: Vec<Vec<Span>>,
    end_states: Vec<A::State>,
    dirty: Vec<bool>,
}

impl<A: IncrementalAnalyzer> LineStates<A> {
    fn new(analyzer: &A, text: &str) -> Self {
        let mut shadow = Content::from_text(text);
        shadow.set_undo_enabled(false);
        let line_count = shadow.line_count();
        Self {
            shadow,
            tokens: vec![Vec::new(); line_count],
            end_states: vec![analyzer.initial_state(); line_count],
            dirty: vec![true; line_count],
        }
    }

    fn apply(&mut self, analyzer: &A, message: Message) -> Result<(), ContentError> {
        match message {
            Message::Reset(text) => *self = Self::new(analyzer, &text),
            Message::Insert { start, end, text } => {
                self.shadow.insert(start.line, start.column, &text)?;
                let added = end.line - start.line;
                let at = start.line + 1;
                self.tokens.splice(at..at, std::iter::repeat_n(Vec::new(), added));
                // The old end state of the edited line moves to the last inserted line, where
                // it is compared against on retokenization.
                self.end_states.splice(
                    start.line..start.line,
                    std::iter::repeat_n(analyzer.initial_state(), added),
                );
                self.dirty.splice(at..at, std::iter::repeat_n(true, added));
                self.dirty[start.line] = true;
            }
            Message::Delete { start, end } => {
                self.shadow.delete(start, end)?;
                self.tokens.drain(start.line + 1..=end.line);
                self.end_states.drain(start.line..end.line);
                self.dirty.drain(start.line + 1..=end.line);
                self.dirty[start.line] = true;
            }
        }
        Ok(())
    }

    fn mark_all_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|dirty| *dirty = true);
    }

    /// Retokenize dirty lines, following state changes downward until they converge.
    /// Returns the number of lines tokenized.
    fn retokenize(
        &mut self,
        analyzer: &A,
        delegate: &AnalyzeDelegate,
    ) -> Result<usize, AnalysisError> {
        let line_count = self.shadow.line_count();
        let mut tokenized = 0;
        let mut next = self.dirty.iter().position(|dirty| *dirty);
        while let Some(line) = next {
            delegate.check()?;
            let start_state = match line {
                0 => analyzer.initial_state(),
                _ => self.end_states[line - 1].clone(),
            };
            let text = self.shadow.lines()[line].as_str();
            let LineTokens { spans, state } = analyzer.tokenize_line(text, &start_state);
            self.tokens[line] = normalize(spans);
            let changed = self.end_states[line] != state;
            self.end_states[line] = state;
            self.dirty[line] = false;
            tokenized += 1;
            if changed && line + 1 < line_count {
                self.dirty[line + 1] = true;
            }
            next = self.dirty[line + 1..]
                .iter()
                .position(|dirty| *dirty)
                .map(|offset| line + 1 + offset);
        }
        Ok(tokenized)
    }

    fn pass(&mut self, analyzer: &A, delegate: &AnalyzeDelegate) -> Result<Styles, AnalysisError> {
        let tokenized = self.retokenize(analyzer, delegate)?;
        let scan = analyzer.compute_blocks(&self.shadow, delegate)?;
        delegate.check()?;
        trace!(tokenized, lines = self.tokens.len(), "incremental pass");
        Ok(Styles::from_parts(
            self.tokens.clone(),
            scan.blocks,
            scan.suppress_switch,
            scan.navigation,
        ))
    }
}

/// Runs an [`IncrementalAnalyzer`] on a dedicated thread against a shadow copy of the document.
///
/// Edits are queued in order and applied to the shadow before each pass; a pass only
/// re-tokenizes lines from the edited one until the lexer state at a line end matches the
/// previous pass.
pub struct IncrementalAnalyzeManager {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl IncrementalAnalyzeManager {
    /// Spawn a manager thread with the default [`AnalysisConfig`].
    pub fn new<A: IncrementalAnalyzer>(analyzer: A) -> io::Result<Self> {
        Self::with_config(analyzer, AnalysisConfig::default())
    }

    /// Spawn a manager thread.
    pub fn with_config<A: IncrementalAnalyzer>(
        analyzer: A,
        config: AnalysisConfig,
    ) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                messages: VecDeque::new(),
                running: false,
                shutdown: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            generation: Arc::new(AtomicU64::new(0)),
            styles: ArcSwap::from_pointee(Styles::default()),
            callback: Mutex::new(None),
        });

        let thread_shared = Arc::clone(&shared);
        let thread_name = config.thread_name.clone();
        let thread = std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || run(analyzer, &thread_shared, &thread_name))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Replace the shadow document with the text of `content` and analyze it from scratch.
    pub fn reset(&self, content: &Content) {
        self.shared.enqueue(Message::Reset(content.to_string()));
    }

    /// Queue an insertion of `text`, which now spans `start..end`.
    pub fn insert(&self, start: Position, end: Position, text: &str) {
        self.shared.enqueue(Message::Insert {
            start,
            end,
            text: text.to_string(),
        });
    }

    /// Queue a deletion of `start..end`.
    pub fn delete(&self, start: Position, end: Position) {
        self.shared.enqueue(Message::Delete { start, end });
    }

    /// The last published styles, shifted for edits queued since.
    pub fn result(&self) -> Arc<Styles> {
        self.shared.styles.load_full()
    }

    /// Install a callback run after every published result.
    pub fn set_callback(&self, callback: impl FnMut(&Arc<Styles>) + Send + 'static) {
        *self.shared.callback.lock() = Some(Box::new(callback));
    }

    /// A listener forwarding every edit of a [`Content`] to this manager.
    ///
    /// Call [`IncrementalAnalyzeManager::reset`] with the same content before registering it.
    pub fn trigger(&self) -> IncrementalTrigger {
        IncrementalTrigger {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Block until the queue is drained and no pass is running. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.shared.queue.lock();
        while !queue.messages.is_empty() || queue.running {
            if self.shared.idle.wait_until(&mut queue, deadline).timed_out() {
                return queue.messages.is_empty() && !queue.running;
            }
        }
        true
    }

    /// Stop the manager thread. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
            queue.messages.clear();
            self.shared.generation.fetch_add(1, Ordering::AcqRel);
            self.shared.wake.notify_all();
            self.shared.idle.notify_all();
        }
        if thread.join().is_err() {
            warn!("incremental analysis thread panicked during shutdown");
        }
    }
}

impl Drop for IncrementalAnalyzeManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for IncrementalAnalyzeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.shared.queue.lock();
        f.debug_struct("IncrementalAnalyzeManager")
            .field("queued", &queue.messages.len())
            .field("running", &queue.running)
            .finish()
    }
}

fn run<A: IncrementalAnalyzer>(analyzer: A, shared: &Shared, thread_name: &str) {
    debug!(thread = thread_name, "incremental analysis started");
    let mut states = LineStates::new(&analyzer, "");
    loop {
        let (messages, generation) = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.shutdown {
                    debug!(thread = thread_name, "incremental analysis stopped");
                    return;
                }
                if !queue.messages.is_empty() {
                    queue.running = true;
                    let generation = shared.generation.load(Ordering::Acquire);
                    break (queue.messages.drain(..).collect::<Vec<_>>(), generation);
                }
                shared.wake.wait(&mut queue);
            }
        };

        let delegate = AnalyzeDelegate::new(Arc::clone(&shared.generation), generation);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            for message in messages {
                if let Err(err) = states.apply(&analyzer, message) {
                    warn!(%err, "edit does not fit the shadow document, retokenizing everything");
                    states.mark_all_dirty();
                }
            }
            states.pass(&analyzer, &delegate)
        }));

        match outcome {
            Ok(Ok(styles)) => {
                let styles = Arc::new(styles);
                let published = {
                    let _queue = shared.queue.lock();
                    let current = shared.generation.load(Ordering::Acquire) == generation;
                    if current {
                        shared.styles.store(Arc::clone(&styles));
                    }
                    current
                };
                if published && let Some(callback) = shared.callback.lock().as_mut() {
                    callback(&styles);
                }
            }
            Ok(Err(AnalysisError::Cancelled)) => trace!(generation, "incremental pass cancelled"),
            Ok(Err(err)) => warn!(%err, "incremental pass failed, keeping previous result"),
            Err(panic) => {
                warn!(panic = %panic_message(panic.as_ref()), "incremental pass panicked");
                states.mark_all_dirty();
            }
        }

        let mut queue = shared.queue.lock();
        queue.running = false;
        if queue.messages.is_empty() {
            shared.idle.notify_all();
        }
    }
}

/// Content listener created by [`IncrementalAnalyzeManager::trigger`].
pub struct IncrementalTrigger {
    shared: Arc<Shared>,
}

impl ContentListener for IncrementalTrigger {
    fn after_insert(&mut self, _content: &Content, start: Position, end: Position, text: &str) {
        self.shared.enqueue(Message::Insert {
            start,
            end,
            text: text.to_string(),
        });
    }

    fn after_delete(&mut self, _content: &Content, start: Position, end: Position, _text: &str) {
        self.shared.enqueue(Message::Delete { start, end });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LanguageAnalyzer, LexState};
    use crate::styles::{COMMENT, KEYWORD};
    use textcore_lang::Language;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_insert_splices_line_states() {
        let analyzer = LanguageAnalyzer::new(&Language::Java);
        let mut states = LineStates::new(&analyzer, "a\nb");
        states.pass(&analyzer, &AnalyzeDelegate::always()).unwrap();
        states
            .apply(
                &analyzer,
                Message::Insert {
                    start: Position::new(0, 1),
                    end: Position::new(2, 0),
                    text: "\n/*\n".to_string(),
                },
            )
            .unwrap();
        assert_eq!(states.tokens.len(), 4);
        assert_eq!(states.end_states.len(), 4);
        assert_eq!(states.dirty, vec![true, true, true, false]);

        let tokenized = states.retokenize(&analyzer, &AnalyzeDelegate::always()).unwrap();
        assert_eq!(tokenized, 4);
        assert_eq!(states.end_states[3], LexState::BlockComment);
    }

    #[test]
    fn test_unchanged_state_stops_retokenizing() {
        let analyzer = LanguageAnalyzer::new(&Language::Java);
        let mut states = LineStates::new(&analyzer, "a\nb\nc\nd");
        states.pass(&analyzer, &AnalyzeDelegate::always()).unwrap();
        states
            .apply(
                &analyzer,
                Message::Insert {
                    start: Position::new(1, 1),
                    end: Position::new(1, 2),
                    text: "x".to_string(),
                },
            )
            .unwrap();
        let tokenized = states.retokenize(&analyzer, &AnalyzeDelegate::always()).unwrap();
        assert_eq!(tokenized, 1);
    }

    #[test]
    fn test_manager_follows_content_edits() {
        let manager =
            IncrementalAnalyzeManager::new(LanguageAnalyzer::new(&Language::Java)).unwrap();
        let mut content = Content::from_text("int a;\nint b;\nint c;");
        manager.reset(&content);
        content.add_listener(Box::new(manager.trigger()));
        assert!(manager.wait_idle(WAIT));
        assert_eq!(manager.result().style_at(2, 0), KEYWORD);

        content.insert(0, 0, "/*").unwrap();
        assert!(manager.wait_idle(WAIT));
        let styles = manager.result();
        assert_eq!(styles.line_count(), 3);
        assert_eq!(styles.style_at(2, 0), COMMENT);

        content.delete(Position::new(0, 0), Position::new(0, 2)).unwrap();
        assert!(manager.wait_idle(WAIT));
        assert_eq!(manager.result().style_at(2, 0), KEYWORD);
    }
}
