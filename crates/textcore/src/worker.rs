//! Wake-and-replace background worker.
//!
//! A worker owns one thread and one request slot. Submitting a request replaces whatever is
//! still pending and bumps a generation counter, so the job in flight sees its
//! [`AnalyzeDelegate`] go stale and can bail out early. Requests are never queued.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::analysis::AnalyzeDelegate;

struct Slot<T> {
    pending: Option<(u64, T)>,
    running: bool,
    shutdown: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    wake: Condvar,
    idle: Condvar,
    generation: Arc<AtomicU64>,
}

/// Cloneable handle used to submit to a [`ReplaceWorker`].
pub(crate) struct WorkerHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for WorkerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> WorkerHandle<T> {
    fn bump(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Replace the pending request. Returns the request's generation.
    pub(crate) fn submit(&self, request: T) -> u64 {
        let mut slot = self.shared.slot.lock();
        let generation = self.bump();
        if slot.shutdown {
            trace!(generation, "request after shutdown ignored");
            return generation;
        }
        if slot.pending.replace((generation, request)).is_some() {
            trace!(generation, "pending request replaced");
        }
        self.shared.wake.notify_one();
        generation
    }

    /// Run `update` and supersede the in-flight and pending requests, atomically with respect
    /// to [`WorkerHandle::publish_if_current`].
    pub(crate) fn invalidate(&self, update: impl FnOnce()) {
        let mut slot = self.shared.slot.lock();
        update();
        self.bump();
        slot.pending = None;
        if !slot.running {
            self.shared.idle.notify_all();
        }
    }

    /// Drop the pending request and cancel the one in flight.
    pub(crate) fn cancel(&self) {
        self.invalidate(|| {});
    }

    /// Run `publish` only if `generation` is still the latest request.
    pub(crate) fn publish_if_current(&self, generation: u64, publish: impl FnOnce()) -> bool {
        let _slot = self.shared.slot.lock();
        if self.shared.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        publish();
        true
    }

    /// Whether a request is pending or running.
    pub(crate) fn is_busy(&self) -> bool {
        let slot = self.shared.slot.lock();
        slot.pending.is_some() || slot.running
    }

    /// Block until the worker is idle or `timeout` elapses. Returns `true` when idle.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.pending.is_some() || slot.running {
            if self.shared.idle.wait_until(&mut slot, deadline).timed_out() {
                return slot.pending.is_none() && !slot.running;
            }
        }
        true
    }
}

/// Owner of the worker thread. Dropping it stops the thread.
pub(crate) struct ReplaceWorker<T> {
    handle: WorkerHandle<T>,
    thread: Option<JoinHandle<()>>,
    name: String,
}

impl<T: Send + 'static> ReplaceWorker<T> {
    /// Spawn a worker thread named `name` running `job` for each request.
    ///
    /// Panics inside `job` are caught and logged; the worker keeps serving requests.
    pub(crate) fn spawn<F>(name: &str, mut job: F) -> std::io::Result<Self>
    where
        F: FnMut(T, &AnalyzeDelegate, &WorkerHandle<T>) + Send + 'static,
    {
        let handle = WorkerHandle {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    pending: None,
                    running: false,
                    shutdown: false,
                }),
                wake: Condvar::new(),
                idle: Condvar::new(),
                generation: Arc::new(AtomicU64::new(0)),
            }),
        };

        let worker_handle = handle.clone();
        let thread_name = name.to_string();
        let thread = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(thread = %thread_name, "worker started");
                let shared = &worker_handle.shared;
                loop {
                    let (generation, request) = {
                        let mut slot = shared.slot.lock();
                        loop {
                            if slot.shutdown {
                                debug!(thread = %thread_name, "worker stopped");
                                return;
                            }
                            if let Some(next) = slot.pending.take() {
                                slot.running = true;
                                break next;
                            }
                            shared.wake.wait(&mut slot);
                        }
                    };

                    let delegate =
                        AnalyzeDelegate::new(Arc::clone(&shared.generation), generation);
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| job(request, &delegate, &worker_handle)));
                    if let Err(panic) = outcome {
                        warn!(
                            thread = %thread_name,
                            generation,
                            panic = %panic_message(panic.as_ref()),
                            "worker job panicked"
                        );
                    }

                    let mut slot = shared.slot.lock();
                    slot.running = false;
                    if slot.pending.is_none() {
                        shared.idle.notify_all();
                    }
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
            name: name.to_string(),
        })
    }
}

impl<T> ReplaceWorker<T> {
    pub(crate) fn handle(&self) -> &WorkerHandle<T> {
        &self.handle
    }

    /// Stop the thread and wait for it. Idempotent.
    pub(crate) fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        {
            let mut slot = self.handle.shared.slot.lock();
            slot.shutdown = true;
            slot.pending = None;
            self.handle.bump();
            self.handle.shared.wake.notify_all();
            self.handle.shared.idle.notify_all();
        }
        if thread.thread().id() == std::thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            warn!(thread = %self.name, "worker thread panicked during shutdown");
        }
    }
}

impl<T> Drop for ReplaceWorker<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
