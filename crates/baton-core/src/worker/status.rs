//! Shared worker fields readable from any thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use crate::domain::{AtomicWorkerState, WorkerId, WorkerState};

/// Fields shared between the worker thread and the main thread.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) id: OnceLock<WorkerId>,
    pub(crate) state: AtomicWorkerState,
    /// f32 bit pattern.
    progress: AtomicU32,
    cancel_requested: AtomicBool,
    /// Set once, before the Error state is published.
    fault: OnceLock<String>,
}

impl Shared {
    pub(crate) fn set_progress(&self, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.progress.store(value.to_bits(), Ordering::Release);
    }

    pub(crate) fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Acquire))
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    pub(crate) fn record_fault(&self, message: String) {
        let _ = self.fault.set(message);
    }
}

/// Cloneable, thread-safe view of a worker.
///
/// Hook listeners capture a clone of this to read progress or the fault
/// message on the main thread. All reads are atomic, so a progress value
/// read mid-flight is never torn.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub(crate) shared: Arc<Shared>,
}

impl WorkerStatus {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// The id issued by the dispatcher, or `None` before the worker is started.
    pub fn id(&self) -> Option<WorkerId> {
        self.shared.id.get().copied()
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state.load()
    }

    /// Last progress value reported by the body, in `[0.0, 1.0]`.
    pub fn progress(&self) -> f32 {
        self.shared.progress()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.is_cancel_requested()
    }

    /// Ask the body to stop at its next checkpoint.
    pub fn request_cancel(&self) {
        self.shared.request_cancel();
    }

    /// Message of the fault that moved the worker to `Error`, if any.
    pub fn fault(&self) -> Option<&str> {
        self.shared.fault.get().map(String::as_str)
    }
}
