//! WorkContext - what a work body can see while it runs.

use std::sync::Arc;

use crate::domain::{WorkFault, WorkerId};

use super::status::Shared;

/// Handed to the body on the worker thread.
///
/// There is no timeout or preemption: a body that wants to be cancellable
/// polls [`WorkContext::is_cancelled`] or calls [`WorkContext::checkpoint`].
pub struct WorkContext {
    id: WorkerId,
    pub(super) shared: Arc<Shared>,
}

impl WorkContext {
    pub(crate) fn new(id: WorkerId, shared: Arc<Shared>) -> Self {
        Self { id, shared }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.id
    }

    /// Report progress in `[0.0, 1.0]`. Out of range values are clamped.
    pub fn set_progress(&self, value: f32) {
        self.shared.set_progress(value);
    }

    pub fn progress(&self) -> f32 {
        self.shared.progress()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancel_requested()
    }

    /// `Err(WorkFault::Cancelled)` once cancellation has been requested.
    ///
    /// ```ignore
    /// for item in items {
    ///     ctx.checkpoint()?;
    ///     process(item);
    /// }
    /// ```
    pub fn checkpoint(&self) -> Result<(), WorkFault> {
        if self.is_cancelled() {
            Err(WorkFault::Cancelled)
        } else {
            Ok(())
        }
    }
}
