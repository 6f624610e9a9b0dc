//! Worker state machine.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Worker state.
///
/// State transitions:
/// - NotStarted -> Running -> Closed (body returned normally)
/// - NotStarted -> Running -> Error (body returned a fault or panicked)
///
/// `NotStarted` covers the window between `start` and the moment the worker
/// thread begins executing the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WorkerState {
    NotStarted = 0,
    Running = 1,
    Closed = 2,
    Error = 3,
}

impl WorkerState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Closed | WorkerState::Error)
    }

    /// Can the state move from `self` to `next`?
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (WorkerState::NotStarted, WorkerState::Running)
                | (WorkerState::Running, WorkerState::Closed)
                | (WorkerState::Running, WorkerState::Error)
        )
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::NotStarted,
            1 => WorkerState::Running,
            2 => WorkerState::Closed,
            _ => WorkerState::Error,
        }
    }
}

/// Lock-free cell holding a [`WorkerState`].
///
/// Written only by the worker's own thread, read by the tick thread.
/// Release on store / acquire on load, so anything the worker wrote before
/// publishing a terminal state is visible to the hook that observes it.
#[derive(Debug)]
pub struct AtomicWorkerState(AtomicU8);

impl AtomicWorkerState {
    pub fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if that is a legal transition from the current state.
    ///
    /// Returns the state that was current before the call on success, or the
    /// unchanged current state on failure.
    pub fn transition(&self, next: WorkerState) -> Result<WorkerState, WorkerState> {
        let mut current = self.load();
        loop {
            if !current.can_transition_to(next) {
                return Err(current);
            }
            match self.0.compare_exchange_weak(
                current as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current),
                Err(actual) => current = WorkerState::from_u8(actual),
            }
        }
    }
}

impl Default for AtomicWorkerState {
    fn default() -> Self {
        Self::new(WorkerState::NotStarted)
    }
}
