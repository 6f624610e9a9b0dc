//! Status views over the dispatcher registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{WorkerId, WorkerState};

/// Snapshot of one registered worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub id: WorkerId,
    pub state: WorkerState,
    pub progress: f32,
    pub started_at: DateTime<Utc>,
}

/// Registered workers by state.
///
/// Terminal counts are workers that finished but whose terminal tick has not
/// run yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCounts {
    pub not_started: usize,
    pub running: usize,
    pub closed: usize,
    pub error: usize,
}

impl WorkerCounts {
    pub fn record(&mut self, state: WorkerState) {
        match state {
            WorkerState::NotStarted => self.not_started += 1,
            WorkerState::Running => self.running += 1,
            WorkerState::Closed => self.closed += 1,
            WorkerState::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.not_started + self.running + self.closed + self.error
    }
}

/// What one `tick()` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Workers that got the update hook.
    pub updated: usize,
    /// Workers that got the close hook and were removed.
    pub closed: usize,
    /// Workers that got the error hook and were removed.
    pub errored: usize,
    /// Listeners that panicked during this tick.
    pub listener_panics: usize,
    /// Removed workers whose joined thread ended in `Err` or a panic.
    pub thread_faults: usize,
}

impl TickReport {
    pub fn removed(&self) -> usize {
        self.closed + self.errored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_state() {
        let mut counts = WorkerCounts::default();
        for state in [
            WorkerState::Running,
            WorkerState::Running,
            WorkerState::Closed,
            WorkerState::Error,
            WorkerState::NotStarted,
        ] {
            counts.record(state);
        }
        assert_eq!(
            counts,
            WorkerCounts {
                not_started: 1,
                running: 2,
                closed: 1,
                error: 1,
            }
        );
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn counts_serialize_as_flat_json() {
        let json = serde_json::to_value(WorkerCounts::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "not_started": 0, "running": 0, "closed": 0, "error": 0 })
        );
    }
}
