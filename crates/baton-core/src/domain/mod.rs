//! Domain model (ids, worker state, errors).

pub mod errors;
pub mod ids;
pub mod state;

pub use self::errors::{DispatchError, WorkFault};
pub use self::ids::WorkerId;
pub use self::state::{AtomicWorkerState, WorkerState};
