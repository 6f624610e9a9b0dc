//! App - the dispatcher and everything around it.
//!
//! - **Dispatcher**: registry of in-flight workers, per-tick polling, aborts
//! - **singleton**: process-wide instance with explicit init/shutdown
//! - **Ticker**: fixed-interval tick driver
//! - **DispatcherConfig**: TOML-backed configuration
//! - **status**: snapshots and per-tick reports

pub mod config;
pub mod dispatcher;
pub mod singleton;
pub mod status;
pub mod ticker;

pub use self::config::{ConfigError, DispatcherConfig};
pub use self::dispatcher::Dispatcher;
pub use self::status::{TickReport, WorkerCounts, WorkerInfo};
pub use self::ticker::Ticker;
