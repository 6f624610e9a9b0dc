//! Errors - dispatcher errors and work body faults.

use thiserror::Error;

/// Errors returned by dispatcher operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A singleton operation ran before `init()` (or after `shutdown()`).
    #[error("dispatcher is not instantiated; call baton_core::init() first")]
    NotInstantiated,

    /// The OS refused to create the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A fault raised by a work body.
///
/// Any fault is terminal for the worker: its state becomes `Error`, the
/// fault is returned as the worker thread's result, and the error hook fires
/// on the next tick.
#[derive(Debug, Error)]
pub enum WorkFault {
    #[error("{0}")]
    Failed(String),

    /// The body stopped because cancellation was requested.
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkFault {
    pub fn failed(message: impl Into<String>) -> Self {
        WorkFault::Failed(message.into())
    }

    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WorkFault::Other(Box::new(error))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkFault::Cancelled)
    }
}
