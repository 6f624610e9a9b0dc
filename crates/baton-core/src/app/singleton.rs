//! Process-wide dispatcher.
//!
//! Hosts with a single main loop usually want one dispatcher for the whole
//! process. `init` creates it, `shutdown` tears it down; the free functions
//! here fail with [`DispatchError::NotInstantiated`] while no instance exists.
//!
//! ```ignore
//! baton_core::init();
//! let id = baton_core::start(Worker::from_fn(|_| Ok(())))?;
//! loop {
//!     baton_core::tick()?; // once per frame
//! }
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use crate::app::config::DispatcherConfig;
use crate::app::dispatcher::Dispatcher;
use crate::app::status::TickReport;
use crate::domain::{DispatchError, WorkerId};
use crate::worker::Worker;

static INSTANCE: RwLock<Option<Arc<Dispatcher>>> = RwLock::new(None);

/// Create the process-wide dispatcher with the default config.
pub fn init() -> Arc<Dispatcher> {
    init_with(DispatcherConfig::default())
}

/// Create the process-wide dispatcher.
///
/// If one already exists it is returned unchanged and `config` is discarded.
pub fn init_with(config: DispatcherConfig) -> Arc<Dispatcher> {
    let mut slot = INSTANCE.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = slot.as_ref() {
        if *existing.config() != config {
            tracing::warn!("dispatcher already initialized; ignoring new config");
        }
        return Arc::clone(existing);
    }

    let dispatcher = Arc::new(Dispatcher::new(config));
    *slot = Some(Arc::clone(&dispatcher));
    tracing::info!("dispatcher initialized");
    dispatcher
}

pub fn instance() -> Result<Arc<Dispatcher>, DispatchError> {
    INSTANCE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Arc::clone)
        .ok_or(DispatchError::NotInstantiated)
}

pub fn is_initialized() -> bool {
    instance().is_ok()
}

/// Drop the process-wide dispatcher, force-aborting whatever is still
/// registered. Returns false if there was none.
pub fn shutdown() -> bool {
    let taken = INSTANCE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match taken {
        Some(dispatcher) => {
            let aborted = dispatcher.force_abort_all();
            tracing::info!(aborted, "dispatcher shut down");
            true
        }
        None => false,
    }
}

pub fn start(worker: Worker) -> Result<WorkerId, DispatchError> {
    instance()?.start(worker)
}

pub fn tick() -> Result<TickReport, DispatchError> {
    Ok(instance()?.tick())
}

pub fn contains(id: WorkerId) -> Result<bool, DispatchError> {
    Ok(instance()?.contains(id))
}

pub fn cancel(id: WorkerId) -> Result<bool, DispatchError> {
    Ok(instance()?.cancel(id))
}

pub fn force_abort(id: WorkerId) -> Result<bool, DispatchError> {
    Ok(instance()?.force_abort(id))
}

pub fn force_abort_all() -> Result<usize, DispatchError> {
    Ok(instance()?.force_abort_all())
}
