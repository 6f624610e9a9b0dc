//! Worker - one background job: its body, its state machine and its hooks.
//!
//! # Lifecycle
//! 1. Build a [`Worker`] from a body and wire its hooks.
//! 2. Move it into `Dispatcher::start`. The worker is consumed, so the same
//!    instance can never be submitted twice.
//! 3. The body runs once on a dedicated thread; the dispatcher reports
//!    progress and the outcome back through the hooks on the tick thread.
//!
//! # Threads
//! - The body runs on the worker thread only and must not touch
//!   main-thread-only resources.
//! - Hooks run on the main thread only (start on the thread calling `start`,
//!   the rest on the thread calling `tick`).

mod context;
mod event;
mod status;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::domain::{WorkFault, WorkerId, WorkerState};

pub use self::context::WorkContext;
pub use self::event::{Event, HookKind, Hooks, ListenerId};
pub use self::status::WorkerStatus;

pub(crate) use self::event::panic_message;
use self::status::Shared;

/// The job-specific logic of a worker.
///
/// ```ignore
/// struct Resize { path: PathBuf }
///
/// impl WorkBody for Resize {
///     fn run(self: Box<Self>, ctx: &WorkContext) -> Result<(), WorkFault> {
///         let image = load(&self.path)?;
///         ctx.set_progress(0.5);
///         save(shrink(image))?;
///         Ok(())
///     }
/// }
/// ```
pub trait WorkBody: Send + 'static {
    fn run(self: Box<Self>, ctx: &WorkContext) -> Result<(), WorkFault>;
}

struct FnBody<F>(F);

impl<F> WorkBody for FnBody<F>
where
    F: FnOnce(&WorkContext) -> Result<(), WorkFault> + Send + 'static,
{
    fn run(self: Box<Self>, ctx: &WorkContext) -> Result<(), WorkFault> {
        (self.0)(ctx)
    }
}

/// A job waiting to be submitted.
pub struct Worker {
    body: Box<dyn WorkBody>,
    hooks: Hooks,
    shared: Arc<Shared>,
}

impl Worker {
    pub fn new<B: WorkBody>(body: B) -> Self {
        Self {
            body: Box::new(body),
            hooks: Hooks::new(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Build a worker from a closure.
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce(&WorkContext) -> Result<(), WorkFault> + Send + 'static,
    {
        Self::new(FnBody(body))
    }

    pub fn on_start<F: FnMut() + Send + 'static>(mut self, listener: F) -> Self {
        self.hooks.event_mut(HookKind::Start).add_listener(listener);
        self
    }

    pub fn on_update<F: FnMut() + Send + 'static>(mut self, listener: F) -> Self {
        self.hooks.event_mut(HookKind::Update).add_listener(listener);
        self
    }

    pub fn on_close<F: FnMut() + Send + 'static>(mut self, listener: F) -> Self {
        self.hooks.event_mut(HookKind::Close).add_listener(listener);
        self
    }

    pub fn on_error<F: FnMut() + Send + 'static>(mut self, listener: F) -> Self {
        self.hooks.event_mut(HookKind::Error).add_listener(listener);
        self
    }

    pub fn hook_mut(&mut self, kind: HookKind) -> &mut Event {
        self.hooks.event_mut(kind)
    }

    /// A status handle that stays valid after the worker is submitted.
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::new(Arc::clone(&self.shared))
    }

    /// Split into the part that moves to the worker thread and the part the
    /// dispatcher keeps on the main thread.
    pub(crate) fn into_parts(self, id: WorkerId) -> (Execution, Hooks, WorkerStatus) {
        let _ = self.shared.id.set(id);
        let status = WorkerStatus::new(Arc::clone(&self.shared));
        let execution = Execution {
            body: self.body,
            ctx: WorkContext::new(id, self.shared),
        };
        (execution, self.hooks, status)
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.shared.state.load())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// The body of a started worker, bound to its context.
///
/// `run` consumes `self`, so a body executes at most once.
pub(crate) struct Execution {
    body: Box<dyn WorkBody>,
    ctx: WorkContext,
}

impl Execution {
    /// Run the body on the current (worker) thread.
    ///
    /// - body returns `Ok` -> `Closed`, returns `Ok(())`
    /// - body returns `Err` -> `Error`, returns the fault as the thread result
    /// - body panics -> `Error`, the panic is resumed so the thread still
    ///   dies with it and `JoinHandle::join` reports it
    pub(crate) fn run(self) -> Result<(), WorkFault> {
        let Execution { body, ctx } = self;
        let shared = Arc::clone(&ctx.shared);
        let worker_id = ctx.worker_id();

        let started = shared.state.transition(WorkerState::Running);
        debug_assert!(started.is_ok(), "worker body executed twice");
        tracing::debug!(worker_id = %worker_id, "worker running");

        match panic::catch_unwind(AssertUnwindSafe(|| body.run(&ctx))) {
            Ok(Ok(())) => {
                let _ = shared.state.transition(WorkerState::Closed);
                tracing::debug!(worker_id = %worker_id, "worker closed");
                Ok(())
            }
            Ok(Err(fault)) => {
                shared.record_fault(fault.to_string());
                let _ = shared.state.transition(WorkerState::Error);
                tracing::error!(worker_id = %worker_id, error = %fault, "work body failed");
                Err(fault)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                shared.record_fault(format!("panicked: {message}"));
                let _ = shared.state.transition(WorkerState::Error);
                tracing::error!(worker_id = %worker_id, panic = %message, "work body panicked");
                panic::resume_unwind(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;
    use ulid::Ulid;

    fn new_id() -> WorkerId {
        WorkerId::from_ulid(Ulid::new())
    }

    #[test]
    fn state_is_not_started_until_execution() {
        let worker = Worker::from_fn(|_| Ok(()));
        let status = worker.status();

        assert_eq!(status.state(), WorkerState::NotStarted);
        assert_eq!(status.id(), None);
    }

    #[test]
    fn successful_body_closes() {
        let worker = Worker::from_fn(|ctx| {
            ctx.set_progress(1.0);
            Ok(())
        });
        let id = new_id();
        let (execution, _hooks, status) = worker.into_parts(id);

        assert!(execution.run().is_ok());
        assert_eq!(status.state(), WorkerState::Closed);
        assert_eq!(status.progress(), 1.0);
        assert_eq!(status.id(), Some(id));
        assert_eq!(status.fault(), None);
    }

    #[test]
    fn body_sees_running_state() {
        let slot: Arc<Mutex<Option<WorkerStatus>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(None));
        let worker = Worker::from_fn({
            let slot = Arc::clone(&slot);
            let seen = Arc::clone(&seen);
            move |_| {
                let state = slot.lock().unwrap().as_ref().map(WorkerStatus::state);
                *seen.lock().unwrap() = state;
                Ok(())
            }
        });
        *slot.lock().unwrap() = Some(worker.status());
        let (execution, _, status) = worker.into_parts(new_id());

        execution.run().unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(WorkerState::Running));
        assert_eq!(status.state(), WorkerState::Closed);
    }

    #[test]
    fn failing_body_reports_fault_on_its_thread() {
        let worker = Worker::from_fn(|_| Err(WorkFault::failed("no input")));
        let (execution, _, status) = worker.into_parts(new_id());

        let result = thread::spawn(move || execution.run()).join().unwrap();

        assert!(matches!(result, Err(WorkFault::Failed(ref m)) if m == "no input"));
        assert_eq!(status.state(), WorkerState::Error);
        assert_eq!(status.fault(), Some("no input"));
    }

    #[test]
    fn panicking_body_still_panics_its_thread() {
        let worker = Worker::from_fn(|_| panic!("kaboom"));
        let (execution, _, status) = worker.into_parts(new_id());

        let joined = thread::spawn(move || execution.run()).join();

        let payload = joined.unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "kaboom");
        assert_eq!(status.state(), WorkerState::Error);
        assert_eq!(status.fault(), Some("panicked: kaboom"));
    }

    #[test]
    fn builder_hooks_are_registered() {
        let mut worker = Worker::from_fn(|_| Ok(()))
            .on_start(|| {})
            .on_update(|| {})
            .on_update(|| {})
            .on_close(|| {});
        worker.hook_mut(HookKind::Error).add_listener(|| {});

        let (_, hooks, _) = worker.into_parts(new_id());
        assert_eq!(hooks.event(HookKind::Start).len(), 1);
        assert_eq!(hooks.event(HookKind::Update).len(), 2);
        assert_eq!(hooks.event(HookKind::Close).len(), 1);
        assert_eq!(hooks.event(HookKind::Error).len(), 1);
    }

    struct Steps(u32);

    impl WorkBody for Steps {
        fn run(self: Box<Self>, ctx: &WorkContext) -> Result<(), WorkFault> {
            for i in 0..self.0 {
                ctx.checkpoint()?;
                ctx.set_progress((i + 1) as f32 / self.0 as f32);
            }
            Ok(())
        }
    }

    #[test]
    fn struct_bodies_run_too() {
        let worker = Worker::new(Steps(4));
        let (execution, _, status) = worker.into_parts(new_id());

        execution.run().unwrap();
        assert_eq!(status.progress(), 1.0);
    }

    #[test]
    fn cancelled_body_ends_in_error() {
        let worker = Worker::new(Steps(4));
        worker.status().request_cancel();
        let (execution, _, status) = worker.into_parts(new_id());

        let result = execution.run();

        assert!(matches!(result, Err(WorkFault::Cancelled)));
        assert_eq!(status.state(), WorkerState::Error);
        assert_eq!(status.fault(), Some("cancelled"));
    }
}
