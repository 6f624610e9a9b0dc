//! Dispatcher - registry of in-flight workers and the per-tick poll.
//!
//! # Flow
//! 1. `start` issues a `WorkerId`, fires the start hook on the calling
//!    thread, spawns a dedicated thread for the body, registers the worker.
//! 2. The host calls `tick` once per frame on its main thread. Each
//!    registered worker gets exactly one hook per tick: update while it is
//!    running, close or error once it is terminal (and is then removed).
//! 3. `force_abort` / `force_abort_all` drop workers without any hook.
//!
//! The registry mutex is never held while hooks run, so listeners may call
//! back into the dispatcher.
//!
//! # スレッドの後始末
//! 終了済みのワーカーを tick で取り除くとき、スレッドが既に終わっていれば
//! `join` して結果 (`Err` / panic) を拾う。まだ終わっていなければ detach する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::app::config::DispatcherConfig;
use crate::app::status::{TickReport, WorkerCounts, WorkerInfo};
use crate::domain::{DispatchError, WorkFault, WorkerId, WorkerState};
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::worker::{HookKind, Hooks, Worker, WorkerStatus, panic_message};

/// One registered worker.
struct Entry {
    id: WorkerId,
    hooks: Arc<Mutex<Hooks>>,
    status: WorkerStatus,
    /// Dropping the handle detaches the thread.
    thread: JoinHandle<Result<(), WorkFault>>,
    started_at: DateTime<Utc>,
}

/// Registry of in-flight workers.
///
/// Owns each worker's thread handle and hooks. `start` may be called from
/// any thread; `tick` belongs to the host's main thread.
pub struct Dispatcher {
    config: DispatcherConfig,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    /// Insertion order.
    entries: Mutex<Vec<Entry>>,
    ticking: AtomicBool,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_ports(
            config,
            Arc::new(SystemClock),
            Box::new(UlidGenerator::new(SystemClock)),
        )
    }

    pub fn with_ports(
        config: DispatcherConfig,
        clock: Arc<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        Self {
            config,
            clock,
            ids,
            entries: Mutex::new(Vec::new()),
            ticking: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit a worker.
    ///
    /// The start hook runs on the calling thread before the worker thread is
    /// spawned, so listeners see "about to run", never "already finished".
    /// If the thread cannot be spawned nothing is registered and no further
    /// hook fires.
    pub fn start(&self, worker: Worker) -> Result<WorkerId, DispatchError> {
        let id = self.ids.generate_worker_id();
        let (execution, mut hooks, status) = worker.into_parts(id);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.config.thread_name_prefix, id));
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        hooks.fire(HookKind::Start);

        let thread = builder.spawn(move || execution.run()).map_err(|e| {
            tracing::error!(worker_id = %id, error = %e, "failed to spawn worker thread");
            DispatchError::Spawn(e)
        })?;

        self.entries().push(Entry {
            id,
            hooks: Arc::new(Mutex::new(hooks)),
            status,
            thread,
            started_at: self.clock.now(),
        });
        tracing::debug!(worker_id = %id, "worker started");

        Ok(id)
    }

    /// Poll every registered worker once and fire its hook.
    ///
    /// Must be called from the host's main thread, once per frame. Workers
    /// are visited newest first. A call made from inside a hook is ignored.
    pub fn tick(&self) -> TickReport {
        if self.ticking.swap(true, Ordering::AcqRel) {
            tracing::warn!("tick called re-entrantly from a hook; ignored");
            return TickReport::default();
        }
        let _guard = TickGuard(&self.ticking);

        let snapshot: Vec<(WorkerId, Arc<Mutex<Hooks>>, WorkerStatus)> = self
            .entries()
            .iter()
            .map(|e| (e.id, Arc::clone(&e.hooks), e.status.clone()))
            .collect();

        let mut report = TickReport::default();
        for (id, hooks, status) in snapshot.into_iter().rev() {
            let kind = match status.state() {
                WorkerState::NotStarted | WorkerState::Running => {
                    // may have been aborted by an earlier hook in this tick
                    if !self.contains(id) {
                        continue;
                    }
                    report.updated += 1;
                    HookKind::Update
                }
                WorkerState::Closed => {
                    let Some(entry) = self.remove(id) else {
                        continue;
                    };
                    report.thread_faults += reap(entry);
                    tracing::debug!(worker_id = %id, "worker removed after close");
                    report.closed += 1;
                    HookKind::Close
                }
                WorkerState::Error => {
                    let Some(entry) = self.remove(id) else {
                        continue;
                    };
                    report.thread_faults += reap(entry);
                    tracing::warn!(
                        worker_id = %id,
                        fault = status.fault().unwrap_or("unknown"),
                        "worker removed after error"
                    );
                    report.errored += 1;
                    HookKind::Error
                }
            };
            report.listener_panics += lock_hooks(&hooks).fire(kind);
        }
        report
    }

    fn remove(&self, id: WorkerId) -> Option<Entry> {
        let mut entries = self.entries();
        let pos = entries.iter().position(|e| e.id == id)?;
        Some(entries.remove(pos))
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.entries().iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn status(&self, id: WorkerId) -> Option<WorkerStatus> {
        self.entries()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.status.clone())
    }

    /// Snapshot of registered workers in insertion order.
    pub fn workers(&self) -> Vec<WorkerInfo> {
        self.entries()
            .iter()
            .map(|e| WorkerInfo {
                id: e.id,
                state: e.status.state(),
                progress: e.status.progress(),
                started_at: e.started_at,
            })
            .collect()
    }

    pub fn counts(&self) -> WorkerCounts {
        let mut counts = WorkerCounts::default();
        for entry in self.entries().iter() {
            counts.record(entry.status.state());
        }
        counts
    }

    /// Ask a worker's body to stop at its next checkpoint.
    ///
    /// The worker stays registered and reports through its hooks as usual.
    pub fn cancel(&self, id: WorkerId) -> bool {
        match self.entries().iter().find(|e| e.id == id) {
            Some(entry) => {
                entry.status.request_cancel();
                tracing::debug!(worker_id = %id, "cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Last resort: drop a running worker without firing any hook.
    ///
    /// Threads cannot be killed, so the thread is detached and its
    /// cancellation flag raised; a body that never checks the flag keeps
    /// running in the background until it returns, and nothing it leaves
    /// half-done is cleaned up. Use `cancel` for normal cancellation.
    ///
    /// No-op (returns false) if `id` is not registered or its thread already
    /// finished; a finished worker is left for the next tick to report.
    pub fn force_abort(&self, id: WorkerId) -> bool {
        let entry = {
            let mut entries = self.entries();
            let Some(pos) = entries.iter().position(|e| e.id == id) else {
                return false;
            };
            if entries[pos].thread.is_finished() {
                return false;
            }
            entries.remove(pos)
        };
        abandon(entry);
        true
    }

    /// Empty the registry without firing any hook.
    ///
    /// Live workers are abandoned as in `force_abort`; finished workers that
    /// were not yet reported are discarded. Returns the number removed.
    pub fn force_abort_all(&self) -> usize {
        let drained: Vec<Entry> = self.entries().drain(..).collect();
        let removed = drained.len();
        for entry in drained {
            if entry.thread.is_finished() {
                tracing::debug!(worker_id = %entry.id, "discarded finished worker");
            } else {
                abandon(entry);
            }
        }
        removed
    }

    /// Cancel every worker and keep ticking until the registry drains or
    /// `timeout` passes. Terminal hooks fire as usual.
    ///
    /// Call from the main thread. Returns true if the registry drained.
    pub fn join_all(&self, timeout: Duration) -> bool {
        for entry in self.entries().iter() {
            entry.status.request_cancel();
        }
        let deadline = Instant::now() + timeout;
        loop {
            self.tick();
            if self.is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(remaining = self.len(), "join_all timed out");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let entries = self.entries.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !entries.is_empty() {
            tracing::warn!(
                remaining = entries.len(),
                "dispatcher dropped with registered workers; detaching their threads"
            );
            for entry in entries.iter() {
                entry.status.request_cancel();
            }
        }
    }
}

/// Join a removed worker's thread if it already finished; returns 1 if the
/// thread ended with a fault or a panic. An unfinished thread (it set its
/// terminal state but has not returned yet) is detached.
fn reap(entry: Entry) -> usize {
    if !entry.thread.is_finished() {
        return 0;
    }
    match entry.thread.join() {
        Ok(Ok(())) => 0,
        Ok(Err(fault)) => {
            tracing::debug!(worker_id = %entry.id, %fault, "worker thread returned a fault");
            1
        }
        Err(payload) => {
            tracing::debug!(
                worker_id = %entry.id,
                panic = %panic_message(payload.as_ref()),
                "worker thread panicked"
            );
            1
        }
    }
}

fn abandon(entry: Entry) {
    entry.status.request_cancel();
    tracing::warn!(worker_id = %entry.id, "worker force-aborted; thread detached");
}

fn lock_hooks(hooks: &Mutex<Hooks>) -> MutexGuard<'_, Hooks> {
    hooks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the re-entrancy flag when the tick ends, even by unwinding.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
