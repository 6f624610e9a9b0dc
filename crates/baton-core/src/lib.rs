//! baton-core
//!
//! Run jobs on dedicated background threads and hear about them on the main
//! thread.
//!
//! # Modules
//! - **domain**: ids, worker state machine, errors
//! - **ports**: clock and id generation seams
//! - **worker**: `Worker`, `WorkBody`, hook events, status handles
//! - **app**: `Dispatcher`, the process-wide singleton, `Ticker`, config
//!
//! The host calls `tick()` once per frame from its main thread; every hook
//! except `start` runs inside that call.
//!
//! # 設計メモ
//! - ジョブ本体は専用スレッドで動き、フックはメインスレッドの `tick()` 内で呼ばれる
//! - ワーカーの識別は参照ではなく `WorkerId` (ULID) で行う

pub mod app;
pub mod domain;
pub mod ports;
pub mod worker;

pub use app::singleton::{
    cancel, contains, force_abort, force_abort_all, init, init_with, instance, is_initialized,
    shutdown, start, tick,
};
pub use app::{
    ConfigError, Dispatcher, DispatcherConfig, TickReport, Ticker, WorkerCounts, WorkerInfo,
};
pub use domain::{DispatchError, WorkFault, WorkerId, WorkerState};
pub use worker::{Event, HookKind, ListenerId, WorkBody, WorkContext, Worker, WorkerStatus};
