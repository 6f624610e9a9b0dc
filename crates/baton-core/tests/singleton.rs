//! Process-wide dispatcher lifecycle.
//!
//! The singleton is global state, so every test takes `SERIAL` and starts
//! from a shut-down dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use baton_core::{DispatchError, DispatcherConfig, WorkFault, Worker, WorkerState};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    baton_core::shutdown();
    guard
}

fn tick_until_empty() {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !baton_core::instance().unwrap().is_empty() {
        assert!(Instant::now() < deadline, "registry never drained");
        baton_core::tick().unwrap();
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn start_before_init_fails_and_registers_nothing() {
    let _serial = serial();
    let started = Arc::new(AtomicUsize::new(0));
    let worker = Worker::from_fn(|_| Ok(())).on_start({
        let started = Arc::clone(&started);
        move || {
            started.fetch_add(1, Ordering::SeqCst);
        }
    });
    let status = worker.status();

    let err = baton_core::start(worker).unwrap_err();

    assert!(matches!(err, DispatchError::NotInstantiated));
    assert_eq!(started.load(Ordering::SeqCst), 0);
    assert_eq!(status.state(), WorkerState::NotStarted);
    assert!(!baton_core::is_initialized());
}

#[test]
fn every_operation_requires_an_instance() {
    let _serial = serial();
    let d = baton_core::init();
    let id = d.start(Worker::from_fn(|_| Ok(()))).unwrap();
    baton_core::shutdown();

    assert!(matches!(baton_core::tick(), Err(DispatchError::NotInstantiated)));
    assert!(matches!(baton_core::contains(id), Err(DispatchError::NotInstantiated)));
    assert!(matches!(baton_core::cancel(id), Err(DispatchError::NotInstantiated)));
    assert!(matches!(baton_core::force_abort(id), Err(DispatchError::NotInstantiated)));
    assert!(matches!(baton_core::force_abort_all(), Err(DispatchError::NotInstantiated)));
    assert!(matches!(baton_core::instance(), Err(DispatchError::NotInstantiated)));
}

#[test]
fn second_init_returns_the_original() {
    let _serial = serial();
    let first = baton_core::init_with(DispatcherConfig {
        thread_name_prefix: "first".to_string(),
        ..DispatcherConfig::default()
    });
    let second = baton_core::init_with(DispatcherConfig {
        thread_name_prefix: "second".to_string(),
        ..DispatcherConfig::default()
    });

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.config().thread_name_prefix, "first");
    assert!(baton_core::shutdown());
    assert!(!baton_core::shutdown());
}

#[test]
fn submitted_worker_closes_through_the_singleton() {
    let _serial = serial();
    baton_core::init();
    let closed = Arc::new(AtomicUsize::new(0));
    let worker = Worker::from_fn(|ctx| {
        thread::sleep(Duration::from_millis(50));
        ctx.set_progress(1.0);
        Ok(())
    })
    .on_close({
        let closed = Arc::clone(&closed);
        move || {
            closed.fetch_add(1, Ordering::SeqCst);
        }
    });
    let status = worker.status();

    let id = baton_core::start(worker).unwrap();
    assert!(baton_core::contains(id).unwrap());
    tick_until_empty();

    assert!(!baton_core::contains(id).unwrap());
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(status.state(), WorkerState::Closed);
    assert_eq!(status.progress(), 1.0);
    baton_core::shutdown();
}

#[test]
fn failing_worker_errors_through_the_singleton() {
    let _serial = serial();
    baton_core::init();
    let errors = Arc::new(AtomicUsize::new(0));
    let worker = Worker::from_fn(|_| Err(WorkFault::failed("boom"))).on_error({
        let errors = Arc::clone(&errors);
        move || {
            errors.fetch_add(1, Ordering::SeqCst);
        }
    });

    let id = baton_core::start(worker).unwrap();
    tick_until_empty();

    assert!(!baton_core::contains(id).unwrap());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    baton_core::shutdown();
}

#[test]
fn shutdown_aborts_live_workers() {
    let _serial = serial();
    let d = baton_core::init();
    let worker = Worker::from_fn(|ctx| {
        while !ctx.is_cancelled() {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    });
    let status = worker.status();
    baton_core::start(worker).unwrap();

    assert!(baton_core::shutdown());

    assert!(d.is_empty());
    assert!(status.is_cancel_requested());
    assert!(!baton_core::is_initialized());
}

#[test]
fn force_abort_all_through_the_singleton() {
    let _serial = serial();
    baton_core::init();
    for _ in 0..3 {
        baton_core::start(Worker::from_fn(|ctx| {
            while !ctx.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }))
        .unwrap();
    }

    assert_eq!(baton_core::force_abort_all().unwrap(), 3);
    assert!(baton_core::instance().unwrap().is_empty());
    baton_core::shutdown();
}
