//! Ticker - fixed-interval tick driver for hosts without a frame loop.

use std::thread;
use std::time::{Duration, Instant};

use crate::app::config::DispatcherConfig;
use crate::app::dispatcher::Dispatcher;
use crate::app::status::TickReport;

/// Calls `Dispatcher::tick` at a fixed cadence on the current thread.
///
/// The thread that owns the `Ticker` is the main thread as far as hooks are
/// concerned.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    ticks: u64,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self { interval, ticks: 0 }
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::new(config.tick_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks performed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tick once, then sleep out the rest of the frame.
    pub fn tick_once(&mut self, dispatcher: &Dispatcher) -> TickReport {
        let frame_start = Instant::now();
        let report = dispatcher.tick();
        self.ticks += 1;
        let spent = frame_start.elapsed();
        if spent < self.interval {
            thread::sleep(self.interval - spent);
        }
        report
    }

    /// Tick until the registry is empty or `max_ticks` ticks have run.
    ///
    /// Returns true if the registry drained.
    pub fn run_until_idle(&mut self, dispatcher: &Dispatcher, max_ticks: Option<u64>) -> bool {
        let mut ran = 0;
        while !dispatcher.is_empty() {
            if max_ticks.is_some_and(|max| ran >= max) {
                tracing::debug!(ticks = ran, remaining = dispatcher.len(), "tick budget exhausted");
                return false;
            }
            self.tick_once(dispatcher);
            ran += 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkFault;
    use crate::worker::Worker;
    use std::sync::mpsc;

    #[test]
    fn idle_dispatcher_needs_no_ticks() {
        let d = Dispatcher::new(DispatcherConfig::default());
        let mut ticker = Ticker::new(Duration::from_millis(1));

        assert!(ticker.run_until_idle(&d, Some(0)));
        assert_eq!(ticker.ticks(), 0);
    }

    #[test]
    fn runs_until_workers_finish() {
        let d = Dispatcher::new(DispatcherConfig::default());
        let mut ticker = Ticker::new(Duration::from_millis(2));
        d.start(Worker::from_fn(|_| {
            thread::sleep(Duration::from_millis(10));
            Ok(())
        }))
        .unwrap();

        assert!(ticker.run_until_idle(&d, Some(5_000)));
        assert!(ticker.ticks() >= 1);
    }

    #[test]
    fn stops_at_the_tick_budget() {
        let d = Dispatcher::new(DispatcherConfig::default());
        let mut ticker = Ticker::new(Duration::from_millis(1));
        let (tx, rx) = mpsc::channel::<()>();
        d.start(Worker::from_fn(move |_| {
            rx.recv().map_err(|e| WorkFault::failed(e.to_string()))
        }))
        .unwrap();

        assert!(!ticker.run_until_idle(&d, Some(3)));
        assert_eq!(ticker.ticks(), 3);

        tx.send(()).unwrap();
        assert!(ticker.run_until_idle(&d, Some(5_000)));
    }

    #[test]
    fn tick_once_waits_out_the_frame() {
        let d = Dispatcher::new(DispatcherConfig::default());
        let mut ticker = Ticker::from_config(&DispatcherConfig {
            tick_interval_ms: 20,
            ..DispatcherConfig::default()
        });

        let start = Instant::now();
        ticker.tick_once(&d);

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(ticker.interval(), Duration::from_millis(20));
    }
}
