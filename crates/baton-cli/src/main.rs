use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use baton_core::{DispatcherConfig, Ticker, WorkBody, WorkContext, WorkFault, Worker};
use clap::Parser;
use serde::Serialize;

/// Demo host: submits a few background jobs and drives them from a fixed
/// frame loop on the main thread.
#[derive(Debug, Parser)]
#[command(name = "baton", version)]
struct Args {
    /// Config file (missing file means defaults).
    #[arg(long, default_value = "baton.toml")]
    config: PathBuf,

    /// Number of progress jobs to submit.
    #[arg(long, default_value_t = 2)]
    jobs: usize,

    /// Steps per job (1ms each).
    #[arg(long, default_value_t = 500)]
    steps: u32,

    /// Also submit a job that fails halfway.
    #[arg(long)]
    fail: bool,

    /// Force-abort everything still running after this many ticks.
    #[arg(long)]
    abort_after: Option<u64>,
}

/// Sleeps through `steps` 1ms steps, reporting progress.
struct ProgressJob {
    steps: u32,
    fail_at: Option<u32>,
}

impl WorkBody for ProgressJob {
    fn run(self: Box<Self>, ctx: &WorkContext) -> Result<(), WorkFault> {
        for i in 0..self.steps {
            ctx.checkpoint()?;
            if self.fail_at == Some(i) {
                return Err(WorkFault::failed(format!("step {i} failed")));
            }
            thread::sleep(Duration::from_millis(1));
            ctx.set_progress((i + 1) as f32 / self.steps as f32);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Tally {
    closed: AtomicUsize,
    errored: AtomicUsize,
}

#[derive(Debug, Serialize)]
struct Summary {
    ticks: u64,
    closed: usize,
    errored: usize,
    aborted: usize,
}

fn demo_worker(label: String, job: ProgressJob, tally: &Arc<Tally>) -> Worker {
    let worker = Worker::new(job);
    let status = worker.status();

    worker
        .on_start({
            let label = label.clone();
            move || tracing::info!(job = %label, "starting")
        })
        .on_update({
            let label = label.clone();
            let status = status.clone();
            move || {
                let percent = (status.progress() * 100.0) as u32;
                tracing::debug!(job = %label, progress = percent, "progress");
            }
        })
        .on_close({
            let label = label.clone();
            let tally = Arc::clone(tally);
            move || {
                tally.closed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(job = %label, "finished");
            }
        })
        .on_error({
            let tally = Arc::clone(tally);
            move || {
                tally.errored.fetch_add(1, Ordering::Relaxed);
                let fault = status.fault().unwrap_or("unknown");
                tracing::error!(job = %label, fault, "failed");
            }
        })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = DispatcherConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let mut ticker = Ticker::from_config(&config);
    let dispatcher = baton_core::init_with(config);

    let tally = Arc::new(Tally::default());
    for n in 0..args.jobs {
        let job = ProgressJob {
            steps: args.steps,
            fail_at: None,
        };
        baton_core::start(demo_worker(format!("job-{n}"), job, &tally))?;
    }
    if args.fail {
        let job = ProgressJob {
            steps: args.steps,
            fail_at: Some(args.steps / 2),
        };
        baton_core::start(demo_worker("doomed".to_string(), job, &tally))?;
    }

    let drained = ticker.run_until_idle(&dispatcher, args.abort_after);
    let aborted = if drained {
        0
    } else {
        tracing::warn!(remaining = dispatcher.len(), "tick budget exhausted; aborting");
        baton_core::force_abort_all()?
    };
    baton_core::shutdown();

    let summary = Summary {
        ticks: ticker.ticks(),
        closed: tally.closed.load(Ordering::Relaxed),
        errored: tally.errored.load(Ordering::Relaxed),
        aborted,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
