//! Price scheduler.
//!
//! Drives [`Engine::tick`] on a fixed period from a tokio task. The tick
//! itself is synchronous and takes entity locks, so it runs on the blocking
//! pool. Missed periods are skipped rather than bunched up.

use crate::config::SchedulerConfig;
use crate::engine::{Engine, TickReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct PriceScheduler {
    engine: Arc<Engine>,
    period: Duration,
}

impl PriceScheduler {
    pub fn new(engine: Arc<Engine>, config: &SchedulerConfig) -> Self {
        Self {
            engine,
            period: Duration::from_millis(config.tick_interval_ms.max(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run a single tick off the async executor. `None` if the tick panicked.
    pub async fn tick(&self) -> Option<TickReport> {
        run_tick(self.engine.clone()).await
    }

    /// Start ticking in the background. Must be called inside a tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, mut stop_rx) = watch::channel(false);
        let Self { engine, period } = self;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut completed = 0u64;
            info!(period_ms = period.as_millis() as u64, "price scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match run_tick(engine.clone()).await {
                            Some(report) if report.skipped => debug!("tick skipped"),
                            Some(_) => completed += 1,
                            None => {}
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(ticks = completed, "price scheduler stopped");
            completed
        });

        SchedulerHandle { shutdown, task }
    }
}

async fn run_tick(engine: Arc<Engine>) -> Option<TickReport> {
    match tokio::task::spawn_blocking(move || engine.tick()).await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(error = %e, "tick task failed");
            None
        }
    }
}

/// Running scheduler. Dropping the handle leaves the task running until the
/// runtime shuts down; call [`SchedulerHandle::stop`] to end it cleanly.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop to exit. Returns completed ticks.
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(ticks) => ticks,
            Err(e) => {
                error!(error = %e, "scheduler task failed");
                0
            }
        }
    }
}
