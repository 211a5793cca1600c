//! Background scheduler: supervised periodic sweeps.
//!
//! Each sweep runs in its own task on a fixed interval using
//! `tokio::time::interval` and stops when the shared cancellation token is
//! triggered. A panicking or erroring tick never takes the process down; the
//! loop logs and waits for the next tick.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{config::SchedulerConfig, services::sweeps::SweepService};

/// Handle to the running sweep tasks. Dropping it does not stop them;
/// call `shutdown` for a graceful stop.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Trigger cancellation and wait for every sweep loop to finish its
    /// current tick and exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "sweep task did not shut down cleanly");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

/// Spawn the three sweep loops and return their supervision handle.
pub fn start(sweeps: SweepService, config: &SchedulerConfig) -> SchedulerHandle {
    let cancel = CancellationToken::new();

    let tasks = vec![
        tokio::spawn(run_overdue_sweep(
            sweeps.clone(),
            Duration::from_secs(config.overdue_interval_secs),
            cancel.clone(),
        )),
        tokio::spawn(run_expiry_sweep(
            sweeps.clone(),
            Duration::from_secs(config.expiry_interval_secs),
            cancel.clone(),
        )),
        tokio::spawn(run_penalty_sweep(
            sweeps,
            Duration::from_secs(config.penalty_interval_secs),
            cancel.clone(),
        )),
    ];

    tracing::info!("scheduler started");
    SchedulerHandle { cancel, tasks }
}

async fn run_overdue_sweep(sweeps: SweepService, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "overdue sweep started");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("overdue sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match sweeps.mark_overdue_borrows(Utc::now()).await {
                    Ok(flipped) if flipped > 0 => {
                        tracing::info!(flipped, "overdue sweep: borrows flipped");
                    }
                    Ok(_) => {
                        tracing::debug!("overdue sweep: nothing to flip");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "overdue sweep failed");
                    }
                }
            }
        }
    }
}

async fn run_expiry_sweep(sweeps: SweepService, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "expiry sweep started");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match sweeps.expire_reservations(Utc::now()).await {
                    Ok(expired) if expired > 0 => {
                        tracing::info!(expired, "expiry sweep: reservations expired");
                    }
                    Ok(_) => {
                        tracing::debug!("expiry sweep: nothing to expire");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "expiry sweep failed");
                    }
                }
            }
        }
    }
}

async fn run_penalty_sweep(sweeps: SweepService, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "penalty sweep started");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("penalty sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match sweeps.evaluate_penalties(Utc::now()).await {
                    Ok(suspended) if suspended > 0 => {
                        tracing::info!(suspended, "penalty sweep: accounts suspended");
                    }
                    Ok(_) => {
                        tracing::debug!("penalty sweep: no suspensions");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "penalty sweep failed");
                    }
                }
            }
        }
    }
}
