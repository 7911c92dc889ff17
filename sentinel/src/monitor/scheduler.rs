//! Fixed-interval cycle scheduler.
//!
//! One tokio task per monitor. Ticks that arrive while a cycle is still
//! running are skipped, never queued. Cancellation is only observed between
//! cycles, so a cycle in progress always runs to completion.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::engine::Monitor;
use crate::error::{MonitorError, MonitorResult};

/// Handle to a running monitor task.
#[derive(Debug)]
pub struct MonitorHandle {
    name: String,
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl MonitorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the task to stop after the current cycle. Does not wait.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop and wait. Returns the number of cycles the task ran.
    pub async fn shutdown(self) -> MonitorResult<u64> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| MonitorError::TaskJoin(format!("{}: {}", self.name, e)))
    }
}

pub fn spawn(monitor: Arc<Monitor>) -> MonitorHandle {
    spawn_with_token(monitor, CancellationToken::new())
}

/// Spawn under an externally owned token (e.g. a child of a supervisor's).
pub fn spawn_with_token(monitor: Arc<Monitor>, cancel: CancellationToken) -> MonitorHandle {
    let name = monitor.category().to_string();
    let task = tokio::spawn(run(monitor, cancel.clone()));
    MonitorHandle { name, cancel, task }
}

/// Drive `monitor` until `cancel` fires. The first cycle runs immediately.
pub async fn run(monitor: Arc<Monitor>, cancel: CancellationToken) -> u64 {
    let interval = monitor.config().interval;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        monitor = %monitor.category(),
        interval_ms = interval.as_millis() as u64,
        "Monitor started"
    );

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        monitor.run_cycle().await;
        cycles += 1;
    }

    info!(monitor = %monitor.category(), cycles, "Monitor stopped");
    cycles
}
