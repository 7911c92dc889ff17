//! Runs several monitors side by side under one cancellation root.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::engine::Monitor;
use super::scheduler::{spawn_with_token, MonitorHandle};
use crate::error::MonitorResult;

#[derive(Debug, Default)]
pub struct MonitorSet {
    root: CancellationToken,
    handles: Vec<MonitorHandle>,
}

impl MonitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, monitor: Arc<Monitor>) {
        let handle = spawn_with_token(monitor, self.root.child_token());
        info!(monitor = %handle.name(), "Monitor spawned");
        self.handles.push(handle);
    }

    pub fn spawn_all(&mut self, monitors: impl IntoIterator<Item = Arc<Monitor>>) {
        for monitor in monitors {
            self.spawn(monitor);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handles.iter().map(|h| h.name()).collect()
    }

    /// Signal every monitor to stop after its current cycle.
    pub fn stop_all(&self) {
        self.root.cancel();
    }

    /// Stop every monitor and wait for all of them.
    pub async fn shutdown_all(self) -> Vec<(String, MonitorResult<u64>)> {
        self.root.cancel();
        let results = join_all(self.handles.into_iter().map(|handle| async move {
            let name = handle.name().to_string();
            (name, handle.shutdown().await)
        }))
        .await;

        for (name, result) in &results {
            match result {
                Ok(cycles) => info!(monitor = %name, cycles, "Monitor shut down"),
                Err(e) => error!(monitor = %name, "Monitor task failed: {}", e),
            }
        }
        results
    }
}
