//! Contracts for the external collaborators a monitor consumes.
//!
//! The engine owns no transport, crypto or consensus code. Each trait exists
//! so that production backends and test stubs plug in the same way.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::ActionKind;
use crate::error::CollaboratorError;
use crate::report::Report;

/// Supplies this cycle's per-entity snapshots.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_reports(&self) -> Result<Vec<Report>, CollaboratorError>;
}

/// Encrypts the payload handed to the enforcement backend.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CollaboratorError>;
}

/// The enforcement (consensus) backend. One call per tier per entity per attempt.
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// `true` if the backend accepted the action.
    async fn enforce(&self, action: ActionKind, entity_key: &str, payload: &[u8]) -> bool;
}

/// Batch hook invoked every `finalization_period` cycles.
#[async_trait]
pub trait CycleFinalizer: Send + Sync {
    async fn finalize_cycle(&self, cycle: u64) -> bool;
}

/// Derives the entity key from a report. Defaults to `report.entity_key`.
pub type KeyExtractor = Arc<dyn Fn(&Report) -> String + Send + Sync>;

pub fn default_key_extractor() -> KeyExtractor {
    Arc::new(|report: &Report| report.entity_key.clone())
}

/// Report source over a fixed, shared list. Handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticReportSource {
    reports: Arc<tokio::sync::Mutex<Vec<Report>>>,
}

impl StaticReportSource {
    pub fn new(reports: Vec<Report>) -> Self {
        Self {
            reports: Arc::new(tokio::sync::Mutex::new(reports)),
        }
    }

    /// Replace what the next fetch returns.
    pub async fn set(&self, reports: Vec<Report>) {
        *self.reports.lock().await = reports;
    }
}

#[async_trait]
impl ReportSource for StaticReportSource {
    async fn fetch_reports(&self) -> Result<Vec<Report>, CollaboratorError> {
        Ok(self.reports.lock().await.clone())
    }
}
