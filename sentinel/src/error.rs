//! Error taxonomy for the monitoring engine.
//!
//! Every failure in a cycle ends in a log line and, where it concerns an
//! entity or a cycle boundary, a ledger entry. Nothing here aborts the
//! scheduler; callers query [`MonitorError::is_retriable`] to decide whether
//! another attempt inside the current cycle is allowed.

use thiserror::Error;

use crate::action::ActionKind;
use crate::config::ConfigError;
use crate::ledger::LedgerError;

/// Result type alias for engine operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised by the engine or surfaced from its collaborators
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Crypto collaborator returned an error
    #[error("encryption failed for {entity}: {reason}")]
    EncryptionFailure { entity: String, reason: String },

    /// Enforcement call returned `false`
    #[error("{action} rejected by enforcement backend for {entity}")]
    ActionRejected { action: ActionKind, entity: String },

    /// A collaborator call exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Report source failed or returned garbage
    #[error("report fetch failed: {0}")]
    ReportFetch(String),

    /// Finalize hook returned `false`
    #[error("cycle finalization failed at cycle {cycle}")]
    FinalizationFailure { cycle: u64 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("monitor is missing a {0}")]
    MissingCollaborator(&'static str),

    #[error("monitor task failed: {0}")]
    TaskJoin(String),
}

impl MonitorError {
    /// Whether another attempt within the same cycle may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::EncryptionFailure { .. } | Self::ActionRejected { .. } | Self::Timeout { .. }
        )
    }

    pub(crate) fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

/// Error returned by an external collaborator (report source, crypto backend).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for CollaboratorError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for CollaboratorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
