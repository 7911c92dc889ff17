//! Ledger record types

use serde::{Deserialize, Serialize};

/// An immutable audit record.
///
/// Fields are private; once built, an entry can be read and serialized but
/// never changed. Wire shape: `{id, timestamp, type, status, details}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    id: String,
    /// Unix seconds
    timestamp: i64,
    #[serde(rename = "type")]
    event_type: String,
    status: String,
    details: String,
}

impl LedgerEntry {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        event_type: impl Into<String>,
        status: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            event_type: event_type.into(),
            status: status.into(),
            details: details.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn details(&self) -> &str {
        &self.details
    }
}

/// Every kind of record the engine writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AlertIssued,
    Escalated,
    SanctionApplied,
    Terminated,
    LockedDown,
    /// Terminal failure of an action after exhausting its attempts
    Failure,
    EmergencyLockedDown,
    ViolationCleared,
    ManualReset,
    ReportFetchFailure,
    CycleFinalization,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlertIssued => "Alert Issued",
            Self::Escalated => "Escalated",
            Self::SanctionApplied => "Sanction Applied",
            Self::Terminated => "Terminated",
            Self::LockedDown => "Locked Down",
            Self::Failure => "Failure",
            Self::EmergencyLockedDown => "Emergency Locked Down",
            Self::ViolationCleared => "Violation Cleared",
            Self::ManualReset => "Manual Reset",
            Self::ReportFetchFailure => "Report Fetch Failure",
            Self::CycleFinalization => "Cycle Finalization",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Success,
    Failure,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
