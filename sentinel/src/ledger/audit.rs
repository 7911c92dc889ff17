//! Audit logger: builds ledger entries and hands them to the sink.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use super::entry::{EntryStatus, EventType, LedgerEntry};
use super::sink::LedgerSink;

/// Deterministic entry id: `{category}-{entity_key}-{event_type}`.
///
/// Repeated events for the same entity produce the same id.
pub fn entry_id(category: &str, entity_key: &str, event_type: EventType) -> String {
    format!("{}-{}-{}", category, entity_key, event_type.as_str())
}

/// Entity key used for cycle-scoped entries.
pub fn cycle_key(cycle: u64) -> String {
    format!("cycle-{}", cycle)
}

#[derive(Clone)]
pub struct AuditLogger {
    category: String,
    sink: Arc<dyn LedgerSink>,
}

impl AuditLogger {
    pub fn new(category: impl Into<String>, sink: Arc<dyn LedgerSink>) -> Self {
        Self {
            category: category.into(),
            sink,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Append one entry. A sink failure is logged and swallowed so that
    /// auditing can never stall a cycle.
    pub async fn record(
        &self,
        entity_key: &str,
        event_type: EventType,
        status: EntryStatus,
        details: impl Into<String>,
    ) -> LedgerEntry {
        let entry = LedgerEntry::new(
            entry_id(&self.category, entity_key, event_type),
            Utc::now().timestamp(),
            event_type.as_str(),
            status.as_str(),
            details,
        );

        match self.sink.add_entry(entry.clone()).await {
            Ok(()) => debug!(
                monitor = %self.category,
                entity = entity_key,
                event = %event_type,
                status = %status,
                "Ledger entry appended"
            ),
            Err(e) => error!(
                monitor = %self.category,
                entity = entity_key,
                event = %event_type,
                "Failed to append ledger entry: {}",
                e
            ),
        }

        entry
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerError, MemoryLedger};
    use async_trait::async_trait;

    struct BrokenSink;

    #[async_trait]
    impl LedgerSink for BrokenSink {
        async fn add_entry(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
            Err(LedgerError::Rejected {
                id: entry.id().to_string(),
                reason: "read-only".to_string(),
            })
        }
    }

    #[test]
    fn test_entry_id_format() {
        assert_eq!(
            entry_id("rbac", "user-7", EventType::AlertIssued),
            "rbac-user-7-Alert Issued"
        );
        assert_eq!(
            entry_id("swap", &cycle_key(20), EventType::CycleFinalization),
            "swap-cycle-20-Cycle Finalization"
        );
    }

    #[tokio::test]
    async fn test_record_appends_to_sink() {
        let ledger = MemoryLedger::new();
        let audit = AuditLogger::new("reputation", Arc::new(ledger.clone()));

        let entry = audit
            .record(
                "user-1",
                EventType::Escalated,
                EntryStatus::Success,
                "streak=3",
            )
            .await;

        assert_eq!(entry.id(), "reputation-user-1-Escalated");
        let stored = ledger.snapshot().await;
        assert_eq!(stored, vec![entry]);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let audit = AuditLogger::new("reputation", Arc::new(BrokenSink));
        let entry = audit
            .record("user-1", EventType::Failure, EntryStatus::Failure, "")
            .await;
        assert_eq!(entry.status(), "Failure");
    }
}
