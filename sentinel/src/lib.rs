//! Sentinel: a threshold-triggered escalation engine
//!
//! Each [`Monitor`] polls a [`ReportSource`] on a fixed interval, classifies
//! every report with a [`Predicate`], moves the entity along the escalation
//! ladder and submits the tier's action to an [`Enforcer`], recording every
//! outcome in an append-only ledger.
//!
//! ```text
//! ReportSource ──▶ Predicate ──▶ EscalationPolicy ──▶ ActionExecutor ──▶ Enforcer
//!                                      │                    │
//!                                      ▼                    ▼
//!                                 EntityStore          AuditLogger ──▶ LedgerSink
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let monitor = Monitor::builder("rbac")
//!     .config(MonitorConfig::from_env())
//!     .report_source(source)
//!     .predicate(Arc::new(ThresholdPredicate::at_or_above(0.25)))
//!     .encryptor(encryptor)
//!     .enforcer(enforcer)
//!     .ledger(Arc::new(JsonlLedger::new("ledger.jsonl")))
//!     .build()?;
//! let handle = sentinel::monitor::spawn(Arc::new(monitor));
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod action;
pub mod collaborators;
pub mod config;
pub mod entity;
pub mod error;
pub mod escalation;
pub mod events;
pub mod ledger;
pub mod monitor;
pub mod predicate;
pub mod report;

pub use action::{ActionExecutor, ActionKind, ExecutionOutcome, TierActions};
pub use collaborators::{
    default_key_extractor, CycleFinalizer, Encryptor, Enforcer, KeyExtractor, ReportSource,
    StaticReportSource,
};
pub use config::{ConfigError, EncryptionPolicy, MonitorConfig};
pub use entity::{EntityStore, MonitoredEntity, Tier};
pub use error::{CollaboratorError, MonitorError, MonitorResult};
pub use escalation::{EscalationDecision, EscalationPolicy};
pub use events::{EventBus, MonitorEvent};
pub use ledger::{
    AuditLogger, EntryStatus, EventType, JsonlLedger, LedgerEntry, LedgerError, LedgerSink,
    MemoryLedger,
};
pub use monitor::{CycleSummary, Monitor, MonitorBuilder, MonitorHandle, MonitorSet};
pub use predicate::{Direction, FlagPredicate, Predicate, PredicateSpec, ThresholdPredicate};
pub use report::{Metric, Report, Verdict};
