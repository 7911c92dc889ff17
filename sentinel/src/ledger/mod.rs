//! Audit Logger and ledger sinks
//!
//! Every state transition, action success, terminal failure and cycle
//! finalization produces exactly one [`LedgerEntry`]. Entries are immutable
//! once built and sinks are append-only.

pub mod audit;
pub mod entry;
pub mod sink;

pub use audit::{cycle_key, entry_id, AuditLogger};
pub use entry::{EntryStatus, EventType, LedgerEntry};
pub use sink::{JsonlLedger, LedgerError, LedgerSink, MemoryLedger};
