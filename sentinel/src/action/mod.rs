//! Action Executor and tier-to-action bindings

pub mod binding;
pub mod executor;

pub use binding::{ActionKind, TierActions};
pub use executor::{ActionExecutor, AuditableAction, ExecutionOutcome};
