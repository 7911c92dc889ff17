//! Entity State Store
//!
//! One [`MonitoredEntity`] per entity key, owned by the monitor and only
//! mutated by the escalation policy and action executor while the monitor's
//! lock is held.

pub mod state;
pub mod store;

pub use state::{MonitoredEntity, Tier};
pub use store::EntityStore;
