//! Live monitor events
//!
//! Published on the monitor's [`EventBus`](super::EventBus) as they happen.
//! The ledger is the durable record; these are for in-process subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::entity::Tier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// An entity changed tier
    TierChanged {
        monitor: String,
        entity_key: String,
        from: Tier,
        to: Tier,
        timestamp: DateTime<Utc>,
    },

    ActionSucceeded {
        monitor: String,
        entity_key: String,
        action: ActionKind,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// Every attempt failed this cycle
    ActionExhausted {
        monitor: String,
        entity_key: String,
        action: ActionKind,
        attempts: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },

    EmergencyLockdown {
        monitor: String,
        entity_key: String,
        previous_tier: Tier,
        enforced: bool,
        timestamp: DateTime<Utc>,
    },

    /// Manual intervention returned an entity to Clear
    EntityReset {
        monitor: String,
        entity_key: String,
        previous_tier: Tier,
        timestamp: DateTime<Utc>,
    },

    CycleCompleted {
        monitor: String,
        cycle: u64,
        reports: usize,
        violations: usize,
        timestamp: DateTime<Utc>,
    },

    FinalizationFailed {
        monitor: String,
        cycle: u64,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TierChanged { .. } => "tier_changed",
            Self::ActionSucceeded { .. } => "action_succeeded",
            Self::ActionExhausted { .. } => "action_exhausted",
            Self::EmergencyLockdown { .. } => "emergency_lockdown",
            Self::EntityReset { .. } => "entity_reset",
            Self::CycleCompleted { .. } => "cycle_completed",
            Self::FinalizationFailed { .. } => "finalization_failed",
        }
    }

    pub fn monitor(&self) -> &str {
        match self {
            Self::TierChanged { monitor, .. }
            | Self::ActionSucceeded { monitor, .. }
            | Self::ActionExhausted { monitor, .. }
            | Self::EmergencyLockdown { monitor, .. }
            | Self::EntityReset { monitor, .. }
            | Self::CycleCompleted { monitor, .. }
            | Self::FinalizationFailed { monitor, .. } => monitor,
        }
    }

    /// Entity the event concerns, if it is entity-scoped.
    pub fn entity_key(&self) -> Option<&str> {
        match self {
            Self::TierChanged { entity_key, .. }
            | Self::ActionSucceeded { entity_key, .. }
            | Self::ActionExhausted { entity_key, .. }
            | Self::EmergencyLockdown { entity_key, .. }
            | Self::EntityReset { entity_key, .. } => Some(entity_key),
            Self::CycleCompleted { .. } | Self::FinalizationFailed { .. } => None,
        }
    }
}
