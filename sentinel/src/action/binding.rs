//! Enforcement calls and their binding to tiers

use serde::{Deserialize, Serialize};

use crate::entity::Tier;
use crate::ledger::EventType;

/// One external enforcement call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Alert,
    Escalate,
    Sanction,
    Terminate,
    Lockdown,
}

impl ActionKind {
    /// Ledger event written when this call succeeds on the periodic path.
    pub fn success_event(&self) -> EventType {
        match self {
            Self::Alert => EventType::AlertIssued,
            Self::Escalate => EventType::Escalated,
            Self::Sanction => EventType::SanctionApplied,
            Self::Terminate => EventType::Terminated,
            Self::Lockdown => EventType::LockedDown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Escalate => "escalate",
            Self::Sanction => "sanction",
            Self::Terminate => "terminate",
            Self::Lockdown => "lockdown",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which enforcement call each tier invokes.
///
/// A monitor that sanctions instead of escalating just rebinds `escalated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierActions {
    pub alerted: ActionKind,
    pub escalated: ActionKind,
    pub locked_down: ActionKind,
}

impl Default for TierActions {
    fn default() -> Self {
        Self {
            alerted: ActionKind::Alert,
            escalated: ActionKind::Escalate,
            locked_down: ActionKind::Lockdown,
        }
    }
}

impl TierActions {
    /// `None` for Clear, which has no action.
    pub fn for_tier(&self, tier: Tier) -> Option<ActionKind> {
        match tier {
            Tier::Clear => None,
            Tier::Alerted => Some(self.alerted),
            Tier::Escalated => Some(self.escalated),
            Tier::LockedDown => Some(self.locked_down),
        }
    }
}
