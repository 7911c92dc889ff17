//! Streak-driven tier selection
//!
//! Consumes one verdict per entity per cycle and decides which tier's action
//! (if any) to invoke. All decisions are deterministic and take no I/O.
//!
//! Enforcement failures never feed back into this module: a tier is only
//! raised by the violation streak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{MonitoredEntity, Tier};

/// Outcome of applying one verdict to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum EscalationDecision {
    /// Clear verdict reset a non-zero streak
    Cleared { previous_streak: u32 },
    /// Clear verdict, nothing to reset
    Steady,
    /// Violation: invoke `target`'s action
    Act {
        /// Tier whose enforcement action runs this cycle
        target: Tier,
        from: Tier,
        /// Entity tier after the decision (never below `from`)
        to: Tier,
        streak: u32,
    },
    /// Violation on a locked-down entity; counted, no automatic action
    Suppressed { streak: u32 },
}

impl EscalationDecision {
    /// The tier whose action should run, if any.
    pub fn action_tier(&self) -> Option<Tier> {
        match self {
            Self::Act { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Whether the entity's tier changed.
    pub fn transitioned(&self) -> bool {
        matches!(self, Self::Act { from, to, .. } if from != to)
    }
}

/// The state machine itself
#[derive(Debug, Clone, Copy)]
pub struct EscalationPolicy {
    violation_threshold: u32,
}

impl EscalationPolicy {
    pub fn new(violation_threshold: u32) -> Self {
        Self {
            violation_threshold: violation_threshold.max(1),
        }
    }

    pub fn violation_threshold(&self) -> u32 {
        self.violation_threshold
    }

    /// Apply one verdict.
    ///
    /// Clear resets both counters but leaves the tier where it is; tiers are
    /// sticky until an explicit [`reset`](Self::reset). A violation bumps the
    /// streak and selects Alerted below the threshold, Escalated at or above.
    pub fn decide(
        &self,
        entity: &mut MonitoredEntity,
        violating: bool,
        now: DateTime<Utc>,
    ) -> EscalationDecision {
        if !violating {
            let previous_streak = entity.violation_streak;
            entity.violation_streak = 0;
            entity.action_retries = 0;
            return if previous_streak > 0 {
                EscalationDecision::Cleared { previous_streak }
            } else {
                EscalationDecision::Steady
            };
        }

        entity.violation_streak = entity.violation_streak.saturating_add(1);
        let streak = entity.violation_streak;

        if entity.tier == Tier::LockedDown {
            return EscalationDecision::Suppressed { streak };
        }

        let target = if streak >= self.violation_threshold {
            Tier::Escalated
        } else {
            Tier::Alerted
        };
        let from = entity.tier;
        let to = from.max(target);
        entity.transition(to, now);

        EscalationDecision::Act {
            target,
            from,
            to,
            streak,
        }
    }

    /// Emergency override: jump to LockedDown from any tier.
    /// Returns the tier the entity was in.
    pub fn lock_down(&self, entity: &mut MonitoredEntity, now: DateTime<Utc>) -> Tier {
        let from = entity.tier;
        entity.transition(Tier::LockedDown, now);
        from
    }

    /// Manual intervention: back to Clear with zeroed counters.
    /// Returns the tier the entity was in.
    pub fn reset(&self, entity: &mut MonitoredEntity, now: DateTime<Utc>) -> Tier {
        let from = entity.tier;
        entity.violation_streak = 0;
        entity.action_retries = 0;
        entity.transition(Tier::Clear, now);
        from
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
