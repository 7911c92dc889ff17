//! Per-entity escalation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Escalation level of a monitored entity.
///
/// Ordered: the policy only ever moves an entity forward along
/// `Clear → Alerted → Escalated`. `LockedDown` is terminal and only reachable
/// through an explicit emergency lockdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Clear,
    Alerted,
    Escalated,
    LockedDown,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => write!(f, "clear"),
            Self::Alerted => write!(f, "alerted"),
            Self::Escalated => write!(f, "escalated"),
            Self::LockedDown => write!(f, "locked_down"),
        }
    }
}

/// Counters and tier for one entity key (user, validator, contract, chain, node...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredEntity {
    pub key: String,
    pub tier: Tier,
    /// Consecutive violating verdicts; reset by the first clear verdict
    pub violation_streak: u32,
    /// Consecutive failed enforcement attempts; reset by a clear verdict or a success
    pub action_retries: u32,
    pub last_transition_at: DateTime<Utc>,
    /// Last time a report or operator call touched this entity
    pub last_seen_at: DateTime<Utc>,
}

impl MonitoredEntity {
    pub fn new(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            tier: Tier::Clear,
            violation_streak: 0,
            action_retries: 0,
            last_transition_at: now,
            last_seen_at: now,
        }
    }

    /// Nothing worth remembering: safe to evict or sweep.
    pub fn is_idle(&self) -> bool {
        self.tier == Tier::Clear && self.violation_streak == 0 && self.action_retries == 0
    }

    /// Move to `tier`, stamping the transition time. Returns `true` if it changed.
    pub(crate) fn transition(&mut self, tier: Tier, now: DateTime<Utc>) -> bool {
        if self.tier == tier {
            return false;
        }
        self.tier = tier;
        self.last_transition_at = now;
        true
    }

    pub fn summary(&self) -> String {
        format!(
            "entity={} tier={} streak={} retries={}",
            self.key, self.tier, self.violation_streak, self.action_retries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Clear < Tier::Alerted);
        assert!(Tier::Alerted < Tier::Escalated);
        assert!(Tier::Escalated < Tier::LockedDown);
        assert_eq!(Tier::Alerted.max(Tier::Escalated), Tier::Escalated);
    }

    #[test]
    fn test_new_entity_is_idle() {
        let entity = MonitoredEntity::new("user-1", Utc::now());
        assert!(entity.is_idle());
        assert_eq!(entity.tier, Tier::Clear);
    }

    #[test]
    fn test_transition_stamps_time_only_on_change() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(30);
        let mut entity = MonitoredEntity::new("user-1", t0);

        assert!(!entity.transition(Tier::Clear, t1));
        assert_eq!(entity.last_transition_at, t0);

        assert!(entity.transition(Tier::Alerted, t1));
        assert_eq!(entity.last_transition_at, t1);
        assert!(!entity.is_idle());
    }

    #[test]
    fn test_tier_serde() {
        let json = serde_json::to_string(&Tier::LockedDown).unwrap();
        assert_eq!(json, "\"locked_down\"");
        assert_eq!(Tier::LockedDown.to_string(), "locked_down");
    }
}
