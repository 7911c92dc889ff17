//! Bounded entity store.
//!
//! Only idle entities (tier Clear, zero counters) are ever dropped, either
//! by capacity eviction on insert or by the per-cycle TTL sweep. Entities
//! carrying escalation state are kept even past the capacity bound.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::state::MonitoredEntity;

#[derive(Debug, Clone)]
pub struct EntityStore {
    entities: HashMap<String, MonitoredEntity>,
    capacity: usize,
    idle_ttl: Option<Duration>,
}

impl EntityStore {
    pub fn new(capacity: usize, idle_ttl: Option<Duration>) -> Self {
        Self {
            entities: HashMap::new(),
            capacity: capacity.max(1),
            idle_ttl,
        }
    }

    /// Fetch or create the entity for `key`, marking it seen at `now`.
    pub fn touch(&mut self, key: &str, now: DateTime<Utc>) -> &mut MonitoredEntity {
        if !self.entities.contains_key(key) && self.entities.len() >= self.capacity {
            self.evict_one();
        }
        let entity = self
            .entities
            .entry(key.to_string())
            .or_insert_with(|| MonitoredEntity::new(key, now));
        entity.last_seen_at = now;
        entity
    }

    pub fn get(&self, key: &str) -> Option<&MonitoredEntity> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MonitoredEntity> {
        self.entities.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Copies of every tracked entity, sorted by key.
    pub fn snapshot(&self) -> Vec<MonitoredEntity> {
        let mut all: Vec<_> = self.entities.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Drop idle entities not seen within the TTL. Returns how many went.
    pub fn sweep_idle(&mut self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let before = self.entities.len();
        self.entities.retain(|_, e| {
            let expired = (now - e.last_seen_at)
                .to_std()
                .map(|age| age >= ttl)
                .unwrap_or(false);
            !(e.is_idle() && expired)
        });
        let swept = before - self.entities.len();
        if swept > 0 {
            debug!(swept, remaining = self.entities.len(), "Swept idle entities");
        }
        swept
    }

    fn evict_one(&mut self) {
        let victim = self
            .entities
            .values()
            .filter(|e| e.is_idle())
            .min_by_key(|e| e.last_seen_at)
            .map(|e| e.key.clone());

        match victim {
            Some(key) => {
                self.entities.remove(&key);
                debug!(entity = %key, "Evicted idle entity at capacity");
            }
            None => warn!(
                capacity = self.capacity,
                tracked = self.entities.len(),
                "Entity store over capacity; no idle entity to evict"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Tier;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_touch_creates_and_updates_last_seen() {
        let t0 = Utc::now();
        let mut store = EntityStore::new(10, None);
        store.touch("user-1", t0);
        let t1 = t0 + ChronoDuration::seconds(5);
        let entity = store.touch("user-1", t1);
        assert_eq!(entity.last_seen_at, t1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_idle() {
        let t0 = Utc::now();
        let mut store = EntityStore::new(2, None);
        store.touch("old", t0);
        store.touch("newer", t0 + ChronoDuration::seconds(1));
        store.touch("newest", t0 + ChronoDuration::seconds(2));

        assert_eq!(store.len(), 2);
        assert!(store.get("old").is_none());
        assert!(store.get("newer").is_some());
    }

    #[test]
    fn test_capacity_never_evicts_escalated_state() {
        let t0 = Utc::now();
        let mut store = EntityStore::new(1, None);
        store.touch("flagged", t0).tier = Tier::Alerted;
        store.touch("other", t0 + ChronoDuration::seconds(1));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("flagged").map(|e| e.tier), Some(Tier::Alerted));
    }

    #[test]
    fn test_sweep_only_removes_expired_idle() {
        let t0 = Utc::now();
        let mut store = EntityStore::new(10, Some(Duration::from_secs(60)));
        store.touch("idle", t0);
        store.touch("streaking", t0).violation_streak = 2;
        store.touch("fresh", t0 + ChronoDuration::seconds(100));

        let swept = store.sweep_idle(t0 + ChronoDuration::seconds(120));
        assert_eq!(swept, 1);
        assert!(store.get("idle").is_none());
        assert!(store.get("streaking").is_some());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn test_sweep_disabled_without_ttl() {
        let t0 = Utc::now();
        let mut store = EntityStore::new(10, None);
        store.touch("idle", t0);
        assert_eq!(store.sweep_idle(t0 + ChronoDuration::days(30)), 0);
    }
}
