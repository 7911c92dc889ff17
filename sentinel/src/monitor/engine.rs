//! The monitor: one instantiation of the poll → classify → escalate →
//! enforce → audit loop.
//!
//! All mutable state sits behind a single async mutex that is held for the
//! whole cycle (and for the whole of an operator call), so cycle work is
//! serialized against itself and against emergency lockdowns.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::action::{ActionExecutor, ExecutionOutcome, TierActions};
use crate::collaborators::{
    default_key_extractor, CycleFinalizer, Encryptor, Enforcer, KeyExtractor, ReportSource,
};
use crate::config::MonitorConfig;
use crate::entity::{EntityStore, MonitoredEntity, Tier};
use crate::error::{MonitorError, MonitorResult};
use crate::escalation::{EscalationDecision, EscalationPolicy};
use crate::events::{EventBus, MonitorEvent};
use crate::ledger::{cycle_key, AuditLogger, EntryStatus, EventType, LedgerSink};
use crate::predicate::Predicate;
use crate::report::Report;

/// What one cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Cycle number after increment (1-based)
    pub cycle: u64,
    /// Distinct entities evaluated
    pub reports: usize,
    pub violations: usize,
    pub actions_succeeded: usize,
    pub actions_exhausted: usize,
    pub fetch_failed: bool,
    /// `None` when no finalization was due (or no finalizer is configured)
    pub finalized: Option<bool>,
    /// Idle entities dropped by the TTL sweep
    pub swept: usize,
}

struct MonitorState {
    store: EntityStore,
    cycle_count: u64,
}

pub struct Monitor {
    category: String,
    config: MonitorConfig,
    source: Arc<dyn ReportSource>,
    predicate: Arc<dyn Predicate>,
    key_extractor: KeyExtractor,
    policy: EscalationPolicy,
    executor: ActionExecutor,
    finalizer: Option<Arc<dyn CycleFinalizer>>,
    audit: AuditLogger,
    events: EventBus,
    state: Mutex<MonitorState>,
}

impl Monitor {
    pub fn builder(category: impl Into<String>) -> MonitorBuilder {
        MonitorBuilder::new(category)
    }

    /// Category name; also the prefix of every ledger id this monitor writes.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub async fn cycle_count(&self) -> u64 {
        self.state.lock().await.cycle_count
    }

    pub async fn entity(&self, key: &str) -> Option<MonitoredEntity> {
        self.state.lock().await.store.get(key).cloned()
    }

    pub async fn entities(&self) -> Vec<MonitoredEntity> {
        self.state.lock().await.store.snapshot()
    }

    /// Run one full cycle: fetch, evaluate and act on every entity, sweep,
    /// bump the cycle counter and finalize when due.
    pub async fn run_cycle(&self) -> CycleSummary {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let mut summary = CycleSummary::default();

        let reports = match self.fetch().await {
            Ok(reports) => reports,
            Err(e) => {
                warn!(monitor = %self.category, "Report fetch failed: {}", e);
                summary.fetch_failed = true;
                self.audit
                    .record(
                        &cycle_key(state.cycle_count + 1),
                        EventType::ReportFetchFailure,
                        EntryStatus::Failure,
                        e.to_string(),
                    )
                    .await;
                Vec::new()
            }
        };

        let keyed = self.key_reports(reports);
        summary.reports = keyed.len();
        for (key, report) in &keyed {
            self.process(&mut state.store, key, report, &mut summary)
                .await;
        }

        summary.swept = state.store.sweep_idle(Utc::now());
        state.cycle_count += 1;
        summary.cycle = state.cycle_count;

        if summary.cycle % self.config.finalization_period == 0 {
            summary.finalized = self.finalize(summary.cycle).await;
        }

        info!(
            monitor = %self.category,
            cycle = summary.cycle,
            reports = summary.reports,
            violations = summary.violations,
            succeeded = summary.actions_succeeded,
            exhausted = summary.actions_exhausted,
            tracked = state.store.len(),
            "Cycle complete"
        );
        self.events.publish(MonitorEvent::CycleCompleted {
            monitor: self.category.clone(),
            cycle: summary.cycle,
            reports: summary.reports,
            violations: summary.violations,
            timestamp: Utc::now(),
        });

        summary
    }

    /// Emergency override: lock `key` down regardless of its tier or streak,
    /// then submit the LockedDown tier's action. Writes exactly one
    /// "Emergency Locked Down" entry whose status reflects the enforcement
    /// result; the local tier is LockedDown either way.
    pub async fn emergency_lockdown(&self, key: &str, reason: &str) -> ExecutionOutcome {
        let mut guard = self.state.lock().await;
        let now = Utc::now();
        let entity = guard.store.touch(key, now);
        let previous_tier = self.policy.lock_down(entity, now);
        warn!(
            monitor = %self.category,
            entity = key,
            previous_tier = %previous_tier,
            reason,
            "Emergency lockdown"
        );

        let outcome = self
            .executor
            .execute(entity, Tier::LockedDown, reason.as_bytes())
            .await;

        let (status, details) = match &outcome {
            ExecutionOutcome::Succeeded {
                action,
                attempts,
                payload_digest,
            } => (
                EntryStatus::Success,
                format!(
                    "previous_tier={} action={} attempts={} reason={} payload_blake3={}",
                    previous_tier, action, attempts, reason, payload_digest
                ),
            ),
            ExecutionOutcome::Exhausted {
                action,
                attempts,
                last_error,
            } => (
                EntryStatus::Failure,
                format!(
                    "previous_tier={} action={} attempts={} reason={} error={}",
                    previous_tier, action, attempts, reason, last_error
                ),
            ),
            ExecutionOutcome::Unbound { tier } => (
                EntryStatus::Failure,
                format!(
                    "previous_tier={} reason={} error=no action bound to {}",
                    previous_tier, reason, tier
                ),
            ),
        };
        self.audit
            .record(key, EventType::EmergencyLockedDown, status, details)
            .await;

        self.events.publish(MonitorEvent::EmergencyLockdown {
            monitor: self.category.clone(),
            entity_key: key.to_string(),
            previous_tier,
            enforced: outcome.is_success(),
            timestamp: now,
        });

        outcome
    }

    /// Manual intervention: return a tracked entity to Clear with zeroed
    /// counters. `false` if the key is unknown.
    pub async fn reset_entity(&self, key: &str, reason: &str) -> bool {
        let mut guard = self.state.lock().await;
        let now = Utc::now();
        let Some(entity) = guard.store.get_mut(key) else {
            return false;
        };
        let previous_tier = self.policy.reset(entity, now);
        entity.last_seen_at = now;
        info!(monitor = %self.category, entity = key, previous_tier = %previous_tier, "Entity reset");

        self.audit
            .record(
                key,
                EventType::ManualReset,
                EntryStatus::Success,
                format!("previous_tier={} reason={}", previous_tier, reason),
            )
            .await;
        self.events.publish(MonitorEvent::EntityReset {
            monitor: self.category.clone(),
            entity_key: key.to_string(),
            previous_tier,
            timestamp: now,
        });
        true
    }

    async fn fetch(&self) -> MonitorResult<Vec<Report>> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, self.source.fetch_reports()).await {
            Ok(Ok(reports)) => Ok(reports),
            Ok(Err(e)) => Err(MonitorError::ReportFetch(e.to_string())),
            Err(_) => Err(MonitorError::timeout("report fetch", timeout)),
        }
    }

    /// Pair each report with its entity key; the last report per key wins.
    fn key_reports(&self, reports: Vec<Report>) -> Vec<(String, Report)> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(reports.len());
        let mut keyed: Vec<(String, Report)> = Vec::with_capacity(reports.len());
        for report in reports {
            let key = (self.key_extractor)(&report);
            match index.get(&key) {
                Some(&pos) => {
                    warn!(monitor = %self.category, entity = %key, "Duplicate report in one fetch; keeping the last");
                    keyed[pos].1 = report;
                }
                None => {
                    index.insert(key.clone(), keyed.len());
                    keyed.push((key, report));
                }
            }
        }
        keyed
    }

    async fn process(
        &self,
        store: &mut EntityStore,
        key: &str,
        report: &Report,
        summary: &mut CycleSummary,
    ) {
        let now = Utc::now();
        let violating = self.predicate.evaluate(report);
        if violating {
            summary.violations += 1;
        }

        let entity = store.touch(key, now);
        let decision = self.policy.decide(entity, violating, now);
        debug!(
            monitor = %self.category,
            entity = key,
            violating,
            predicate = %self.predicate.describe(),
            ?decision,
            "Verdict"
        );

        match decision {
            EscalationDecision::Steady => {}
            EscalationDecision::Cleared { previous_streak } => {
                self.audit
                    .record(
                        key,
                        EventType::ViolationCleared,
                        EntryStatus::Success,
                        format!("previous_streak={} tier={}", previous_streak, entity.tier),
                    )
                    .await;
            }
            EscalationDecision::Suppressed { streak } => {
                debug!(
                    monitor = %self.category,
                    entity = key,
                    streak,
                    "Entity locked down; no automatic action"
                );
            }
            EscalationDecision::Act {
                target,
                from,
                to,
                streak,
            } => {
                if from != to {
                    info!(monitor = %self.category, entity = key, from = %from, to = %to, streak, "Tier changed");
                    self.events.publish(MonitorEvent::TierChanged {
                        monitor: self.category.clone(),
                        entity_key: key.to_string(),
                        from,
                        to,
                        timestamp: now,
                    });
                }

                let outcome = self
                    .executor
                    .execute(entity, target, &report.raw_payload)
                    .await;
                self.record_outcome(entity, target, from, outcome, summary)
                    .await;
            }
        }
    }

    async fn record_outcome(
        &self,
        entity: &MonitoredEntity,
        target: Tier,
        from: Tier,
        outcome: ExecutionOutcome,
        summary: &mut CycleSummary,
    ) {
        match outcome {
            ExecutionOutcome::Succeeded {
                action,
                attempts,
                payload_digest,
            } => {
                summary.actions_succeeded += 1;
                self.audit
                    .record(
                        &entity.key,
                        action.success_event(),
                        EntryStatus::Success,
                        format!(
                            "action={} target={} from={} tier={} streak={} attempts={} payload_blake3={}",
                            action,
                            target,
                            from,
                            entity.tier,
                            entity.violation_streak,
                            attempts,
                            payload_digest
                        ),
                    )
                    .await;
                self.events.publish(MonitorEvent::ActionSucceeded {
                    monitor: self.category.clone(),
                    entity_key: entity.key.clone(),
                    action,
                    attempts,
                    timestamp: Utc::now(),
                });
            }
            ExecutionOutcome::Exhausted {
                action,
                attempts,
                last_error,
            } => {
                summary.actions_exhausted += 1;
                error!(
                    monitor = %self.category,
                    entity = %entity.key,
                    action = %action,
                    attempts,
                    "Action failed; no further attempts this cycle: {}",
                    last_error
                );
                self.audit
                    .record(
                        &entity.key,
                        EventType::Failure,
                        EntryStatus::Failure,
                        format!(
                            "action={} target={} tier={} streak={} attempts={} retries={} error={}",
                            action,
                            target,
                            entity.tier,
                            entity.violation_streak,
                            attempts,
                            entity.action_retries,
                            last_error
                        ),
                    )
                    .await;
                self.events.publish(MonitorEvent::ActionExhausted {
                    monitor: self.category.clone(),
                    entity_key: entity.key.clone(),
                    action,
                    attempts,
                    error: last_error.to_string(),
                    timestamp: Utc::now(),
                });
            }
            ExecutionOutcome::Unbound { tier } => {
                warn!(monitor = %self.category, entity = %entity.key, tier = %tier, "No action bound to tier");
            }
        }
    }

    async fn finalize(&self, cycle: u64) -> Option<bool> {
        let finalizer = self.finalizer.as_ref()?;
        let timeout = self.config.finalize_timeout;
        let result = match tokio::time::timeout(timeout, finalizer.finalize_cycle(cycle)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MonitorError::FinalizationFailure { cycle }),
            Err(_) => Err(MonitorError::timeout("cycle finalization", timeout)),
        };

        let key = cycle_key(cycle);
        match result {
            Ok(()) => {
                info!(monitor = %self.category, cycle, "Cycle finalized");
                self.audit
                    .record(
                        &key,
                        EventType::CycleFinalization,
                        EntryStatus::Success,
                        format!("cycle={}", cycle),
                    )
                    .await;
                Some(true)
            }
            Err(e) => {
                error!(monitor = %self.category, cycle, "Cycle finalization failed: {}", e);
                self.audit
                    .record(
                        &key,
                        EventType::CycleFinalization,
                        EntryStatus::Failure,
                        format!("cycle={} error={}", cycle, e),
                    )
                    .await;
                self.events.publish(MonitorEvent::FinalizationFailed {
                    monitor: self.category.clone(),
                    cycle,
                    timestamp: Utc::now(),
                });
                Some(false)
            }
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("category", &self.category)
            .field("config", &self.config)
            .field("predicate", &self.predicate.describe())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Monitor`] from its collaborators.
pub struct MonitorBuilder {
    category: String,
    config: MonitorConfig,
    source: Option<Arc<dyn ReportSource>>,
    predicate: Option<Arc<dyn Predicate>>,
    key_extractor: Option<KeyExtractor>,
    tier_actions: TierActions,
    encryptor: Option<Arc<dyn Encryptor>>,
    enforcer: Option<Arc<dyn Enforcer>>,
    finalizer: Option<Arc<dyn CycleFinalizer>>,
    ledger: Option<Arc<dyn LedgerSink>>,
}

impl MonitorBuilder {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            config: MonitorConfig::default(),
            source: None,
            predicate: None,
            key_extractor: None,
            tier_actions: TierActions::default(),
            encryptor: None,
            enforcer: None,
            finalizer: None,
            ledger: None,
        }
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn report_source(mut self, source: Arc<dyn ReportSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn predicate(mut self, predicate: Arc<dyn Predicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn key_extractor(mut self, extractor: KeyExtractor) -> Self {
        self.key_extractor = Some(extractor);
        self
    }

    pub fn tier_actions(mut self, actions: TierActions) -> Self {
        self.tier_actions = actions;
        self
    }

    pub fn encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    pub fn enforcer(mut self, enforcer: Arc<dyn Enforcer>) -> Self {
        self.enforcer = Some(enforcer);
        self
    }

    pub fn finalizer(mut self, finalizer: Arc<dyn CycleFinalizer>) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn LedgerSink>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(self) -> MonitorResult<Monitor> {
        self.config.validate()?;

        let source = self
            .source
            .ok_or(MonitorError::MissingCollaborator("report source"))?;
        let predicate = self
            .predicate
            .ok_or(MonitorError::MissingCollaborator("predicate"))?;
        let encryptor = self
            .encryptor
            .ok_or(MonitorError::MissingCollaborator("encryptor"))?;
        let enforcer = self
            .enforcer
            .ok_or(MonitorError::MissingCollaborator("enforcer"))?;
        let ledger = self
            .ledger
            .ok_or(MonitorError::MissingCollaborator("ledger"))?;

        let executor = ActionExecutor::new(encryptor, enforcer, self.tier_actions, &self.config);
        let store = EntityStore::new(self.config.entity_capacity, self.config.idle_ttl);

        info!(
            monitor = %self.category,
            predicate = %predicate.describe(),
            interval_ms = self.config.interval.as_millis() as u64,
            violation_threshold = self.config.violation_threshold,
            max_action_attempts = self.config.max_action_attempts,
            "Monitor built"
        );

        Ok(Monitor {
            audit: AuditLogger::new(self.category.clone(), ledger),
            category: self.category,
            policy: EscalationPolicy::new(self.config.violation_threshold),
            config: self.config,
            source,
            predicate,
            key_extractor: self.key_extractor.unwrap_or_else(default_key_extractor),
            executor,
            finalizer: self.finalizer,
            events: EventBus::new(),
            state: Mutex::new(MonitorState {
                store,
                cycle_count: 0,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::StaticReportSource;
    use crate::error::CollaboratorError;
    use crate::ledger::MemoryLedger;
    use crate::predicate::ThresholdPredicate;
    use async_trait::async_trait;

    struct PlainEncryptor;

    #[async_trait]
    impl Encryptor for PlainEncryptor {
        async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CollaboratorError> {
            Ok(plaintext.to_vec())
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl Enforcer for AcceptAll {
        async fn enforce(&self, _action: crate::action::ActionKind, _key: &str, _p: &[u8]) -> bool {
            true
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl ReportSource for BrokenSource {
        async fn fetch_reports(&self) -> Result<Vec<Report>, CollaboratorError> {
            Err(CollaboratorError::new("connection refused"))
        }
    }

    fn builder(source: Arc<dyn ReportSource>, ledger: &MemoryLedger) -> MonitorBuilder {
        Monitor::builder("unit")
            .report_source(source)
            .predicate(Arc::new(ThresholdPredicate::at_or_above(0.5)))
            .encryptor(Arc::new(PlainEncryptor))
            .enforcer(Arc::new(AcceptAll))
            .ledger(Arc::new(ledger.clone()))
    }

    #[test]
    fn test_build_requires_collaborators() {
        let err = Monitor::builder("unit").build().unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MissingCollaborator("report source")
        ));
    }

    #[test]
    fn test_build_validates_config() {
        let ledger = MemoryLedger::new();
        let config = MonitorConfig {
            violation_threshold: 0,
            ..Default::default()
        };
        let err = builder(Arc::new(StaticReportSource::default()), &ledger)
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[tokio::test]
    async fn test_duplicate_reports_evaluated_once() {
        let ledger = MemoryLedger::new();
        let source = StaticReportSource::new(vec![
            Report::score("dup", 0.9),
            Report::score("dup", 0.1),
        ]);
        let monitor = builder(Arc::new(source), &ledger).build().unwrap();

        let summary = monitor.run_cycle().await;

        assert_eq!(summary.reports, 1);
        assert_eq!(summary.violations, 0, "last report (clear) wins");
        let entity = monitor.entity("dup").await.unwrap();
        assert_eq!(entity.violation_streak, 0);
    }

    #[tokio::test]
    async fn test_key_extractor_overrides_report_key() {
        let ledger = MemoryLedger::new();
        let source = StaticReportSource::new(vec![Report::score("chain-a/validator-1", 0.9)]);
        let monitor = builder(Arc::new(source), &ledger)
            .key_extractor(Arc::new(|r: &Report| {
                r.entity_key
                    .split('/')
                    .next_back()
                    .unwrap_or_default()
                    .to_string()
            }))
            .build()
            .unwrap();

        monitor.run_cycle().await;

        assert!(monitor.entity("validator-1").await.is_some());
        assert!(monitor.entity("chain-a/validator-1").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_logged_and_cycle_counted() {
        let ledger = MemoryLedger::new();
        let monitor = builder(Arc::new(BrokenSource), &ledger).build().unwrap();

        let summary = monitor.run_cycle().await;

        assert!(summary.fetch_failed);
        assert_eq!(summary.cycle, 1);
        assert_eq!(monitor.cycle_count().await, 1);
        let failures = ledger.entries_of_type("Report Fetch Failure").await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id(), "unit-cycle-1-Report Fetch Failure");
    }

    #[tokio::test]
    async fn test_reset_unknown_entity() {
        let ledger = MemoryLedger::new();
        let monitor = builder(Arc::new(StaticReportSource::default()), &ledger)
            .build()
            .unwrap();
        assert!(!monitor.reset_entity("nobody", "operator").await);
        assert!(ledger.is_empty().await);
    }
}
