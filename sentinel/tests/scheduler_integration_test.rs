//! Scheduler and supervisor behavior under paused tokio time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use sentinel::monitor::{spawn, MonitorSet};
use sentinel::{
    ActionKind, Enforcer, MemoryLedger, Monitor, MonitorConfig, Report, StaticReportSource,
    ThresholdPredicate,
};

/// Accepts after a fixed delay.
struct SlowEnforcer(Duration);

#[async_trait]
impl Enforcer for SlowEnforcer {
    async fn enforce(&self, _action: ActionKind, _entity_key: &str, _payload: &[u8]) -> bool {
        tokio::time::sleep(self.0).await;
        true
    }
}

fn quiet_monitor(name: &str) -> Arc<Monitor> {
    let source = StaticReportSource::default();
    Arc::new(
        Monitor::builder(name)
            .config(test_config())
            .report_source(Arc::new(source))
            .predicate(Arc::new(ThresholdPredicate::at_or_above(0.25)))
            .encryptor(Arc::new(MarkerEncryptor))
            .enforcer(RecordingEnforcer::accepting())
            .ledger(Arc::new(MemoryLedger::new()))
            .build()
            .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_cycles_on_interval() {
    let monitor = quiet_monitor("rbac");
    let handle = spawn(monitor.clone());

    tokio::time::sleep(Duration::from_secs(35)).await;
    let cycles = handle.shutdown().await.unwrap();

    // Immediate first tick, then every 10s.
    assert!((3..=4).contains(&cycles), "cycles = {cycles}");
    assert_eq!(monitor.cycle_count().await, cycles);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_scheduler_runs_no_more_cycles() {
    let monitor = quiet_monitor("rbac");
    let handle = spawn(monitor.clone());

    tokio::time::sleep(Duration::from_secs(15)).await;
    handle.stop();
    let cycles = handle.shutdown().await.unwrap();

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(monitor.cycle_count().await, cycles);
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_skip_ticks() {
    let source = StaticReportSource::new(vec![Report::score("node-1", 0.9)]);
    let ledger = MemoryLedger::new();
    let config = MonitorConfig {
        action_timeout: Duration::from_secs(60),
        ..test_config()
    };
    let monitor = Arc::new(
        Monitor::builder("rbac")
            .config(config)
            .report_source(Arc::new(source))
            .predicate(Arc::new(ThresholdPredicate::at_or_above(0.25)))
            .encryptor(Arc::new(MarkerEncryptor))
            .enforcer(Arc::new(SlowEnforcer(Duration::from_secs(25))))
            .ledger(Arc::new(ledger.clone()))
            .build()
            .unwrap(),
    );
    let handle = spawn(monitor.clone());

    tokio::time::sleep(Duration::from_secs(100)).await;
    let cycles = handle.shutdown().await.unwrap();

    // Ten ticks elapsed, but each cycle takes 25s and missed ticks are dropped.
    assert!((2..=5).contains(&cycles), "cycles = {cycles}");
    assert_eq!(ledger.len().await as u64, cycles);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_set_runs_independently() {
    let mut set = MonitorSet::new();
    let rbac = quiet_monitor("rbac");
    let reputation = quiet_monitor("reputation");
    set.spawn_all(vec![rbac.clone(), reputation.clone()]);

    assert_eq!(set.len(), 2);
    assert_eq!(set.names(), vec!["rbac", "reputation"]);

    tokio::time::sleep(Duration::from_secs(25)).await;
    let results = set.shutdown_all().await;

    assert_eq!(results.len(), 2);
    for (name, result) in &results {
        let cycles = result.as_ref().unwrap();
        assert!(*cycles >= 2, "{name} ran {cycles} cycles");
    }
    assert!(rbac.cycle_count().await >= 2);
    assert!(reputation.cycle_count().await >= 2);
}
