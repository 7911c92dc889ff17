//! Collaborator stubs shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sentinel::{
    ActionKind, CollaboratorError, CycleFinalizer, Encryptor, Enforcer, MemoryLedger, Monitor,
    MonitorBuilder, MonitorConfig, StaticReportSource, ThresholdPredicate,
};

/// "Encrypts" by prefixing a marker so tests can tell ciphertext from plaintext.
pub struct MarkerEncryptor;

#[async_trait]
impl Encryptor for MarkerEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CollaboratorError> {
        let mut out = b"enc:".to_vec();
        out.extend_from_slice(plaintext);
        Ok(out)
    }
}

pub struct BrokenEncryptor;

#[async_trait]
impl Encryptor for BrokenEncryptor {
    async fn encrypt(&self, _plaintext: &[u8]) -> Result<Vec<u8>, CollaboratorError> {
        Err(CollaboratorError::new("key unavailable"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforceCall {
    pub action: ActionKind,
    pub entity_key: String,
    pub payload: Vec<u8>,
}

/// Records every call; rejects the first `failures` calls, then follows `accept`.
pub struct RecordingEnforcer {
    calls: Mutex<Vec<EnforceCall>>,
    failures: AtomicU32,
    accept: AtomicBool,
}

impl RecordingEnforcer {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failures: AtomicU32::new(0),
            accept: AtomicBool::new(true),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        let enforcer = Self::accepting();
        enforcer.set_accept(false);
        enforcer
    }

    pub fn failing_first(failures: u32) -> Arc<Self> {
        let enforcer = Self::accepting();
        enforcer.failures.store(failures, Ordering::SeqCst);
        enforcer
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EnforceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Enforcer for RecordingEnforcer {
    async fn enforce(&self, action: ActionKind, entity_key: &str, payload: &[u8]) -> bool {
        self.calls.lock().unwrap().push(EnforceCall {
            action,
            entity_key: entity_key.to_string(),
            payload: payload.to_vec(),
        });
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return false;
        }
        self.accept.load(Ordering::SeqCst)
    }
}

/// Never answers.
pub struct HangingEnforcer;

#[async_trait]
impl Enforcer for HangingEnforcer {
    async fn enforce(&self, _action: ActionKind, _entity_key: &str, _payload: &[u8]) -> bool {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        true
    }
}

pub struct RecordingFinalizer {
    cycles: Mutex<Vec<u64>>,
    result: AtomicBool,
}

impl RecordingFinalizer {
    pub fn new(result: bool) -> Arc<Self> {
        Arc::new(Self {
            cycles: Mutex::new(Vec::new()),
            result: AtomicBool::new(result),
        })
    }

    pub fn cycles(&self) -> Vec<u64> {
        self.cycles.lock().unwrap().clone()
    }
}

#[async_trait]
impl CycleFinalizer for RecordingFinalizer {
    async fn finalize_cycle(&self, cycle: u64) -> bool {
        self.cycles.lock().unwrap().push(cycle);
        self.result.load(Ordering::SeqCst)
    }
}

pub fn test_config() -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_secs(10),
        violation_threshold: 3,
        max_action_attempts: 3,
        finalization_period: 1000,
        ..Default::default()
    }
}

/// Builder wired to a score-at-or-above-0.25 predicate and the given stubs.
pub fn monitor_builder(
    source: &StaticReportSource,
    enforcer: &Arc<RecordingEnforcer>,
    ledger: &MemoryLedger,
) -> MonitorBuilder {
    Monitor::builder("rbac")
        .config(test_config())
        .report_source(Arc::new(source.clone()))
        .predicate(Arc::new(ThresholdPredicate::at_or_above(0.25)))
        .encryptor(Arc::new(MarkerEncryptor))
        .enforcer(enforcer.clone())
        .ledger(Arc::new(ledger.clone()))
}
