//! Action executor: encrypt, enforce, retry.
//!
//! Retries run as an explicit bounded state machine:
//!
//! ```text
//! Attempting(1) ──fail──▶ Attempting(2) ──fail──▶ ... ──▶ Exhausted
//!      │                       │
//!      └────────success────────┴──────────────────────▶ Succeeded
//! ```
//!
//! Each attempt re-encrypts and calls the same tier's action. Failed attempts
//! never change the tier. Encrypt and enforce calls are each bounded by
//! `action_timeout`; a timeout is a failed attempt.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::binding::{ActionKind, TierActions};
use crate::collaborators::{Encryptor, Enforcer};
use crate::config::{EncryptionPolicy, MonitorConfig};
use crate::entity::{MonitoredEntity, Tier};
use crate::error::MonitorError;

/// What actually goes to the enforcement backend. Discarded after the call;
/// only its digest reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditableAction {
    pub tier: Tier,
    pub entity_key: String,
    pub encrypted_payload: Vec<u8>,
}

impl AuditableAction {
    /// blake3 hex digest of the encrypted payload.
    pub fn payload_digest(&self) -> String {
        blake3::hash(&self.encrypted_payload).to_hex().to_string()
    }
}

/// Result of one `execute` call
#[derive(Debug)]
pub enum ExecutionOutcome {
    Succeeded {
        action: ActionKind,
        attempts: u32,
        payload_digest: String,
    },
    /// Every attempt failed; a terminal Failure entry is due
    Exhausted {
        action: ActionKind,
        attempts: u32,
        last_error: MonitorError,
    },
    /// Tier has no action bound (Clear)
    Unbound { tier: Tier },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
            Self::Unbound { .. } => 0,
        }
    }
}

enum AttemptState {
    Attempting(u32),
    Succeeded { attempts: u32, payload_digest: String },
    Exhausted { attempts: u32, error: MonitorError },
}

pub struct ActionExecutor {
    encryptor: Arc<dyn Encryptor>,
    enforcer: Arc<dyn Enforcer>,
    bindings: TierActions,
    max_attempts: u32,
    call_timeout: Duration,
    retry_backoff: Duration,
    encryption_policy: EncryptionPolicy,
}

impl ActionExecutor {
    pub fn new(
        encryptor: Arc<dyn Encryptor>,
        enforcer: Arc<dyn Enforcer>,
        bindings: TierActions,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            encryptor,
            enforcer,
            bindings,
            max_attempts: config.max_action_attempts.max(1),
            call_timeout: config.action_timeout,
            retry_backoff: config.retry_backoff,
            encryption_policy: config.encryption_policy,
        }
    }

    pub fn bindings(&self) -> &TierActions {
        &self.bindings
    }

    /// Run `tier`'s action for `entity`, retrying up to `max_action_attempts`.
    ///
    /// Success zeroes `entity.action_retries`; every failed attempt bumps it.
    pub async fn execute(
        &self,
        entity: &mut MonitoredEntity,
        tier: Tier,
        payload: &[u8],
    ) -> ExecutionOutcome {
        let Some(action) = self.bindings.for_tier(tier) else {
            return ExecutionOutcome::Unbound { tier };
        };

        let mut state = AttemptState::Attempting(1);
        loop {
            state = match state {
                AttemptState::Attempting(attempt) => {
                    let result = self.attempt(action, tier, &entity.key, payload).await;
                    match result {
                        Ok(payload_digest) => {
                            entity.action_retries = 0;
                            AttemptState::Succeeded {
                                attempts: attempt,
                                payload_digest,
                            }
                        }
                        Err(error) => {
                            entity.action_retries = entity.action_retries.saturating_add(1);
                            warn!(
                                entity = %entity.key,
                                action = %action,
                                attempt,
                                max_attempts = self.max_attempts,
                                "Action attempt failed: {}",
                                error
                            );
                            if attempt >= self.max_attempts || !error.is_retriable() {
                                AttemptState::Exhausted {
                                    attempts: attempt,
                                    error,
                                }
                            } else {
                                if !self.retry_backoff.is_zero() {
                                    tokio::time::sleep(self.retry_backoff).await;
                                }
                                AttemptState::Attempting(attempt + 1)
                            }
                        }
                    }
                }
                AttemptState::Succeeded {
                    attempts,
                    payload_digest,
                } => {
                    info!(entity = %entity.key, action = %action, attempts, "Action succeeded");
                    return ExecutionOutcome::Succeeded {
                        action,
                        attempts,
                        payload_digest,
                    };
                }
                AttemptState::Exhausted { attempts, error } => {
                    return ExecutionOutcome::Exhausted {
                        action,
                        attempts,
                        last_error: error,
                    };
                }
            };
        }
    }

    async fn attempt(
        &self,
        action: ActionKind,
        tier: Tier,
        entity_key: &str,
        payload: &[u8],
    ) -> Result<String, MonitorError> {
        let auditable = AuditableAction {
            tier,
            entity_key: entity_key.to_string(),
            encrypted_payload: self.encrypt(entity_key, payload).await?,
        };

        let call = self
            .enforcer
            .enforce(action, entity_key, &auditable.encrypted_payload);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(true) => {
                debug!(entity = entity_key, action = %action, "Enforcement accepted");
                Ok(auditable.payload_digest())
            }
            Ok(false) => Err(MonitorError::ActionRejected {
                action,
                entity: entity_key.to_string(),
            }),
            Err(_) => Err(MonitorError::timeout(
                format!("{} call", action),
                self.call_timeout,
            )),
        }
    }

    async fn encrypt(&self, entity_key: &str, payload: &[u8]) -> Result<Vec<u8>, MonitorError> {
        let error = match tokio::time::timeout(self.call_timeout, self.encryptor.encrypt(payload))
            .await
        {
            Ok(Ok(ciphertext)) => return Ok(ciphertext),
            Ok(Err(e)) => MonitorError::EncryptionFailure {
                entity: entity_key.to_string(),
                reason: e.to_string(),
            },
            Err(_) => MonitorError::timeout("encrypt", self.call_timeout),
        };

        match self.encryption_policy {
            EncryptionPolicy::FailClosed => Err(error),
            EncryptionPolicy::FailOpen => {
                warn!(
                    entity = entity_key,
                    "Encryption failed, proceeding with empty payload (fail-open): {}", error
                );
                Ok(Vec::new())
            }
        }
    }
}
