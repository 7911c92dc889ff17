//! Escalation Policy: deterministic state machine for entity tiers
//!
//! # Escalation Ladder
//!
//! ```text
//! Clear
//!   │  first violating verdict
//!   ▼
//! Alerted ── Alert action every violating cycle while streak < threshold
//!   │  streak reaches violation_threshold
//!   ▼
//! Escalated ── Escalate action every violating cycle
//!
//! LockedDown ── only via emergency override, from any tier; terminal
//! ```
//!
//! A clear verdict zeroes the streak but never demotes the tier; only an
//! explicit manual reset does that.

pub mod policy;

pub use policy::{EscalationDecision, EscalationPolicy};
