//! Per-entity snapshots supplied by the report source each cycle.

use serde::{Deserialize, Serialize};

/// The measured quantity a predicate classifies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    /// Continuous score compared against a threshold
    Score(f64),
    /// Verdict precomputed by the source
    Flag(bool),
}

/// One entity's status for the current cycle. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub entity_key: String,
    pub metric: Metric,
    /// Opaque payload handed to the crypto collaborator before enforcement
    #[serde(default)]
    pub raw_payload: Vec<u8>,
}

impl Report {
    pub fn score(entity_key: impl Into<String>, score: f64) -> Self {
        Self {
            entity_key: entity_key.into(),
            metric: Metric::Score(score),
            raw_payload: Vec::new(),
        }
    }

    pub fn flag(entity_key: impl Into<String>, flagged: bool) -> Self {
        Self {
            entity_key: entity_key.into(),
            metric: Metric::Flag(flagged),
            raw_payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.raw_payload = payload.into();
        self
    }
}

/// Derived classification of a report. Recomputed every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub entity_key: String,
    pub violating: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_deserializes_both_metric_forms() {
        let scored: Report =
            serde_json::from_str(r#"{"entity_key":"user-1","metric":0.3}"#).unwrap();
        assert_eq!(scored.metric, Metric::Score(0.3));
        assert!(scored.raw_payload.is_empty());

        let flagged: Report = serde_json::from_str(
            r#"{"entity_key":"contract-9","metric":true,"raw_payload":[1,2,3]}"#,
        )
        .unwrap();
        assert_eq!(flagged.metric, Metric::Flag(true));
        assert_eq!(flagged.raw_payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_builders() {
        let report = Report::score("node-4", 0.9).with_payload(b"hash-rate".to_vec());
        assert_eq!(report.entity_key, "node-4");
        assert_eq!(report.raw_payload, b"hash-rate");
    }
}
