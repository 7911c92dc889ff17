//! Stateless classification of a report into violating / clear.
//!
//! Two forms cover every monitor: a continuous score compared against a
//! threshold in a monitor-specific direction, and a boolean flag the source
//! already computed. Any `Fn(&Report) -> bool` also works as a predicate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::report::{Metric, Report, Verdict};

/// Maps a report to a verdict. Must not mutate anything.
pub trait Predicate: Send + Sync {
    /// `true` when the report is a violation.
    fn evaluate(&self, report: &Report) -> bool;

    /// Short human-readable form for logs.
    fn describe(&self) -> String {
        "custom predicate".to_string()
    }

    fn verdict(&self, report: &Report) -> Verdict {
        Verdict {
            entity_key: report.entity_key.clone(),
            violating: self.evaluate(report),
        }
    }
}

impl<F> Predicate for F
where
    F: Fn(&Report) -> bool + Send + Sync,
{
    fn evaluate(&self, report: &Report) -> bool {
        self(report)
    }
}

/// Which side of the threshold counts as a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `score >= threshold` (anomaly scores)
    AtOrAbove,
    /// `score <= threshold` (performance and reputation scores)
    AtOrBelow,
    /// `score > threshold`
    Above,
    /// `score < threshold`
    Below,
}

impl Direction {
    fn symbol(self) -> &'static str {
        match self {
            Self::AtOrAbove => ">=",
            Self::AtOrBelow => "<=",
            Self::Above => ">",
            Self::Below => "<",
        }
    }
}

/// Score-versus-threshold predicate.
///
/// NaN never violates. A `Flag` metric is passed straight through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPredicate {
    pub threshold: f64,
    pub direction: Direction,
}

impl ThresholdPredicate {
    pub fn new(threshold: f64, direction: Direction) -> Self {
        Self {
            threshold,
            direction,
        }
    }

    pub fn at_or_above(threshold: f64) -> Self {
        Self::new(threshold, Direction::AtOrAbove)
    }

    pub fn at_or_below(threshold: f64) -> Self {
        Self::new(threshold, Direction::AtOrBelow)
    }

    fn violates(&self, score: f64) -> bool {
        match self.direction {
            Direction::AtOrAbove => score >= self.threshold,
            Direction::AtOrBelow => score <= self.threshold,
            Direction::Above => score > self.threshold,
            Direction::Below => score < self.threshold,
        }
    }
}

impl Predicate for ThresholdPredicate {
    fn evaluate(&self, report: &Report) -> bool {
        match report.metric {
            Metric::Score(score) => self.violates(score),
            Metric::Flag(flagged) => flagged,
        }
    }

    fn describe(&self) -> String {
        format!("score {} {}", self.direction.symbol(), self.threshold)
    }
}

/// Pass-through for sources that compute the verdict themselves.
///
/// A `Score` metric counts as violating when non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagPredicate;

impl Predicate for FlagPredicate {
    fn evaluate(&self, report: &Report) -> bool {
        match report.metric {
            Metric::Flag(flagged) => flagged,
            Metric::Score(score) => score != 0.0 && !score.is_nan(),
        }
    }

    fn describe(&self) -> String {
        "flag".to_string()
    }
}

/// Serializable predicate description, as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredicateSpec {
    Threshold { threshold: f64, direction: Direction },
    Flag,
}

impl PredicateSpec {
    pub fn build(&self) -> Arc<dyn Predicate> {
        match *self {
            Self::Threshold {
                threshold,
                direction,
            } => Arc::new(ThresholdPredicate::new(threshold, direction)),
            Self::Flag => Arc::new(FlagPredicate),
        }
    }
}
