//! Declarative CI gate over audit metrics.
//!
//! Two independent checks:
//! - [`GateSpec::evaluate`]: every metric inside its threshold (plus slack).
//! - [`GateSpec::improvement_ok`]: relative to a baseline, failing metrics
//!   moved by at least `min_improve` and passing metrics stayed passing.
//!
//! The regression loop requires both.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{Metrics, DEADLOCK_RATE, EXPLOIT_DOMINANCE, WIN_SKEW};

/// Value used for a metric the lookup does not know. Fails any sane threshold.
pub const MISSING_METRIC_VALUE: f64 = 1e9;

/// Default exploit-dominance ceiling.
pub const DEFAULT_EXPLOIT_THRESHOLD: f64 = 0.25;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetricSpec {
    pub name: String,
    pub direction: Direction,
    pub threshold: f64,
    #[serde(default)]
    pub slack: f64,
    #[serde(default)]
    pub min_improve: f64,
}

impl MetricSpec {
    pub fn lower_is_better(name: &str, threshold: f64, min_improve: f64) -> Self {
        Self {
            name: name.to_string(),
            direction: Direction::LowerIsBetter,
            threshold,
            slack: 0.0,
            min_improve,
        }
    }

    pub fn is_passing(&self, value: f64) -> bool {
        match self.direction {
            Direction::LowerIsBetter => value <= self.threshold + self.slack,
            Direction::HigherIsBetter => value >= self.threshold - self.slack,
        }
    }

    /// Moved at least `min_improve` in the favourable direction.
    pub fn improved(&self, before: f64, after: f64) -> bool {
        match self.direction {
            Direction::LowerIsBetter => before - after >= self.min_improve,
            Direction::HigherIsBetter => after - before >= self.min_improve,
        }
    }

    /// Key under which the threshold is exported.
    pub fn threshold_key(&self) -> String {
        match self.direction {
            Direction::LowerIsBetter => format!("{}_max", self.name),
            Direction::HigherIsBetter => format!("{}_min", self.name),
        }
    }
}

/// Anything metrics can be read from by name.
pub trait MetricLookup {
    fn metric(&self, name: &str) -> Option<f64>;
}

impl MetricLookup for Metrics {
    fn metric(&self, name: &str) -> Option<f64> {
        self.get(name)
    }
}

impl MetricLookup for BTreeMap<String, f64> {
    fn metric(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl MetricLookup for HashMap<String, f64> {
    fn metric(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Verdict of [`GateSpec::evaluate`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GateEvaluation {
    pub passed: bool,
    pub per_metric: BTreeMap<String, bool>,
    /// Violation text per failing metric.
    pub reasons: BTreeMap<String, String>,
}

/// Ordered set of metric constraints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GateSpec {
    pub metrics: Vec<MetricSpec>,
}

fn value_of<M: MetricLookup + ?Sized>(values: &M, name: &str) -> f64 {
    values.metric(name).unwrap_or(MISSING_METRIC_VALUE)
}

impl GateSpec {
    pub fn evaluate<M: MetricLookup + ?Sized>(&self, values: &M) -> GateEvaluation {
        let mut eval = GateEvaluation {
            passed: true,
            ..Default::default()
        };
        for spec in &self.metrics {
            let value = value_of(values, &spec.name);
            let ok = spec.is_passing(value);
            eval.per_metric.insert(spec.name.clone(), ok);
            if !ok {
                eval.passed = false;
                eval.reasons.insert(
                    spec.name.clone(),
                    format!(
                        "{}={} violates threshold={} (slack={})",
                        spec.name, value, spec.threshold, spec.slack
                    ),
                );
            }
        }
        eval
    }

    /// Relative check of `after` against `before`.
    ///
    /// A baseline that already passes only requires `after` to pass too.
    /// Otherwise each metric is judged on its own: failing-before metrics
    /// must improve by `min_improve` (passing outright is not required),
    /// passing-before metrics must not regress past their threshold.
    pub fn improvement_ok<B, A>(&self, before: &B, after: &A) -> (bool, BTreeMap<String, String>)
    where
        B: MetricLookup + ?Sized,
        A: MetricLookup + ?Sized,
    {
        if self.evaluate(before).passed {
            let after_eval = self.evaluate(after);
            return (after_eval.passed, after_eval.reasons);
        }

        let mut ok = true;
        let mut reasons = BTreeMap::new();
        for spec in &self.metrics {
            let b = value_of(before, &spec.name);
            let a = value_of(after, &spec.name);
            if !spec.is_passing(b) {
                if !spec.improved(b, a) {
                    ok = false;
                    reasons.insert(
                        spec.name.clone(),
                        format!(
                            "no improvement on failing metric: {} {} -> {} (min_improve={})",
                            spec.name, b, a, spec.min_improve
                        ),
                    );
                }
            } else if !spec.is_passing(a) {
                ok = false;
                reasons.insert(
                    spec.name.clone(),
                    format!(
                        "introduced regression past threshold: {} {} -> {} (threshold={}, slack={})",
                        spec.name, b, a, spec.threshold, spec.slack
                    ),
                );
            }
        }
        (ok, reasons)
    }

    /// `<name>_max` / `<name>_min` → threshold, for reporting.
    pub fn thresholds(&self) -> BTreeMap<String, f64> {
        self.metrics
            .iter()
            .map(|m| (m.threshold_key(), m.threshold))
            .collect()
    }
}

impl Default for GateSpec {
    fn default() -> Self {
        default_gate_spec(DEFAULT_EXPLOIT_THRESHOLD)
    }
}

/// Deadlock ≤ 0.01, skew ≤ 0.10, exploit ≤ `exploit_threshold`.
pub fn default_gate_spec(exploit_threshold: f64) -> GateSpec {
    GateSpec {
        metrics: vec![
            MetricSpec::lower_is_better(DEADLOCK_RATE, 0.01, 0.01),
            MetricSpec::lower_is_better(WIN_SKEW, 0.10, 0.01),
            MetricSpec::lower_is_better(EXPLOIT_DOMINANCE, exploit_threshold, 0.02),
        ],
    }
}
