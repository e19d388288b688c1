use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use super::log::TerminalReason;

pub const DEADLOCK_RATE: &str = "deadlock_rate";
pub const WIN_RATE_A: &str = "win_rate_A";
pub const WIN_SKEW: &str = "win_skew";
pub const EXPLOIT_DOMINANCE: &str = "exploit_dominance";

/// Metrics the gate and patcher reason about, in reporting order.
pub const GATED_METRICS: [&str; 3] = [DEADLOCK_RATE, WIN_SKEW, EXPLOIT_DOMINANCE];

/// Round to 4 decimals for reporting. Comparisons use the unrounded value.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn serialize_round4<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round4(*value))
}

fn serialize_rates_round4<S: Serializer>(
    rates: &BTreeMap<String, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let rounded: BTreeMap<&str, f64> = rates.iter().map(|(k, v)| (k.as_str(), round4(*v))).collect();
    rounded.serialize(serializer)
}

/// Balance metrics over one log set. Stored at full precision.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Metrics {
    #[serde(serialize_with = "serialize_round4")]
    pub deadlock_rate: f64,
    #[serde(rename = "win_rate_A", serialize_with = "serialize_round4")]
    pub win_rate_a: f64,
    #[serde(serialize_with = "serialize_round4")]
    pub win_skew: f64,
    #[serde(serialize_with = "serialize_round4")]
    pub exploit_dominance: f64,
}

impl Metrics {
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            DEADLOCK_RATE => Some(self.deadlock_rate),
            WIN_RATE_A => Some(self.win_rate_a),
            WIN_SKEW => Some(self.win_skew),
            EXPLOIT_DOMINANCE => Some(self.exploit_dominance),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Deadlock,
    SpawnOrObjectiveBias,
    ExploitDominance,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub severity: Severity,
    pub evidence_ref: String,
}

/// Pointer to the match that demonstrates a finding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Evidence {
    pub id: String,
    pub seed: Option<u64>,
    pub policy_a: String,
    pub policy_b: String,
    pub terminal_reason: Option<TerminalReason>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuditReport {
    pub metrics: Metrics,
    #[serde(serialize_with = "serialize_rates_round4")]
    pub policy_win_rates: BTreeMap<String, f64>,
    pub findings: Vec<Finding>,
    pub evidence: Vec<Evidence>,
    pub recommendations: Vec<String>,
    pub reproducible: bool,
}

impl AuditReport {
    /// Overlay the reproducibility verdict computed by the caller.
    pub fn with_reproducible(mut self, reproducible: bool) -> Self {
        self.reproducible = reproducible;
        self
    }

    pub fn finding(&self, id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id == id)
    }

    pub fn evidence_for(&self, finding: &Finding) -> Option<&Evidence> {
        self.evidence.iter().find(|e| e.id == finding.evidence_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_serialize_rounded_keep_full_precision() {
        let metrics = Metrics {
            deadlock_rate: 0.123456,
            win_rate_a: 2.0 / 3.0,
            win_skew: 1.0 / 6.0,
            exploit_dominance: 0.0,
        };
        let value = serde_json::to_value(metrics).unwrap();
        assert_eq!(value["deadlock_rate"], 0.1235);
        assert_eq!(value["win_rate_A"], 0.6667);
        assert_eq!(value["win_skew"], 0.1667);
        assert_eq!(metrics.get(WIN_RATE_A), Some(2.0 / 3.0));
        assert_eq!(metrics.get("unknown"), None);
    }

    #[test]
    fn test_finding_type_field_name() {
        let finding = Finding {
            id: "F2".to_string(),
            kind: FindingKind::SpawnOrObjectiveBias,
            severity: Severity::High,
            evidence_ref: "E1".to_string(),
        };
        let value = serde_json::to_value(finding).unwrap();
        assert_eq!(value["type"], "spawn_or_objective_bias");
        assert_eq!(value["severity"], "high");
    }
}
