//! Balance metrics and findings over one log set.

use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{
    AuditReport, Evidence, Finding, FindingKind, GameLog, Metrics, Severity, Team, TerminalReason,
};

/// Finding thresholds. A metric strictly above its limit raises the finding.
pub const DEADLOCK_FINDING_LIMIT: f64 = 0.01;
pub const SKEW_FINDING_LIMIT: f64 = 0.10;
pub const EXPLOIT_FINDING_LIMIT: f64 = 0.20;

pub const REC_DEADLOCK: &str = "Open one choke wall or relax map bottlenecks.";
pub const REC_SKEW: &str = "Rebalance spawn and flag distances to remove side advantage.";
pub const REC_EXPLOIT: &str = "Disrupt single-policy dominance via objective relocation.";
pub const REC_CLEAN: &str = "No high-risk issues detected under current policy matrix.";
pub const REC_EMPTY: &str = "No games executed.";

/// Wins / appearances for every policy that played either side, keyed by name.
pub fn policy_win_rates(logs: &[GameLog]) -> BTreeMap<String, f64> {
    let mut tally: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for log in logs {
        for team in Team::BOTH {
            let entry = tally.entry(log.policy(team)).or_insert((0, 0));
            entry.1 += 1;
            if log.winner == Some(team) {
                entry.0 += 1;
            }
        }
    }
    tally
        .into_iter()
        .map(|(name, (wins, total))| (name.to_string(), wins as f64 / total as f64))
        .collect()
}

/// Top rate minus runner-up rate, 0 with fewer than two policies.
fn exploit_dominance(rates: &BTreeMap<String, f64>) -> f64 {
    let mut sorted: Vec<f64> = rates.values().copied().collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    match sorted.as_slice() {
        [top1, top2, ..] => (top1 - top2).max(0.0),
        _ => 0.0,
    }
}

fn evidence_from(id: String, log: Option<&GameLog>) -> Evidence {
    match log {
        Some(log) => Evidence {
            id,
            seed: Some(log.seed),
            policy_a: log.policy_a.clone(),
            policy_b: log.policy_b.clone(),
            terminal_reason: Some(log.terminal_reason),
        },
        None => Evidence {
            id,
            seed: None,
            policy_a: String::new(),
            policy_b: String::new(),
            terminal_reason: None,
        },
    }
}

/// Aggregate logs (in orchestrator order) into an [`AuditReport`].
///
/// `reproducible` is left `true` for a non-empty set; the caller overlays
/// the real verdict.
pub fn build_audit_report(logs: &[GameLog]) -> AuditReport {
    if logs.is_empty() {
        return AuditReport {
            metrics: Metrics {
                deadlock_rate: 0.0,
                win_rate_a: 0.0,
                win_skew: 0.5,
                exploit_dominance: 0.0,
            },
            policy_win_rates: BTreeMap::new(),
            findings: vec![],
            evidence: vec![],
            recommendations: vec![REC_EMPTY.to_string()],
            reproducible: false,
        };
    }

    let total = logs.len() as f64;
    let deadlocks = logs
        .iter()
        .filter(|l| l.terminal_reason == TerminalReason::Deadlock)
        .count();
    let wins_a = logs.iter().filter(|l| l.winner == Some(Team::A)).count();
    let wins_b = logs.iter().filter(|l| l.winner == Some(Team::B)).count();
    let decisive = wins_a + wins_b;

    let rates = policy_win_rates(logs);
    let deadlock_rate = deadlocks as f64 / total;
    let win_rate_a = if decisive > 0 {
        wins_a as f64 / decisive as f64
    } else {
        0.5
    };
    let metrics = Metrics {
        deadlock_rate,
        win_rate_a,
        win_skew: (win_rate_a - 0.5).abs(),
        exploit_dominance: exploit_dominance(&rates),
    };

    let mut findings = Vec::new();
    let mut evidence = Vec::new();
    let mut recommendations = Vec::new();
    let mut raise = |finding_id: &str, kind, severity, log: Option<&GameLog>, rec: &str| {
        let evidence_id = format!("E{}", evidence.len() + 1);
        evidence.push(evidence_from(evidence_id.clone(), log));
        findings.push(Finding {
            id: finding_id.to_string(),
            kind,
            severity,
            evidence_ref: evidence_id,
        });
        recommendations.push(rec.to_string());
    };

    if metrics.deadlock_rate > DEADLOCK_FINDING_LIMIT {
        let log = logs.iter().find(|l| l.terminal_reason == TerminalReason::Deadlock);
        raise("F1", FindingKind::Deadlock, Severity::High, log, REC_DEADLOCK);
    }

    if metrics.win_skew > SKEW_FINDING_LIMIT {
        let dominant = if metrics.win_rate_a > 0.5 { Team::A } else { Team::B };
        let log = logs.iter().find(|l| l.winner == Some(dominant));
        raise("F2", FindingKind::SpawnOrObjectiveBias, Severity::High, log, REC_SKEW);
    }

    if metrics.exploit_dominance > EXPLOIT_FINDING_LIMIT {
        // First match the dominant policy won, on either side.
        let top = rates
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.as_str());
        let log = logs
            .iter()
            .find(|l| l.winner.is_some_and(|w| Some(l.policy(w)) == top))
            .or_else(|| logs.first());
        raise("F3", FindingKind::ExploitDominance, Severity::Medium, log, REC_EXPLOIT);
    }

    if findings.is_empty() {
        recommendations.push(REC_CLEAN.to_string());
    }

    debug!(
        matches = logs.len(),
        deadlock_rate = metrics.deadlock_rate,
        win_skew = metrics.win_skew,
        exploit_dominance = metrics.exploit_dominance,
        findings = findings.len(),
        "audit built"
    );

    AuditReport {
        metrics,
        policy_win_rates: rates,
        findings,
        evidence,
        recommendations,
        reproducible: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(seed: u64, a: &str, b: &str, winner: Option<Team>, reason: TerminalReason) -> GameLog {
        GameLog {
            seed,
            policy_a: a.to_string(),
            policy_b: b.to_string(),
            winner,
            terminal_reason: reason,
            turns: 10,
            trace: vec![],
            state_hashes: vec![],
            events: vec![],
        }
    }

    #[test]
    fn test_empty_log_set() {
        let report = build_audit_report(&[]);
        assert_eq!(report.metrics.win_skew, 0.5);
        assert_eq!(report.metrics.win_rate_a, 0.0);
        assert!(!report.reproducible);
        assert_eq!(report.recommendations, vec![REC_EMPTY.to_string()]);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_no_decisive_matches_is_balanced() {
        let logs = vec![
            log(1, "x", "y", None, TerminalReason::Timeout),
            log(2, "y", "x", None, TerminalReason::Draw),
        ];
        let report = build_audit_report(&logs);
        assert_eq!(report.metrics.win_rate_a, 0.5);
        assert_eq!(report.metrics.win_skew, 0.0);
        assert_eq!(report.metrics.deadlock_rate, 0.0);
        assert_eq!(report.recommendations, vec![REC_CLEAN.to_string()]);
    }

    #[test]
    fn test_metrics_and_findings() {
        let logs = vec![
            log(1, "greedy", "camper", Some(Team::A), TerminalReason::Capture),
            log(2, "greedy", "camper", None, TerminalReason::Deadlock),
            log(3, "camper", "greedy", Some(Team::B), TerminalReason::Capture),
            log(4, "camper", "camper", Some(Team::A), TerminalReason::Capture),
        ];
        let report = build_audit_report(&logs);

        assert_eq!(report.metrics.deadlock_rate, 0.25);
        assert!((report.metrics.win_rate_a - 2.0 / 3.0).abs() < 1e-12);
        // greedy: 2 wins / 3 games, camper: 1 / 5
        assert!((report.policy_win_rates["greedy"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.policy_win_rates["camper"] - 0.2).abs() < 1e-12);
        assert!((report.metrics.exploit_dominance - (2.0 / 3.0 - 0.2)).abs() < 1e-12);

        let ids: Vec<&str> = report.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F2", "F3"]);
        let refs: Vec<&str> = report.findings.iter().map(|f| f.evidence_ref.as_str()).collect();
        assert_eq!(refs, vec!["E1", "E2", "E3"]);

        let f1 = report.finding("F1").unwrap();
        assert_eq!(report.evidence_for(f1).unwrap().seed, Some(2));
        // A is dominant: first A win is seed 1.
        let f2 = report.finding("F2").unwrap();
        assert_eq!(report.evidence_for(f2).unwrap().seed, Some(1));
        assert_eq!(report.finding("F3").unwrap().severity, Severity::Medium);
        assert_eq!(report.recommendations.len(), 3);
    }

    #[test]
    fn test_skew_evidence_follows_dominant_side() {
        let logs = vec![
            log(1, "p", "q", Some(Team::A), TerminalReason::Capture),
            log(2, "q", "p", Some(Team::B), TerminalReason::Capture),
            log(3, "p", "q", Some(Team::B), TerminalReason::Capture),
            log(4, "q", "p", Some(Team::B), TerminalReason::Capture),
        ];
        let report = build_audit_report(&logs);
        assert_eq!(report.metrics.win_rate_a, 0.25);
        let f2 = report.finding("F2").unwrap();
        assert_eq!(report.evidence_for(f2).unwrap().seed, Some(2));
        // No deadlock finding, so the skew finding takes E1.
        assert_eq!(f2.evidence_ref, "E1");
    }

    #[test]
    fn test_single_policy_has_no_dominance() {
        let logs = vec![log(1, "solo", "solo", Some(Team::A), TerminalReason::Capture)];
        let report = build_audit_report(&logs);
        assert_eq!(report.metrics.exploit_dominance, 0.0);
        assert_eq!(report.policy_win_rates.len(), 1);
        assert_eq!(report.policy_win_rates["solo"], 0.5);
    }
}
