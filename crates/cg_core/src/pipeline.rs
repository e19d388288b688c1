//! End-to-end audit → gate → patch → re-gate run.
//!
//! ```text
//! resolve spec ─▶ expand seeds ─▶ self-play ─▶ audit (+ probe) ─▶ gate
//!                                                                 │
//!          ┌──────────────────── pass ◀──────────────────────────┤
//!          ▼                                                      ▼ fail
//!   short-circuit record                     candidates ─▶ regression loop
//!          └──────────────────────────┬───────────────────────────┘
//!                                     ▼
//!                        after gate, merged reasons, verdict
//! ```
//!
//! Nothing here touches the filesystem; the outcome carries every artifact
//! and the caller decides what to write.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::analysis::{build_audit_report, check_reproducible};
use crate::engine::{PolicyKind, SelfPlayRunner};
use crate::error::{CoreError, Result};
use crate::gate::{GateEvaluation, GateSpec};
use crate::models::{AuditReport, GameLog, GameSpec, Metrics, PatchProposal};
use crate::oracle::{RankingOracle, SpecGenerator};
use crate::patch::suggest_patch_candidates;
use crate::regression::{run_regression_gate, AttemptRecord, RegressionResult, DEFAULT_MAX_ATTEMPTS};
use crate::spec_gen::{default_gamespec, generate_gamespec, DEFAULT_PROMPT};
use crate::validation::validate_gamespec;
use crate::RESULT_SCHEMA_VERSION;

pub const DEFAULT_SEED_BASE: u64 = 1337;
pub const DEFAULT_SEED_COUNT: usize = 50;
/// Spacing between expanded seeds.
pub const SEED_STRIDE: u64 = 17;

pub const RATIONALE_ALREADY_PASSING: &str =
    "Spec already satisfies CI gate thresholds; patch not required.";
pub const REPRODUCIBLE_REASON_KEY: &str = "reproducible";
pub const REPRODUCIBLE_REASON: &str = "reproducibility check failed";

/// Where the spec under audit comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    /// Caller-supplied; validated before use.
    Provided(GameSpec),
    /// Drafted by the configured generator, baseline on failure.
    Generated { prompt: String },
    /// The built-in biased baseline.
    Builtin,
}

pub struct PipelineConfig {
    pub spec: SpecSource,
    /// Explicit seed list; overrides `seed_base`/`seed_count`.
    pub seeds: Option<Vec<u64>>,
    pub seed_base: u64,
    pub seed_count: usize,
    pub roster: Vec<PolicyKind>,
    pub max_attempts: usize,
    pub gate: GateSpec,
    /// Simulation threads; `None` uses the global rayon pool.
    pub workers: Option<usize>,
    pub ranking_oracle: Option<Box<dyn RankingOracle>>,
    pub spec_generator: Option<Box<dyn SpecGenerator>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spec: SpecSource::Builtin,
            seeds: None,
            seed_base: DEFAULT_SEED_BASE,
            seed_count: DEFAULT_SEED_COUNT,
            roster: PolicyKind::default_roster(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            gate: GateSpec::default(),
            workers: None,
            ranking_oracle: None,
            spec_generator: None,
        }
    }
}

/// `base + 17·i` for `i in 0..count`.
pub fn expand_seeds(base: u64, count: usize) -> Vec<u64> {
    (0..count as u64)
        .map(|i| base.wrapping_add(SEED_STRIDE.wrapping_mul(i)))
        .collect()
}

impl PipelineConfig {
    pub fn resolve_seeds(&self) -> Result<Vec<u64>> {
        let seeds = match &self.seeds {
            Some(explicit) => explicit.clone(),
            None => expand_seeds(self.seed_base, self.seed_count),
        };
        if seeds.is_empty() {
            return Err(CoreError::EmptySeeds);
        }
        Ok(seeds)
    }

    pub fn resolve_spec(&self) -> Result<GameSpec> {
        match &self.spec {
            SpecSource::Provided(spec) => {
                validate_gamespec(spec)?;
                Ok(spec.clone())
            }
            SpecSource::Generated { prompt } => {
                generate_gamespec(prompt, self.seed_base, self.spec_generator.as_deref())
            }
            SpecSource::Builtin => {
                let spec = default_gamespec(self.seed_base);
                validate_gamespec(&spec)?;
                Ok(spec)
            }
        }
    }

    pub fn prompt(&self) -> &str {
        match &self.spec {
            SpecSource::Generated { prompt } => prompt,
            _ => DEFAULT_PROMPT,
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub spec_before: GameSpec,
    pub seeds: Vec<u64>,
    pub policy_names: Vec<String>,
    pub logs_before: Vec<GameLog>,
    pub report_before: AuditReport,
    pub regression: RegressionResult,
    pub gate: GateSpec,
    pub before_gate: GateEvaluation,
    pub after_gate: GateEvaluation,
    /// After-gate violations, reproducibility and (if the last attempt did
    /// not improve) `improvement:<metric>` reasons.
    pub gate_reasons: BTreeMap<String, String>,
    /// Did the final selection pass the gate.
    pub passed: bool,
}

/// Serializable run summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary<'a> {
    pub schema_version: u8,
    pub passed: bool,
    pub before_gate_passed: bool,
    pub after_gate_passed: bool,
    pub gate_thresholds: BTreeMap<String, f64>,
    pub gate_reasons: &'a BTreeMap<String, String>,
    pub before_metrics: Metrics,
    pub after_metrics: Metrics,
    pub selected_patch: &'a PatchProposal,
    pub short_circuit: bool,
    pub attempt: usize,
    pub spec_name: &'a str,
    pub policy_names: &'a [String],
    pub seeds: &'a [u64],
    pub reproducible_before: bool,
    pub reproducible_after: bool,
    pub attempts: &'a [AttemptRecord],
}

impl PipelineOutcome {
    pub fn spec_after(&self) -> &GameSpec {
        &self.regression.patched_spec
    }

    pub fn report_after(&self) -> &AuditReport {
        &self.regression.after_report
    }

    pub fn logs_after(&self) -> &[GameLog] {
        &self.regression.after_logs
    }

    pub fn selected_patch(&self) -> &PatchProposal {
        &self.regression.selected_patch
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.regression.attempts
    }

    pub fn short_circuit(&self) -> bool {
        self.attempts().first().is_some_and(|a| a.short_circuit)
    }

    pub fn summary(&self) -> PipelineSummary<'_> {
        PipelineSummary {
            schema_version: RESULT_SCHEMA_VERSION,
            passed: self.passed,
            before_gate_passed: self.before_gate.passed,
            after_gate_passed: self.after_gate.passed,
            gate_thresholds: self.gate.thresholds(),
            gate_reasons: &self.gate_reasons,
            before_metrics: self.report_before.metrics,
            after_metrics: self.report_after().metrics,
            selected_patch: self.selected_patch(),
            short_circuit: self.short_circuit(),
            attempt: self.attempts().last().map_or(0, |a| a.attempt),
            spec_name: &self.spec_before.meta.name,
            policy_names: &self.policy_names,
            seeds: &self.seeds,
            reproducible_before: self.report_before.reproducible,
            reproducible_after: self.report_after().reproducible,
            attempts: self.attempts(),
        }
    }
}

/// Gate verdict with the reproducibility flag folded into the reasons.
fn gate_with_repro(gate: &GateSpec, report: &AuditReport) -> GateEvaluation {
    let mut eval = gate.evaluate(&report.metrics);
    if !report.reproducible {
        eval.passed = false;
        eval.reasons
            .insert(REPRODUCIBLE_REASON_KEY.to_string(), REPRODUCIBLE_REASON.to_string());
    }
    eval
}

/// Run the full pipeline.
///
/// Errors only for configuration problems; a gate failure is reported
/// through `PipelineOutcome::passed`.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutcome> {
    if config.max_attempts == 0 {
        return Err(CoreError::ZeroAttempts);
    }
    let seeds = config.resolve_seeds()?;
    let spec = config.resolve_spec()?;
    let runner = SelfPlayRunner::new(config.roster.clone(), config.workers)?;
    let policy_names: Vec<String> = runner.roster_names().into_iter().map(String::from).collect();
    let gate = config.gate.clone();

    info!(
        spec = %spec.meta.name,
        seeds = seeds.len(),
        policies = policy_names.len(),
        "baseline audit started"
    );
    let logs_before = runner.run(&spec, &seeds);
    let reproducible = check_reproducible(&runner, &spec, &seeds);
    if !reproducible {
        warn!(spec = %spec.meta.name, "baseline spec is not reproducible");
    }
    let report_before = build_audit_report(&logs_before).with_reproducible(reproducible);
    let before_gate = gate_with_repro(&gate, &report_before);

    let regression = if before_gate.passed {
        info!("baseline passes the gate, patch not required");
        let patch = PatchProposal::no_op(RATIONALE_ALREADY_PASSING);
        RegressionResult {
            passed: true,
            attempts: vec![AttemptRecord::short_circuit(patch.clone(), &report_before)],
            selected_patch: patch,
            patched_spec: spec.clone(),
            after_report: report_before.clone(),
            after_logs: logs_before.clone(),
        }
    } else {
        info!(reasons = ?before_gate.reasons, "baseline fails the gate, searching for a patch");
        let candidates = suggest_patch_candidates(&spec, &report_before, config.ranking_oracle.as_deref());
        run_regression_gate(
            &spec,
            &report_before,
            &seeds,
            &runner,
            &candidates,
            config.max_attempts,
            &gate,
        )?
    };

    let after_gate = gate_with_repro(&gate, &regression.after_report);
    let mut gate_reasons = after_gate.reasons.clone();
    if let Some(last) = regression.last_attempt() {
        if !last.improved_vs_before {
            for (key, reason) in &last.improvement_reasons {
                gate_reasons.insert(format!("improvement:{}", key), reason.clone());
            }
        }
    }
    let passed = regression.passed;

    if passed {
        info!(
            attempts = regression.attempts.len(),
            rationale = %regression.selected_patch.rationale,
            "gate passed"
        );
    } else {
        warn!(reasons = ?gate_reasons, "gate soft-failed, best-effort patch selected");
    }

    Ok(PipelineOutcome {
        spec_before: spec,
        seeds,
        policy_names,
        logs_before,
        report_before,
        regression,
        gate,
        before_gate,
        after_gate,
        gate_reasons,
        passed,
    })
}
