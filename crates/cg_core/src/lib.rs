//! # cg_core - Deterministic CTF Balance Audit Engine
//!
//! This library evaluates a grid-based two-team capture-the-flag game design
//! for balance defects and, if the design is defective, searches for a small
//! structural patch that fixes it without introducing regressions.
//!
//! ## Features
//! - 100% deterministic self-play (same spec + seeds + roster = same logs)
//! - State-cycle deadlock detection
//! - Balance metrics (deadlock rate, side skew, single-strategy dominance)
//! - Declarative threshold/improvement gate
//! - Patch candidate search verified by re-simulation
//!
//! ## Pipeline
//!
//! ```text
//! GameSpec ─▶ SelfPlay ─▶ Audit ─▶ Gate ──pass──▶ short-circuit
//!                                   │
//!                                   └─fail─▶ Patcher ─▶ Regression loop
//!                                              (apply ─▶ SelfPlay ─▶ Audit ─▶ Gate)
//! ```

pub mod analysis;
pub mod engine;
pub mod error;
pub mod gate;
pub mod models;
pub mod oracle;
pub mod patch;
pub mod pipeline;
pub mod regression;
pub mod spec_gen;
pub mod validation;

// Re-export main API
pub use analysis::{build_audit_report, check_reproducible};
pub use engine::{
    Action, MatchRunner, Observation, Policy, PolicyKind, ScriptedPolicy, SelfPlayRunner,
};
pub use error::{CoreError, OracleError, Result, SpecError};
pub use gate::{default_gate_spec, Direction, GateEvaluation, GateSpec, MetricSpec};
pub use models::{
    AuditReport, Coord, Effect, GameLog, GameSpec, MapSpec, Metrics, PatchOp, PatchProposal,
    Team, TerminalReason,
};
pub use oracle::{GeminiClient, OracleConfig, RankingOracle, SpecGenerator};
pub use patch::{apply_patch, suggest_patch_candidates};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineOutcome, SpecSource};
pub use regression::{run_regression_gate, AttemptRecord, RegressionResult};
pub use spec_gen::{default_gamespec, generate_gamespec};
pub use validation::validate_gamespec;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const RESULT_SCHEMA_VERSION: u8 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let spec = default_gamespec(1337);
        let runner = SelfPlayRunner::new(PolicyKind::default_roster(), None).unwrap();

        let first = runner.run(&spec, &[999, 1000]);
        let second = runner.run(&spec, &[999, 1000]);

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b, "Same seeds should produce byte-identical logs");
    }

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(RESULT_SCHEMA_VERSION, 2);
    }
}
