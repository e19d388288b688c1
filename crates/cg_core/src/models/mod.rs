//! Plain data shared by every stage of the pipeline.
//!
//! - [`GameSpec`] - immutable game design
//! - [`GameLog`] - one simulated match
//! - [`AuditReport`] - balance metrics and findings over a log set
//! - [`PatchProposal`] - ordered structural edits with rationale

pub mod log;
pub mod patch;
pub mod report;
pub mod spec;

pub use log::{GameLog, ReplayKey, TerminalReason};
pub use patch::{
    Effect, PatchOp, PatchProposal, PARAM_CAPTURE_RANGE, PARAM_DEADLOCK_REPEAT, RULE_MAX_TURNS,
};
pub use report::{
    round4, AuditReport, Evidence, Finding, FindingKind, Metrics, Severity, DEADLOCK_RATE,
    EXPLOIT_DOMINANCE, GATED_METRICS, WIN_RATE_A, WIN_SKEW,
};
pub use spec::{manhattan, Coord, GameSpec, MapSpec, Meta, Params, PerTeam, Rules, Team};
