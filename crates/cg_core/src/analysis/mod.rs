//! Audit engine and reproducibility probe.

pub mod audit;
pub mod repro;

pub use audit::{
    build_audit_report, policy_win_rates, DEADLOCK_FINDING_LIMIT, EXPLOIT_FINDING_LIMIT,
    SKEW_FINDING_LIMIT,
};
pub use repro::{check_reproducible, PROBE_SEEDS};
