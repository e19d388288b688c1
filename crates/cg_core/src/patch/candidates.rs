//! Heuristic patch candidates derived from audit metrics.
//!
//! ```text
//! deadlock & skew ─▶ combined (center wall, mirrored flag, capture 2, long repeat)
//! deadlock        ─▶ remove center wall │ max_turns + 10
//! skew            ─▶ mirror disadvantaged spawn + flag
//! exploit         ─▶ flags to opposite corners
//! none            ─▶ no-op
//! ```
//!
//! Candidates are emitted in that order, one block per raised issue.

use tracing::{debug, warn};

use super::apply::nearest_valid;
use crate::analysis::{DEADLOCK_FINDING_LIMIT, EXPLOIT_FINDING_LIMIT, SKEW_FINDING_LIMIT};
use crate::models::{
    AuditReport, GameSpec, Metrics, PatchOp, PatchProposal, Team, PARAM_CAPTURE_RANGE,
    PARAM_DEADLOCK_REPEAT, RULE_MAX_TURNS,
};
use crate::oracle::RankingOracle;

use crate::models::Effect::{Down, Same};

pub const RATIONALE_COMBINED: &str =
    "Break loop states and rebalance objective pressure with minimal structural edits.";
pub const RATIONALE_CENTER_WALL: &str = "Central bottleneck likely causes loop states.";
pub const RATIONALE_LONGER_HORIZON: &str = "Longer horizon can reduce timeout/deadlock pressure.";
pub const RATIONALE_MIRROR: &str = "Mirror disadvantaged side key points to reduce asymmetry.";
pub const RATIONALE_DISPERSE: &str = "Disperse objective hotspots to weaken a single dominant strategy.";
pub const RATIONALE_KEEP: &str = "No critical issue found; keep current spec.";

/// Smallest capture range the combined patch sets.
const MIN_CAPTURE_RANGE: i32 = 2;
/// Turns added by the longer-horizon candidate.
const EXTRA_TURNS: u32 = 10;

/// Which balance problems the metrics show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IssueFlags {
    pub deadlock: bool,
    pub skew: bool,
    pub exploit: bool,
}

impl IssueFlags {
    pub fn from_metrics(metrics: &Metrics) -> Self {
        Self {
            deadlock: metrics.deadlock_rate > DEADLOCK_FINDING_LIMIT,
            skew: metrics.win_skew > SKEW_FINDING_LIMIT,
            exploit: metrics.exploit_dominance > EXPLOIT_FINDING_LIMIT,
        }
    }

    pub fn any(&self) -> bool {
        self.deadlock || self.skew || self.exploit
    }
}

/// `(advantaged, disadvantaged)`; A counts as advantaged on an even split.
fn sides(metrics: &Metrics) -> (Team, Team) {
    if metrics.win_rate_a >= 0.5 {
        (Team::A, Team::B)
    } else {
        (Team::B, Team::A)
    }
}

fn mirrored(spec: &GameSpec, pos: (i32, i32)) -> (i32, i32) {
    nearest_valid(spec, spec.map.mirror(pos))
}

fn combined_candidate(spec: &GameSpec, metrics: &Metrics) -> PatchProposal {
    let (advantaged, disadvantaged) = sides(metrics);
    let mut ops = Vec::new();
    if let Some(wall) = spec.map.center_wall() {
        ops.push(PatchOp::RemoveWall { pos: wall });
    }
    ops.push(PatchOp::MoveFlag {
        team: disadvantaged,
        to: mirrored(spec, spec.flag(advantaged)),
    });
    ops.push(PatchOp::set_param(
        PARAM_CAPTURE_RANGE,
        spec.params.capture_range.max(MIN_CAPTURE_RANGE) as i64,
    ));
    ops.push(PatchOp::set_param(
        PARAM_DEADLOCK_REPEAT,
        (spec.params.deadlock_repeat as i64).max(2 * spec.rules.max_turns as i64),
    ));
    PatchProposal::new(ops, RATIONALE_COMBINED, [Down, Down, Down])
}

fn deadlock_candidates(spec: &GameSpec) -> Vec<PatchProposal> {
    let mut out = Vec::new();
    if let Some(wall) = spec.map.center_wall() {
        out.push(PatchProposal::new(
            vec![PatchOp::RemoveWall { pos: wall }],
            RATIONALE_CENTER_WALL,
            [Down, Same, Same],
        ));
    }
    out.push(PatchProposal::new(
        vec![PatchOp::set_rule(
            RULE_MAX_TURNS,
            spec.rules.max_turns.saturating_add(EXTRA_TURNS) as i64,
        )],
        RATIONALE_LONGER_HORIZON,
        [Down, Same, Same],
    ));
    out
}

fn skew_candidate(spec: &GameSpec, metrics: &Metrics) -> PatchProposal {
    let (advantaged, disadvantaged) = sides(metrics);
    PatchProposal::new(
        vec![
            PatchOp::MoveSpawn {
                team: disadvantaged,
                to: mirrored(spec, spec.spawn(advantaged)),
            },
            PatchOp::MoveFlag {
                team: disadvantaged,
                to: mirrored(spec, spec.flag(advantaged)),
            },
        ],
        RATIONALE_MIRROR,
        [Same, Down, Down],
    )
}

fn exploit_candidate(spec: &GameSpec) -> PatchProposal {
    PatchProposal::new(
        vec![
            PatchOp::MoveFlag {
                team: Team::A,
                to: nearest_valid(spec, (0, spec.map.h - 1)),
            },
            PatchOp::MoveFlag {
                team: Team::B,
                to: nearest_valid(spec, (spec.map.w - 1, 0)),
            },
        ],
        RATIONALE_DISPERSE,
        [Same, Down, Down],
    )
}

/// Heuristic candidates in precedence order, without oracle input.
pub fn heuristic_candidates(spec: &GameSpec, metrics: &Metrics) -> Vec<PatchProposal> {
    let issues = IssueFlags::from_metrics(metrics);
    let mut candidates = Vec::new();

    if issues.deadlock && issues.skew {
        candidates.push(combined_candidate(spec, metrics));
    }
    if issues.deadlock {
        candidates.extend(deadlock_candidates(spec));
    }
    if issues.skew {
        candidates.push(skew_candidate(spec, metrics));
    }
    if issues.exploit {
        candidates.push(exploit_candidate(spec));
    }
    if candidates.is_empty() {
        candidates.push(PatchProposal::no_op(RATIONALE_KEEP));
    }

    debug!(?issues, count = candidates.len(), "patch candidates generated");
    candidates
}

/// Candidate list for the regression loop.
///
/// With an oracle and more than one candidate, a successful ranking puts a
/// copy of the chosen candidate (oracle rationale and effects) in front.
/// Oracle failures leave the heuristic list unchanged.
pub fn suggest_patch_candidates(
    spec: &GameSpec,
    report: &AuditReport,
    oracle: Option<&dyn RankingOracle>,
) -> Vec<PatchProposal> {
    let mut candidates = heuristic_candidates(spec, &report.metrics);

    if let Some(oracle) = oracle.filter(|_| candidates.len() > 1) {
        match oracle.rank(report, &candidates) {
            Ok(suggestion) if suggestion.selected_index < candidates.len() => {
                let chosen = &candidates[suggestion.selected_index];
                let best = PatchProposal {
                    patch_ops: chosen.patch_ops.clone(),
                    rationale: suggestion.rationale,
                    expected_effect: suggestion.expected_effect,
                };
                debug!(index = suggestion.selected_index, "oracle suggestion prepended");
                candidates.insert(0, best);
            }
            Ok(suggestion) => {
                warn!(index = suggestion.selected_index, "oracle index out of range, ignored");
            }
            Err(e) => {
                warn!(error = %e, "oracle ranking unavailable, using heuristic order");
            }
        }
    }

    candidates
}
