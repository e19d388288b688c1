use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::report::GATED_METRICS;
use super::spec::{Coord, Team};

pub const RULE_MAX_TURNS: &str = "max_turns";
pub const PARAM_CAPTURE_RANGE: &str = "capture_range";
pub const PARAM_DEADLOCK_REPEAT: &str = "deadlock_repeat";

/// One structural edit to a GameSpec.
///
/// Unrecognised `op` tags deserialize to [`PatchOp::Unknown`] and are skipped
/// when the patch is applied.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    RemoveWall { pos: Coord },
    AddWall { pos: Coord },
    MoveSpawn { team: Team, to: Coord },
    MoveFlag { team: Team, to: Coord },
    SetRule { key: String, value: i64 },
    SetParam { key: String, value: i64 },
    #[serde(other)]
    Unknown,
}

impl PatchOp {
    pub fn set_rule(key: &str, value: i64) -> Self {
        PatchOp::SetRule {
            key: key.to_string(),
            value,
        }
    }

    pub fn set_param(key: &str, value: i64) -> Self {
        PatchOp::SetParam {
            key: key.to_string(),
            value,
        }
    }
}

/// Expected direction of a metric after a patch.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Down,
    Same,
}

impl Effect {
    /// Parse an untrusted annotation; anything but `"down"` is `Same`.
    pub fn coerce(raw: &str) -> Effect {
        if raw == "down" {
            Effect::Down
        } else {
            Effect::Same
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PatchProposal {
    pub patch_ops: Vec<PatchOp>,
    pub rationale: String,
    pub expected_effect: BTreeMap<String, Effect>,
}

impl PatchProposal {
    /// Proposal with an effect annotation for every gated metric, in
    /// `deadlock_rate`, `win_skew`, `exploit_dominance` order.
    pub fn new(patch_ops: Vec<PatchOp>, rationale: &str, effects: [Effect; 3]) -> Self {
        let expected_effect = GATED_METRICS
            .iter()
            .zip(effects)
            .map(|(name, effect)| (name.to_string(), effect))
            .collect();
        Self {
            patch_ops,
            rationale: rationale.to_string(),
            expected_effect,
        }
    }

    /// The "leave the spec alone" proposal.
    pub fn no_op(rationale: &str) -> Self {
        Self::new(Vec::new(), rationale, [Effect::Same; 3])
    }

    pub fn is_empty(&self) -> bool {
        self.patch_ops.is_empty()
    }
}
