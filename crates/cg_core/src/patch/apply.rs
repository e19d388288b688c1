//! Applying a [`PatchProposal`] to a [`GameSpec`].

use tracing::debug;

use crate::engine::Grid;
use crate::models::{
    Coord, GameSpec, PatchOp, PatchProposal, Team, PARAM_CAPTURE_RANGE, PARAM_DEADLOCK_REPEAT,
    RULE_MAX_TURNS,
};

/// Open cell for a relocation target; spawn A when nothing on the map is open.
pub fn nearest_valid(spec: &GameSpec, target: Coord) -> Coord {
    Grid::from_spec(spec)
        .nearest_open(target)
        .unwrap_or_else(|| spec.spawn(Team::A))
}

/// Execute `proposal` against a copy of `spec`.
///
/// Operations run in order on the working copy, so a relocation sees walls
/// removed by an earlier operation. Unknown operations and keys are skipped.
/// Afterwards walls on a flag or spawn are dropped and the wall list is
/// sorted by `(y, x)`.
pub fn apply_patch(spec: &GameSpec, proposal: &PatchProposal) -> GameSpec {
    let mut patched = spec.clone();

    for op in &proposal.patch_ops {
        match op {
            PatchOp::RemoveWall { pos } => {
                patched.map.walls.retain(|w| w != pos);
            }
            PatchOp::AddWall { pos } => {
                if patched.map.in_bounds(*pos)
                    && !patched.is_key_point(*pos)
                    && !patched.map.walls.contains(pos)
                {
                    patched.map.walls.push(*pos);
                }
            }
            PatchOp::MoveSpawn { team, to } => {
                let target = nearest_valid(&patched, *to);
                patched.spawns[*team] = target;
            }
            PatchOp::MoveFlag { team, to } => {
                let target = nearest_valid(&patched, *to);
                patched.map.flags[*team] = target;
            }
            PatchOp::SetRule { key, value } if key == RULE_MAX_TURNS => {
                patched.rules.max_turns = clamp_u32(*value);
            }
            PatchOp::SetParam { key, value } if key == PARAM_CAPTURE_RANGE => {
                patched.params.capture_range = (*value).clamp(0, i32::MAX as i64) as i32;
            }
            PatchOp::SetParam { key, value } if key == PARAM_DEADLOCK_REPEAT => {
                patched.params.deadlock_repeat = clamp_u32(*value);
            }
            other => {
                debug!(?other, "skipping unsupported patch op");
            }
        }
    }

    let keep: Vec<Coord> = patched
        .map
        .walls
        .iter()
        .copied()
        .filter(|&w| !patched.is_key_point(w))
        .collect();
    patched.map.walls = keep;
    patched.map.walls.sort_by_key(|&(x, y)| (y, x));
    patched.map.walls.dedup();
    patched
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Effect;
    use crate::spec_gen::default_gamespec;

    fn proposal(ops: Vec<PatchOp>) -> PatchProposal {
        PatchProposal::new(ops, "test", [Effect::Same; 3])
    }

    #[test]
    fn test_no_op_returns_equal_spec() {
        let spec = default_gamespec(1337);
        let mut sorted = spec.clone();
        sorted.map.walls.sort_by_key(|&(x, y)| (y, x));
        let patched = apply_patch(&spec, &PatchProposal::no_op("keep"));
        assert_eq!(patched, sorted);
        // Applying twice changes nothing further.
        assert_eq!(apply_patch(&patched, &PatchProposal::no_op("keep")), patched);
    }

    #[test]
    fn test_original_spec_untouched() {
        let spec = default_gamespec(1337);
        let before = spec.clone();
        let _ = apply_patch(&spec, &proposal(vec![PatchOp::RemoveWall { pos: (4, 0) }]));
        assert_eq!(spec, before);
    }

    #[test]
    fn test_remove_and_add_wall() {
        let spec = default_gamespec(1337);
        let patched = apply_patch(
            &spec,
            &proposal(vec![
                PatchOp::RemoveWall { pos: (6, 5) },
                PatchOp::RemoveWall { pos: (3, 3) },
                PatchOp::AddWall { pos: (7, 7) },
                PatchOp::AddWall { pos: (0, 0) },
                PatchOp::AddWall { pos: (10, 3) },
            ]),
        );
        assert!(!patched.map.walls.contains(&(6, 5)));
        assert!(patched.map.walls.contains(&(7, 7)));
        // Spawn A and out-of-bounds cells are rejected.
        assert!(!patched.map.walls.contains(&(0, 0)));
        assert!(!patched.map.walls.contains(&(10, 3)));
        assert_eq!(patched.map.walls.len(), spec.map.walls.len());
    }

    #[test]
    fn test_walls_sorted_by_row_then_column() {
        let spec = default_gamespec(1337);
        let patched = apply_patch(&spec, &proposal(vec![PatchOp::AddWall { pos: (8, 0) }]));
        let keys: Vec<(i32, i32)> = patched.map.walls.iter().map(|&(x, y)| (y, x)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(patched.map.walls[0], (4, 0));
        assert_eq!(patched.map.walls[1], (8, 0));
    }

    #[test]
    fn test_move_flag_snaps_to_open_cell() {
        let spec = default_gamespec(1337);
        // (4,0) is a wall; BFS from it reaches D=(4,1) wall, L=(3,0) open first.
        let patched = apply_patch(
            &spec,
            &proposal(vec![PatchOp::MoveFlag {
                team: Team::B,
                to: (4, 0),
            }]),
        );
        assert_eq!(patched.flag(Team::B), (3, 0));
    }

    #[test]
    fn test_relocation_sees_earlier_wall_removal() {
        let spec = default_gamespec(1337);
        let patched = apply_patch(
            &spec,
            &proposal(vec![
                PatchOp::RemoveWall { pos: (4, 0) },
                PatchOp::MoveSpawn {
                    team: Team::B,
                    to: (4, 0),
                },
            ]),
        );
        assert_eq!(patched.spawn(Team::B), (4, 0));
    }

    #[test]
    fn test_walls_under_moved_key_points_are_dropped() {
        let spec = default_gamespec(1337);
        let patched = apply_patch(
            &spec,
            &proposal(vec![
                PatchOp::RemoveWall { pos: (4, 2) },
                PatchOp::MoveFlag {
                    team: Team::A,
                    to: (4, 2),
                },
                PatchOp::AddWall { pos: (4, 2) },
            ]),
        );
        assert_eq!(patched.flag(Team::A), (4, 2));
        assert!(!patched.map.walls.contains(&(4, 2)));
    }

    #[test]
    fn test_rule_and_param_ops() {
        let spec = default_gamespec(1337);
        let patched = apply_patch(
            &spec,
            &proposal(vec![
                PatchOp::set_rule(RULE_MAX_TURNS, 70),
                PatchOp::set_param(PARAM_CAPTURE_RANGE, 2),
                PatchOp::set_param(PARAM_DEADLOCK_REPEAT, 120),
                PatchOp::set_param("move_cost", 9),
                PatchOp::set_rule("win", 1),
                PatchOp::Unknown,
            ]),
        );
        assert_eq!(patched.rules.max_turns, 70);
        assert_eq!(patched.params.capture_range, 2);
        assert_eq!(patched.params.deadlock_repeat, 120);
        assert_eq!(patched.params.move_cost, spec.params.move_cost);
        assert_eq!(patched.rules.win, spec.rules.win);
    }

    #[test]
    fn test_nearest_valid_falls_back_to_spawn_a() {
        let mut spec = default_gamespec(1337);
        spec.map.w = 2;
        spec.map.h = 1;
        spec.map.walls = vec![(0, 0), (1, 0)];
        spec.spawns.a = (0, 0);
        assert_eq!(nearest_valid(&spec, (1, 0)), (0, 0));
    }
}
