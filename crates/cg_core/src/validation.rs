//! Structural validation of a [`GameSpec`].
//!
//! Runs before anything is simulated. Collects every violation instead of
//! stopping at the first one.

use fxhash::FxHashSet;

use crate::engine::Grid;
use crate::error::SpecError;
use crate::models::{Coord, GameSpec, Team};

/// Largest map the simulator accepts, in cells.
pub const MAX_MAP_CELLS: i32 = 1_000_000;

/// All violations of `spec`, empty when it can be simulated.
pub fn collect_violations(spec: &GameSpec) -> Vec<String> {
    let mut errors = Vec::new();
    let map = &spec.map;

    if map.w <= 1 || map.h <= 1 {
        errors.push("map size must be larger than 1x1".to_string());
    }

    let mut seen: FxHashSet<Coord> = FxHashSet::default();
    let mut duplicate = false;
    for &wall in &map.walls {
        if !seen.insert(wall) {
            duplicate = true;
        }
        if !map.in_bounds(wall) {
            errors.push(format!("wall out of bounds: ({}, {})", wall.0, wall.1));
        }
    }
    if duplicate {
        errors.push("walls contain duplicates".to_string());
    }

    for team in Team::BOTH {
        let pos = spec.spawn(team);
        if !map.in_bounds(pos) {
            errors.push(format!("spawn out of bounds: {}=({}, {})", team, pos.0, pos.1));
        }
        if seen.contains(&pos) {
            errors.push(format!("spawn on wall: {}=({}, {})", team, pos.0, pos.1));
        }
    }
    for team in Team::BOTH {
        let pos = spec.flag(team);
        if !map.in_bounds(pos) {
            errors.push(format!("flag out of bounds: {}=({}, {})", team, pos.0, pos.1));
        }
        if seen.contains(&pos) {
            errors.push(format!("flag on wall: {}=({}, {})", team, pos.0, pos.1));
        }
    }

    if spec.spawn(Team::A) == spec.spawn(Team::B) {
        errors.push("spawns must not overlap".to_string());
    }
    if spec.flag(Team::A) == spec.flag(Team::B) {
        errors.push("flags must not overlap".to_string());
    }
    if spec.params.deadlock_repeat == 0 {
        errors.push("deadlock_repeat must be at least 1".to_string());
    }

    let oversized = map
        .w
        .checked_mul(map.h)
        .map_or(true, |cells| cells > MAX_MAP_CELLS);
    if oversized {
        errors.push(format!(
            "map size {}x{} exceeds {} cells",
            map.w, map.h, MAX_MAP_CELLS
        ));
        return errors;
    }

    let grid = Grid::from_spec(spec);
    for team in Team::BOTH {
        let enemy = team.opponent();
        if grid.shortest_path(spec.spawn(team), spec.flag(enemy)).is_empty() {
            errors.push(format!("no path from spawn {} to enemy flag {}", team, enemy));
        }
    }

    errors
}

/// `Ok(())` or every violation in one [`SpecError::Invalid`].
pub fn validate_gamespec(spec: &GameSpec) -> Result<(), SpecError> {
    let errors = collect_violations(spec);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SpecError::Invalid(errors))
    }
}

/// Parse and validate untrusted JSON.
pub fn parse_gamespec(json: &str) -> Result<GameSpec, SpecError> {
    let spec = GameSpec::from_json(json)?;
    validate_gamespec(&spec)?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_gen::default_gamespec;

    #[test]
    fn test_default_spec_is_valid() {
        assert!(validate_gamespec(&default_gamespec(1337)).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let mut spec = default_gamespec(1337);
        spec.map.walls.push((4, 0));
        spec.map.walls.push((12, 3));
        spec.spawns.b = spec.spawns.a;
        spec.map.flags.b = (4, 1);

        let err = validate_gamespec(&spec).unwrap_err();
        let violations = err.violations();
        assert!(violations.contains(&"walls contain duplicates".to_string()));
        assert!(violations.contains(&"wall out of bounds: (12, 3)".to_string()));
        assert!(violations.contains(&"spawns must not overlap".to_string()));
        assert!(violations.contains(&"flag on wall: B=(4, 1)".to_string()));
    }

    #[test]
    fn test_unreachable_flag() {
        let mut spec = default_gamespec(1337);
        // Close the gap in column 4.
        spec.map.walls.push((4, 4));
        spec.map.walls.push((4, 5));
        let err = validate_gamespec(&spec).unwrap_err();
        assert!(err
            .violations()
            .iter()
            .any(|v| v == "no path from spawn A to enemy flag B" || v == "no path from spawn B to enemy flag A"));
    }

    #[test]
    fn test_tiny_map() {
        let mut spec = default_gamespec(1337);
        spec.map.w = 1;
        let err = validate_gamespec(&spec).unwrap_err();
        assert!(err.violations()[0].contains("larger than 1x1"));
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let json = r#"{"map":{"w":50000,"h":50000,"flags":{"A":[0,1],"B":[1,0]}},"spawns":{"A":[0,0],"B":[1,1]}}"#;
        let err = parse_gamespec(json).unwrap_err();
        assert!(err
            .violations()
            .iter()
            .any(|v| v == "map size 50000x50000 exceeds 1000000 cells"));

        let mut spec = default_gamespec(1337);
        spec.map.h = i32::MAX;
        let err = validate_gamespec(&spec).unwrap_err();
        assert!(err.violations().iter().any(|v| v.contains("exceeds")));
    }

    #[test]
    fn test_parse_gamespec() {
        let json = default_gamespec(7).to_json_pretty().unwrap();
        assert_eq!(parse_gamespec(&json).unwrap(), default_gamespec(7));
        assert!(matches!(parse_gamespec("{\"map\": 3}"), Err(SpecError::Json(_))));
    }
}
