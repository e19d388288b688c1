//! Spec sourcing: the built-in biased baseline and generator fallback.

use tracing::{info, warn};

use crate::error::Result;
use crate::models::{GameSpec, MapSpec, Meta, Params, PerTeam, Rules};
use crate::oracle::{extract_json_object, SpecGenerator};
use crate::validation::{parse_gamespec, validate_gamespec};

pub const DEFAULT_PROMPT: &str = "Generate a 2D CTF map that might have balancing risks.";

/// Deliberately imbalanced 10×10 map.
///
/// Column 4 is walled except rows 4 and 5, with two extra walls at (6,5) and
/// (6,6). Team A spawns two steps from the enemy flag while B must cross the
/// whole map, so the baseline shows both side skew and deadlocks.
pub fn default_gamespec(seed: u64) -> GameSpec {
    let mut walls: Vec<(i32, i32)> = (0..10).filter(|y| *y != 4 && *y != 5).map(|y| (4, y)).collect();
    walls.extend([(6, 5), (6, 6)]);

    GameSpec {
        meta: Meta {
            name: "CTF10-Biased".to_string(),
            seed,
            version: "0.1".to_string(),
        },
        map: MapSpec {
            w: 10,
            h: 10,
            walls,
            flags: PerTeam::new((0, 9), (2, 0)),
        },
        spawns: PerTeam::new((0, 0), (9, 9)),
        rules: Rules {
            max_turns: 60,
            ..Default::default()
        },
        params: Params {
            move_cost: 1,
            capture_range: 0,
            deadlock_repeat: 6,
        },
    }
}

/// Ask `generator` for a spec; fall back to the baseline on any failure.
///
/// Generator output is accepted only if it contains a JSON object that
/// parses and validates. Only an invalid baseline is an error.
pub fn generate_gamespec(
    prompt: &str,
    seed: u64,
    generator: Option<&dyn SpecGenerator>,
) -> Result<GameSpec> {
    if let Some(generator) = generator {
        match generator.generate_spec(prompt, seed) {
            Ok(text) => match extract_json_object(&text).map(parse_gamespec) {
                Some(Ok(spec)) => {
                    info!(name = %spec.meta.name, "using generated spec");
                    return Ok(spec);
                }
                Some(Err(e)) => warn!(error = %e, "generated spec rejected"),
                None => warn!("generator reply contained no JSON object"),
            },
            Err(e) => warn!(error = %e, "spec generator unavailable"),
        }
    }

    let baseline = default_gamespec(seed);
    validate_gamespec(&baseline)?;
    info!(name = %baseline.meta.name, "using built-in baseline spec");
    Ok(baseline)
}
