//! Two-pass reproducibility probe.

use tracing::warn;

use crate::engine::SelfPlayRunner;
use crate::models::GameSpec;

/// Seeds the probe replays, taken from the front of the seed list.
pub const PROBE_SEEDS: usize = 4;

/// Run the first `min(4, N)` seeds twice and compare every log's replay key.
///
/// The two passes run one after the other, never interleaved.
pub fn check_reproducible(runner: &SelfPlayRunner, spec: &GameSpec, seeds: &[u64]) -> bool {
    let probe = &seeds[..seeds.len().min(PROBE_SEEDS)];
    let first = runner.run(spec, probe);
    let second = runner.run(spec, probe);

    if first.len() != second.len() {
        warn!(first = first.len(), second = second.len(), "reproducibility probe count mismatch");
        return false;
    }
    match first
        .iter()
        .zip(&second)
        .position(|(a, b)| a.replay_key() != b.replay_key())
    {
        Some(index) => {
            warn!(
                index,
                seed = first[index].seed,
                policy_a = %first[index].policy_a,
                policy_b = %first[index].policy_b,
                "reproducibility probe diverged"
            );
            false
        }
        None => true,
    }
}
