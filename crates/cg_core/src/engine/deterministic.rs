//! Deterministic seed derivation and state hashing.
//!
//! Policy RNGs never consume the match seed directly. Each (match seed,
//! policy name, side) triple gets its own stream, so adding a policy to the
//! roster or a seed to the list leaves every other stream untouched.
//!
//! ```ignore
//! let seed_a = policy_seed(match_seed, "random_epsilon", Team::A);
//! let seed_b = policy_seed(match_seed, "random_epsilon", Team::B);
//! assert_ne!(seed_a, seed_b);
//! ```

// DefaultHasher is NOT stable across Rust versions; FxHasher64 is, and does
// not depend on the platform's pointer width either.
use fxhash::FxHasher64;
use sha2::{Digest, Sha256};
use std::hash::{Hash, Hasher};

use crate::models::{Coord, Team};

/// Hex length of a state hash.
pub const STATE_HASH_LEN: usize = 12;

/// Per-policy, per-side RNG seed for one match.
#[inline]
pub fn policy_seed(match_seed: u64, policy_name: &str, side: Team) -> u64 {
    let mut hasher = FxHasher64::default();
    match_seed.hash(&mut hasher);
    policy_name.hash(&mut hasher);
    side.as_str().hash(&mut hasher);
    hasher.finish()
}

/// Short stable digest of the joint position.
///
/// The turn number is deliberately not an input: revisiting the same
/// `(pos_a, pos_b)` at any turn yields the same hash.
pub fn state_hash(pos_a: Coord, pos_b: Coord) -> String {
    let payload = format!(
        "{{\"A\":[{},{}],\"B\":[{},{}]}}",
        pos_a.0, pos_a.1, pos_b.0, pos_b.1
    );
    let digest = Sha256::digest(payload.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(STATE_HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_policy_seed_stable() {
        let a = policy_seed(1337, "random_epsilon", Team::A);
        assert_eq!(a, policy_seed(1337, "random_epsilon", Team::A));
        assert_ne!(a, policy_seed(1337, "random_epsilon", Team::B));
        assert_ne!(a, policy_seed(1354, "random_epsilon", Team::A));
        assert_ne!(a, policy_seed(1337, "greedy_shortest_path", Team::A));
    }

    #[test]
    fn test_state_hash_shape() {
        let h = state_hash((0, 0), (9, 9));
        assert_eq!(h.len(), STATE_HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(h, state_hash((9, 9), (0, 0)));
        assert_ne!(h, state_hash((0, 0), (9, 8)));
    }

    proptest! {
        /// Identical joint positions hash identically, regardless of when they occur.
        #[test]
        fn prop_state_hash_is_pure(
            ax in -50i32..50, ay in -50i32..50,
            bx in -50i32..50, by in -50i32..50
        ) {
            prop_assert_eq!(state_hash((ax, ay), (bx, by)), state_hash((ax, ay), (bx, by)));
        }

        /// Moving either team changes the hash.
        #[test]
        fn prop_state_hash_distinguishes_positions(
            ax in 0i32..20, ay in 0i32..20,
            bx in 0i32..20, by in 0i32..20,
            dx in 1i32..5
        ) {
            prop_assert_ne!(state_hash((ax, ay), (bx, by)), state_hash((ax + dx, ay), (bx, by)));
            prop_assert_ne!(state_hash((ax, ay), (bx, by)), state_hash((ax, ay), (bx, by + dx)));
        }
    }
}
