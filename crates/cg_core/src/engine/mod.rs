//! Deterministic match simulation.
//!
//! ```text
//! SelfPlayRunner ──(a, b, seed)──▶ MatchRunner ──▶ GameLog
//!                                   │
//!                                   ├─ Grid (walls, BFS)
//!                                   └─ ScriptedPolicy × 2
//! ```

pub mod deterministic;
pub mod pathing;
pub mod policy;
pub mod selfplay;
pub mod simulator;

pub use deterministic::{policy_seed, state_hash, STATE_HASH_LEN};
pub use pathing::Grid;
pub use policy::{Action, Observation, Policy, PolicyKind, ScriptedPolicy, DEFAULT_EPSILON};
pub use selfplay::SelfPlayRunner;
pub use simulator::{parse_trace_entry, MatchRunner};
