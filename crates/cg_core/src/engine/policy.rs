//! Scripted policies.
//!
//! A policy turns an [`Observation`] into one [`Action`] per turn. The four
//! built-in strategies are deterministic given their construction seed and
//! read nothing but the observation and their own private state.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

use super::pathing::Grid;
use crate::error::CoreError;
use crate::models::{Coord, GameSpec, Team};

/// Probability that the epsilon policy ignores its plan and moves randomly.
pub const DEFAULT_EPSILON: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Stay,
}

impl Action {
    /// Every legal token, in the order random choices index into.
    pub const ALL: [Action; 5] = [Action::Up, Action::Down, Action::Left, Action::Right, Action::Stay];

    pub fn token(self) -> &'static str {
        match self {
            Action::Up => "U",
            Action::Down => "D",
            Action::Left => "L",
            Action::Right => "R",
            Action::Stay => "Stay",
        }
    }

    /// Parse a wire token. Anything that is not a legal token is `Stay`.
    pub fn from_token(token: &str) -> Action {
        match token {
            "U" => Action::Up,
            "D" => Action::Down,
            "L" => Action::Left,
            "R" => Action::Right,
            _ => Action::Stay,
        }
    }

    pub fn delta(self) -> Coord {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
            Action::Stay => (0, 0),
        }
    }

    pub fn apply(self, pos: Coord) -> Coord {
        let d = self.delta();
        (pos.0 + d.0, pos.1 + d.1)
    }

    /// Action that moves `from` onto the adjacent cell `to`; `Stay` otherwise.
    pub fn between(from: Coord, to: Coord) -> Action {
        match (to.0 - from.0, to.1 - from.1) {
            (0, -1) => Action::Up,
            (0, 1) => Action::Down,
            (-1, 0) => Action::Left,
            (1, 0) => Action::Right,
            _ => Action::Stay,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What one team sees at the start of a turn.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub team: Team,
    pub turn: u32,
    pub max_turns: u32,
    pub self_pos: Coord,
    pub opp_pos: Coord,
    pub own_flag: Coord,
    pub opp_flag: Coord,
    /// Map bounds and walls.
    pub grid: &'a Grid,
}

pub trait Policy {
    fn name(&self) -> &str;

    fn act(&mut self, obs: &Observation<'_>) -> Action;
}

/// First step along the shortest path, `Stay` if there or unreachable.
fn step_toward(grid: &Grid, start: Coord, goal: Coord) -> Action {
    let path = grid.shortest_path(start, goal);
    match path.get(1) {
        Some(&next) => Action::between(start, next),
        None => Action::Stay,
    }
}

/// Names of the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    GreedyShortestPath,
    Blocker,
    Camper,
    RandomEpsilon,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::GreedyShortestPath,
        PolicyKind::Blocker,
        PolicyKind::Camper,
        PolicyKind::RandomEpsilon,
    ];

    pub fn default_roster() -> Vec<PolicyKind> {
        Self::ALL.to_vec()
    }

    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::GreedyShortestPath => "greedy_shortest_path",
            PolicyKind::Blocker => "blocker",
            PolicyKind::Camper => "camper",
            PolicyKind::RandomEpsilon => "random_epsilon",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Result<PolicyKind, CoreError> {
        let key = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == key)
            .ok_or_else(|| CoreError::UnknownPolicy(name.to_string()))
    }

    /// Parse a roster of names, rejecting unknown ones.
    pub fn parse_roster<S: AsRef<str>>(names: &[S]) -> Result<Vec<PolicyKind>, CoreError> {
        names.iter().map(|n| Self::from_name(n.as_ref())).collect()
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The built-in strategies with their per-match state.
#[derive(Debug, Clone)]
pub enum ScriptedPolicy {
    /// Shortest path to the opponent's flag.
    Greedy,
    /// Cut in front of the opponent's route to our flag.
    Blocker,
    /// Hold a fixed cell on or next to our own flag.
    Camper { anchor: Coord },
    /// Greedy, except a random token with probability `epsilon`.
    RandomEpsilon { rng: ChaCha8Rng, epsilon: f64 },
}

impl ScriptedPolicy {
    /// Build the policy `kind` for `team`. `seed` feeds the private RNG and
    /// must already be derived per policy and side.
    pub fn build(kind: PolicyKind, team: Team, spec: &GameSpec, grid: &Grid, seed: u64) -> Self {
        match kind {
            PolicyKind::GreedyShortestPath => ScriptedPolicy::Greedy,
            PolicyKind::Blocker => ScriptedPolicy::Blocker,
            PolicyKind::Camper => ScriptedPolicy::Camper {
                anchor: camp_anchor(spec, grid, team),
            },
            PolicyKind::RandomEpsilon => ScriptedPolicy::RandomEpsilon {
                rng: ChaCha8Rng::seed_from_u64(seed),
                epsilon: DEFAULT_EPSILON,
            },
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            ScriptedPolicy::Greedy => PolicyKind::GreedyShortestPath,
            ScriptedPolicy::Blocker => PolicyKind::Blocker,
            ScriptedPolicy::Camper { .. } => PolicyKind::Camper,
            ScriptedPolicy::RandomEpsilon { .. } => PolicyKind::RandomEpsilon,
        }
    }
}

/// Smallest open cell by (row, column) among the own flag and its four
/// neighbours. Falls back to the team's spawn if all five are blocked.
fn camp_anchor(spec: &GameSpec, grid: &Grid, team: Team) -> Coord {
    let flag = spec.flag(team);
    let candidates = [
        flag,
        (flag.0, flag.1 - 1),
        (flag.0, flag.1 + 1),
        (flag.0 - 1, flag.1),
        (flag.0 + 1, flag.1),
    ];
    candidates
        .into_iter()
        .filter(|&c| grid.is_open(c))
        .min_by_key(|&(x, y)| (y, x))
        .unwrap_or_else(|| spec.spawn(team))
}

impl Policy for ScriptedPolicy {
    fn name(&self) -> &str {
        self.kind().name()
    }

    fn act(&mut self, obs: &Observation<'_>) -> Action {
        match self {
            ScriptedPolicy::Greedy => step_toward(obs.grid, obs.self_pos, obs.opp_flag),
            ScriptedPolicy::Blocker => {
                let opponent_path = obs.grid.shortest_path(obs.opp_pos, obs.own_flag);
                if let Some(&intercept) = opponent_path.get(1) {
                    let my_path = obs.grid.shortest_path(obs.self_pos, intercept);
                    if let Some(&next) = my_path.get(1) {
                        return Action::between(obs.self_pos, next);
                    }
                }
                step_toward(obs.grid, obs.self_pos, obs.opp_flag)
            }
            ScriptedPolicy::Camper { anchor } => {
                if obs.self_pos == *anchor {
                    Action::Stay
                } else {
                    step_toward(obs.grid, obs.self_pos, *anchor)
                }
            }
            ScriptedPolicy::RandomEpsilon { rng, epsilon } => {
                if rng.gen::<f64>() < *epsilon {
                    Action::ALL[rng.gen_range(0..Action::ALL.len())]
                } else {
                    step_toward(obs.grid, obs.self_pos, obs.opp_flag)
                }
            }
        }
    }
}
