//! Per-match state machine.
//!
//! ```text
//! running (turn 1..=max_turns)
//!   ├─ both teams in capture range ─▶ draw      (no winner)
//!   ├─ one team in capture range   ─▶ capture   (winner)
//!   ├─ joint position seen N times ─▶ deadlock  (no winner)
//!   └─ turn limit                  ─▶ timeout   (no winner)
//! ```
//!
//! Both teams choose from the same pre-move snapshot and move
//! simultaneously. A move into a wall or off the map leaves the team in
//! place and is recorded as an event; it never ends the match.

use fxhash::FxHashMap;
use tracing::debug;

use super::deterministic::state_hash;
use super::pathing::Grid;
use super::policy::{Action, Observation, Policy};
use crate::models::{manhattan, Coord, GameLog, GameSpec, Team, TerminalReason};

/// Runs matches on one spec.
pub struct MatchRunner<'a> {
    spec: &'a GameSpec,
    grid: Grid,
}

/// Result of attempting one move.
struct MoveOutcome {
    pos: Coord,
    valid: bool,
}

impl<'a> MatchRunner<'a> {
    pub fn new(spec: &'a GameSpec) -> Self {
        Self {
            spec,
            grid: Grid::from_spec(spec),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    fn attempt_move(&self, pos: Coord, action: Action) -> MoveOutcome {
        let next = action.apply(pos);
        if self.grid.is_open(next) {
            MoveOutcome { pos: next, valid: true }
        } else {
            MoveOutcome { pos, valid: false }
        }
    }

    fn observation(&self, team: Team, turn: u32, pos_a: Coord, pos_b: Coord) -> Observation<'_> {
        let (self_pos, opp_pos) = match team {
            Team::A => (pos_a, pos_b),
            Team::B => (pos_b, pos_a),
        };
        Observation {
            team,
            turn,
            max_turns: self.spec.rules.max_turns,
            self_pos,
            opp_pos,
            own_flag: self.spec.flag(team),
            opp_flag: self.spec.flag(team.opponent()),
            grid: &self.grid,
        }
    }

    /// Whether `team` standing on `pos` is within capture range of the enemy flag.
    fn captures(&self, team: Team, pos: Coord) -> bool {
        manhattan(pos, self.spec.flag(team.opponent())) <= self.spec.params.capture_range
    }

    /// Simulate one match from both spawns.
    pub fn run<PA, PB>(&self, seed: u64, policy_a: &mut PA, policy_b: &mut PB) -> GameLog
    where
        PA: Policy + ?Sized,
        PB: Policy + ?Sized,
    {
        let mut pos_a = self.spec.spawn(Team::A);
        let mut pos_b = self.spec.spawn(Team::B);
        let max_turns = self.spec.rules.max_turns;
        let deadlock_repeat = self.spec.params.deadlock_repeat;

        let mut trace = Vec::new();
        let mut state_hashes = Vec::new();
        let mut events = Vec::new();
        let mut hash_count: FxHashMap<String, u32> = FxHashMap::default();

        let mut outcome = (None, TerminalReason::Timeout, max_turns);
        for turn in 1..=max_turns {
            let obs_a = self.observation(Team::A, turn, pos_a, pos_b);
            let obs_b = self.observation(Team::B, turn, pos_a, pos_b);
            let action_a = policy_a.act(&obs_a);
            let action_b = policy_b.act(&obs_b);

            let move_a = self.attempt_move(pos_a, action_a);
            let move_b = self.attempt_move(pos_b, action_b);
            if !move_a.valid {
                events.push(format!("turn={}:A_invalid_move:{}", turn, action_a));
            }
            if !move_b.valid {
                events.push(format!("turn={}:B_invalid_move:{}", turn, action_b));
            }
            pos_a = move_a.pos;
            pos_b = move_b.pos;
            trace.push(format!("A:{}|B:{}", action_a, action_b));

            let hash = state_hash(pos_a, pos_b);
            state_hashes.push(hash.clone());

            let a_captured = self.captures(Team::A, pos_a);
            let b_captured = self.captures(Team::B, pos_b);
            if a_captured && b_captured {
                outcome = (None, TerminalReason::Draw, turn);
                break;
            }
            if a_captured || b_captured {
                let winner = if a_captured { Team::A } else { Team::B };
                outcome = (Some(winner), TerminalReason::Capture, turn);
                break;
            }

            let count = hash_count.entry(hash).or_insert(0);
            *count += 1;
            if *count >= deadlock_repeat {
                outcome = (None, TerminalReason::Deadlock, turn);
                break;
            }
        }

        let (winner, terminal_reason, turns) = outcome;
        debug!(
            seed,
            policy_a = policy_a.name(),
            policy_b = policy_b.name(),
            reason = %terminal_reason,
            turns,
            "match finished"
        );
        GameLog {
            seed,
            policy_a: policy_a.name().to_string(),
            policy_b: policy_b.name().to_string(),
            winner,
            terminal_reason,
            turns,
            trace,
            state_hashes,
            events,
        }
    }

    /// Re-derive the state-hash sequence implied by an action trace.
    ///
    /// Tokens are parsed leniently; a malformed entry counts as `Stay` for
    /// both sides. The result is independent of any hashes stored in a log.
    pub fn replay_hashes(&self, trace: &[String]) -> Vec<String> {
        let mut pos_a = self.spec.spawn(Team::A);
        let mut pos_b = self.spec.spawn(Team::B);
        trace
            .iter()
            .map(|entry| {
                let (action_a, action_b) = parse_trace_entry(entry);
                pos_a = self.attempt_move(pos_a, action_a).pos;
                pos_b = self.attempt_move(pos_b, action_b).pos;
                state_hash(pos_a, pos_b)
            })
            .collect()
    }
}

/// Split `"A:<token>|B:<token>"` into both actions.
pub fn parse_trace_entry(entry: &str) -> (Action, Action) {
    let mut action_a = Action::Stay;
    let mut action_b = Action::Stay;
    for part in entry.split('|') {
        if let Some(token) = part.strip_prefix("A:") {
            action_a = Action::from_token(token);
        } else if let Some(token) = part.strip_prefix("B:") {
            action_b = Action::from_token(token);
        }
    }
    (action_a, action_b)
}
