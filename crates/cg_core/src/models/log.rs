use serde::{Deserialize, Serialize};
use std::fmt;

use super::spec::Team;

/// How a match ended.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Exactly one team reached the opposing flag.
    Capture,
    /// Both teams reached the opposing flag on the same turn.
    Draw,
    /// A joint position repeated `deadlock_repeat` times.
    Deadlock,
    /// `max_turns` elapsed without a terminal event.
    Timeout,
}

impl TerminalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalReason::Capture => "capture",
            TerminalReason::Draw => "draw",
            TerminalReason::Deadlock => "deadlock",
            TerminalReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One simulated match. Created once by the simulator and never mutated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GameLog {
    pub seed: u64,
    pub policy_a: String,
    pub policy_b: String,
    pub winner: Option<Team>,
    pub terminal_reason: TerminalReason,
    pub turns: u32,
    /// `"A:<action>|B:<action>"` per turn
    pub trace: Vec<String>,
    pub state_hashes: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

impl GameLog {
    /// Policy name playing the given side.
    pub fn policy(&self, team: Team) -> &str {
        match team {
            Team::A => &self.policy_a,
            Team::B => &self.policy_b,
        }
    }

    /// Fields that must match between two runs of the same configuration.
    pub fn replay_key(&self) -> ReplayKey<'_> {
        ReplayKey {
            seed: self.seed,
            policy_a: &self.policy_a,
            policy_b: &self.policy_b,
            winner: self.winner,
            terminal_reason: self.terminal_reason,
            turns: self.turns,
            trace: &self.trace,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ReplayKey<'a> {
    pub seed: u64,
    pub policy_a: &'a str,
    pub policy_b: &'a str,
    pub winner: Option<Team>,
    pub terminal_reason: TerminalReason,
    pub turns: u32,
    pub trace: &'a [String],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameLog {
        GameLog {
            seed: 7,
            policy_a: "camper".to_string(),
            policy_b: "blocker".to_string(),
            winner: None,
            terminal_reason: TerminalReason::Deadlock,
            turns: 6,
            trace: vec!["A:Stay|B:Stay".to_string(); 6],
            state_hashes: vec!["abc".to_string(); 6],
            events: vec![],
        }
    }

    #[test]
    fn test_log_json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["terminal_reason"], "deadlock");
        assert!(value["winner"].is_null());
        assert_eq!(value["trace"][0], "A:Stay|B:Stay");
    }

    #[test]
    fn test_replay_key_ignores_hashes_and_events() {
        let a = sample();
        let mut b = sample();
        b.state_hashes.clear();
        b.events.push("turn=1:A_invalid_move:U".to_string());
        assert_eq!(a.replay_key(), b.replay_key());

        b.trace[0] = "A:U|B:Stay".to_string();
        assert_ne!(a.replay_key(), b.replay_key());
    }

    #[test]
    fn test_policy_by_side() {
        let log = sample();
        assert_eq!(log.policy(Team::A), "camper");
        assert_eq!(log.policy(Team::B), "blocker");
    }
}
