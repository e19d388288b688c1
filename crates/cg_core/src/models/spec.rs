//! GameSpec - the static game design under audit.
//!
//! Wire shape (JSON):
//!
//! ```text
//! {
//!   "meta":   {"name": "CTF10", "seed": 1337, "version": "0.1"},
//!   "map":    {"w": 10, "h": 10, "walls": [[x, y], ...], "flags": {"A": [x, y], "B": [x, y]}},
//!   "spawns": {"A": [x, y], "B": [x, y]},
//!   "rules":  {"max_turns": 60, "win": "capture_flag"},
//!   "params": {"move_cost": 1, "capture_range": 0, "deadlock_repeat": 6}
//! }
//! ```
//!
//! `x` is the column and `y` the row. Every transformation produces a new
//! `GameSpec`; nothing mutates a spec that another pass still reads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Grid cell as `(x, y)`.
pub type Coord = (i32, i32);

/// Manhattan distance between two cells.
#[inline]
pub fn manhattan(p: Coord, q: Coord) -> i32 {
    (p.0 - q.0).abs() + (p.1 - q.1).abs()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub const BOTH: [Team; 2] = [Team::A, Team::B];

    pub fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::A => "A",
            Team::B => "B",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per team, serialized as `{"A": .., "B": ..}`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub struct PerTeam<T> {
    #[serde(rename = "A")]
    pub a: T,
    #[serde(rename = "B")]
    pub b: T,
}

impl<T> PerTeam<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Team, &T)> {
        [(Team::A, &self.a), (Team::B, &self.b)].into_iter()
    }
}

impl<T> Index<Team> for PerTeam<T> {
    type Output = T;

    fn index(&self, team: Team) -> &T {
        match team {
            Team::A => &self.a,
            Team::B => &self.b,
        }
    }
}

impl<T> IndexMut<Team> for PerTeam<T> {
    fn index_mut(&mut self, team: Team) -> &mut T {
        match team {
            Team::A => &mut self.a,
            Team::B => &mut self.b,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct Meta {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_name() -> String {
    "CTF10".to_string()
}

fn default_seed() -> u64 {
    1337
}

fn default_version() -> String {
    "0.1".to_string()
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            version: default_version(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct MapSpec {
    pub w: i32,
    pub h: i32,
    #[serde(default)]
    pub walls: Vec<Coord>,
    pub flags: PerTeam<Coord>,
}

impl MapSpec {
    pub fn in_bounds(&self, pos: Coord) -> bool {
        pos.0 >= 0 && pos.0 < self.w && pos.1 >= 0 && pos.1 < self.h
    }

    /// Geometric center as floats; `(w/2, h/2)`.
    pub fn center(&self) -> (f64, f64) {
        (self.w as f64 / 2.0, self.h as f64 / 2.0)
    }

    /// Point reflection through the map center.
    pub fn mirror(&self, pos: Coord) -> Coord {
        (self.w - 1 - pos.0, self.h - 1 - pos.1)
    }

    /// Wall closest (Manhattan) to the map center; earliest in wall order on ties.
    pub fn center_wall(&self) -> Option<Coord> {
        let (cx, cy) = self.center();
        let dist = |p: &Coord| (p.0 as f64 - cx).abs() + (p.1 as f64 - cy).abs();
        self.walls
            .iter()
            .copied()
            .fold(None, |best: Option<Coord>, wall| match best {
                Some(b) if dist(&b) <= dist(&wall) => Some(b),
                _ => Some(wall),
            })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct Rules {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_win")]
    pub win: String,
}

fn default_max_turns() -> u32 {
    60
}

fn default_win() -> String {
    "capture_flag".to_string()
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            win: default_win(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct Params {
    #[serde(default = "default_move_cost")]
    pub move_cost: u32,
    #[serde(default)]
    pub capture_range: i32,
    #[serde(default = "default_deadlock_repeat")]
    pub deadlock_repeat: u32,
}

fn default_move_cost() -> u32 {
    1
}

fn default_deadlock_repeat() -> u32 {
    6
}

impl Default for Params {
    fn default() -> Self {
        Self {
            move_cost: default_move_cost(),
            capture_range: 0,
            deadlock_repeat: default_deadlock_repeat(),
        }
    }
}

/// Complete game design: map, spawns, rules, tunables.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct GameSpec {
    #[serde(default)]
    pub meta: Meta,
    pub map: MapSpec,
    pub spawns: PerTeam<Coord>,
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub params: Params,
}

impl GameSpec {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn flag(&self, team: Team) -> Coord {
        self.map.flags[team]
    }

    pub fn spawn(&self, team: Team) -> Coord {
        self.spawns[team]
    }

    /// Whether `pos` holds a flag or a spawn of either team.
    pub fn is_key_point(&self, pos: Coord) -> bool {
        Team::BOTH
            .iter()
            .any(|&t| self.map.flags[t] == pos || self.spawns[t] == pos)
    }
}
