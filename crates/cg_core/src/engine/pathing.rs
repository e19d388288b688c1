//! Grid queries: passability, BFS shortest path, nearest open cell.
//!
//! Neighbour order is fixed to U, D, L, R. Both searches are breadth-first
//! and return the first hit in that expansion order, so ties between equally
//! short routes (or equally near cells) always resolve the same way.

use pathfinding::prelude::bfs;

use crate::models::{Coord, GameSpec, MapSpec};

/// Unit steps in expansion order: U, D, L, R.
pub const NEIGHBOR_OFFSETS: [Coord; 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Dense passability grid built once per spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    w: i32,
    h: i32,
    blocked: Vec<bool>,
}

impl Grid {
    pub fn from_map(map: &MapSpec) -> Self {
        let w = map.w.max(0);
        let h = map.h.max(0);
        let cells = (w as usize).saturating_mul(h as usize);
        let mut grid = Self {
            w,
            h,
            blocked: vec![false; cells],
        };
        for &wall in &map.walls {
            if grid.in_bounds(wall) {
                let idx = grid.index(wall);
                grid.blocked[idx] = true;
            }
        }
        grid
    }

    /// Row-major cell index; `pos` must be in bounds.
    #[inline]
    fn index(&self, pos: Coord) -> usize {
        pos.1 as usize * self.w as usize + pos.0 as usize
    }

    pub fn from_spec(spec: &GameSpec) -> Self {
        Self::from_map(&spec.map)
    }

    #[inline]
    pub fn in_bounds(&self, pos: Coord) -> bool {
        pos.0 >= 0 && pos.0 < self.w && pos.1 >= 0 && pos.1 < self.h
    }

    #[inline]
    pub fn is_wall(&self, pos: Coord) -> bool {
        self.in_bounds(pos) && self.blocked[self.index(pos)]
    }

    /// In bounds and not a wall.
    #[inline]
    pub fn is_open(&self, pos: Coord) -> bool {
        self.in_bounds(pos) && !self.blocked[self.index(pos)]
    }

    /// In-bounds 4-neighbours, walls included.
    pub fn neighbors(&self, pos: Coord) -> impl Iterator<Item = Coord> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |d| (pos.0 + d.0, pos.1 + d.1))
            .filter(move |&p| self.in_bounds(p))
    }

    /// Passable 4-neighbours.
    pub fn open_neighbors(&self, pos: Coord) -> impl Iterator<Item = Coord> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |d| (pos.0 + d.0, pos.1 + d.1))
            .filter(move |&p| self.is_open(p))
    }

    /// Shortest path `start..=goal` over open cells.
    ///
    /// `[start]` when already there, empty when unreachable.
    pub fn shortest_path(&self, start: Coord, goal: Coord) -> Vec<Coord> {
        bfs(&start, |&p| self.open_neighbors(p), |&p| p == goal).unwrap_or_default()
    }

    /// Step count of the shortest path, `None` when unreachable.
    pub fn shortest_distance(&self, start: Coord, goal: Coord) -> Option<usize> {
        let path = self.shortest_path(start, goal);
        if path.is_empty() {
            None
        } else {
            Some(path.len() - 1)
        }
    }

    /// `target` itself when open; otherwise the first open cell reached by a
    /// BFS from `target` that expands only through walls.
    ///
    /// The result is deterministic but not necessarily the geometrically
    /// nearest cell when several are equidistant.
    pub fn nearest_open(&self, target: Coord) -> Option<Coord> {
        bfs(
            &target,
            |&p| self.neighbors(p).collect::<Vec<_>>(),
            |&p| self.is_open(p),
        )
        .and_then(|path| path.last().copied())
    }
}
