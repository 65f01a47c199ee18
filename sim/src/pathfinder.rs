//! Breadth-first pathfinding over the walkable grid.
//!
//! Every call allocates its own visited/predecessor arrays, so searches for
//! different pedestrians never share state and can run concurrently against
//! the same read-only grid.
//!
//! ## Parallel Feature
//!
//! When compiled with `--features parallel`, [`find_paths`] spreads a batch
//! of requests over rayon's thread pool. Results come back in request order
//! either way.

use crate::terrain::{Cell, CityGrid};
use std::collections::VecDeque;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Shortest-step path from `start` to `goal`, both inclusive.
///
/// Neighbours are expanded in the grid's fixed adjacency order, so equal
/// length alternatives always resolve the same way. Returns an empty path if
/// the goal is unreachable or either endpoint is off the grid or not walkable.
pub fn find_path(grid: &CityGrid, start: Cell, goal: Cell) -> Vec<Cell> {
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return Vec::new();
    }
    let (Some(start_idx), Some(goal_idx)) = (grid.index_of(start), grid.index_of(goal)) else {
        return Vec::new();
    };

    let mut visited = vec![false; grid.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut frontier = VecDeque::new();

    visited[start_idx] = true;
    frontier.push_back(start_idx);

    while let Some(current) = frontier.pop_front() {
        if current == goal_idx {
            return reconstruct_path(grid, &came_from, goal_idx);
        }

        for &next in grid.neighbors(grid.cell_from_index(current)) {
            let Some(next_idx) = grid.index_of(next) else { continue };
            if visited[next_idx] {
                continue;
            }
            visited[next_idx] = true;
            came_from[next_idx] = Some(current);
            frontier.push_back(next_idx);
        }
    }

    Vec::new()
}

fn reconstruct_path(grid: &CityGrid, came_from: &[Option<usize>], goal_idx: usize) -> Vec<Cell> {
    let mut current = goal_idx;
    let mut path = vec![grid.cell_from_index(current)];
    while let Some(prev) = came_from[current] {
        current = prev;
        path.push(grid.cell_from_index(current));
    }
    path.reverse();
    path
}

/// Solve a batch of `(start, goal)` requests, returning paths in request order.
pub fn find_paths(grid: &CityGrid, requests: &[(Cell, Cell)]) -> Vec<Vec<Cell>> {
    #[cfg(feature = "parallel")]
    {
        requests
            .par_iter()
            .map(|&(start, goal)| find_path(grid, start, goal))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        requests
            .iter()
            .map(|&(start, goal)| find_path(grid, start, goal))
            .collect()
    }
}
