//! Occupancy index for pedestrian perception.
//!
//! Maps grid cells to the visible pedestrians standing in them. Gives O(1)
//! "is anyone ahead of me" checks and O(k) radius queries where k is the
//! number of pedestrians in nearby cells, rather than O(n) for brute force.
//!
//! The index is rebuilt from component state at the start of every tick and
//! then updated in place as each pedestrian commits a move, so pedestrians
//! processed later in the tick see earlier movers at their new positions.

use crate::components::{PedestrianId, Position, Presence};
use crate::terrain::Cell;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Cell-keyed index of visible pedestrians.
#[derive(Resource, Debug, Default)]
pub struct OccupancyIndex {
    /// Map from cell to the pedestrians standing in it.
    cells: HashMap<Cell, Vec<OccupancyEntry>>,
    /// Reverse lookup: pedestrian to cell.
    pedestrian_cells: HashMap<u32, Cell>,
}

/// Entry in an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyEntry {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl OccupancyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all entries (call before rebuilding).
    pub fn clear(&mut self) {
        self.cells.clear();
        self.pedestrian_cells.clear();
    }

    /// Insert or move a pedestrian to a position.
    pub fn insert(&mut self, id: u32, x: f32, y: f32) {
        let cell = Cell::containing(x, y);

        if let Some(old_cell) = self.pedestrian_cells.insert(id, cell) {
            if let Some(entries) = self.cells.get_mut(&old_cell) {
                entries.retain(|e| e.id != id);
                if entries.is_empty() {
                    self.cells.remove(&old_cell);
                }
            }
        }

        self.cells
            .entry(cell)
            .or_default()
            .push(OccupancyEntry { id, x, y });
    }

    /// Remove a pedestrian from the index.
    pub fn remove(&mut self, id: u32) {
        if let Some(cell) = self.pedestrian_cells.remove(&id) {
            if let Some(entries) = self.cells.get_mut(&cell) {
                entries.retain(|e| e.id != id);
                if entries.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Pedestrians standing in a cell.
    pub fn occupants(&self, cell: Cell) -> &[OccupancyEntry] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        !self.occupants(cell).is_empty()
    }

    /// Whether someone other than `id` stands in `cell`.
    pub fn is_occupied_by_other(&self, cell: Cell, id: u32) -> bool {
        self.occupants(cell).iter().any(|e| e.id != id)
    }

    /// Cell a pedestrian is indexed under.
    pub fn cell_of(&self, id: u32) -> Option<Cell> {
        self.pedestrian_cells.get(&id).copied()
    }

    /// All entries within `radius` of a point, closest first (ties by id).
    pub fn query_radius(&self, x: f32, y: f32, radius: f32) -> Vec<OccupancyEntry> {
        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        let within = |entry: &&OccupancyEntry| (entry.x - x).powi(2) + (entry.y - y).powi(2) <= radius_sq;

        // Scan the occupied cells directly once the window would cover more cells than are indexed.
        let reach = radius.ceil() + 1.0;
        let window = (2.0 * reach + 1.0).powi(2);
        let mut results: Vec<OccupancyEntry> = if window > self.cells.len() as f32 {
            self.cells.values().flatten().filter(within).copied().collect()
        } else {
            let reach = reach as i32;
            let center = Cell::containing(x, y);
            let mut found = Vec::new();
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    found.extend(self.occupants(center.offset(dx, dy)).iter().filter(within).copied());
                }
            }
            found
        };

        results.sort_by(|a, b| {
            let dist_a = (a.x - x).powi(2) + (a.y - y).powi(2);
            let dist_b = (b.x - x).powi(2) + (b.y - y).powi(2);
            dist_a
                .partial_cmp(&dist_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        results
    }

    /// Ids of other pedestrians within `radius` of `id` at `(x, y)`.
    pub fn neighbors_of(&self, id: u32, x: f32, y: f32, radius: f32) -> Vec<u32> {
        self.query_radius(x, y, radius)
            .into_iter()
            .filter(|e| e.id != id)
            .map(|e| e.id)
            .collect()
    }

    /// Number of indexed pedestrians.
    pub fn total_count(&self) -> usize {
        self.pedestrian_cells.len()
    }
}

/// System that rebuilds the occupancy index from visible pedestrians.
pub fn occupancy_rebuild_system(
    mut index: ResMut<OccupancyIndex>,
    query: Query<(&PedestrianId, &Position, &Presence)>,
) {
    index.clear();

    for (id, pos, presence) in query.iter() {
        if !presence.is_visible() {
            continue;
        }
        index.insert(id.0, pos.x, pos.y);
    }
}
