//! City grid - terrain classification and walkable adjacency.
//!
//! The grid is built once at setup and never changes afterwards. Each cell
//! has exactly one terrain type; walkability, goal and spawn flags are derived
//! from it. Walkable neighbours of every cell are cached at construction so
//! the pathfinder and the decision engine never recompute them.
//!
//! Cell centers sit on integer coordinates: a continuous position `(x, y)`
//! belongs to cell `(round(x), round(y))`.

use crate::error::{Result, SimError};
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Terrain type of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    /// Building entrance - pedestrians appear here and walk towards one.
    Door,
    /// Pavement.
    Sidewalk,
    /// Pedestrian crossing over a road.
    Crossing,
    /// Building interior or wall.
    Building,
    /// Carriageway - pedestrians only cross it at crossings.
    Road,
}

impl Default for TerrainType {
    fn default() -> Self {
        Self::Sidewalk
    }
}

impl TerrainType {
    /// Whether pedestrians may stand on and walk through this terrain.
    pub fn is_walkable(&self) -> bool {
        matches!(
            self,
            TerrainType::Door | TerrainType::Sidewalk | TerrainType::Crossing
        )
    }

    pub fn is_obstacle(&self) -> bool {
        !self.is_walkable()
    }

    /// Whether pedestrians can be sent here as a destination.
    pub fn is_goal(&self) -> bool {
        matches!(self, TerrainType::Door)
    }

    /// Whether pedestrians can be created here.
    pub fn is_spawn(&self) -> bool {
        matches!(self, TerrainType::Door)
    }

    /// Map symbol for this terrain.
    pub fn symbol(&self) -> char {
        match self {
            TerrainType::Door => 'D',
            TerrainType::Sidewalk => 'S',
            TerrainType::Crossing => 'C',
            TerrainType::Building => 'B',
            TerrainType::Road => 'R',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'D' => Some(TerrainType::Door),
            'S' => Some(TerrainType::Sidewalk),
            'C' => Some(TerrainType::Crossing),
            'B' => Some(TerrainType::Building),
            'R' => Some(TerrainType::Road),
            _ => None,
        }
    }
}

/// Integer grid coordinates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Cell containing a continuous position.
    #[inline]
    pub fn containing(x: f32, y: f32) -> Self {
        Self::new(x.round() as i32, y.round() as i32)
    }

    /// Continuous coordinates of the cell center.
    pub fn center(&self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

/// Neighbourhood used for adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Orthogonal neighbours only.
    Four,
    /// Orthogonal and diagonal neighbours.
    #[default]
    Eight,
}

/// Neighbour offsets in heading order: 0, 90, 180, 270 degrees.
static ORTHOGONAL: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
/// Diagonal offsets in heading order: 45, 135, 225, 315 degrees.
static DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

impl Connectivity {
    /// Neighbour offsets in expansion order.
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> {
        let diagonals: &'static [(i32, i32)] = match self {
            Connectivity::Four => &[],
            Connectivity::Eight => &DIAGONAL,
        };
        ORTHOGONAL.iter().chain(diagonals.iter()).copied()
    }
}

/// Immutable city grid with cached adjacency and goal/spawn indexes.
#[derive(Resource, Debug, Clone)]
pub struct CityGrid {
    width: usize,
    height: usize,
    connectivity: Connectivity,
    /// Terrain per cell (row-major order).
    cells: Vec<TerrainType>,
    /// Walkable neighbours per cell, in expansion order.
    neighbors: Vec<Vec<Cell>>,
    goal_cells: Vec<Cell>,
    spawn_cells: Vec<Cell>,
}

impl CityGrid {
    /// Build a grid from rows of terrain (row index = y).
    ///
    /// Fails if no row has any cells, or the rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<TerrainType>>, connectivity: Connectivity) -> Result<Self> {
        let Some(width) = rows.iter().map(Vec::len).find(|&len| len > 0) else {
            return Err(SimError::EmptyMap);
        };
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(SimError::MalformedMap {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
        }
        let height = rows.len();
        let cells: Vec<TerrainType> = rows.into_iter().flatten().collect();
        Ok(Self::from_cells(width, height, cells, connectivity))
    }

    /// A grid of a single terrain type.
    pub fn filled(width: usize, height: usize, terrain: TerrainType, connectivity: Connectivity) -> Self {
        Self::from_cells(width, height, vec![terrain; width * height], connectivity)
    }

    fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<TerrainType>,
        connectivity: Connectivity,
    ) -> Self {
        let mut grid = Self {
            width,
            height,
            connectivity,
            cells,
            neighbors: Vec::new(),
            goal_cells: Vec::new(),
            spawn_cells: Vec::new(),
        };

        let mut neighbors = Vec::with_capacity(grid.cells.len());
        for index in 0..grid.cells.len() {
            let cell = grid.cell_from_index(index);
            let walkable: Vec<Cell> = connectivity
                .offsets()
                .map(|(dx, dy)| cell.offset(dx, dy))
                .filter(|n| grid.is_walkable(*n))
                .collect();
            neighbors.push(walkable);

            let terrain = grid.cells[index];
            if terrain.is_goal() {
                grid.goal_cells.push(cell);
            }
            if terrain.is_spawn() {
                grid.spawn_cells.push(cell);
            }
        }
        grid.neighbors = neighbors;
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Row-major index of a cell, `None` if off-grid.
    #[inline]
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.y as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    pub fn cell_from_index(&self, index: usize) -> Cell {
        Cell::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Terrain at a cell, `None` if off-grid.
    pub fn terrain(&self, cell: Cell) -> Option<TerrainType> {
        self.index_of(cell).map(|i| self.cells[i])
    }

    /// Whether a cell is on the grid and walkable.
    #[inline]
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.terrain(cell).is_some_and(|t| t.is_walkable())
    }

    /// Cached walkable neighbours of a cell (empty if off-grid).
    pub fn neighbors(&self, cell: Cell) -> &[Cell] {
        self.index_of(cell)
            .map(|i| self.neighbors[i].as_slice())
            .unwrap_or(&[])
    }

    /// All goal cells, in row-major order.
    pub fn goal_cells(&self) -> &[Cell] {
        &self.goal_cells
    }

    /// All spawn cells, in row-major order.
    pub fn spawn_cells(&self) -> &[Cell] {
        &self.spawn_cells
    }

    /// Pick a random goal cell other than `exclude`.
    ///
    /// Returns `None` when no such cell exists.
    pub fn random_goal<R: Rng + ?Sized>(&self, rng: &mut R, exclude: Option<Cell>) -> Option<Cell> {
        let candidates = self
            .goal_cells
            .iter()
            .filter(|c| Some(**c) != exclude)
            .count();
        if candidates == 0 {
            return None;
        }
        let pick = rng.random_range(0..candidates);
        self.goal_cells
            .iter()
            .filter(|c| Some(**c) != exclude)
            .nth(pick)
            .copied()
    }

    /// Count cells of each terrain type.
    pub fn count(&self, terrain: TerrainType) -> usize {
        self.cells.iter().filter(|t| **t == terrain).count()
    }
}

/// Static terrain layout for a renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    /// One string of map symbols per row.
    pub rows: Vec<String>,
}

impl GridSnapshot {
    pub fn from_grid(grid: &CityGrid) -> Self {
        let rows = grid
            .cells
            .chunks(grid.width)
            .map(|row| row.iter().map(TerrainType::symbol).collect())
            .collect();
        Self {
            width: grid.width,
            height: grid.height,
            rows,
        }
    }
}
