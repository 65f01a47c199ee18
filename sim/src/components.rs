//! ECS Components for the crowd simulation.
//!
//! Components are pure data containers attached to pedestrian entities.
//! All behaviour lives in the systems that query them.

use crate::config::SimConfig;
use crate::terrain::Cell;
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Continuous position on the grid. Cell centers are at integer coordinates.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Center of a cell.
    pub fn at_cell(cell: Cell) -> Self {
        let (x, y) = cell.center();
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Cell this position lies in.
    #[inline]
    pub fn cell(&self) -> Cell {
        Cell::containing(self.x, self.y)
    }

    /// Position `distance` units along `heading` (negative walks backwards).
    pub fn ahead(&self, heading: f32, distance: f32) -> Self {
        let (dx, dy) = direction(heading);
        Self {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
        }
    }
}

/// Facing direction in degrees: 0 points along +y, 90 along +x.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading(pub f32);

/// Current walking speed in cells per tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Speed(pub f32);

/// Wrap an angle into `[0, 360)`.
#[inline]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit vector for a heading.
#[inline]
pub fn direction(heading: f32) -> (f32, f32) {
    let radians = heading.to_radians();
    (radians.sin(), radians.cos())
}

/// Heading that faces `to` from `from`.
pub fn heading_towards(from: &Position, to: &Position) -> f32 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    normalize_degrees(dx.atan2(dy).to_degrees())
}

// ============================================================================
// IDENTITY / PERSONALITY COMPONENTS
// ============================================================================

/// Unique pedestrian identifier, allocated from a monotonic counter.
#[derive(
    Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PedestrianId(pub u32);

/// Smallest radius used when deriving the avoidance area.
const MIN_AVOIDANCE_RADIUS: f32 = 0.1;

/// Behavioural parameters drawn once at creation and never changed.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Preferred speed (cells per tick).
    pub desired_speed: f32,
    /// Blocked ticks tolerated before a forced escape.
    pub patience: u32,
    /// How strongly local density slows this pedestrian.
    pub density_sensitivity: f32,
    /// Radius within which other pedestrians count as neighbours.
    pub avoidance_radius: f32,
    /// Derived: `PI * max(avoidance_radius, 0.1)^2`.
    pub avoidance_area: f32,
    /// Maximum per-tick random heading change (degrees).
    pub wiggle_angle: f32,
}

impl Personality {
    pub fn new(
        desired_speed: f32,
        patience: u32,
        density_sensitivity: f32,
        avoidance_radius: f32,
        wiggle_angle: f32,
    ) -> Self {
        let r = avoidance_radius.max(MIN_AVOIDANCE_RADIUS);
        Self {
            desired_speed,
            patience,
            density_sensitivity,
            avoidance_radius,
            avoidance_area: std::f32::consts::PI * r * r,
            wiggle_angle,
        }
    }

    /// Draw every parameter uniformly from the configured ranges.
    pub fn sample<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        Self::new(
            config.desired_speed.sample(rng),
            config.patience.sample(rng),
            config.density_sensitivity.sample(rng),
            config.avoidance_radius.sample(rng),
            config.wiggle_angle.sample(rng),
        )
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::new(1.0, 10, 0.5, 2.0, 10.0)
    }
}

// ============================================================================
// NAVIGATION COMPONENTS
// ============================================================================

/// Active path and the index of the next cell to walk to.
///
/// The cursor only moves forward within one path and never passes its end.
/// Recalculation replaces the whole route.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    path: Vec<Cell>,
    cursor: usize,
}

impl Route {
    /// Route along `path` for a pedestrian standing on `current`.
    pub fn new(path: Vec<Cell>, current: Cell) -> Self {
        let mut route = Self { path, cursor: 0 };
        route.skip_reached(current);
        route
    }

    pub fn path(&self) -> &[Cell] {
        &self.path
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cell at the cursor, if any remain.
    pub fn next_cell(&self) -> Option<Cell> {
        self.path.get(self.cursor).copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.path.len()
    }

    /// Advance the cursor past `current` if it is the cursor's target.
    pub fn advance_if_at(&mut self, current: Cell) -> bool {
        if self.next_cell() == Some(current) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Advance the cursor past every leading cell equal to `current`.
    pub fn skip_reached(&mut self, current: Cell) {
        while self.advance_if_at(current) {}
    }
}

/// Destination cell.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal(pub Cell);

/// Per-tick movement bookkeeping.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motion {
    /// Consecutive ticks spent blocked.
    pub stuck_ticks: u32,
    /// Request a fresh path before the next decision phase.
    pub needs_recalc: bool,
    /// Whether this tick's decision allows a step.
    pub able_to_move: bool,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            stuck_ticks: 0,
            needs_recalc: false,
            able_to_move: true,
        }
    }
}

/// Whether a pedestrian is walking or waiting at its goal.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    #[default]
    Visible,
    /// Hidden at its goal until `reappear_tick`.
    AtGoal { reappear_tick: u64 },
}

impl Presence {
    pub fn is_visible(&self) -> bool {
        matches!(self, Presence::Visible)
    }

    /// Hidden and due to reappear at `tick`.
    pub fn is_due(&self, tick: u64) -> bool {
        matches!(self, Presence::AtGoal { reappear_tick } if *reappear_tick <= tick)
    }
}

/// Ids of pedestrians inside the avoidance radius, as of the last decision.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors(pub Vec<u32>);

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete pedestrian entity.
#[derive(Bundle, Default)]
pub struct PedestrianBundle {
    pub id: PedestrianId,
    pub personality: Personality,
    pub position: Position,
    pub heading: Heading,
    pub speed: Speed,
    pub route: Route,
    pub goal: Goal,
    pub motion: Motion,
    pub presence: Presence,
    pub neighbors: Neighbors,
}

impl PedestrianBundle {
    pub fn new(id: u32, personality: Personality, cell: Cell, goal: Cell, path: Vec<Cell>) -> Self {
        let position = Position::at_cell(cell);
        let heading = heading_towards(&position, &Position::at_cell(goal));
        Self {
            id: PedestrianId(id),
            personality,
            position,
            heading: Heading(heading),
            speed: Speed(0.0),
            route: Route::new(path, cell),
            goal: Goal(goal),
            motion: Motion::default(),
            presence: Presence::Visible,
            neighbors: Neighbors::default(),
        }
    }
}

// ============================================================================
// WORKING COPY
// ============================================================================

/// Plain working copy of one pedestrian's components.
///
/// The step system copies components into a `Walker`, runs the decision
/// engine and movement executor on it, then writes the result back.
#[derive(Debug, Clone, PartialEq)]
pub struct Walker {
    pub id: u32,
    pub personality: Personality,
    pub position: Position,
    pub heading: f32,
    pub speed: f32,
    pub route: Route,
    pub goal: Cell,
    pub motion: Motion,
    pub presence: Presence,
    pub neighbors: Vec<u32>,
}

impl Walker {
    /// Fresh walker standing on `cell`, following `path` to `goal`.
    pub fn new(id: u32, personality: Personality, cell: Cell, goal: Cell, path: Vec<Cell>) -> Self {
        let bundle = PedestrianBundle::new(id, personality, cell, goal, path);
        Self {
            id,
            personality,
            position: bundle.position,
            heading: bundle.heading.0,
            speed: 0.0,
            route: bundle.route,
            goal,
            motion: Motion::default(),
            presence: Presence::Visible,
            neighbors: Vec::new(),
        }
    }

    #[inline]
    pub fn cell(&self) -> Cell {
        self.position.cell()
    }
}
