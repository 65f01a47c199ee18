//! Decision engine - picks each pedestrian's heading and speed for the tick.
//!
//! Runs once per visible pedestrian per tick, immediately before that
//! pedestrian's movement is executed. The implicit state is re-derived every
//! tick from what the pedestrian perceives one cell ahead:
//!
//! - **FollowingPath**: the way ahead is clear, walk along the route.
//! - **AvoidingObstacle**: a wall or the grid edge is ahead; back off and turn.
//! - **AvoidingAgent**: another pedestrian is ahead; try to sidestep.
//! - **Stuck**: no sidestep worked, or patience ran out and an escape was forced.

use crate::components::{
    direction, heading_towards, normalize_degrees, Personality, Position, Walker,
};
use crate::config::SimConfig;
use crate::resources::SimStats;
use crate::spatial::OccupancyIndex;
use crate::terrain::{Cell, CityGrid};
use rand::rngs::StdRng;
use rand::Rng;

/// Sidestep angles tried, in order, before a random one.
const SIDESTEP_ANGLES: [f32; 2] = [30.0, -30.0];
/// Avoidance areas below this count as zero density.
const MIN_DENSITY_AREA: f32 = 1e-6;

/// Everything one pedestrian's tick needs besides its own state.
pub struct StepContext<'a> {
    pub grid: &'a CityGrid,
    pub occupancy: &'a mut OccupancyIndex,
    pub rng: &'a mut StdRng,
    pub stats: &'a mut SimStats,
    pub config: &'a SimConfig,
    pub tick: u64,
}

/// What a pedestrian sees one cell ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perception {
    Clear,
    /// Off-grid or non-walkable terrain.
    FixedObstacle,
    /// Another visible pedestrian stands there.
    AgentAhead,
}

/// Behaviour chosen for the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    FollowingPath,
    AvoidingObstacle,
    AvoidingAgent,
    Stuck,
}

/// Cell one unit ahead along `heading`.
#[inline]
pub fn cell_ahead(position: &Position, heading: f32) -> Cell {
    position.ahead(heading, 1.0).cell()
}

/// Classify the cell one unit ahead of a pedestrian.
pub fn perceive(
    grid: &CityGrid,
    occupancy: &OccupancyIndex,
    id: u32,
    position: &Position,
    heading: f32,
) -> Perception {
    let ahead = cell_ahead(position, heading);
    if !grid.is_walkable(ahead) {
        Perception::FixedObstacle
    } else if occupancy.is_occupied_by_other(ahead, id) {
        Perception::AgentAhead
    } else {
        Perception::Clear
    }
}

/// Speed after slowing down for `neighbor_count` pedestrians in the avoidance area.
///
/// Never exceeds one cell per tick or the desired speed, never negative.
pub fn density_speed(personality: &Personality, neighbor_count: usize) -> f32 {
    let density = if personality.avoidance_area < MIN_DENSITY_AREA {
        0.0
    } else {
        personality.density_sensitivity * neighbor_count as f32 / personality.avoidance_area
    };
    (personality.desired_speed.min(1.0) * (1.0 - density).max(0.0)).max(0.0)
}

/// Decide heading and speed for one pedestrian.
pub fn decide(walker: &mut Walker, ctx: &mut StepContext) -> Maneuver {
    walker.motion.able_to_move = true;

    if walker.cell() == walker.goal {
        walker.speed = 0.0;
        walker.motion.able_to_move = false;
        return Maneuver::FollowingPath;
    }

    select_heading(walker);

    let mut maneuver = match perceive(
        ctx.grid,
        &*ctx.occupancy,
        walker.id,
        &walker.position,
        walker.heading,
    ) {
        Perception::Clear => Maneuver::FollowingPath,
        Perception::FixedObstacle => {
            avoid_obstacle(walker, ctx);
            Maneuver::AvoidingObstacle
        }
        Perception::AgentAhead => {
            if sidestep(walker, ctx) {
                Maneuver::AvoidingAgent
            } else {
                Maneuver::Stuck
            }
        }
    };

    if walker.motion.able_to_move {
        walk_freely(walker, ctx);
    }

    if walker.motion.stuck_ticks > walker.personality.patience {
        force_escape(walker, ctx);
        maneuver = Maneuver::Stuck;
    }

    maneuver
}

/// Face the next route cell, or the goal once the route is used up.
fn select_heading(walker: &mut Walker) {
    let current = walker.cell();
    walker.route.skip_reached(current);

    match walker.route.next_cell() {
        Some(next) => {
            walker.heading = heading_towards(&walker.position, &Position::at_cell(next));
        }
        None => {
            walker.heading = heading_towards(&walker.position, &Position::at_cell(walker.goal));
            if current != walker.goal {
                walker.motion.needs_recalc = true;
            }
        }
    }
}

fn avoid_obstacle(walker: &mut Walker, ctx: &mut StepContext) {
    walker.speed = 0.0;

    let back = walker.position.ahead(walker.heading, -1.0);
    if ctx.grid.is_walkable(back.cell()) && !ctx.occupancy.is_occupied_by_other(back.cell(), walker.id) {
        walker.position = back;
        ctx.occupancy.insert(walker.id, back.x, back.y);
    }

    let turn: f32 = ctx.rng.random_range(30.0..150.0);
    walker.heading = normalize_degrees(walker.heading + turn);
    walker.motion.needs_recalc = true;
    walker.motion.stuck_ticks += 1;
    walker.neighbors.clear();
    walker.motion.able_to_move = false;
}

/// Try to turn around a pedestrian standing ahead. Returns whether a clear
/// heading was found.
fn sidestep(walker: &mut Walker, ctx: &mut StepContext) -> bool {
    let original = walker.heading;

    for offset in SIDESTEP_ANGLES {
        let candidate = normalize_degrees(original + offset);
        if is_clear(walker, candidate, ctx) {
            walker.heading = candidate;
            return true;
        }
    }

    let offset = ctx.rng.random_range(-90i32..=90) as f32;
    let candidate = normalize_degrees(original + offset);
    if is_clear(walker, candidate, ctx) {
        walker.heading = candidate;
        return true;
    }

    walker.heading = original;
    walker.speed = 0.0;
    walker.motion.stuck_ticks += 1;
    walker.motion.able_to_move = false;
    false
}

fn is_clear(walker: &Walker, heading: f32, ctx: &StepContext) -> bool {
    perceive(ctx.grid, &*ctx.occupancy, walker.id, &walker.position, heading) == Perception::Clear
}

fn walk_freely(walker: &mut Walker, ctx: &mut StepContext) {
    let wiggle = walker.personality.wiggle_angle;
    if wiggle > 0.0 {
        let jitter: f32 = ctx.rng.random_range(-wiggle..=wiggle);
        walker.heading = normalize_degrees(walker.heading + jitter);
    }

    walker.neighbors = ctx.occupancy.neighbors_of(
        walker.id,
        walker.position.x,
        walker.position.y,
        walker.personality.avoidance_radius,
    );
    walker.speed = density_speed(&walker.personality, walker.neighbors.len());
    walker.motion.stuck_ticks = 0;
}

/// Break a standstill: turn by a non-zero angle of at most 90 degrees and
/// take one step if the cell ahead is walkable.
fn force_escape(walker: &mut Walker, ctx: &mut StepContext) {
    let magnitude = ctx.rng.random_range(1i32..=90) as f32;
    let turn = if ctx.rng.random_bool(0.5) {
        magnitude
    } else {
        -magnitude
    };
    walker.heading = normalize_degrees(walker.heading + turn);

    let (dx, dy) = direction(walker.heading);
    let step = Position::new(walker.position.x + dx, walker.position.y + dy);
    if ctx.grid.is_walkable(step.cell()) {
        walker.position = step;
        ctx.occupancy.insert(walker.id, step.x, step.y);
        walker.route.skip_reached(step.cell());
    }

    walker.motion.needs_recalc = true;
    walker.motion.stuck_ticks = 0;
    ctx.stats.stuck_escapes += 1;
}
