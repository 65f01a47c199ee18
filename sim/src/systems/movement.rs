//! Movement system - executes each pedestrian's decision and handles arrival.
//!
//! Pedestrians are processed one at a time in ascending id order. Each one
//! decides, moves and updates the occupancy index before the next one
//! decides, so later pedestrians see earlier movers at their new cells.

use crate::components::*;
use crate::config::SimConfig;
use crate::resources::{SimRng, SimStats, SimTick};
use crate::spatial::OccupancyIndex;
use crate::systems::decision::{cell_ahead, decide, StepContext};
use crate::terrain::CityGrid;
use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::debug;

/// Result of executing one pedestrian's move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Translated to a new position.
    Moved,
    /// The move would have crossed or ended on an obstacle and was aborted.
    Blocked,
    /// Not able to move, or zero speed.
    Idle,
    /// Standing on the goal; now hidden.
    Arrived,
}

/// Translate a pedestrian along its heading, then check for goal arrival.
pub fn advance(walker: &mut Walker, ctx: &mut StepContext) -> MoveOutcome {
    let mut outcome = MoveOutcome::Idle;
    if walker.motion.able_to_move && walker.speed > 0.0 {
        outcome = translate(walker, ctx);
    }

    if walker.cell() == walker.goal {
        arrive(walker, ctx);
        return MoveOutcome::Arrived;
    }
    outcome
}

fn translate(walker: &mut Walker, ctx: &mut StepContext) -> MoveOutcome {
    let destination = walker.position.ahead(walker.heading, walker.speed);

    // Steps longer than a cell must not jump over an obstacle.
    let crossing_ok =
        walker.speed <= 1.0 || ctx.grid.is_walkable(cell_ahead(&walker.position, walker.heading));
    if !crossing_ok || !ctx.grid.is_walkable(destination.cell()) {
        walker.speed = 0.0;
        walker.motion.needs_recalc = true;
        walker.motion.stuck_ticks += 1;
        ctx.stats.blocked_moves += 1;
        return MoveOutcome::Blocked;
    }

    walker.position = destination;
    ctx.occupancy
        .insert(walker.id, destination.x, destination.y);
    walker.route.advance_if_at(destination.cell());
    MoveOutcome::Moved
}

fn arrive(walker: &mut Walker, ctx: &mut StepContext) {
    let delay = ctx
        .config
        .reappear_base_delay
        .saturating_add(ctx.rng.random_range(0..=ctx.config.reappear_jitter));
    let reappear_tick = ctx.tick.saturating_add(delay);

    walker.speed = 0.0;
    walker.presence = Presence::AtGoal { reappear_tick };
    walker.neighbors.clear();
    ctx.occupancy.remove(walker.id);
    ctx.stats.record_arrival();

    debug!(id = walker.id, goal = ?walker.goal, reappear_tick, "pedestrian reached goal");
}

/// System that runs decision and movement for every visible pedestrian.
#[allow(clippy::type_complexity)]
pub fn pedestrian_step_system(
    tick: Res<SimTick>,
    config: Res<SimConfig>,
    grid: Res<CityGrid>,
    mut occupancy: ResMut<OccupancyIndex>,
    mut rng: ResMut<SimRng>,
    mut stats: ResMut<SimStats>,
    mut query: Query<(
        Entity,
        &PedestrianId,
        &Personality,
        &mut Position,
        &mut Heading,
        &mut Speed,
        &mut Route,
        &Goal,
        &mut Motion,
        &mut Presence,
        &mut Neighbors,
    )>,
) {
    let mut order: Vec<(PedestrianId, Entity)> = query
        .iter()
        .filter(|item| item.9.is_visible())
        .map(|item| (*item.1, item.0))
        .collect();
    order.sort_unstable();

    let mut ctx = StepContext {
        grid: &*grid,
        occupancy: &mut *occupancy,
        rng: &mut rng.0,
        stats: &mut *stats,
        config: &*config,
        tick: tick.0,
    };

    for (_, entity) in order {
        let Ok((
            _,
            id,
            personality,
            mut position,
            mut heading,
            mut speed,
            mut route,
            goal,
            mut motion,
            mut presence,
            mut neighbors,
        )) = query.get_mut(entity)
        else {
            continue;
        };

        let mut walker = Walker {
            id: id.0,
            personality: *personality,
            position: *position,
            heading: heading.0,
            speed: speed.0,
            route: std::mem::take(&mut *route),
            goal: goal.0,
            motion: *motion,
            presence: *presence,
            neighbors: std::mem::take(&mut neighbors.0),
        };

        decide(&mut walker, &mut ctx);
        advance(&mut walker, &mut ctx);

        *position = walker.position;
        heading.0 = walker.heading;
        speed.0 = walker.speed;
        *route = walker.route;
        *motion = walker.motion;
        *presence = walker.presence;
        neighbors.0 = walker.neighbors;
    }
}
