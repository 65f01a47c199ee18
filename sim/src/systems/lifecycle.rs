//! Lifecycle systems - reappearance, path recalculation and population counts.

use crate::components::*;
use crate::config::SimConfig;
use crate::pathfinder::find_paths;
use crate::resources::{SimRng, SimStats, SimTick};
use crate::spatial::OccupancyIndex;
use crate::terrain::{Cell, CityGrid};
use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::{debug, warn};

/// Pick a spawn cell, preferring unoccupied ones.
///
/// Falls back to any spawn cell when all are taken. Returns `None` only if
/// the grid has no spawn cells at all.
pub fn choose_spawn_cell<R: Rng + ?Sized>(
    grid: &CityGrid,
    occupancy: &OccupancyIndex,
    rng: &mut R,
) -> Option<Cell> {
    let spawns = grid.spawn_cells();
    if spawns.is_empty() {
        return None;
    }

    let free: Vec<Cell> = spawns
        .iter()
        .copied()
        .filter(|c| !occupancy.is_occupied(*c))
        .collect();
    if free.is_empty() {
        debug!(spawn_cells = spawns.len(), "all spawn cells occupied, sharing one");
        return Some(spawns[rng.random_range(0..spawns.len())]);
    }
    Some(free[rng.random_range(0..free.len())])
}

/// System that brings hidden pedestrians back once their wait is over.
///
/// A returning pedestrian gets a new goal different from the cell it stands
/// on and requests a fresh path. If the grid offers no such goal the
/// pedestrian stays hidden for another wait.
pub fn reappearance_system(
    tick: Res<SimTick>,
    config: Res<SimConfig>,
    grid: Res<CityGrid>,
    mut rng: ResMut<SimRng>,
    mut stats: ResMut<SimStats>,
    mut query: Query<(
        Entity,
        &PedestrianId,
        &Position,
        &mut Goal,
        &mut Route,
        &mut Motion,
        &mut Presence,
    )>,
) {
    let now = tick.0;
    let mut due: Vec<(PedestrianId, Entity)> = query
        .iter()
        .filter(|item| item.6.is_due(now))
        .map(|item| (*item.1, item.0))
        .collect();
    if due.is_empty() {
        return;
    }
    due.sort_unstable();

    for (_, entity) in due {
        let Ok((_, id, position, mut goal, mut route, mut motion, mut presence)) =
            query.get_mut(entity)
        else {
            continue;
        };

        let current = position.cell();
        match grid.random_goal(&mut rng.0, Some(current)) {
            Some(next_goal) => {
                goal.0 = next_goal;
                *route = Route::default();
                motion.stuck_ticks = 0;
                motion.needs_recalc = true;
                motion.able_to_move = true;
                *presence = Presence::Visible;
                stats.reappearances += 1;
            }
            None => {
                let delay = config
                    .reappear_base_delay
                    .saturating_add(rng.0.random_range(0..=config.reappear_jitter));
                *presence = Presence::AtGoal {
                    reappear_tick: now.saturating_add(delay.max(1)),
                };
                warn!(id = id.0, cell = ?current, "no distinct goal available, staying hidden");
            }
        }
    }
}

/// System that replaces the route of every visible pedestrian that asked for one.
///
/// Requests are solved as one batch (in parallel with the `parallel`
/// feature) and applied in ascending id order.
pub fn path_recalculation_system(
    grid: Res<CityGrid>,
    mut stats: ResMut<SimStats>,
    mut query: Query<(
        Entity,
        &PedestrianId,
        &Position,
        &Goal,
        &mut Route,
        &mut Motion,
        &Presence,
    )>,
) {
    let mut pending: Vec<(PedestrianId, Entity, Cell, Cell)> = query
        .iter()
        .filter(|item| item.6.is_visible() && item.5.needs_recalc)
        .map(|item| (*item.1, item.0, item.2.cell(), item.3.0))
        .collect();
    if pending.is_empty() {
        return;
    }
    pending.sort_unstable_by_key(|p| p.0);

    let requests: Vec<(Cell, Cell)> = pending.iter().map(|p| (p.2, p.3)).collect();
    let paths = find_paths(&grid, &requests);

    for ((id, entity, start, goal), path) in pending.into_iter().zip(paths) {
        let Ok((.., mut route, mut motion, _)) = query.get_mut(entity) else {
            continue;
        };
        if path.is_empty() {
            debug!(id = id.0, ?start, ?goal, "goal unreachable, walking without a route");
            stats.unreachable_paths += 1;
        }
        *route = Route::new(path, start);
        motion.needs_recalc = false;
        stats.recalculations += 1;
    }
}

/// System that records how many pedestrians are walking and how many are hidden.
pub fn population_stats_system(mut stats: ResMut<SimStats>, query: Query<&Presence>) {
    let (visible, hidden) = query.iter().fold((0u32, 0u32), |(v, h), presence| {
        if presence.is_visible() {
            (v + 1, h)
        } else {
            (v, h + 1)
        }
    });
    stats.visible = visible;
    stats.hidden = hidden;
}
