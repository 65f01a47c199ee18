//! Public API for the simulation.
//!
//! `SimWorld` is the interface a driver (a renderer, a recorder, a test) uses
//! to build a simulation, advance it tick by tick and read its state.
//!
//! ## Determinism
//!
//! Pedestrians are processed in ascending id order and every random draw comes
//! from one seeded generator, so two worlds built from the same grid and
//! configuration produce identical snapshots tick for tick.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::map::{load_map, parse_map};
use crate::pathfinder::find_path;
use crate::resources::{SimRng, SimStats, SimTick};
use crate::spatial::{occupancy_rebuild_system, OccupancyIndex};
use crate::systems::*;
use crate::terrain::{Cell, CityGrid, GridSnapshot};
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use std::path::Path;
use tracing::{debug, info, trace};

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Building the simulation from a grid and configuration
/// - Stepping the simulation forward
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    next_id: u32,
}

impl SimWorld {
    /// Build a simulation on `grid` and populate it.
    ///
    /// Fails if the configuration is invalid or the grid has nowhere to spawn
    /// or nowhere to go. The grid's own connectivity is used for adjacency.
    pub fn setup(grid: CityGrid, config: SimConfig) -> Result<Self> {
        config.validate()?;
        if grid.spawn_cells().is_empty() {
            return Err(SimError::NoSpawnCells);
        }
        if grid.goal_cells().is_empty() {
            return Err(SimError::NoGoalCells);
        }

        let population = config.population;
        let seed = config.seed;
        let (width, height) = (grid.width(), grid.height());

        let mut world = World::new();
        world.insert_resource(SimTick(0));
        world.insert_resource(SimRng::from_seed(seed));
        world.insert_resource(SimStats::default());
        world.insert_resource(OccupancyIndex::new());
        world.insert_resource(grid);
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                occupancy_rebuild_system,
                pedestrian_step_system,
                reappearance_system,
                path_recalculation_system,
                population_stats_system,
            )
                .chain(),
        );

        let mut sim = Self {
            world,
            schedule,
            next_id: 0,
        };
        for _ in 0..population {
            sim.spawn_pedestrian();
        }

        info!(width, height, population, seed, "simulation ready");
        Ok(sim)
    }

    /// Parse a character map and build a simulation on it.
    pub fn from_map_str(map: &str, config: SimConfig) -> Result<Self> {
        let grid = parse_map(map, config.connectivity)?;
        Self::setup(grid, config)
    }

    /// Load a character map file and build a simulation on it.
    pub fn from_map_file(path: impl AsRef<Path>, config: SimConfig) -> Result<Self> {
        let grid = load_map(path, config.connectivity)?;
        Self::setup(grid, config)
    }

    /// Create one pedestrian with sampled personality on a spawn cell and
    /// send it to a random goal.
    ///
    /// Returns `None` only if the grid has no spawn or goal cells.
    pub fn spawn_pedestrian(&mut self) -> Option<PedestrianId> {
        let (personality, cell, goal) = self
            .world
            .resource_scope(|world, mut rng: Mut<SimRng>| {
                let config = world.resource::<SimConfig>();
                let grid = world.resource::<CityGrid>();
                let occupancy = world.resource::<OccupancyIndex>();

                let personality = Personality::sample(config, &mut rng.0);
                let cell = choose_spawn_cell(grid, occupancy, &mut rng.0)?;
                let goal = grid
                    .random_goal(&mut rng.0, Some(cell))
                    .or_else(|| grid.random_goal(&mut rng.0, None))?;
                Some((personality, cell, goal))
            })?;
        Some(self.spawn_pedestrian_at(cell, goal, personality))
    }

    /// Create a pedestrian at an explicit cell with an explicit goal.
    pub fn spawn_pedestrian_at(
        &mut self,
        cell: Cell,
        goal: Cell,
        personality: Personality,
    ) -> PedestrianId {
        let id = self.next_id;
        self.next_id += 1;

        let path = find_path(self.grid(), cell, goal);
        if path.is_empty() {
            debug!(id, ?cell, ?goal, "goal unreachable from spawn");
        }

        let bundle = PedestrianBundle::new(id, personality, cell, goal, path);
        let (x, y) = (bundle.position.x, bundle.position.y);
        self.world.spawn(bundle);
        self.world.resource_mut::<OccupancyIndex>().insert(id, x, y);

        let mut stats = self.world.resource_mut::<SimStats>();
        stats.visible += 1;

        PedestrianId(id)
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        self.world.resource_mut::<SimStats>().begin_tick();
        self.schedule.run(&mut self.world);

        let tick = {
            let mut tick = self.world.resource_mut::<SimTick>();
            tick.increment();
            tick.0
        };
        let stats = self.world.resource::<SimStats>();
        trace!(
            tick,
            visible = stats.visible,
            arrivals = stats.arrivals,
            recalculations = stats.recalculations,
            "tick complete"
        );
    }

    /// Advance the simulation by `ticks` ticks.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Static terrain layout (for initial load).
    pub fn grid_snapshot(&self) -> GridSnapshot {
        GridSnapshot::from_grid(self.grid())
    }

    /// Get grid snapshot as JSON.
    pub fn grid_snapshot_json(&self) -> String {
        serde_json::to_string(&self.grid_snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Working copy of one pedestrian's full state.
    pub fn pedestrian_state(&mut self, id: PedestrianId) -> Option<Walker> {
        let mut query = self.world.query::<(
            &PedestrianId,
            &Personality,
            &Position,
            &Heading,
            &Speed,
            &Route,
            &Goal,
            &Motion,
            &Presence,
            &Neighbors,
        )>();
        query
            .iter(&self.world)
            .find(|item| *item.0 == id)
            .map(
                |(id, personality, position, heading, speed, route, goal, motion, presence, neighbors)| {
                    Walker {
                        id: id.0,
                        personality: *personality,
                        position: *position,
                        heading: heading.0,
                        speed: speed.0,
                        route: route.clone(),
                        goal: goal.0,
                        motion: *motion,
                        presence: *presence,
                        neighbors: neighbors.0.clone(),
                    }
                },
            )
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimTick>().0
    }

    /// Number of pedestrians created so far.
    pub fn pedestrian_count(&self) -> usize {
        self.next_id as usize
    }

    /// Counters for the most recent tick.
    pub fn stats(&self) -> &SimStats {
        self.world.resource::<SimStats>()
    }

    pub fn grid(&self) -> &CityGrid {
        self.world.resource::<CityGrid>()
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Get the occupancy index (for debugging/visualization).
    pub fn occupancy(&self) -> &OccupancyIndex {
        self.world.resource::<OccupancyIndex>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamRange;
    use crate::terrain::{Connectivity, TerrainType};

    const TOWN: &str = "\
BBBBBBBBBB
DSSSSSSSSD
SBBBSSBBBS
SSSSCCSSSS
SBBBRRBBBS
DSSSCCSSSD
BBBBBBBBBB";

    fn config(population: usize) -> SimConfig {
        SimConfig {
            population,
            ..Default::default()
        }
    }

    #[test]
    fn test_setup_populates() {
        let sim = SimWorld::from_map_str(TOWN, config(8)).unwrap();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.pedestrian_count(), 8);
        assert_eq!(sim.occupancy().total_count(), 8);
        assert_eq!(sim.stats().visible, 8);
    }

    #[test]
    fn test_step_advances_tick() {
        let mut sim = SimWorld::from_map_str(TOWN, config(4)).unwrap();
        sim.step();
        assert_eq!(sim.current_tick(), 1);
        sim.run(9);
        assert_eq!(sim.current_tick(), 10);
    }

    #[test]
    fn test_zero_population_runs() {
        let mut sim = SimWorld::from_map_str(TOWN, config(0)).unwrap();
        sim.run(5);
        assert!(sim.snapshot().agents.is_empty());
    }

    #[test]
    fn test_setup_without_spawn_cells_fails() {
        let grid = CityGrid::filled(4, 4, TerrainType::Sidewalk, Connectivity::Eight);
        assert!(matches!(
            SimWorld::setup(grid, config(1)),
            Err(SimError::NoSpawnCells)
        ));
    }

    #[test]
    fn test_setup_rejects_invalid_config() {
        let bad = SimConfig {
            patience: ParamRange::new(9, 1),
            ..Default::default()
        };
        assert!(matches!(
            SimWorld::from_map_str(TOWN, bad),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_agents_stay_on_walkable_cells() {
        let mut sim = SimWorld::from_map_str(TOWN, config(20)).unwrap();
        for _ in 0..200 {
            sim.step();
            let snapshot = sim.snapshot();
            for agent in snapshot.visible_agents() {
                let cell = Cell::containing(agent.x, agent.y);
                assert!(sim.grid().is_walkable(cell), "agent {} on {:?}", agent.id, cell);
            }
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = SimWorld::from_map_str(TOWN, config(15)).unwrap();
        let mut b = SimWorld::from_map_str(TOWN, config(15)).unwrap();
        a.run(100);
        b.run(100);
        assert_eq!(a.snapshot_json(), b.snapshot_json());
    }

    #[test]
    fn test_snapshot_json() {
        let mut sim = SimWorld::from_map_str(TOWN, config(3)).unwrap();
        let json = sim.snapshot_json();
        assert!(json.contains("agents"));
        assert!(json.contains("heading"));
        assert!(sim.grid_snapshot_json().contains("DSSSSSSSSD"));
    }

    #[test]
    fn test_pedestrian_state_lookup() {
        let mut sim = SimWorld::from_map_str(TOWN, config(2)).unwrap();
        let walker = sim.pedestrian_state(PedestrianId(1)).unwrap();
        assert_eq!(walker.id, 1);
        assert!(sim.grid().spawn_cells().contains(&walker.cell()));
        assert!(sim.pedestrian_state(PedestrianId(99)).is_none());
    }

    #[test]
    fn test_oversized_config_values_keep_ticking() {
        let config = SimConfig {
            population: 3,
            avoidance_radius: ParamRange::fixed(3.0e9),
            reappear_base_delay: u64::MAX,
            reappear_jitter: 5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let mut sim = SimWorld::from_map_str("DSSSSD", config).unwrap();
        sim.run(12);
        assert_eq!(sim.current_tick(), 12);
        assert_eq!(sim.pedestrian_count(), 3);
    }
}
