//! Properties that must hold on any map and any seed.

use crowd_sim::{
    find_path, Cell, CityGrid, Connectivity, PedestrianId, Presence, SimConfig, SimWorld,
    TerrainType,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const TOWN: &str = "\
BBBBBDBBBBBBBBDBBBBB
SSSSSSSSSSSSSSSSSSSS
SBBBBBBSRRRRSBBBBBBS
SDBBBBBCRRRRCBBBBBDS
SBBBBBBSRRRRSBBBBBBS
SSSSSSSCCCCCCSSSSSSS
SBBBBBBSRRRRSBBBBBBS
SDBBBBBCRRRRCBBBBBDS
SBBBBBBSRRRRSBBBBBBS
SSSSSSSSSSSSSSSSSSSS
BBBBBDBBBBBBBBDBBBBB";

fn random_grid(rng: &mut StdRng, size: usize, connectivity: Connectivity) -> CityGrid {
    let rows = (0..size)
        .map(|_| {
            (0..size)
                .map(|_| {
                    if rng.random_bool(0.3) {
                        TerrainType::Building
                    } else {
                        TerrainType::Sidewalk
                    }
                })
                .collect()
        })
        .collect();
    CityGrid::from_rows(rows, connectivity).unwrap()
}

fn is_connected(grid: &CityGrid, path: &[Cell]) -> bool {
    path.windows(2)
        .all(|pair| grid.neighbors(pair[0]).contains(&pair[1]))
}

/// Step distances from `start` by repeated relaxation, without a queue.
fn relaxed_distances(grid: &CityGrid, start: Cell) -> HashMap<Cell, usize> {
    let diagonal = grid.connectivity() == Connectivity::Eight;
    let mut dist = HashMap::new();
    if !grid.is_walkable(start) {
        return dist;
    }
    dist.insert(start, 0usize);

    let mut changed = true;
    while changed {
        changed = false;
        for y in 0..grid.height() as i32 {
            for x in 0..grid.width() as i32 {
                let cell = Cell::new(x, y);
                if !grid.is_walkable(cell) {
                    continue;
                }
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if (dx == 0 && dy == 0) || (!diagonal && dx != 0 && dy != 0) {
                            continue;
                        }
                        let Some(&d) = dist.get(&cell.offset(dx, dy)) else { continue };
                        if dist.get(&cell).map_or(true, |&current| d + 1 < current) {
                            dist.insert(cell, d + 1);
                            changed = true;
                        }
                    }
                }
            }
        }
    }
    dist
}

#[test]
fn bfs_paths_are_shortest() {
    let mut rng = StdRng::seed_from_u64(2024);
    for round in 0..30 {
        let connectivity = if round % 2 == 0 {
            Connectivity::Four
        } else {
            Connectivity::Eight
        };
        let grid = random_grid(&mut rng, 10, connectivity);
        let start = Cell::new(rng.random_range(0..10), rng.random_range(0..10));
        let distances = relaxed_distances(&grid, start);

        for y in 0..10 {
            for x in 0..10 {
                let goal = Cell::new(x, y);
                let path = find_path(&grid, start, goal);
                match distances.get(&goal) {
                    Some(&d) => {
                        assert_eq!(path.len(), d + 1, "round {round}: {start:?} -> {goal:?}");
                        assert_eq!(path.first(), Some(&start));
                        assert_eq!(path.last(), Some(&goal));
                        assert!(path.iter().all(|c| grid.is_walkable(*c)));
                        assert!(is_connected(&grid, &path));
                    }
                    _ => assert!(path.is_empty(), "round {round}: {start:?} -> {goal:?}"),
                }
            }
        }
    }
}

fn town(population: usize, seed: u64) -> SimWorld {
    let config = SimConfig {
        population,
        seed,
        ..Default::default()
    };
    SimWorld::from_map_str(TOWN, config).unwrap()
}

#[test]
fn route_cursor_only_moves_forward() {
    let mut sim = town(25, 7);
    let mut last: HashMap<u32, (Vec<Cell>, usize)> = HashMap::new();

    for _ in 0..300 {
        sim.step();
        // Without recalculations this tick, every route is the one from last tick.
        let routes_kept = sim.stats().recalculations == 0;
        for id in 0..25 {
            let walker = sim.pedestrian_state(PedestrianId(id)).unwrap();
            let path = walker.route.path().to_vec();
            let cursor = walker.route.cursor();
            assert!(cursor <= path.len());
            if routes_kept {
                if let Some((prev_path, prev_cursor)) = last.get(&id) {
                    assert_eq!(*prev_path, path, "route of {id} changed without recalculation");
                    assert!(cursor >= *prev_cursor, "cursor moved back for {id}");
                }
            }
            last.insert(id, (path, cursor));
        }
    }
}

#[test]
fn speed_never_exceeds_desired_or_one() {
    let config = SimConfig {
        population: 40,
        seed: 3,
        density_sensitivity: crowd_sim::ParamRange::new(0.5, 4.0),
        desired_speed: crowd_sim::ParamRange::new(0.5, 1.5),
        ..Default::default()
    };
    let mut sim = SimWorld::from_map_str(TOWN, config).unwrap();

    for _ in 0..200 {
        sim.step();
        for id in 0..40 {
            let walker = sim.pedestrian_state(PedestrianId(id)).unwrap();
            let cap = walker.personality.desired_speed.min(1.0);
            assert!(walker.speed >= 0.0);
            assert!(walker.speed <= cap + 1e-6, "{} > {}", walker.speed, cap);
            if !walker.presence.is_visible() {
                assert_eq!(walker.speed, 0.0);
            }
        }
    }
}

#[test]
fn visible_pedestrians_never_stand_on_obstacles() {
    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let config = SimConfig {
            population: 30,
            connectivity,
            ..Default::default()
        };
        let mut sim = SimWorld::from_map_str(TOWN, config).unwrap();
        for _ in 0..300 {
            sim.step();
            let snapshot = sim.snapshot();
            for agent in snapshot.visible_agents() {
                let cell = Cell::containing(agent.x, agent.y);
                assert!(sim.grid().is_walkable(cell), "{connectivity:?}: agent {} on {cell:?}", agent.id);
            }
        }
    }
}

#[test]
fn reappearance_falls_in_window() {
    let mut sim = town(30, 11);
    let mut arrivals = 0;

    for _ in 0..600 {
        let tick = sim.current_tick();
        let before: Vec<bool> = (0..30)
            .map(|id| sim.pedestrian_state(PedestrianId(id)).unwrap().presence.is_visible())
            .collect();
        sim.step();
        for id in 0..30u32 {
            let walker = sim.pedestrian_state(PedestrianId(id)).unwrap();
            if let (true, Presence::AtGoal { reappear_tick }) = (before[id as usize], walker.presence) {
                arrivals += 1;
                assert!(
                    (tick + 50..=tick + 200).contains(&reappear_tick),
                    "arrived at {tick}, reappears at {reappear_tick}"
                );
                assert_eq!(sim.occupancy().cell_of(id), None);
            }
        }
    }
    assert!(arrivals > 0, "nobody reached a goal in 600 ticks");
}

#[test]
fn hidden_pedestrians_are_not_indexed() {
    let mut sim = town(30, 5);
    for _ in 0..400 {
        sim.step();
        let snapshot = sim.snapshot();
        let visible = snapshot.visible_agents().count() as u32;
        assert_eq!(visible, snapshot.stats.visible);
        assert_eq!(
            snapshot.agents.len() as u32,
            snapshot.stats.visible + snapshot.stats.hidden
        );
        // Pedestrians that reappeared this tick join the index on the next rebuild.
        let indexed = sim.occupancy().total_count() as u32;
        assert_eq!(indexed + snapshot.stats.reappearances, visible);
    }
}

#[test]
fn runs_are_reproducible_per_seed() {
    let mut a = town(20, 99);
    let mut b = town(20, 99);
    let mut c = town(20, 100);
    a.run(150);
    b.run(150);
    c.run(150);
    assert_eq!(a.snapshot_json(), b.snapshot_json());
    assert_ne!(a.snapshot_json(), c.snapshot_json());
}
