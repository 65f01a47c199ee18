//! Basic demonstration of the crowd simulation.
//!
//! Run with: cargo run --example basic_demo [MAP_FILE] [CONFIG_JSON]
//!
//! Without arguments a small built-in town is used. Set `RUST_LOG=debug` to
//! see arrivals and unreachable goals.

use crowd_sim::{SimConfig, SimWorld};
use std::process::ExitCode;
use tracing::error;

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

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut args = std::env::args().skip(1);
    let map_path = args.next();
    let config_path = args.next();

    let config = match config_path {
        Some(path) => match SimConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(%err, "could not load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig {
            population: 30,
            ..Default::default()
        },
    };

    let built = match &map_path {
        Some(path) => SimWorld::from_map_file(path, config),
        None => SimWorld::from_map_str(TOWN, config),
    };
    let mut sim = match built {
        Ok(sim) => sim,
        Err(err) => {
            error!(%err, "could not build simulation");
            return ExitCode::FAILURE;
        }
    };

    println!("=== Crowd Simulation Demo ===\n");
    for row in sim.grid_snapshot().rows.iter().rev() {
        println!("  {row}");
    }
    println!();

    println!("Running simulation for 300 ticks...\n");
    for _ in 0..300 {
        sim.step();
        if sim.current_tick() % 50 == 0 {
            print_status(&mut sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!(%err, "could not serialize snapshot");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn print_status(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    let stats = &snapshot.stats;
    println!(
        "--- Tick {} --- walking={} waiting={} arrivals={} recalcs={} escapes={}",
        snapshot.tick,
        stats.visible,
        stats.hidden,
        stats.total_arrivals,
        stats.recalculations,
        stats.stuck_escapes
    );
    for agent in snapshot.visible_agents().take(5) {
        println!(
            "    Pedestrian {}: pos=({:.1}, {:.1}) heading={:.0}",
            agent.id, agent.x, agent.y, agent.heading
        );
    }
}
