//! Crowd Simulation Core
//!
//! A deterministic, tick-based ECS simulation of pedestrians walking between
//! building doors on a city grid. Uses `bevy_ecs` for the
//! entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod map;
pub mod pathfinder;
pub mod resources;
pub mod spatial;
pub mod systems;
pub mod terrain;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{ParamRange, SimConfig};
pub use error::{Result, SimError};
pub use map::{load_map, parse_map};
pub use pathfinder::{find_path, find_paths};
pub use resources::{SimRng, SimStats, SimTick};
pub use spatial::{OccupancyEntry, OccupancyIndex};
pub use systems::*;
pub use terrain::{Cell, CityGrid, Connectivity, GridSnapshot, TerrainType};
pub use world::{AgentSnapshot, Snapshot};
