//! ECS Systems for the crowd simulation.
//!
//! Systems contain the simulation logic that operates on components.
//!
//! ## Tick Phases
//!
//! One tick runs these systems as a single chain, in this order:
//!
//! 0. `occupancy_rebuild_system` - rebuilds the occupancy index from visible
//!    pedestrians (lives in `spatial`)
//! 1. `pedestrian_step_system` - decision then movement, one pedestrian at a
//!    time in ascending id order
//! 2. `reappearance_system` - brings back hidden pedestrians that are due
//! 3. `path_recalculation_system` - new routes for pedestrians that asked
//! 4. `population_stats_system` - visible/hidden counts
//!
//! The tick counter is advanced by `SimWorld::step` after the chain.

pub mod decision;
pub mod lifecycle;
pub mod movement;
pub mod serialization;

pub use decision::*;
pub use lifecycle::*;
pub use movement::*;
pub use serialization::*;
