//! Snapshot types.
//!
//! The `Snapshot` struct is a serializable view of the simulation state that a
//! renderer or recorder consumes once per tick.

use crate::components::*;
use crate::resources::{SimStats, SimTick};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single pedestrian's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    /// Degrees, 0 along +y, 90 along +x.
    pub heading: f32,
    pub visible: bool,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticks completed so far.
    pub tick: u64,
    /// All pedestrians, visible or not, in id order.
    pub agents: Vec<AgentSnapshot>,
    /// Counters for the most recent tick.
    pub stats: SimStats,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World) -> Self {
        let tick = world.get_resource::<SimTick>().map(|t| t.0).unwrap_or(0);
        let stats = world.get_resource::<SimStats>().cloned().unwrap_or_default();

        let mut query = world.query::<(&PedestrianId, &Position, &Heading, &Presence)>();
        let mut agents: Vec<AgentSnapshot> = query
            .iter(world)
            .map(|(id, pos, heading, presence)| AgentSnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
                heading: heading.0,
                visible: presence.is_visible(),
            })
            .collect();
        agents.sort_by_key(|a| a.id);

        Self { tick, agents, stats }
    }

    /// Visible pedestrians only.
    pub fn visible_agents(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.agents.iter().filter(|a| a.visible)
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
