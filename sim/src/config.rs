//! Simulation configuration.
//!
//! Population size plus one inclusive `[min, max]` range per personality
//! parameter. Every pedestrian draws its own values from these ranges when it
//! is created, which is where the crowd's heterogeneity comes from.
//!
//! Configuration can be built in code (starting from `Default`) or loaded from
//! a JSON document; missing fields fall back to their defaults.

use crate::error::{Result, SimError};
use crate::terrain::Connectivity;
use bevy_ecs::prelude::*;
use rand::distr::uniform::SampleUniform;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive range a personality parameter is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange<T> {
    pub min: T,
    pub max: T,
}

impl<T> ParamRange<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// A degenerate range that always yields `value`.
    pub fn fixed(value: T) -> Self {
        Self { min: value, max: value }
    }

    /// Draw a value uniformly from `[min, max]`.
    ///
    /// The range must have been validated (`min <= max`).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        rng.random_range(self.min..=self.max)
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Configuration for a simulation run.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of pedestrians created at setup. Fixed for the whole run.
    pub population: usize,
    /// Seed for the simulation's random source.
    pub seed: u64,
    /// Neighbourhood used for the adjacency cache and pathfinding.
    pub connectivity: Connectivity,
    /// Preferred walking speed in cells per tick.
    pub desired_speed: ParamRange<f32>,
    /// Blocked ticks tolerated before a forced escape.
    pub patience: ParamRange<u32>,
    /// How strongly nearby pedestrians slow a walker down.
    pub density_sensitivity: ParamRange<f32>,
    /// Radius (cells) within which other pedestrians count as neighbours.
    pub avoidance_radius: ParamRange<f32>,
    /// Maximum random heading perturbation per tick, in degrees.
    pub wiggle_angle: ParamRange<f32>,
    /// Minimum number of ticks a pedestrian stays hidden after reaching its goal.
    pub reappear_base_delay: u64,
    /// Extra random ticks (inclusive upper bound) added to the base delay.
    pub reappear_jitter: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            population: 50,
            seed: 42,
            connectivity: Connectivity::Eight,
            desired_speed: ParamRange::new(0.5, 1.0),
            patience: ParamRange::new(5, 20),
            density_sensitivity: ParamRange::new(0.0, 1.0),
            avoidance_radius: ParamRange::new(1.0, 3.0),
            wiggle_angle: ParamRange::new(0.0, 15.0),
            reappear_base_delay: 50,
            reappear_jitter: 150,
        }
    }
}

impl SimConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that every range is ordered, finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        check_float_range("desired_speed", self.desired_speed)?;
        check_float_range("density_sensitivity", self.density_sensitivity)?;
        check_float_range("avoidance_radius", self.avoidance_radius)?;
        check_float_range("wiggle_angle", self.wiggle_angle)?;
        if self.patience.min > self.patience.max {
            return Err(SimError::InvalidConfig(format!(
                "patience: min {} exceeds max {}",
                self.patience.min, self.patience.max
            )));
        }
        if self.wiggle_angle.max > 180.0 {
            return Err(SimError::InvalidConfig(format!(
                "wiggle_angle: max {} exceeds 180 degrees",
                self.wiggle_angle.max
            )));
        }
        Ok(())
    }

    /// Inclusive window of ticks after arrival in which a pedestrian reappears.
    pub fn reappear_window(&self) -> (u64, u64) {
        (
            self.reappear_base_delay,
            self.reappear_base_delay.saturating_add(self.reappear_jitter),
        )
    }
}

fn check_float_range(name: &str, range: ParamRange<f32>) -> Result<()> {
    if !range.min.is_finite() || !range.max.is_finite() {
        return Err(SimError::InvalidConfig(format!("{name}: bounds must be finite")));
    }
    if range.min < 0.0 {
        return Err(SimError::InvalidConfig(format!(
            "{name}: min {} is negative",
            range.min
        )));
    }
    if range.min > range.max {
        return Err(SimError::InvalidConfig(format!(
            "{name}: min {} exceeds max {}",
            range.min, range.max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = SimConfig {
            avoidance_radius: ParamRange::new(3.0, 1.0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("avoidance_radius"));
    }

    #[test]
    fn test_negative_speed_rejected() {
        let config = SimConfig {
            desired_speed: ParamRange::new(-0.5, 1.0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(r#"{ "population": 7, "seed": 3 }"#).unwrap();
        assert_eq!(config.population, 7);
        assert_eq!(config.seed, 3);
        assert_eq!(config.reappear_base_delay, 50);
        assert_eq!(config.connectivity, Connectivity::Eight);
    }

    #[test]
    fn test_json_with_invalid_range_fails() {
        let json = r#"{ "patience": { "min": 10, "max": 2 } }"#;
        assert!(SimConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_range_sampling_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let range = ParamRange::new(0.25f32, 0.75);
        for _ in 0..500 {
            assert!(range.contains(range.sample(&mut rng)));
        }
        let fixed = ParamRange::fixed(4u32);
        assert_eq!(fixed.sample(&mut rng), 4);
    }

    #[test]
    fn test_reappear_window() {
        let config = SimConfig::default();
        assert_eq!(config.reappear_window(), (50, 200));
    }
}
