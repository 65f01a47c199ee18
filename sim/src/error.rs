//! Error types for simulation setup.
//!
//! Everything that can fail happens before the first tick: loading the map,
//! validating configuration, and checking that the grid has somewhere to
//! spawn and somewhere to go. The tick loop itself never returns an error.

use std::path::PathBuf;

/// Errors raised while building a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The map source does not exist.
    #[error("map source not found: {}", .0.display())]
    MapNotFound(PathBuf),

    /// Reading a map or configuration file failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The map source contained no rows.
    #[error("map source is empty")]
    EmptyMap,

    /// A map row does not match the width of the first row.
    #[error("malformed map: row {row} has {found} cells, expected {expected}")]
    MalformedMap {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },

    /// The grid has no cell where pedestrians can appear.
    #[error("grid has no spawn cells")]
    NoSpawnCells,

    /// The grid has no cell pedestrians can walk to.
    #[error("grid has no goal cells")]
    NoGoalCells,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;
