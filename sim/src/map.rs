//! Character map loading.
//!
//! One line per grid row, one character per cell:
//!
//! | Symbol | Terrain  |
//! |--------|----------|
//! | `D`    | Door     |
//! | `S`    | Sidewalk |
//! | `C`    | Crossing |
//! | `B`    | Building |
//! | `R`    | Road     |
//!
//! Trailing blank lines and `\r` line endings are ignored. Unknown symbols
//! become buildings and are reported once per symbol.

use crate::error::{Result, SimError};
use crate::terrain::{CityGrid, Connectivity, TerrainType};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Parse a character map into a grid.
pub fn parse_map(source: &str, connectivity: Connectivity) -> Result<CityGrid> {
    let mut lines: Vec<&str> = source
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .skip_while(|l| l.is_empty())
        .collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return Err(SimError::EmptyMap);
    }

    let mut unknown: BTreeMap<char, usize> = BTreeMap::new();
    let rows: Vec<Vec<TerrainType>> = lines
        .iter()
        .map(|line| {
            line.chars()
                .map(|symbol| {
                    TerrainType::from_symbol(symbol).unwrap_or_else(|| {
                        *unknown.entry(symbol).or_default() += 1;
                        TerrainType::Building
                    })
                })
                .collect()
        })
        .collect();

    for (symbol, count) in &unknown {
        warn!(?symbol, count, "unknown map symbol, treating as building");
    }

    let grid = CityGrid::from_rows(rows, connectivity)?;
    info!(
        width = grid.width(),
        height = grid.height(),
        doors = grid.goal_cells().len(),
        "map parsed"
    );
    Ok(grid)
}

/// Read and parse a character map file.
pub fn load_map(path: impl AsRef<Path>, connectivity: Connectivity) -> Result<CityGrid> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SimError::MapNotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map(&source, connectivity)
}
