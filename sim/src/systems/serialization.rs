//! Serialization utilities for simulation output.
//!
//! Snapshots are exchanged as JSON. A run can be recorded as JSON lines, one
//! snapshot per line, preceded by the static grid layout.

use crate::terrain::GridSnapshot;
use crate::world::Snapshot;
use std::io::Write;

/// Serialize a snapshot to JSON bytes.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(snapshot)
}

/// Deserialize a snapshot from JSON bytes.
pub fn snapshot_from_json(data: &[u8]) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Serialize the grid layout to a JSON string.
pub fn grid_to_json(grid: &GridSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(grid)
}

/// Deserialize a grid layout from a JSON string.
pub fn grid_from_json(data: &str) -> Result<GridSnapshot, serde_json::Error> {
    serde_json::from_str(data)
}

/// Writes a run as JSON lines: the grid layout first, then one snapshot per line.
pub struct SnapshotRecorder<W: Write> {
    out: W,
    frames: usize,
}

impl<W: Write> SnapshotRecorder<W> {
    /// Start a recording by writing the grid layout.
    pub fn new(mut out: W, grid: &GridSnapshot) -> Result<Self, serde_json::Error> {
        serde_json::to_writer(&mut out, grid)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)?;
        Ok(Self { out, frames: 0 })
    }

    /// Append one snapshot.
    pub fn record(&mut self, snapshot: &Snapshot) -> Result<(), serde_json::Error> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        self.out.write_all(b"\n").map_err(serde_json::Error::io)?;
        self.frames += 1;
        Ok(())
    }

    /// Number of snapshots recorded so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> Result<W, serde_json::Error> {
        self.out.flush().map_err(serde_json::Error::io)?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::SimStats;
    use crate::world::AgentSnapshot;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            tick: 42,
            agents: vec![AgentSnapshot {
                id: 1,
                x: 10.0,
                y: 20.0,
                heading: 90.0,
                visible: true,
            }],
            stats: SimStats {
                total_arrivals: 3,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let bytes = snapshot_to_json(&sample_snapshot()).unwrap();
        let restored = snapshot_from_json(&bytes).unwrap();

        assert_eq!(restored.tick, 42);
        assert_eq!(restored.agents.len(), 1);
        assert_eq!(restored.agents[0].id, 1);
        assert_eq!(restored.stats.total_arrivals, 3);
    }

    #[test]
    fn test_recorder_writes_json_lines() {
        let grid = GridSnapshot {
            width: 2,
            height: 1,
            rows: vec!["DS".to_string()],
        };
        let mut recorder = SnapshotRecorder::new(Vec::new(), &grid).unwrap();
        recorder.record(&sample_snapshot()).unwrap();
        recorder.record(&sample_snapshot()).unwrap();
        assert_eq!(recorder.frames(), 2);

        let bytes = recorder.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(grid_from_json(lines[0]).unwrap().rows, vec!["DS"]);
        assert_eq!(snapshot_from_json(lines[2].as_bytes()).unwrap().tick, 42);
    }
}
