//! Trajectory pose files.
//!
//! A trajectory is stored as a JSON array of 4×4 row-major matrices,
//! index-aligned with the sorted frame directory. Loaded poses are
//! checked for rigidity; a non-rigid matrix is logged but kept, since
//! diagnostic trajectories sometimes carry scale from upstream tools.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::warn;

use crate::core::types::{Pose, Trajectory};
use crate::error::Result;

/// Read a trajectory from a JSON file.
pub fn load_poses(path: &Path) -> Result<Trajectory> {
    let file = File::open(path)?;
    read_poses(&mut BufReader::new(file))
}

/// Read a trajectory from any reader.
pub fn read_poses<R: Read>(reader: &mut R) -> Result<Trajectory> {
    let raw: Vec<[[f64; 4]; 4]> = serde_json::from_reader(reader)?;
    let trajectory: Trajectory = raw.into_iter().map(Pose::from_matrix).collect();
    for (index, pose) in trajectory.iter().enumerate() {
        if !pose.is_rigid(1e-6) {
            warn!("pose {index} is not a rigid transform");
        }
    }
    Ok(trajectory)
}

/// Write a trajectory to a JSON file.
pub fn save_poses(trajectory: &Trajectory, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_poses(trajectory, &mut BufWriter::new(file))
}

/// Write a trajectory as JSON to any writer.
pub fn write_poses<W: Write>(trajectory: &Trajectory, writer: &mut W) -> Result<()> {
    let raw: Vec<[[f64; 4]; 4]> = trajectory.iter().map(|pose| pose.m).collect();
    serde_json::to_writer(writer, &raw)?;
    Ok(())
}
