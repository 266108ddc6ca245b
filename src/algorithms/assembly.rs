//! Map assembly.
//!
//! Folds a sequence of filtered frames and their trajectory poses into a
//! single cloud in the local map frame: every frame is transformed by its
//! pose and concatenated in order. The ground variant segments each frame
//! in sensor coordinates first, where the road is still a near-horizontal
//! plane, and assembles only the ground returns.

use log::debug;

use crate::algorithms::ground::{segment_ground, GroundConfig};
use crate::core::types::{PointCloud, Trajectory};
use crate::error::{MargaError, Result};

/// Transform every frame by its pose and concatenate.
///
/// Frame `i` is paired with pose `i`; the output holds every input point
/// exactly once, in frame order. Intensity rides along untouched.
///
/// # Errors
/// `FrameCountMismatch` when the trajectory and frame list disagree in
/// length.
pub fn assemble(frames: &[PointCloud], trajectory: &Trajectory) -> Result<PointCloud> {
    let total: usize = frames.iter().map(PointCloud::len).sum();
    let mut map = PointCloud::with_capacity(total);
    assemble_into(frames, trajectory, &mut map)?;
    Ok(map)
}

/// Like [`assemble`] but appends into an existing cloud.
pub fn assemble_into(
    frames: &[PointCloud],
    trajectory: &Trajectory,
    out: &mut PointCloud,
) -> Result<()> {
    if frames.len() != trajectory.len() {
        return Err(MargaError::FrameCountMismatch {
            poses: trajectory.len(),
            frames: frames.len(),
        });
    }

    for (frame, pose) in frames.iter().zip(trajectory.iter()) {
        let placed = frame.transform(pose);
        out.extend_from(&placed);
    }

    debug!("assembled {} frames into {} points", frames.len(), out.len());
    Ok(())
}

/// Assemble only the ground returns of every frame.
///
/// Each frame is plane-segmented in its own sensor coordinates before the
/// pose is applied, so hills and ramps stay ground as long as each single
/// sweep is locally planar.
///
/// # Errors
/// `FrameCountMismatch` on length disagreement; segmentation errors from
/// any frame abort the whole map.
pub fn assemble_ground(
    frames: &[PointCloud],
    trajectory: &Trajectory,
    config: &GroundConfig,
) -> Result<PointCloud> {
    if frames.len() != trajectory.len() {
        return Err(MargaError::FrameCountMismatch {
            poses: trajectory.len(),
            frames: frames.len(),
        });
    }

    let mut map = PointCloud::new();
    for (frame, pose) in frames.iter().zip(trajectory.iter()) {
        let (ground, _) = segment_ground(frame, config)?;
        let placed = ground.transform(pose);
        map.extend_from(&placed);
    }

    debug!(
        "assembled ground returns of {} frames into {} points",
        frames.len(),
        map.len()
    );
    Ok(map)
}
