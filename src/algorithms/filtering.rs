//! Per-frame point-cloud filters.
//!
//! Four independent cleaning passes applied to raw sweeps before assembly:
//! invalid-point removal, ego-vehicle box masking, statistical outlier
//! removal and band filters over z / intensity. Every filter is a pure
//! function returning new clouds; frames can be processed independently.
//!
//! # Example
//!
//! ```rust
//! use marga_map::algorithms::filtering::{remove_ego_box, DEFAULT_POG_Z};
//! use marga_map::core::types::{Point, PointCloud};
//!
//! let cloud = PointCloud::from_points(vec![
//!     Point::new(0.0, 0.0, -1.0, 5.0),      // on the roof of the vehicle
//!     Point::new(100.0, 100.0, 100.0, 5.0), // far away
//! ]);
//!
//! let (kept, ego) = remove_ego_box(&cloud, DEFAULT_POG_Z);
//! assert_eq!(kept.len(), 1);
//! assert_eq!(ego.len(), 1);
//! ```

use kiddo::{KdTree, SquaredEuclidean};

use crate::core::stats::{self, ChannelStats};
use crate::core::types::PointCloud;
use crate::error::{MargaError, Result};

/// Vehicle length in meters.
pub const EGO_LENGTH: f64 = 4.27;
/// Vehicle width in meters.
pub const EGO_WIDTH: f64 = 2.02;
/// Vehicle height in meters.
pub const EGO_HEIGHT: f64 = 1.45;
/// Default sensor-to-ground offset in meters (sensor sits above the road,
/// so the road plane is below z = 0).
pub const DEFAULT_POG_Z: f64 = -2.9;

/// Fraction of the vehicle length ahead of the sensor mount.
const FRONT_FRACTION: f64 = 0.62;

/// Drop points with non-finite x, y or z.
///
/// Never errors; the result may be empty. Intensity is not inspected.
pub fn remove_invalid(cloud: &PointCloud) -> PointCloud {
    let mut result = PointCloud::with_capacity(cloud.len());
    for p in cloud.iter() {
        if p.is_finite() {
            result.push(p);
        }
    }
    result
}

/// Remove returns from the vehicle body itself.
///
/// The exclusion box is derived from the fixed vehicle dimensions and the
/// sensor-to-ground offset `pog_z`: x ∈ (−rear, +front) with
/// front = 0.62·length (the sensor is mounted aft of center), y spans the
/// vehicle width, z ∈ (pog_z, 0).
///
/// A point is **kept** when it lies outside the box on at least one axis;
/// only points inside on all three axes are classified ego. Returns
/// `(kept, ego)`.
pub fn remove_ego_box(cloud: &PointCloud, pog_z: f64) -> (PointCloud, PointCloud) {
    let front = EGO_LENGTH * FRONT_FRACTION;
    let rear = EGO_LENGTH - front;
    let half_width = EGO_WIDTH / 2.0;

    let mask: Vec<bool> = (0..cloud.len())
        .map(|i| {
            let [x, y, z] = cloud.xyz(i);
            let outside_x = x < -rear || x > front;
            let outside_y = y < -half_width || y > half_width;
            let outside_z = z < pog_z || z > 0.0;
            outside_x || outside_y || outside_z
        })
        .collect();

    cloud.split_by_mask(&mask)
}

/// Statistical outlier removal over the x/y/z channels.
///
/// For every point, the mean Euclidean distance to its `k_neighbors`
/// nearest neighbors (self excluded) is computed through a k-d tree. The
/// cloud-wide mean `μ` and standard deviation `σ` of those per-point means
/// form a single global threshold `μ + z_thresh·σ`; a point stays iff its
/// mean neighbor distance is at or below it.
///
/// `k_neighbors` is clamped to `len − 1` for small clouds; clouds with at
/// most one point pass through unchanged. Returns `(inliers, outliers)`.
///
/// # Errors
/// `InvalidParameter` if `k_neighbors < 1`.
pub fn statistical_outlier_removal(
    cloud: &PointCloud,
    k_neighbors: usize,
    z_thresh: f64,
) -> Result<(PointCloud, PointCloud)> {
    if k_neighbors < 1 {
        return Err(MargaError::InvalidParameter {
            name: "k_neighbors",
            reason: format!("must be at least 1, got {k_neighbors}"),
        });
    }
    if cloud.len() <= 1 {
        return Ok((cloud.clone(), PointCloud::new()));
    }

    let k = k_neighbors.min(cloud.len() - 1);

    let mut tree: KdTree<f64, 3> = KdTree::new();
    for i in 0..cloud.len() {
        tree.add(&cloud.xyz(i), i as u64);
    }

    // Query k+1 so the point itself (distance 0) can be skipped by id.
    let mean_distances: Vec<f64> = (0..cloud.len())
        .map(|i| {
            let neighbors = tree.nearest_n::<SquaredEuclidean>(&cloud.xyz(i), k + 1);
            let sum: f64 = neighbors
                .iter()
                .filter(|n| n.item != i as u64)
                .take(k)
                .map(|n| n.distance.sqrt())
                .sum();
            sum / k as f64
        })
        .collect();

    let mu = stats::mean(&mean_distances);
    let sigma = stats::std_dev(&mean_distances);
    let threshold = mu + z_thresh * sigma;

    let mask: Vec<bool> = mean_distances.iter().map(|&d| d <= threshold).collect();
    Ok(cloud.split_by_mask(&mask))
}

/// Keep points with `z_min ≤ z ≤ z_max` (inclusive both ends).
///
/// Returns `(inliers, outliers)`.
pub fn z_band_filter(cloud: &PointCloud, z_min: f64, z_max: f64) -> (PointCloud, PointCloud) {
    let mask: Vec<bool> = cloud.zs.iter().map(|&z| z >= z_min && z <= z_max).collect();
    cloud.split_by_mask(&mask)
}

/// Keep points with `lo ≤ intensity ≤ hi` (inclusive both ends).
///
/// Returns `(inliers, outliers)`.
pub fn intensity_band_filter(cloud: &PointCloud, lo: f64, hi: f64) -> (PointCloud, PointCloud) {
    let mask: Vec<bool> = cloud
        .intensities
        .iter()
        .map(|&v| v >= lo && v <= hi)
        .collect();
    cloud.split_by_mask(&mask)
}

/// Derive intensity band bounds from the channel statistics:
/// `lo = round(μ + σ)`, `hi = round(μ + num_std·σ)`.
///
/// Lane paint reflects far brighter than asphalt, so the band sits above
/// the bulk of the intensity distribution. Returns `None` for an empty
/// cloud.
pub fn derive_intensity_band(cloud: &PointCloud, num_std: f64) -> Option<(f64, f64)> {
    let stats = ChannelStats::compute(&cloud.intensities)?;
    let lo = (stats.mean + stats.std).round();
    let hi = (stats.mean + num_std * stats.std).round();
    Some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point;
    use approx::assert_relative_eq;

    fn flat_point(x: f64, y: f64, z: f64) -> Point {
        Point::new(x, y, z, 0.0)
    }

    #[test]
    fn test_remove_invalid_drops_non_finite() {
        let cloud = PointCloud::from_points(vec![
            flat_point(1.0, 2.0, 3.0),
            flat_point(f64::NAN, 0.0, 0.0),
            flat_point(0.0, f64::INFINITY, 0.0),
            flat_point(0.0, 0.0, f64::NEG_INFINITY),
            flat_point(4.0, 5.0, 6.0),
        ]);

        let clean = remove_invalid(&cloud);
        assert_eq!(clean.len(), 2);
        assert_relative_eq!(clean.xs[1], 4.0);
    }

    #[test]
    fn test_remove_invalid_keeps_non_finite_intensity() {
        // Only the spatial channels decide validity.
        let cloud = PointCloud::from_points(vec![Point::new(1.0, 1.0, 1.0, f64::NAN)]);
        assert_eq!(remove_invalid(&cloud).len(), 1);
    }

    #[test]
    fn test_ego_box_discards_sensor_origin() {
        let cloud = PointCloud::from_points(vec![flat_point(0.0, 0.0, 0.0)]);
        let (kept, ego) = remove_ego_box(&cloud, DEFAULT_POG_Z);
        assert_eq!(kept.len(), 0);
        assert_eq!(ego.len(), 1);
    }

    #[test]
    fn test_ego_box_keeps_distant_point() {
        let cloud = PointCloud::from_points(vec![flat_point(100.0, 100.0, 100.0)]);
        let (kept, ego) = remove_ego_box(&cloud, DEFAULT_POG_Z);
        assert_eq!(kept.len(), 1);
        assert_eq!(ego.len(), 0);
    }

    #[test]
    fn test_ego_box_one_axis_outside_is_kept() {
        // front = 0.62 · 4.27 ≈ 2.647: x = 3 is ahead of the hood while
        // y and z stay inside the box.
        let cloud = PointCloud::from_points(vec![flat_point(3.0, 0.0, -1.0)]);
        let (kept, _) = remove_ego_box(&cloud, DEFAULT_POG_Z);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_ego_box_asymmetric_front_rear() {
        // rear = 4.27 − 2.6474 ≈ 1.623: x = −2 is already behind the
        // bumper, x = +2 is still over the hood.
        let behind = PointCloud::from_points(vec![flat_point(-2.0, 0.0, -1.0)]);
        let over_hood = PointCloud::from_points(vec![flat_point(2.0, 0.0, -1.0)]);

        assert_eq!(remove_ego_box(&behind, DEFAULT_POG_Z).0.len(), 1);
        assert_eq!(remove_ego_box(&over_hood, DEFAULT_POG_Z).0.len(), 0);
    }

    #[test]
    fn test_ego_box_partition_is_complete() {
        let cloud = PointCloud::from_points(vec![
            flat_point(0.0, 0.0, -1.0),
            flat_point(5.0, 0.0, -1.0),
            flat_point(0.0, 5.0, -1.0),
            flat_point(0.0, 0.0, -5.0),
        ]);
        let (kept, ego) = remove_ego_box(&cloud, DEFAULT_POG_Z);
        assert_eq!(kept.len() + ego.len(), cloud.len());
        assert_eq!(ego.len(), 1);
    }

    fn line_cloud_with_outlier() -> PointCloud {
        let mut points: Vec<Point> = (0..10)
            .map(|i| flat_point(i as f64 * 0.1, 0.0, 0.0))
            .collect();
        points.push(flat_point(100.0, 0.0, 0.0));
        PointCloud::from_points(points)
    }

    #[test]
    fn test_sor_removes_isolated_point() {
        let cloud = line_cloud_with_outlier();
        let (inliers, outliers) = statistical_outlier_removal(&cloud, 2, 1.0).unwrap();
        assert_eq!(inliers.len(), 10);
        assert_eq!(outliers.len(), 1);
        assert_relative_eq!(outliers.xs[0], 100.0);
    }

    #[test]
    fn test_sor_monotone_in_z_thresh() {
        let cloud = line_cloud_with_outlier();
        let mut previous = 0;
        for z_thresh in [0.0, 0.5, 1.0, 2.0, 10.0] {
            let (inliers, _) = statistical_outlier_removal(&cloud, 2, z_thresh).unwrap();
            assert!(
                inliers.len() >= previous,
                "inlier count dropped from {} to {} at z_thresh {}",
                previous,
                inliers.len(),
                z_thresh
            );
            previous = inliers.len();
        }
        // A generous threshold keeps everything.
        let (all, none) = statistical_outlier_removal(&cloud, 2, 10.0).unwrap();
        assert_eq!(all.len(), cloud.len());
        assert_eq!(none.len(), 0);
    }

    #[test]
    fn test_sor_rejects_zero_k() {
        let cloud = line_cloud_with_outlier();
        assert!(matches!(
            statistical_outlier_removal(&cloud, 0, 1.0),
            Err(MargaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_sor_tiny_clouds_pass_through() {
        let empty = PointCloud::new();
        let (inliers, outliers) = statistical_outlier_removal(&empty, 5, 1.0).unwrap();
        assert!(inliers.is_empty() && outliers.is_empty());

        let single = PointCloud::from_points(vec![flat_point(1.0, 2.0, 3.0)]);
        let (inliers, outliers) = statistical_outlier_removal(&single, 5, 1.0).unwrap();
        assert_eq!(inliers.len(), 1);
        assert!(outliers.is_empty());
    }

    #[test]
    fn test_sor_clamps_k_to_cloud_size() {
        let cloud = PointCloud::from_points(vec![
            flat_point(0.0, 0.0, 0.0),
            flat_point(0.1, 0.0, 0.0),
            flat_point(0.2, 0.0, 0.0),
        ]);
        // k far larger than the cloud still partitions cleanly.
        let (inliers, outliers) = statistical_outlier_removal(&cloud, 50, 1.0).unwrap();
        assert_eq!(inliers.len() + outliers.len(), 3);
    }

    #[test]
    fn test_z_band_inclusive_bounds() {
        let cloud = PointCloud::from_points(vec![
            flat_point(0.0, 0.0, -1.0),
            flat_point(0.0, 0.0, 0.0),
            flat_point(0.0, 0.0, 1.0),
            flat_point(0.0, 0.0, 1.0001),
        ]);
        let (inliers, outliers) = z_band_filter(&cloud, -1.0, 1.0);
        assert_eq!(inliers.len(), 3);
        assert_eq!(outliers.len(), 1);
    }

    #[test]
    fn test_intensity_band_inclusive_bounds() {
        let cloud = PointCloud::from_points(vec![
            Point::new(0.0, 0.0, 0.0, 36.9),
            Point::new(0.0, 0.0, 0.0, 37.0),
            Point::new(0.0, 0.0, 0.0, 50.0),
            Point::new(0.0, 0.0, 0.0, 72.0),
            Point::new(0.0, 0.0, 0.0, 72.1),
        ]);
        let (inliers, outliers) = intensity_band_filter(&cloud, 37.0, 72.0);
        assert_eq!(inliers.len(), 3);
        assert_eq!(outliers.len(), 2);
    }

    #[test]
    fn test_derive_intensity_band() {
        // μ = 20, σ = sqrt(300) ≈ 17.32 → lo = 37, hi (n = 3) = 72.
        let cloud = PointCloud::from_points(vec![
            Point::new(0.0, 0.0, 0.0, 10.0),
            Point::new(0.0, 0.0, 0.0, 10.0),
            Point::new(0.0, 0.0, 0.0, 10.0),
            Point::new(0.0, 0.0, 0.0, 50.0),
        ]);
        let (lo, hi) = derive_intensity_band(&cloud, 3.0).unwrap();
        assert_relative_eq!(lo, 37.0);
        assert_relative_eq!(hi, 72.0);
    }

    #[test]
    fn test_derive_intensity_band_empty() {
        assert!(derive_intensity_band(&PointCloud::new(), 3.0).is_none());
    }
}
