//! RANSAC ground-plane segmentation.
//!
//! Splits a frame into ground and non-ground by fitting a single dominant
//! plane: random point triples propose candidate planes, each candidate is
//! scored by how many points lie within a distance threshold, and the best
//! candidate's inliers become the ground set. A fixed seed makes the
//! sampling reproducible.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::types::PointCloud;
use crate::error::{MargaError, Result};

/// Configuration for [`segment_ground`].
#[derive(Debug, Clone)]
pub struct GroundConfig {
    /// Maximum point-to-plane distance in meters for a point to count as
    /// ground. Default: 0.3
    pub distance_threshold: f64,
    /// Points drawn per sampling round; the plane is fit to the first
    /// three. Default: 3
    pub ransac_points: usize,
    /// Number of sampling rounds. Default: 1000
    pub max_iterations: usize,
    /// Seed for the sampling RNG; `None` seeds from the OS. Default: None
    pub seed: Option<u64>,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.3,
            ransac_points: 3,
            max_iterations: 1000,
            seed: None,
        }
    }
}

impl GroundConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inlier distance threshold.
    pub fn with_distance_threshold(mut self, threshold: f64) -> Self {
        self.distance_threshold = threshold;
        self
    }

    /// Set the number of points drawn per sampling round.
    pub fn with_ransac_points(mut self, points: usize) -> Self {
        self.ransac_points = points;
        self
    }

    /// Set the number of sampling rounds.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Fix the sampling seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Plane in Hessian normal form: `normal · p + d = 0` with `|normal| = 1`.
#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: [f64; 3],
    d: f64,
}

impl Plane {
    /// Fit a plane through three points. Returns `None` when the points
    /// are (nearly) collinear.
    fn from_triple(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Option<Self> {
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let cross = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        let norm = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        if norm < 1e-12 {
            return None;
        }
        let normal = [cross[0] / norm, cross[1] / norm, cross[2] / norm];
        let d = -(normal[0] * a[0] + normal[1] * a[1] + normal[2] * a[2]);
        Some(Self { normal, d })
    }

    #[inline]
    fn distance(&self, p: [f64; 3]) -> f64 {
        (self.normal[0] * p[0] + self.normal[1] * p[1] + self.normal[2] * p[2] + self.d).abs()
    }
}

/// Segment the dominant plane out of `cloud`.
///
/// Returns `(ground, non_ground)`; together the two clouds contain every
/// input point exactly once. Sampling rounds whose points are collinear
/// are skipped without counting against the score.
///
/// # Errors
/// - `InvalidParameter` if `ransac_points < 3` or `max_iterations < 1`.
/// - `InsufficientPoints` if the cloud has fewer than `ransac_points`
///   points.
/// - `PlaneFitFailed` if every sampling round was degenerate (all points
///   collinear).
pub fn segment_ground(cloud: &PointCloud, config: &GroundConfig) -> Result<(PointCloud, PointCloud)> {
    if config.ransac_points < 3 {
        return Err(MargaError::InvalidParameter {
            name: "ransac_points",
            reason: format!("a plane needs at least 3 points, got {}", config.ransac_points),
        });
    }
    if config.max_iterations < 1 {
        return Err(MargaError::InvalidParameter {
            name: "max_iterations",
            reason: "must be at least 1".to_string(),
        });
    }
    if cloud.len() < config.ransac_points {
        return Err(MargaError::InsufficientPoints {
            needed: config.ransac_points,
            got: cloud.len(),
        });
    }

    let mut rng: StdRng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut best_plane: Option<Plane> = None;
    let mut best_count = 0usize;

    for _ in 0..config.max_iterations {
        let sample = sample_distinct(&mut rng, cloud.len(), config.ransac_points);
        let plane = match Plane::from_triple(
            cloud.xyz(sample[0]),
            cloud.xyz(sample[1]),
            cloud.xyz(sample[2]),
        ) {
            Some(plane) => plane,
            None => continue,
        };

        let count = (0..cloud.len())
            .filter(|&i| plane.distance(cloud.xyz(i)) <= config.distance_threshold)
            .count();

        if count > best_count {
            best_count = count;
            best_plane = Some(plane);
        }
    }

    let plane = best_plane.ok_or(MargaError::PlaneFitFailed {
        iterations: config.max_iterations,
    })?;

    debug!(
        "ground plane normal ({:.3}, {:.3}, {:.3}), d {:.3}, {} of {} inliers",
        plane.normal[0],
        plane.normal[1],
        plane.normal[2],
        plane.d,
        best_count,
        cloud.len()
    );

    let mask: Vec<bool> = (0..cloud.len())
        .map(|i| plane.distance(cloud.xyz(i)) <= config.distance_threshold)
        .collect();
    Ok(cloud.split_by_mask(&mask))
}

/// Draw `count` distinct indices from `0..len`.
fn sample_distinct(rng: &mut StdRng, len: usize, count: usize) -> Vec<usize> {
    let mut sample: Vec<usize> = Vec::with_capacity(count);
    while sample.len() < count {
        let candidate = rng.random_range(0..len);
        if !sample.contains(&candidate) {
            sample.push(candidate);
        }
    }
    sample
}
