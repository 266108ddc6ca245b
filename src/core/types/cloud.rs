//! Point and point-cloud types.

use serde::{Deserialize, Serialize};

use super::pose::Pose;

/// A single lidar return: position in the sensor frame plus reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Sensor-calibrated reflectance, unitless and non-negative.
    pub intensity: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, intensity: f64) -> Self {
        Self { x, y, z, intensity }
    }

    /// True when x, y and z are all finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Collection of points using Struct of Arrays (SoA) layout.
///
/// Instead of `Vec<Point>` (x,y,z,i,x,y,z,i...), stores one vector per
/// channel. Filters operate on single channels at a time and the spatial
/// index is built from x/y/z only, so the columnar layout avoids touching
/// intensity data on those paths.
///
/// Insertion order carries no meaning; all points share the sensor frame
/// they were captured in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PointCloud {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub zs: Vec<f64>,
    /// Same length as the coordinate channels.
    pub intensities: Vec<f64>,
}

impl PointCloud {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
            zs: Vec::with_capacity(capacity),
            intensities: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points (converts AoS to SoA).
    pub fn from_points(points: Vec<Point>) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push(p);
        }
        cloud
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.xs.push(point.x);
        self.ys.push(point.y);
        self.zs.push(point.z);
        self.intensities.push(point.intensity);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Get point at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    pub fn point_at(&self, i: usize) -> Point {
        Point {
            x: self.xs[i],
            y: self.ys[i],
            z: self.zs[i],
            intensity: self.intensities[i],
        }
    }

    /// Get the spatial coordinates at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    pub fn xyz(&self, i: usize) -> [f64; 3] {
        [self.xs[i], self.ys[i], self.zs[i]]
    }

    /// Iterate over points (creates `Point` on the fly).
    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.len()).map(move |i| self.point_at(i))
    }

    /// Append all points of `other`.
    pub fn extend_from(&mut self, other: &PointCloud) {
        self.xs.extend_from_slice(&other.xs);
        self.ys.extend_from_slice(&other.ys);
        self.zs.extend_from_slice(&other.zs);
        self.intensities.extend_from_slice(&other.intensities);
    }

    /// Split into (kept, rejected) clouds according to a per-point mask.
    ///
    /// `mask[i] == true` sends point `i` into the first cloud. The mask
    /// must have one entry per point.
    ///
    /// # Panics
    /// Panics if `mask.len() != self.len()`.
    pub fn split_by_mask(&self, mask: &[bool]) -> (PointCloud, PointCloud) {
        assert_eq!(mask.len(), self.len(), "mask length must match point count");
        let kept_count = mask.iter().filter(|&&m| m).count();
        let mut kept = PointCloud::with_capacity(kept_count);
        let mut rejected = PointCloud::with_capacity(self.len() - kept_count);
        for (i, &keep) in mask.iter().enumerate() {
            if keep {
                kept.push(self.point_at(i));
            } else {
                rejected.push(self.point_at(i));
            }
        }
        (kept, rejected)
    }

    /// Axis-aligned bounding box as `(min, max)` corners over x/y/z.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        if self.is_empty() {
            return None;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for i in 0..self.len() {
            let p = self.xyz(i);
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }

    /// Transform all points by a rigid pose: `p' = R·p + t` on x/y/z,
    /// intensity passed through unchanged.
    pub fn transform(&self, pose: &Pose) -> PointCloud {
        let mut result = PointCloud::with_capacity(self.len());
        for i in 0..self.len() {
            let [x, y, z] = pose.transform_point(self.xyz(i));
            result.push(Point::new(x, y, z, self.intensities[i]));
        }
        result
    }
}
