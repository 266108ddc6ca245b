//! Rigid-body pose as a 4×4 homogeneous transform.

use serde::{Deserialize, Serialize};

/// 4×4 homogeneous rigid transform.
///
/// The upper-left 3×3 block is the rotation (orthonormal, det +1 for a
/// well-formed pose), the last column holds the translation. Pose `i` of a
/// trajectory maps frame-`i` local coordinates into the odometry origin
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Row-major matrix entries.
    pub m: [[f64; 4]; 4],
}

/// Ordered pose sequence, index-aligned with the frame sequence it
/// transforms.
pub type Trajectory = Vec<Pose>;

impl Pose {
    /// Identity transform.
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { m }
    }

    /// Build from a row-major 4×4 matrix.
    pub fn from_matrix(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    /// Pure translation.
    pub fn translation_xyz(x: f64, y: f64, z: f64) -> Self {
        let mut pose = Self::identity();
        pose.m[0][3] = x;
        pose.m[1][3] = y;
        pose.m[2][3] = z;
        pose
    }

    /// Rotation about the vertical axis by `degrees`, horizontal plane only
    /// (roll and pitch untouched).
    pub fn rotation_z_degrees(degrees: f64) -> Self {
        let radians = degrees.to_radians();
        let (sin, cos) = radians.sin_cos();
        Self {
            m: [
                [cos, -sin, 0.0, 0.0],
                [sin, cos, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Matrix product `self · other`: the composed transform applies
    /// `other` first, then `self`.
    pub fn compose(&self, other: &Pose) -> Pose {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Pose { m }
    }

    /// Apply the transform to a point: `R·p + t`.
    #[inline]
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let [x, y, z] = p;
        [
            self.m[0][0] * x + self.m[0][1] * y + self.m[0][2] * z + self.m[0][3],
            self.m[1][0] * x + self.m[1][1] * y + self.m[1][2] * z + self.m[1][3],
            self.m[2][0] * x + self.m[2][1] * y + self.m[2][2] * z + self.m[2][3],
        ]
    }

    /// Translation column.
    #[inline]
    pub fn translation(&self) -> [f64; 3] {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }

    /// Check rigidity: rotation block orthonormal with det +1, bottom row
    /// `(0, 0, 0, 1)`, all within `epsilon`.
    pub fn is_rigid(&self, epsilon: f64) -> bool {
        let r = &self.m;
        // R·Rᵀ == I
        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|k| r[i][k] * r[j][k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                if (dot - expected).abs() > epsilon {
                    return false;
                }
            }
        }
        let det = r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0]);
        if (det - 1.0).abs() > epsilon {
            return false;
        }
        let bottom = [0.0, 0.0, 0.0, 1.0];
        (0..4).all(|j| (self.m[3][j] - bottom[j]).abs() <= epsilon)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_transform() {
        let p = Pose::identity().transform_point([1.0, 2.0, 3.0]);
        assert_relative_eq!(p[0], 1.0);
        assert_relative_eq!(p[1], 2.0);
        assert_relative_eq!(p[2], 3.0);
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let pose = Pose::rotation_z_degrees(90.0);
        let p = pose.transform_point([1.0, 0.0, 5.0]);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);
        // z untouched by a heading rotation
        assert_relative_eq!(p[2], 5.0);
    }

    #[test]
    fn test_translation() {
        let pose = Pose::translation_xyz(10.0, -5.0, 2.0);
        let p = pose.transform_point([1.0, 1.0, 1.0]);
        assert_relative_eq!(p[0], 11.0);
        assert_relative_eq!(p[1], -4.0);
        assert_relative_eq!(p[2], 3.0);
        assert_eq!(pose.translation(), [10.0, -5.0, 2.0]);
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let rotate = Pose::rotation_z_degrees(90.0);
        let translate = Pose::translation_xyz(1.0, 0.0, 0.0);

        // rotate·translate: shift along x, then turn left.
        let p = rotate.compose(&translate).transform_point([0.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);

        // translate·rotate: turning first leaves the origin in place.
        let q = translate.compose(&rotate).transform_point([0.0, 0.0, 0.0]);
        assert_relative_eq!(q[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(q[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_composed_with_pose_moves_translation() {
        // Rotating a pose must rotate its translation column too.
        let pose = Pose::translation_xyz(1.0, 0.0, 0.0);
        let rotated = Pose::rotation_z_degrees(90.0).compose(&pose);
        let t = rotated.translation();
        assert_relative_eq!(t[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_is_rigid() {
        assert!(Pose::identity().is_rigid(1e-9));
        assert!(Pose::rotation_z_degrees(37.5).is_rigid(1e-9));
        assert!(Pose::translation_xyz(100.0, -3.0, 0.5).is_rigid(1e-9));

        let mut scaled = Pose::identity();
        scaled.m[0][0] = 2.0;
        assert!(!scaled.is_rigid(1e-9));

        // Mirror: orthonormal but det -1.
        let mut mirror = Pose::identity();
        mirror.m[0][0] = -1.0;
        assert!(!mirror.is_rigid(1e-9));
    }
}
