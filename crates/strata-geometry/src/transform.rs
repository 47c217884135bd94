//! Affine transformations for placing antennas in survey coordinates.
//!
//! Loops are usually specified about their own centre and then moved to a
//! station, rotated to the flight-line heading, or raised to a flying
//! height. Coordinates follow the earth convention: $x$ north, $y$ east,
//! $z$ down.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// An affine transformation: rotation/scale matrix + translation.
#[derive(Debug, Clone)]
pub struct Transform {
    /// 3x3 rotation/scale matrix.
    pub matrix: Matrix3<f64>,
    /// Translation vector (m).
    pub translation: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

impl Transform {
    /// Create a pure translation.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            matrix: Matrix3::identity(),
            translation: Vector3::new(dx, dy, dz),
        }
    }

    /// Create a uniform scale about the origin.
    pub fn uniform_scale(factor: f64) -> Self {
        Self {
            matrix: Matrix3::identity() * factor,
            translation: Vector3::zeros(),
        }
    }

    /// Rotate about the vertical axis by `heading_deg` degrees.
    ///
    /// Positive headings turn $x$ towards $y$ (north towards east).
    pub fn rotation_z(heading_deg: f64) -> Self {
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), heading_deg.to_radians());
        Self {
            matrix: *rot.matrix(),
            translation: Vector3::zeros(),
        }
    }

    /// Apply this transformation to a 3D point.
    pub fn apply(&self, point: &[f64; 3]) -> [f64; 3] {
        let v = Vector3::new(point[0], point[1], point[2]);
        let result = self.matrix * v + self.translation;
        [result.x, result.y, result.z]
    }

    /// Compose two transforms: self followed by other.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            matrix: other.matrix * self.matrix,
            translation: other.matrix * self.translation + other.translation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_transform() {
        let t = Transform::default();
        let result = t.apply(&[1.0, 2.0, 3.0]);
        assert_eq!(result, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_heading_then_station() {
        let t = Transform::rotation_z(90.0).then(&Transform::translation(100.0, 0.0, -30.0));
        let result = t.apply(&[10.0, 0.0, 0.0]);
        assert_abs_diff_eq!(result[0], 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[1], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[2], -30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_and_translate() {
        let t = Transform::uniform_scale(2.0).then(&Transform::translation(1.0, 0.0, 0.0));
        let result = t.apply(&[1.0, 1.0, 1.0]);
        assert_abs_diff_eq!(result[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[2], 2.0, epsilon = 1e-12);
    }
}
