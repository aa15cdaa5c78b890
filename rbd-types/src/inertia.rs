//! Inertia-tensor constructors for common solids.
//!
//! Bodies carry the *inverse* of their body-space inertia tensor; these
//! helpers build the forward tensors for common solids and invert them,
//! failing explicitly when the tensor is singular.

use nalgebra::{Matrix3, Vector3};

use crate::{PhysError, Result};

/// Inertia tensor of a uniform solid sphere.
///
/// I = (2/5) * m * r² on each diagonal entry.
pub fn solid_sphere(mass: f64, radius: f64) -> Result<Matrix3<f64>> {
    check_mass(mass)?;
    if radius <= 0.0 || !radius.is_finite() {
        return Err(PhysError::invalid_shape(format!(
            "sphere radius must be positive, got {radius}"
        )));
    }
    let i = 0.4 * mass * radius * radius;
    Ok(Matrix3::from_diagonal(&Vector3::new(i, i, i)))
}

/// Inertia tensor of a uniform solid box with the given half-extents.
///
/// For full dimensions (x, y, z):
/// - Ixx = (1/12) * m * (y² + z²)
/// - Iyy = (1/12) * m * (x² + z²)
/// - Izz = (1/12) * m * (x² + y²)
pub fn solid_cuboid(mass: f64, half_extents: Vector3<f64>) -> Result<Matrix3<f64>> {
    check_mass(mass)?;
    if half_extents.iter().any(|&h| h <= 0.0 || !h.is_finite()) {
        return Err(PhysError::invalid_shape(format!(
            "box half-extents must be positive, got {half_extents:?}"
        )));
    }
    let x2 = 4.0 * half_extents.x * half_extents.x;
    let y2 = 4.0 * half_extents.y * half_extents.y;
    let z2 = 4.0 * half_extents.z * half_extents.z;

    let ixx = mass * (y2 + z2) / 12.0;
    let iyy = mass * (x2 + z2) / 12.0;
    let izz = mass * (x2 + y2) / 12.0;

    Ok(Matrix3::from_diagonal(&Vector3::new(ixx, iyy, izz)))
}

/// Invert an inertia tensor.
///
/// Fails with [`PhysError::SingularInertia`] when the determinant is zero
/// rather than returning a degenerate result.
pub fn inverse(inertia: &Matrix3<f64>) -> Result<Matrix3<f64>> {
    inertia.try_inverse().ok_or(PhysError::SingularInertia)
}

/// Inverse inertia tensor of a uniform solid sphere.
pub fn inv_solid_sphere(mass: f64, radius: f64) -> Result<Matrix3<f64>> {
    inverse(&solid_sphere(mass, radius)?)
}

/// Inverse inertia tensor of a uniform solid box.
pub fn inv_solid_cuboid(mass: f64, half_extents: Vector3<f64>) -> Result<Matrix3<f64>> {
    inverse(&solid_cuboid(mass, half_extents)?)
}

fn check_mass(mass: f64) -> Result<()> {
    if mass <= 0.0 || !mass.is_finite() {
        return Err(PhysError::invalid_mass(format!(
            "mass must be positive and finite, got {mass}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solid_sphere() {
        let i = solid_sphere(1.0, 1.0).unwrap();
        // (2/5) * 1 * 1²
        assert_relative_eq!(i[(0, 0)], 0.4, epsilon = 1e-12);
        assert_relative_eq!(i[(1, 1)], 0.4, epsilon = 1e-12);
        assert_relative_eq!(i[(2, 2)], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_solid_cuboid() {
        // 1x1x1 box with mass 12: I = (1/12) * 12 * (1 + 1) = 2
        let i = solid_cuboid(12.0, Vector3::new(0.5, 0.5, 0.5)).unwrap();
        assert_relative_eq!(i[(0, 0)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let i = solid_sphere(2.0, 0.5).unwrap();
        let inv = inverse(&i).unwrap();
        let product = i * inv;
        assert_relative_eq!(product, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_singular_inertia_fails() {
        let singular = Matrix3::zeros();
        assert_eq!(inverse(&singular), Err(PhysError::SingularInertia));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(solid_sphere(-1.0, 1.0).is_err());
        assert!(solid_sphere(1.0, 0.0).is_err());
        assert!(solid_cuboid(1.0, Vector3::new(1.0, -1.0, 1.0)).is_err());
    }
}
