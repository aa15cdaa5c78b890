//! Collision shapes for the narrow phase.
//!
//! A [`Primitive`] binds a shape to a body with a local offset transform;
//! several primitives can cover one irregular body. A [`Plane`] is
//! immovable scenery with no owning body.

use nalgebra::{Isometry3, Point3, Vector3};
use rbd_types::{BodyId, PhysError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;

/// Shape-specific extent of a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere with the given radius.
    Sphere {
        /// Sphere radius in meters.
        radius: f64,
    },
    /// Box with the given half-extents along its local axes.
    Cuboid {
        /// Half-extents of the box in each local axis.
        half_extents: Vector3<f64>,
    },
}

impl Shape {
    /// Create a sphere shape; the radius must be positive.
    pub fn sphere(radius: f64) -> Result<Self> {
        if radius <= 0.0 || !radius.is_finite() {
            return Err(PhysError::invalid_shape(format!(
                "sphere radius must be positive, got {radius}"
            )));
        }
        Ok(Self::Sphere { radius })
    }

    /// Create a box shape; every half-extent must be positive.
    pub fn cuboid(half_extents: Vector3<f64>) -> Result<Self> {
        if half_extents.iter().any(|&h| h <= 0.0 || !h.is_finite()) {
            return Err(PhysError::invalid_shape(format!(
                "box half-extents must be positive, got {half_extents:?}"
            )));
        }
        Ok(Self::Cuboid { half_extents })
    }

    /// Radius of a sphere that bounds the shape, for broad-phase volumes.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Cuboid { half_extents } => half_extents.norm(),
        }
    }
}

/// A shape attached to a body at a local offset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Primitive {
    /// The body this primitive bounds.
    pub body: BodyId,
    /// Offset of the primitive from the body's center of mass.
    pub offset: Isometry3<f64>,
    /// The shape itself.
    pub shape: Shape,
}

impl Primitive {
    /// Create a primitive centered on the body (identity offset).
    #[must_use]
    pub fn new(body: BodyId, shape: Shape) -> Self {
        Self {
            body,
            offset: Isometry3::identity(),
            shape,
        }
    }

    /// Set the primitive's offset from the body's center of mass.
    #[must_use]
    pub fn with_offset(mut self, offset: Isometry3<f64>) -> Self {
        self.offset = offset;
        self
    }

    /// The primitive's full world transform: body pose composed with the
    /// local offset.
    #[must_use]
    pub fn world_transform(&self, body: &RigidBody) -> Isometry3<f64> {
        body.pose() * self.offset
    }

    /// The primitive's center in world coordinates.
    #[must_use]
    pub fn world_center(&self, body: &RigidBody) -> Point3<f64> {
        self.world_transform(body) * Point3::origin()
    }
}

/// An infinite immovable plane: scenery, not a body.
///
/// Points satisfy `normal · x = distance` on the plane; the signed distance
/// of a point is positive on the side the normal faces.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    normal: Vector3<f64>,
    distance: f64,
}

impl Plane {
    /// Create a plane from a normal (normalized here) and a signed distance
    /// from the origin. Fails on a zero-length or non-finite normal.
    pub fn new(normal: Vector3<f64>, distance: f64) -> Result<Self> {
        let length = normal.norm();
        if length == 0.0 || !length.is_finite() {
            return Err(PhysError::invalid_shape(
                "plane normal must be a non-zero finite vector",
            ));
        }
        Ok(Self {
            normal: normal / length,
            distance,
        })
    }

    /// Unit normal of the plane.
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Signed distance of the plane from the origin.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Signed distance of a point from the plane:
    /// `point · normal − distance`.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        point.coords.dot(&self.normal) - self.distance
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Translation3, UnitQuaternion};

    #[test]
    fn test_shape_validation() {
        assert!(Shape::sphere(1.0).is_ok());
        assert!(Shape::sphere(0.0).is_err());
        assert!(Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).is_ok());
        assert!(Shape::cuboid(Vector3::new(1.0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn test_bounding_radius() {
        assert_eq!(Shape::sphere(2.0).unwrap().bounding_radius(), 2.0);
        let cuboid = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        assert_relative_eq!(cuboid.bounding_radius(), 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_primitive_offset_composes_with_pose() {
        let body = RigidBody::new(1.0, Matrix3::identity(), Point3::new(1.0, 0.0, 0.0))
            .unwrap()
            .with_orientation(UnitQuaternion::from_euler_angles(
                0.0,
                0.0,
                std::f64::consts::FRAC_PI_2,
            ));
        let primitive = Primitive::new(BodyId::new(0), Shape::sphere(0.5).unwrap())
            .with_offset(Translation3::new(1.0, 0.0, 0.0).into());

        // Offset (1,0,0) rotated 90° about Z becomes (0,1,0), then the
        // body position (1,0,0) is added.
        let center = primitive.world_center(&body);
        assert_relative_eq!(center.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(center.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_normalizes_and_measures() {
        let plane = Plane::new(Vector3::new(0.0, 2.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(plane.normal().y, 1.0, epsilon = 1e-12);

        assert_relative_eq!(
            plane.signed_distance(&Point3::new(0.0, 3.0, 0.0)),
            2.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            plane.signed_distance(&Point3::new(5.0, 0.0, 0.0)),
            -1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_plane_rejects_zero_normal() {
        assert!(Plane::new(Vector3::zeros(), 0.0).is_err());
    }
}
