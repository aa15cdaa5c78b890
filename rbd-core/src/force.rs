//! Force generators.
//!
//! A force generator is registered against a set of target bodies and, once
//! per frame, adds a force and/or torque into each target's accumulator —
//! never overwriting what other generators contributed. Target handles are
//! validated when the generator is built, so application itself cannot fail;
//! a target removed from the world after registration is silently skipped.

use nalgebra::{Point3, Vector3};
use rbd_types::{BodyId, PhysError, Result};

use crate::arena::BodyArena;

/// Per-frame force injection over a registered target set.
pub trait ForceGenerator {
    /// Add this generator's force/torque to its targets' accumulators.
    fn apply(&self, bodies: &mut BodyArena);
}

fn validate_targets(targets: &[BodyId], bodies: &BodyArena) -> Result<()> {
    for &id in targets {
        bodies.try_get(id)?;
    }
    Ok(())
}

fn validate_spring(constant: f64, rest_length: f64) -> Result<()> {
    if constant <= 0.0 || !constant.is_finite() {
        return Err(PhysError::invalid_spring(format!(
            "spring constant must be positive, got {constant}"
        )));
    }
    if rest_length < 0.0 || !rest_length.is_finite() {
        return Err(PhysError::invalid_spring(format!(
            "rest length must be non-negative, got {rest_length}"
        )));
    }
    Ok(())
}

/// Uniform gravitational acceleration.
///
/// Applies `m·g` to each finite-mass target; immovable bodies are skipped
/// since the force would be physically meaningless.
#[derive(Debug, Clone)]
pub struct Gravity {
    acceleration: Vector3<f64>,
    targets: Vec<BodyId>,
}

impl Gravity {
    /// Standard Earth gravity, Y down.
    #[must_use]
    pub fn earth() -> Vector3<f64> {
        Vector3::new(0.0, -9.81, 0.0)
    }

    /// Create a gravity generator over the given targets.
    ///
    /// Fails with [`PhysError::InvalidBodyId`] if any target is absent.
    pub fn new(
        acceleration: Vector3<f64>,
        targets: Vec<BodyId>,
        bodies: &BodyArena,
    ) -> Result<Self> {
        validate_targets(&targets, bodies)?;
        Ok(Self {
            acceleration,
            targets,
        })
    }
}

impl ForceGenerator for Gravity {
    fn apply(&self, bodies: &mut BodyArena) {
        for &id in &self.targets {
            if let Some(body) = bodies.get_mut(id) {
                if body.has_finite_mass() {
                    let force = self.acceleration * body.mass();
                    body.apply_force(force);
                }
            }
        }
    }
}

/// Constant torque, as if each target's center of mass were pinned.
#[derive(Debug, Clone)]
pub struct ConstantTorque {
    torque: Vector3<f64>,
    targets: Vec<BodyId>,
}

impl ConstantTorque {
    /// Create a torque generator over the given targets.
    pub fn new(torque: Vector3<f64>, targets: Vec<BodyId>, bodies: &BodyArena) -> Result<Self> {
        validate_targets(&targets, bodies)?;
        Ok(Self { torque, targets })
    }
}

impl ForceGenerator for ConstantTorque {
    fn apply(&self, bodies: &mut BodyArena) {
        for &id in &self.targets {
            if let Some(body) = bodies.get_mut(id) {
                body.apply_torque(self.torque);
            }
        }
    }
}

/// Hooke's-law spring from a fixed world anchor to a point on one body.
///
/// The force acts at the attachment point, so an off-center attachment also
/// torques the body.
#[derive(Debug, Clone)]
pub struct AnchoredSpring {
    body: BodyId,
    /// Attachment point in the body's local frame.
    attachment: Point3<f64>,
    /// Anchor in world coordinates.
    anchor: Point3<f64>,
    spring_constant: f64,
    rest_length: f64,
}

impl AnchoredSpring {
    /// Create an anchored spring.
    ///
    /// Fails on an absent body, a non-positive spring constant, or a
    /// negative rest length.
    pub fn new(
        body: BodyId,
        attachment: Point3<f64>,
        anchor: Point3<f64>,
        spring_constant: f64,
        rest_length: f64,
        bodies: &BodyArena,
    ) -> Result<Self> {
        bodies.try_get(body)?;
        validate_spring(spring_constant, rest_length)?;
        Ok(Self {
            body,
            attachment,
            anchor,
            spring_constant,
            rest_length,
        })
    }
}

impl ForceGenerator for AnchoredSpring {
    fn apply(&self, bodies: &mut BodyArena) {
        let Some(body) = bodies.get_mut(self.body) else {
            return;
        };
        let attach_world = body.point_to_world(&self.attachment);
        let span = attach_world - self.anchor;
        let length = span.norm();
        if length == 0.0 {
            // Coincident endpoints give the spring no direction to pull.
            return;
        }
        let magnitude = -self.spring_constant * (length - self.rest_length);
        let force = span * (magnitude / length);
        body.apply_force_at_point(force, attach_world);
    }
}

/// Hooke's-law spring between attachment points on two bodies.
#[derive(Debug, Clone)]
pub struct Spring {
    body_a: BodyId,
    attachment_a: Point3<f64>,
    body_b: BodyId,
    attachment_b: Point3<f64>,
    spring_constant: f64,
    rest_length: f64,
}

impl Spring {
    /// Create a two-body spring.
    ///
    /// Fails on absent or identical bodies, a non-positive spring constant,
    /// or a negative rest length.
    pub fn new(
        body_a: BodyId,
        attachment_a: Point3<f64>,
        body_b: BodyId,
        attachment_b: Point3<f64>,
        spring_constant: f64,
        rest_length: f64,
        bodies: &BodyArena,
    ) -> Result<Self> {
        bodies.try_get(body_a)?;
        bodies.try_get(body_b)?;
        if body_a == body_b {
            return Err(PhysError::invalid_spring(
                "spring endpoints must be distinct bodies",
            ));
        }
        validate_spring(spring_constant, rest_length)?;
        Ok(Self {
            body_a,
            attachment_a,
            body_b,
            attachment_b,
            spring_constant,
            rest_length,
        })
    }
}

impl ForceGenerator for Spring {
    fn apply(&self, bodies: &mut BodyArena) {
        let Ok((a, b)) = bodies.get_pair_mut(self.body_a, self.body_b) else {
            return;
        };
        let attach_a = a.point_to_world(&self.attachment_a);
        let attach_b = b.point_to_world(&self.attachment_b);
        let span = attach_a - attach_b;
        let length = span.norm();
        if length == 0.0 {
            return;
        }
        let magnitude = -self.spring_constant * (length - self.rest_length);
        let force = span * (magnitude / length);
        a.apply_force_at_point(force, attach_a);
        b.apply_force_at_point(-force, attach_b);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::body::RigidBody;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn arena_with_bodies(n: usize) -> (BodyArena, Vec<BodyId>) {
        let mut arena = BodyArena::new();
        let ids = (0..n)
            .map(|i| {
                arena.add(
                    RigidBody::new(2.0, Matrix3::identity(), Point3::new(i as f64, 0.0, 0.0))
                        .unwrap(),
                )
            })
            .collect();
        (arena, ids)
    }

    #[test]
    fn test_gravity_applies_weight() {
        let (mut arena, ids) = arena_with_bodies(1);
        let gravity = Gravity::new(Gravity::earth(), ids.clone(), &arena).unwrap();
        gravity.apply(&mut arena);

        // F = m·g = 2 * -9.81
        let force = arena.get(ids[0]).unwrap().net_force();
        assert_relative_eq!(force.y, -19.62, epsilon = 1e-12);
    }

    #[test]
    fn test_gravity_skips_immovable() {
        let mut arena = BodyArena::new();
        let id = arena.add(RigidBody::immovable(Point3::origin()));
        let gravity = Gravity::new(Gravity::earth(), vec![id], &arena).unwrap();
        gravity.apply(&mut arena);
        assert_eq!(arena.get(id).unwrap().net_force(), Vector3::zeros());
    }

    #[test]
    fn test_generators_accumulate_not_overwrite() {
        let (mut arena, ids) = arena_with_bodies(1);
        let g1 = Gravity::new(Vector3::new(0.0, -1.0, 0.0), ids.clone(), &arena).unwrap();
        let g2 = Gravity::new(Vector3::new(1.0, 0.0, 0.0), ids.clone(), &arena).unwrap();
        g1.apply(&mut arena);
        g2.apply(&mut arena);

        let force = arena.get(ids[0]).unwrap().net_force();
        assert_relative_eq!(force.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(force.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_absent_target_fails_at_construction() {
        let (arena, _) = arena_with_bodies(1);
        let missing = BodyId::new(99);
        assert_eq!(
            Gravity::new(Gravity::earth(), vec![missing], &arena).unwrap_err(),
            PhysError::InvalidBodyId(99)
        );
    }

    #[test]
    fn test_spring_validation() {
        let (arena, ids) = arena_with_bodies(2);
        let origin = Point3::origin();

        assert!(AnchoredSpring::new(ids[0], origin, origin, 0.0, 1.0, &arena).is_err());
        assert!(AnchoredSpring::new(ids[0], origin, origin, -5.0, 1.0, &arena).is_err());
        assert!(AnchoredSpring::new(ids[0], origin, origin, 5.0, -1.0, &arena).is_err());
        assert!(Spring::new(ids[0], origin, ids[0], origin, 5.0, 1.0, &arena).is_err());
        assert!(Spring::new(ids[0], origin, ids[1], origin, 5.0, 1.0, &arena).is_ok());
    }

    #[test]
    fn test_anchored_spring_pulls_toward_anchor() {
        let (mut arena, ids) = arena_with_bodies(1);
        // Body at origin, anchor 3 m up, rest length 1 → stretched by 2.
        let spring = AnchoredSpring::new(
            ids[0],
            Point3::origin(),
            Point3::new(0.0, 3.0, 0.0),
            10.0,
            1.0,
            &arena,
        )
        .unwrap();
        spring.apply(&mut arena);

        // F = -k·(l - l0) along the span direction (0,-1,0): pulls up with 20 N.
        let force = arena.get(ids[0]).unwrap().net_force();
        assert_relative_eq!(force.y, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_two_body_spring_equal_and_opposite() {
        let (mut arena, ids) = arena_with_bodies(2);
        // Bodies 1 m apart, rest length 0.5 → attraction.
        let spring = Spring::new(
            ids[0],
            Point3::origin(),
            ids[1],
            Point3::origin(),
            4.0,
            0.5,
            &arena,
        )
        .unwrap();
        spring.apply(&mut arena);

        let fa = arena.get(ids[0]).unwrap().net_force();
        let fb = arena.get(ids[1]).unwrap().net_force();
        assert_relative_eq!(fa.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fb.x, -2.0, epsilon = 1e-12);
    }
}
