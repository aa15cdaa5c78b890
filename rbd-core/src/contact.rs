//! Contact data and per-contact resolution machinery.
//!
//! A [`Contact`] fully describes one collision between a movable reference
//! body and either another body or immovable scenery. It carries the world
//! contact point, the unit contact normal (pointing toward the reference
//! body), the penetration depth already reduced by the generator's
//! pessimism offset, the material coefficients, and a derived orthonormal
//! contact basis whose x-axis is the normal.
//!
//! Contacts are ephemeral: built during the narrow phase, consumed by one
//! resolution pass, then discarded.

use nalgebra::{Matrix3, Point3, Vector3};
use rbd_types::{BodyId, ContactParams, PhysError, Result};

use crate::arena::BodyArena;

/// Closing speeds below this threshold get no restitution, so near-resting
/// contacts settle instead of jittering.
pub const DEFAULT_MIN_CONTACT_VELOCITY: f64 = 0.01;

/// Fraction of the contact lever arm the angular share of a positional
/// projection may not exceed.
pub const DEFAULT_ANGULAR_LIMIT: f64 = 0.5;

/// A fully-described collision between two bodies, or between a body and
/// immovable scenery.
#[derive(Debug, Clone)]
pub struct Contact {
    reference: BodyId,
    other: Option<BodyId>,
    point: Point3<f64>,
    normal: Vector3<f64>,
    penetration: f64,
    friction: f64,
    restitution: f64,
    basis: Matrix3<f64>,
}

/// Positional change applied to one body by penetration projection, used
/// to fix up the stored penetration of other contacts sharing the body.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyShift {
    pub body: BodyId,
    pub linear: Vector3<f64>,
    pub rotation: Vector3<f64>,
}

impl Contact {
    /// Build a contact.
    ///
    /// The reference body must be movable: if it is immovable the sides are
    /// swapped (and the normal flipped to keep pointing at the reference);
    /// an immovable other side collapses to scenery (`None`). Fails with
    /// [`PhysError::DegenerateContact`] when no movable side remains, the
    /// reference handle is stale, or the normal has zero length.
    ///
    /// `penetration` is the raw measured depth; the offset from `params` is
    /// subtracted here, once.
    pub fn new(
        reference: BodyId,
        other: Option<BodyId>,
        point: Point3<f64>,
        normal: Vector3<f64>,
        penetration: f64,
        params: &ContactParams,
        bodies: &BodyArena,
    ) -> Result<Self> {
        let length = normal.norm();
        if length == 0.0 || !length.is_finite() {
            return Err(PhysError::degenerate_contact("zero-length contact normal"));
        }
        let mut normal = normal / length;

        let mut reference = reference;
        let mut other = match other {
            Some(id) if bodies.try_get(id)?.has_finite_mass() => Some(id),
            _ => None,
        };

        if !bodies.try_get(reference)?.has_finite_mass() {
            // The reference side must be able to respond to impulses. The
            // normal flips with the swap so it keeps pointing toward the
            // new reference.
            match other.take() {
                Some(movable) => {
                    reference = movable;
                    normal = -normal;
                }
                None => {
                    return Err(PhysError::degenerate_contact(
                        "both sides of the contact are immovable",
                    ));
                }
            }
        }

        Ok(Self {
            reference,
            other,
            point,
            normal,
            penetration: penetration - params.penetration_offset,
            friction: params.friction,
            restitution: params.restitution,
            basis: orthonormal_basis(&normal),
        })
    }

    /// The movable reference body.
    #[must_use]
    pub fn reference(&self) -> BodyId {
        self.reference
    }

    /// The other body; `None` means collision with static scenery.
    #[must_use]
    pub fn other(&self) -> Option<BodyId> {
        self.other
    }

    /// World contact point.
    #[must_use]
    pub fn point(&self) -> Point3<f64> {
        self.point
    }

    /// Unit contact normal, pointing toward the reference body.
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Penetration depth, already reduced by the penetration offset.
    /// Positive means overlap remains to be resolved.
    #[must_use]
    pub fn penetration(&self) -> f64 {
        self.penetration
    }

    /// Friction coefficient for this contact.
    #[must_use]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Restitution coefficient for this contact.
    #[must_use]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Contact basis: columns are the contact axes in world coordinates,
    /// x-axis equal to the contact normal.
    #[must_use]
    pub fn basis(&self) -> Matrix3<f64> {
        self.basis
    }

    pub(crate) fn adjust_penetration(&mut self, delta: f64) {
        self.penetration += delta;
    }

    /// Cross-wake rule: a collision between an asleep and an awake body
    /// wakes the asleep one. Collisions with scenery never wake anything.
    pub(crate) fn wake_pair(&self, bodies: &mut BodyArena) {
        let Some(other) = self.other else {
            return;
        };
        let (Some(reference_awake), Some(other_awake)) = (
            bodies.get(self.reference).map(|b| b.is_awake()),
            bodies.get(other).map(|b| b.is_awake()),
        ) else {
            return;
        };
        if reference_awake != other_awake {
            if reference_awake {
                if let Some(body) = bodies.get_mut(other) {
                    body.wake();
                }
            } else if let Some(body) = bodies.get_mut(self.reference) {
                body.wake();
            }
        }
    }

    /// Velocity change along the normal that one unit of impulse at the
    /// contact point produces on `body`: the inverse mass plus the
    /// rotational contribution through the world inverse inertia tensor.
    fn velocity_per_unit_impulse(&self, body: &crate::body::RigidBody) -> f64 {
        let r = self.point - body.position();
        let torque_per_impulse = r.cross(&self.normal);
        let rotation_per_impulse = body.inv_inertia_world() * torque_per_impulse;
        rotation_per_impulse.cross(&r).dot(&self.normal) + body.inverse_mass()
    }

    /// Relative velocity of the contact point, reference minus other (zero
    /// when the other side is scenery), in world coordinates.
    fn separating_velocity(&self, bodies: &BodyArena) -> Vector3<f64> {
        let reference_velocity = bodies
            .get(self.reference)
            .map(|b| b.velocity_at_point(&self.point))
            .unwrap_or_else(Vector3::zeros);
        match self.other.and_then(|id| bodies.get(id)) {
            Some(other) => reference_velocity - other.velocity_at_point(&self.point),
            None => reference_velocity,
        }
    }

    /// Desired change of the contact-point velocity along the normal.
    ///
    /// A bias from each body's last-frame acceleration discounts velocity
    /// that was only acquired by resting-contact forces this frame, and
    /// restitution is zeroed below the minimum closing speed, both of which
    /// keep resting stacks from being amplified into jitter.
    fn desired_delta_velocity(&self, dt: f64, bodies: &BodyArena) -> f64 {
        let mut acceleration_bias = bodies
            .get(self.reference)
            .map(|b| b.last_acceleration().dot(&self.normal) * dt)
            .unwrap_or_default();
        if let Some(other) = self.other.and_then(|id| bodies.get(id)) {
            acceleration_bias -= other.last_acceleration().dot(&self.normal) * dt;
        }

        // Closing velocity in contact coordinates; x is along the normal.
        let closing = self.basis.transpose() * self.separating_velocity(bodies);

        let restitution = if closing.x.abs() < DEFAULT_MIN_CONTACT_VELOCITY {
            0.0
        } else {
            self.restitution
        };

        -closing.x - restitution * (closing.x - acceleration_bias)
    }

    /// Compute and apply the frictionless collision impulse for this
    /// contact.
    pub(crate) fn resolve_velocity(&self, dt: f64, bodies: &mut BodyArena) {
        let Some(reference) = bodies.get(self.reference) else {
            return;
        };
        let mut response = self.velocity_per_unit_impulse(reference);
        if let Some(other) = self.other.and_then(|id| bodies.get(id)) {
            response += self.velocity_per_unit_impulse(other);
        }
        if response <= 0.0 {
            return;
        }

        let desired = self.desired_delta_velocity(dt, bodies);
        let impulse = self.normal * (desired / response);

        if let Some(body) = bodies.get_mut(self.reference) {
            body.apply_impulse(&impulse, &self.point, 1.0);
        }
        if let Some(body) = self.other.and_then(|id| bodies.get_mut(id)) {
            body.apply_impulse(&impulse, &self.point, -1.0);
        }
    }

    /// Resolve this contact's penetration by non-linear projection, moving
    /// each participant directly in position and orientation.
    ///
    /// Returns the shifts applied, so the resolver can adjust the stored
    /// penetration of other contacts sharing a body.
    pub(crate) fn resolve_penetration(
        &self,
        angular_limit: f64,
        bodies: &mut BodyArena,
    ) -> [Option<BodyShift>; 2] {
        let mut shifts = [None, None];

        // Total inertia of the pair at the contact, along the normal.
        let mut total_inertia = 0.0;
        for id in self.participants().into_iter().flatten() {
            if let Some(body) = bodies.get(id) {
                total_inertia += body.inverse_mass() + body.inertia_about(&self.normal, &self.point);
            }
        }
        if total_inertia <= 0.0 {
            return shifts;
        }

        for (slot, id) in self.participants().into_iter().enumerate() {
            let Some(body) = id.and_then(|id| bodies.get(id)) else {
                continue;
            };
            let sign = if slot == 0 { 1.0 } else { -1.0 };

            let linear_inertia = body.inverse_mass();
            let angular_inertia = body.inertia_about(&self.normal, &self.point);

            let mut linear_move = sign * self.penetration * linear_inertia / total_inertia;
            let mut angular_move = sign * self.penetration * angular_inertia / total_inertia;

            // Cap the angular share by a fraction of the lever arm; the
            // excess becomes linear movement.
            let r = self.point - body.position();
            let limit = angular_limit * r.norm();
            if angular_move.abs() > limit {
                let total_move = linear_move + angular_move;
                angular_move = limit * angular_move.signum();
                linear_move = total_move - angular_move;
            }

            let rotation = if angular_move == 0.0 || angular_inertia == 0.0 {
                Vector3::zeros()
            } else {
                let torque_direction = r.cross(&self.normal);
                let rotation_direction = body.inv_inertia_world() * torque_direction;
                rotation_direction * (angular_move / angular_inertia)
            };
            let linear = self.normal * linear_move;

            if let (Some(id), Some(body)) = (id, id.and_then(|id| bodies.get_mut(id))) {
                body.shift(&linear, &rotation);
                shifts[slot] = Some(BodyShift {
                    body: id,
                    linear,
                    rotation,
                });
            }
        }

        shifts
    }

    fn participants(&self) -> [Option<BodyId>; 2] {
        [Some(self.reference), self.other]
    }
}

/// Orthonormal contact basis with the x-axis along the normal.
///
/// The seed for the remaining axes is whichever world axis (X or Y) is less
/// aligned with the normal, so the cross products cannot degenerate.
fn orthonormal_basis(normal: &Vector3<f64>) -> Matrix3<f64> {
    let x = *normal;
    let seed = if x.x.abs() > x.y.abs() {
        Vector3::y()
    } else {
        Vector3::x()
    };
    let z = x.cross(&seed).normalize();
    let y = z.cross(&x);
    Matrix3::from_columns(&[x, y, z])
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
    use rbd_types::inertia;

    fn params_without_offset() -> ContactParams {
        ContactParams::new(0.0, 1.0, 0.0).unwrap()
    }

    fn dynamic_body(x: f64) -> RigidBody {
        RigidBody::new(
            1.0,
            inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
            Point3::new(x, 0.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_penetration_reduced_by_offset() {
        let mut arena = BodyArena::new();
        let a = arena.add(dynamic_body(0.0));
        let params = ContactParams::new(0.0, 1.0, 0.005).unwrap();
        let contact = Contact::new(
            a,
            None,
            Point3::origin(),
            Vector3::y(),
            0.1,
            &params,
            &arena,
        )
        .unwrap();
        assert_relative_eq!(contact.penetration(), 0.095, epsilon = 1e-12);
    }

    #[test]
    fn test_immovable_reference_swapped_and_normal_flipped() {
        let mut arena = BodyArena::new();
        let wall = arena.add(RigidBody::immovable(Point3::origin()));
        let ball = arena.add(dynamic_body(1.0));

        let contact = Contact::new(
            wall,
            Some(ball),
            Point3::origin(),
            Vector3::x(),
            0.1,
            &params_without_offset(),
            &arena,
        )
        .unwrap();

        assert_eq!(contact.reference(), ball);
        assert_eq!(contact.other(), None);
        assert_relative_eq!(contact.normal().x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_both_immovable_fails() {
        let mut arena = BodyArena::new();
        let a = arena.add(RigidBody::immovable(Point3::origin()));
        let b = arena.add(RigidBody::immovable(Point3::new(1.0, 0.0, 0.0)));

        let result = Contact::new(
            a,
            Some(b),
            Point3::origin(),
            Vector3::x(),
            0.1,
            &params_without_offset(),
            &arena,
        );
        assert!(matches!(
            result,
            Err(PhysError::DegenerateContact { .. })
        ));
    }

    #[test]
    fn test_zero_normal_fails() {
        let mut arena = BodyArena::new();
        let a = arena.add(dynamic_body(0.0));
        let result = Contact::new(
            a,
            None,
            Point3::origin(),
            Vector3::zeros(),
            0.1,
            &params_without_offset(),
            &arena,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for normal in [
            Vector3::x(),
            Vector3::y(),
            Vector3::z(),
            Vector3::new(1.0, 1.0, 1.0).normalize(),
            Vector3::new(-0.3, 0.8, 0.1).normalize(),
        ] {
            let basis = orthonormal_basis(&normal);
            let product = basis.transpose() * basis;
            assert_relative_eq!(product, Matrix3::identity(), epsilon = 1e-12);
            // First column is the normal itself.
            assert_relative_eq!(basis.column(0).into_owned(), normal, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_head_on_impulse_reverses_velocity() {
        let mut arena = BodyArena::new();
        // Ball moving down onto scenery; contact normal up. No rotation
        // involved since the contact is at the center height.
        let ball = arena.add(dynamic_body(0.0).with_velocity(Vector3::new(0.0, -1.0, 0.0)));
        let contact = Contact::new(
            ball,
            None,
            Point3::origin(),
            Vector3::y(),
            0.0,
            &params_without_offset(),
            &arena,
        )
        .unwrap();

        contact.resolve_velocity(0.0, &mut arena);

        // Perfectly elastic: closing velocity -1 becomes separating +1.
        let v = arena.get(ball).unwrap().velocity();
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slow_contact_gets_no_restitution() {
        let mut arena = BodyArena::new();
        let ball = arena.add(dynamic_body(0.0).with_velocity(Vector3::new(0.0, -0.005, 0.0)));
        let contact = Contact::new(
            ball,
            None,
            Point3::origin(),
            Vector3::y(),
            0.0,
            &params_without_offset(),
            &arena,
        )
        .unwrap();

        contact.resolve_velocity(0.0, &mut arena);

        // Restitution suppressed: the closing velocity is only cancelled.
        let v = arena.get(ball).unwrap().velocity();
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wake_pair() {
        let mut arena = BodyArena::new();
        let awake = arena.add(dynamic_body(0.0));
        let mut sleeper = dynamic_body(1.0).with_sleep(0.1);
        sleeper.fall_asleep();
        let asleep = arena.add(sleeper);

        let contact = Contact::new(
            awake,
            Some(asleep),
            Point3::origin(),
            Vector3::x(),
            0.1,
            &params_without_offset(),
            &arena,
        )
        .unwrap();
        contact.wake_pair(&mut arena);

        assert!(arena.get(asleep).unwrap().is_awake());
    }

    #[test]
    fn test_scenery_contact_never_wakes() {
        let mut arena = BodyArena::new();
        let mut sleeper = dynamic_body(0.0).with_sleep(0.1);
        sleeper.fall_asleep();
        let asleep = arena.add(sleeper);

        let contact = Contact::new(
            asleep,
            None,
            Point3::origin(),
            Vector3::y(),
            0.1,
            &params_without_offset(),
            &arena,
        )
        .unwrap();
        contact.wake_pair(&mut arena);

        assert!(!arena.get(asleep).unwrap().is_awake());
    }
}
