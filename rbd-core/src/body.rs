//! Rigid body state and integration.
//!
//! A [`RigidBody`] is the simulated entity: center-of-mass position,
//! orientation, linear and angular velocity, force/torque accumulators, and
//! the sleep state machine. Integration is semi-implicit per step: forces
//! become accelerations, accelerations update velocities, damped velocities
//! update position and orientation.
//!
//! Two invariants hold throughout:
//!
//! - the orientation is renormalized after every additive update;
//! - a body with zero inverse mass is never moved or rotated, whether by
//!   integration, impulse, or positional projection.

use nalgebra::{Isometry3, Matrix3, Point3, Quaternion, UnitQuaternion, Vector3};
use rbd_types::{PhysError, Result};

/// Default per-unit-time velocity decay factor.
const DEFAULT_DAMPING: f64 = 0.999;

/// Multiple of the sleep threshold at which the motion bias is clamped, so
/// a long burst of activity doesn't postpone sleep indefinitely.
const SLEEP_BIAS_CLAMP: f64 = 10.0;

/// A rigid body: the simulated entity of the engine.
///
/// The position is the center of mass; all vector quantities are relative
/// to it. Built with [`RigidBody::new`] for dynamic bodies or
/// [`RigidBody::immovable`] for infinite-mass scenery bodies.
#[derive(Debug, Clone)]
pub struct RigidBody {
    inverse_mass: f64,
    position: Point3<f64>,
    velocity: Vector3<f64>,
    acceleration: Vector3<f64>,
    last_acceleration: Vector3<f64>,
    force_accum: Vector3<f64>,
    torque_accum: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    angular_velocity: Vector3<f64>,
    inv_inertia_body: Matrix3<f64>,
    linear_damping: f64,
    angular_damping: f64,
    can_sleep: bool,
    motion: f64,
    sleep_threshold: f64,
    awake: bool,
}

impl RigidBody {
    /// Create a dynamic body at rest at the given position.
    ///
    /// `inv_inertia_body` is the inverse of the body-space inertia tensor;
    /// see [`rbd_types::inertia`] for constructors. Fails with
    /// [`PhysError::InvalidMass`] for non-positive or non-finite mass.
    pub fn new(
        mass: f64,
        inv_inertia_body: Matrix3<f64>,
        position: Point3<f64>,
    ) -> Result<Self> {
        if mass <= 0.0 || !mass.is_finite() {
            return Err(PhysError::invalid_mass(format!(
                "mass must be positive and finite, got {mass}"
            )));
        }
        Ok(Self {
            inverse_mass: 1.0 / mass,
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            last_acceleration: Vector3::zeros(),
            force_accum: Vector3::zeros(),
            torque_accum: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            inv_inertia_body,
            linear_damping: DEFAULT_DAMPING,
            angular_damping: DEFAULT_DAMPING,
            can_sleep: false,
            motion: 0.0,
            sleep_threshold: 0.0,
            awake: true,
        })
    }

    /// Create an immovable (infinite-mass) body.
    ///
    /// Its inverse mass and inverse inertia are zero, so no impulse or
    /// integration step ever moves it.
    #[must_use]
    pub fn immovable(position: Point3<f64>) -> Self {
        Self {
            inverse_mass: 0.0,
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            last_acceleration: Vector3::zeros(),
            force_accum: Vector3::zeros(),
            torque_accum: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            inv_inertia_body: Matrix3::zeros(),
            linear_damping: DEFAULT_DAMPING,
            angular_damping: DEFAULT_DAMPING,
            can_sleep: false,
            motion: 0.0,
            sleep_threshold: 0.0,
            awake: true,
        }
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the initial acceleration (e.g. a constant gravity baked in).
    #[must_use]
    pub fn with_acceleration(mut self, acceleration: Vector3<f64>) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Set the initial orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the initial angular velocity.
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: Vector3<f64>) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set the linear and angular damping factors.
    ///
    /// Damping is a multiplicative per-unit-time decay applied as
    /// `factor^dt` each step; values belong in `(0, 1]`.
    #[must_use]
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Mark the body sleep-capable with the given motion threshold.
    ///
    /// The motion bias is seeded above the threshold so the body isn't put
    /// to sleep on its very first step.
    #[must_use]
    pub fn with_sleep(mut self, threshold: f64) -> Self {
        self.set_sleepable(threshold);
        self
    }

    // --- accessors -------------------------------------------------------

    /// Inverse mass; zero means immovable.
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        self.inverse_mass
    }

    /// Mass; infinite for immovable bodies.
    #[must_use]
    pub fn mass(&self) -> f64 {
        if self.inverse_mass == 0.0 {
            f64::INFINITY
        } else {
            1.0 / self.inverse_mass
        }
    }

    /// Whether the body can be moved by forces and impulses.
    #[must_use]
    pub fn has_finite_mass(&self) -> bool {
        self.inverse_mass > 0.0
    }

    /// Center-of-mass position in world coordinates.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Set the position.
    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    /// Linear velocity.
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Set the linear velocity.
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }

    /// Orientation as a unit quaternion.
    #[must_use]
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// Set the orientation; the input is renormalized.
    pub fn set_orientation(&mut self, orientation: Quaternion<f64>) {
        self.orientation = UnitQuaternion::from_quaternion(orientation);
    }

    /// Angular velocity in world coordinates.
    #[must_use]
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    /// Set the angular velocity.
    pub fn set_angular_velocity(&mut self, angular_velocity: Vector3<f64>) {
        self.angular_velocity = angular_velocity;
    }

    /// Acceleration carried over from the previous step, including applied
    /// forces. Used by the resolver to discount resting-contact velocity.
    #[must_use]
    pub fn last_acceleration(&self) -> Vector3<f64> {
        self.last_acceleration
    }

    /// Net accumulated force for the current step.
    #[must_use]
    pub fn net_force(&self) -> Vector3<f64> {
        self.force_accum
    }

    /// Net accumulated torque for the current step.
    #[must_use]
    pub fn net_torque(&self) -> Vector3<f64> {
        self.torque_accum
    }

    /// Inverse inertia tensor in body space.
    #[must_use]
    pub fn inv_inertia_body(&self) -> Matrix3<f64> {
        self.inv_inertia_body
    }

    /// Inverse inertia tensor in world space, derived from the current
    /// orientation on each query.
    #[must_use]
    pub fn inv_inertia_world(&self) -> Matrix3<f64> {
        let r = self.orientation.to_rotation_matrix().into_inner();
        r * self.inv_inertia_body * r.transpose()
    }

    /// The body's pose as an isometry (rotation then translation).
    #[must_use]
    pub fn pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(self.position.coords.into(), self.orientation)
    }

    /// Transform a point from body-local to world coordinates.
    #[must_use]
    pub fn point_to_world(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.orientation * local.coords
    }

    /// Transform a point from world to body-local coordinates.
    #[must_use]
    pub fn point_to_local(&self, world: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.orientation.inverse() * (world - self.position))
    }

    /// Velocity of a world-space point rigidly attached to the body:
    /// v + ω × r.
    #[must_use]
    pub fn velocity_at_point(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity.cross(&(point - self.position))
    }

    /// Moment of inertia about an axis through a world-space point, as the
    /// velocity change along that axis per unit of impulse applied there.
    #[must_use]
    pub fn inertia_about(&self, axis: &Vector3<f64>, point: &Point3<f64>) -> f64 {
        let r = point - self.position;
        let torque_per_impulse = r.cross(axis);
        let rotation_per_impulse = self.inv_inertia_world() * torque_per_impulse;
        rotation_per_impulse.cross(&r).dot(axis)
    }

    // --- force accumulation ----------------------------------------------

    /// Add a force acting at the center of mass; generates no torque.
    ///
    /// No-op on an immovable body.
    pub fn apply_force(&mut self, force: Vector3<f64>) {
        if self.has_finite_mass() {
            self.force_accum += force;
        }
    }

    /// Add a torque.
    ///
    /// No-op on an immovable body.
    pub fn apply_torque(&mut self, torque: Vector3<f64>) {
        if self.has_finite_mass() {
            self.torque_accum += torque;
        }
    }

    /// Add a world-space force acting at a world-space point, accumulating
    /// both the force and the torque r × F it generates about the center of
    /// mass.
    pub fn apply_force_at_point(&mut self, force: Vector3<f64>, point: Point3<f64>) {
        if self.has_finite_mass() {
            self.force_accum += force;
            let r = point - self.position;
            self.torque_accum += r.cross(&force);
        }
    }

    /// Reset the force and torque accumulators to zero.
    pub fn clear_accumulators(&mut self) {
        self.force_accum = Vector3::zeros();
        self.torque_accum = Vector3::zeros();
    }

    // --- integration ------------------------------------------------------

    /// Advance the body by `dt` seconds.
    ///
    /// Asleep and immovable bodies are left untouched. The step records the
    /// last-frame acceleration, applies accumulated force and torque,
    /// damps both velocities, advances position and orientation, clears
    /// the accumulators, and finally updates the sleep state machine.
    pub fn integrate(&mut self, dt: f64) {
        if !self.awake || !self.has_finite_mass() {
            return;
        }

        self.last_acceleration = self.acceleration + self.force_accum * self.inverse_mass;

        let linear_acceleration = self.force_accum * self.inverse_mass;
        let angular_acceleration = self.inv_inertia_body * self.torque_accum;

        self.velocity += linear_acceleration * dt;
        self.angular_velocity += angular_acceleration * dt;

        self.velocity *= self.linear_damping.powf(dt);
        self.angular_velocity *= self.angular_damping.powf(dt);

        self.position += self.velocity * dt;
        self.orientation = integrate_orientation(&self.orientation, &(self.angular_velocity * dt));

        self.clear_accumulators();

        if self.can_sleep {
            // Kinetic-energy proxy blended into a time-decayed bias; the
            // weight halves every second of simulated time.
            let proxy = self.velocity.norm_squared() + self.angular_velocity.norm_squared();
            let bias = 0.5_f64.powf(dt);
            self.motion = bias * self.motion + (1.0 - bias) * proxy;

            if self.motion < self.sleep_threshold {
                self.fall_asleep();
            } else if self.motion > SLEEP_BIAS_CLAMP * self.sleep_threshold {
                self.motion = SLEEP_BIAS_CLAMP * self.sleep_threshold;
            }
        }
    }

    // --- sleep state machine ---------------------------------------------

    /// Mark the body sleep-capable with the given motion threshold, seeding
    /// the motion bias to twice the threshold.
    pub fn set_sleepable(&mut self, threshold: f64) {
        self.can_sleep = true;
        self.sleep_threshold = threshold;
        self.motion = 2.0 * threshold;
    }

    /// Whether the body may be put to sleep.
    #[must_use]
    pub fn can_sleep(&self) -> bool {
        self.can_sleep
    }

    /// Whether the body is currently awake.
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Current motion bias (diagnostic).
    #[must_use]
    pub fn motion(&self) -> f64 {
        self.motion
    }

    /// Wake the body.
    ///
    /// The motion bias is seeded to twice the sleep threshold so the next
    /// integration step doesn't immediately put it back to sleep.
    pub fn wake(&mut self) {
        self.awake = true;
        self.motion = 2.0 * self.sleep_threshold;
    }

    /// Put a sleep-capable body to sleep, zeroing both velocities.
    pub(crate) fn fall_asleep(&mut self) {
        self.awake = false;
        self.velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
    }

    // --- resolver hooks ---------------------------------------------------

    /// Apply an impulse at a world-space point: the linear velocity changes
    /// by ±J·m⁻¹, the angular velocity by ±I⁻¹(r × J). `sign` is +1 for the
    /// contact's reference body and −1 for the other.
    pub(crate) fn apply_impulse(&mut self, impulse: &Vector3<f64>, point: &Point3<f64>, sign: f64) {
        if !self.has_finite_mass() {
            return;
        }
        self.velocity += impulse * self.inverse_mass * sign;
        let r = point - self.position;
        self.angular_velocity += self.inv_inertia_world() * r.cross(impulse) * sign;
    }

    /// Directly move the body and nudge its orientation, as penetration
    /// projection does. The rotation is an angle-scaled axis applied with
    /// the additive quaternion rule (no time step involved).
    pub(crate) fn shift(&mut self, linear: &Vector3<f64>, rotation: &Vector3<f64>) {
        if !self.has_finite_mass() {
            return;
        }
        self.position += linear;
        if rotation.norm_squared() > 0.0 {
            self.orientation = integrate_orientation(&self.orientation, rotation);
        }
    }
}

/// Additive quaternion update: θ' = θ + (1/2)·ω⊗θ, renormalized.
///
/// `delta` is an angular displacement (ω·dt for integration, or a direct
/// rotation amount for positional projection).
fn integrate_orientation(
    orientation: &UnitQuaternion<f64>,
    delta: &Vector3<f64>,
) -> UnitQuaternion<f64> {
    let omega = Quaternion::new(0.0, delta.x, delta.y, delta.z);
    let q = orientation.into_inner();
    UnitQuaternion::from_quaternion(q + omega * q * 0.5)
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
    use approx::assert_relative_eq;
    use rbd_types::inertia;

    fn make_body() -> RigidBody {
        let inv_inertia = inertia::inv_solid_sphere(2.0, 0.5).unwrap();
        RigidBody::new(2.0, inv_inertia, Point3::origin()).unwrap()
    }

    #[test]
    fn test_rejects_bad_mass() {
        assert!(RigidBody::new(0.0, Matrix3::identity(), Point3::origin()).is_err());
        assert!(RigidBody::new(-1.0, Matrix3::identity(), Point3::origin()).is_err());
        assert!(RigidBody::new(f64::NAN, Matrix3::identity(), Point3::origin()).is_err());
    }

    #[test]
    fn test_force_integrates_to_velocity_and_position() {
        let mut body = make_body().with_damping(1.0, 1.0);
        body.apply_force(Vector3::new(2.0, 0.0, 0.0));
        body.integrate(1.0);

        // a = F/m = 1; v = a·dt = 1; x = v·dt = 1
        assert_relative_eq!(body.velocity().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.position().x, 1.0, epsilon = 1e-12);
        // accumulators cleared
        assert_eq!(body.net_force(), Vector3::zeros());
    }

    #[test]
    fn test_last_frame_acceleration_recorded() {
        let mut body = make_body();
        body.apply_force(Vector3::new(4.0, 0.0, 0.0));
        body.integrate(0.01);
        assert_relative_eq!(body.last_acceleration().x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_damping_decays_velocity() {
        let mut body = make_body()
            .with_velocity(Vector3::new(1.0, 0.0, 0.0))
            .with_damping(0.5, 0.5);
        body.integrate(1.0);
        assert_relative_eq!(body.velocity().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_orientation_stays_unit_under_spin() {
        let mut body = make_body().with_angular_velocity(Vector3::new(3.0, -2.0, 1.0));
        for _ in 0..100 {
            body.integrate(0.02);
            let norm = body.orientation().into_inner().norm();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_immovable_never_moves() {
        let mut body = RigidBody::immovable(Point3::new(1.0, 2.0, 3.0));
        body.apply_force(Vector3::new(100.0, 0.0, 0.0));
        body.apply_torque(Vector3::new(0.0, 100.0, 0.0));
        body.apply_impulse(&Vector3::new(10.0, 0.0, 0.0), &Point3::origin(), 1.0);
        body.shift(&Vector3::new(1.0, 0.0, 0.0), &Vector3::zeros());
        body.integrate(1.0);

        assert_eq!(body.position(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(body.velocity(), Vector3::zeros());
        assert_eq!(body.net_force(), Vector3::zeros());
    }

    #[test]
    fn test_force_at_point_generates_torque() {
        let mut body = make_body();
        body.apply_force_at_point(Vector3::new(0.0, 1.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        // r × F = (1,0,0) × (0,1,0) = (0,0,1)
        assert_relative_eq!(body.net_torque().z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.net_force().y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inv_inertia_world_follows_orientation() {
        let inv_inertia = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0));
        let rotation =
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let body = RigidBody::new(1.0, inv_inertia, Point3::origin())
            .unwrap()
            .with_orientation(rotation);

        let world = body.inv_inertia_world();
        // 90° about Z swaps the X and Y diagonal entries.
        assert_relative_eq!(world[(0, 0)], 2.0, epsilon = 1e-9);
        assert_relative_eq!(world[(1, 1)], 1.0, epsilon = 1e-9);
        assert_relative_eq!(world[(2, 2)], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_velocity_at_point() {
        let body = make_body().with_angular_velocity(Vector3::new(0.0, 0.0, 1.0));
        let v = body.velocity_at_point(&Point3::new(1.0, 0.0, 0.0));
        // ω × r = (0,0,1) × (1,0,0) = (0,1,0)
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sleep_transition_and_wake() {
        let mut body = make_body()
            .with_velocity(Vector3::new(0.01, 0.0, 0.0))
            .with_sleep(0.1);
        assert!(body.is_awake());

        let mut frames = 0;
        while body.is_awake() && frames < 1000 {
            body.integrate(0.1);
            frames += 1;
        }
        assert!(!body.is_awake(), "body should eventually fall asleep");
        assert_eq!(body.velocity(), Vector3::zeros());
        assert_eq!(body.angular_velocity(), Vector3::zeros());

        body.wake();
        assert!(body.is_awake());
        assert_relative_eq!(body.motion(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_sleeping_body_not_integrated() {
        let mut body = make_body().with_sleep(0.1);
        body.fall_asleep();
        body.apply_force(Vector3::new(1.0, 0.0, 0.0));
        body.integrate(1.0);
        assert_eq!(body.position(), Point3::origin());
    }

    #[test]
    fn test_motion_bias_clamped() {
        let mut body = make_body()
            .with_velocity(Vector3::new(100.0, 0.0, 0.0))
            .with_sleep(0.1);
        body.integrate(0.1);
        assert!(body.motion() <= 10.0 * 0.1 + 1e-12);
    }
}
