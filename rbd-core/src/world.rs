//! World orchestration: the per-frame pipeline.
//!
//! The [`World`] owns all simulation state for the duration of a frame:
//! the body arena, the registered force generators, the registered
//! collision generators, and the resolver. One [`World::step`] runs the
//! whole pipeline — forces, integration, broad phase, narrow phase, one
//! combined penetration-then-velocity resolution — and completes fully
//! before returning. Contacts are rebuilt from scratch every frame.

use hashbrown::HashMap;
use rbd_types::{
    BodyId, ContactParams, PhysError, Point3, Result, UnitQuaternion, WorldConfig,
};
use tracing::{debug, trace};

use crate::arena::BodyArena;
use crate::body::RigidBody;
use crate::broad_phase::{BoundingSphere, BoundingVolumeTree};
use crate::contact::Contact;
use crate::force::ForceGenerator;
use crate::narrow::ContactGenerator;
use crate::resolve::{ContactResolver, ResolveStats};
use crate::shapes::{Plane, Primitive};

/// A registered collision generator: produces one frame's worth of
/// verified contacts, up to a budget of broad-phase candidates.
pub trait ContactSource {
    /// Generate this source's contacts for the current frame.
    fn generate(&self, bodies: &BodyArena, limit: usize) -> Result<Vec<Contact>>;
}

/// The default collision generator: a bounding-volume tree over registered
/// primitives, plus scenery planes, feeding the narrow phase.
pub struct CollisionSet {
    tree: BoundingVolumeTree,
    primitives: HashMap<BodyId, Primitive>,
    planes: Vec<Plane>,
    generator: ContactGenerator,
}

impl CollisionSet {
    /// Create an empty collision set with the given contact parameters.
    pub fn new(params: ContactParams) -> Result<Self> {
        Ok(Self {
            tree: BoundingVolumeTree::new(),
            primitives: HashMap::new(),
            planes: Vec::new(),
            generator: ContactGenerator::new(params)?,
        })
    }

    /// Register a primitive; its bounding sphere is built from the body's
    /// current pose and inserted into the tree.
    ///
    /// One primitive per body within a set; registering again replaces the
    /// old one.
    pub fn add_primitive(&mut self, primitive: Primitive, bodies: &BodyArena) -> Result<()> {
        let body = bodies.try_get(primitive.body)?;
        let volume = BoundingSphere::new(
            primitive.world_center(body),
            primitive.shape.bounding_radius(),
        )?;
        if self.primitives.contains_key(&primitive.body) {
            self.tree.remove(primitive.body);
        }
        self.tree.insert(primitive.body, volume);
        self.primitives.insert(primitive.body, primitive);
        Ok(())
    }

    /// Register an immovable scenery plane. Planes are not in the tree:
    /// they are tested against every registered primitive each frame.
    pub fn add_plane(&mut self, plane: Plane) {
        self.planes.push(plane);
    }

    /// Unregister a body's primitive.
    pub fn remove_body(&mut self, body: BodyId) {
        self.tree.remove(body);
        self.primitives.remove(&body);
    }

    /// Re-seat a body's bounding volume from its current pose.
    ///
    /// The tree re-tightens only at insertion boundaries, so a body that
    /// has moved far since registration should be re-seated for the broad
    /// phase to stay accurate.
    pub fn update_volume(&mut self, body: BodyId, bodies: &BodyArena) -> Result<()> {
        let primitive = self
            .primitives
            .get(&body)
            .cloned()
            .ok_or(PhysError::InvalidBodyId(body.raw()))?;
        self.tree.remove(body);
        let state = bodies.try_get(body)?;
        let volume = BoundingSphere::new(
            primitive.world_center(state),
            primitive.shape.bounding_radius(),
        )?;
        self.tree.insert(body, volume);
        Ok(())
    }
}

impl ContactSource for CollisionSet {
    fn generate(&self, bodies: &BodyArena, limit: usize) -> Result<Vec<Contact>> {
        let mut contacts = Vec::new();

        let pairs = self.tree.potential_contacts(limit);
        trace!(candidates = pairs.len(), "broad phase");
        for pair in pairs {
            let (Some(first), Some(second)) = (
                self.primitives.get(&pair.first),
                self.primitives.get(&pair.second),
            ) else {
                continue;
            };
            contacts.extend(self.generator.generate(first, second, bodies)?);
        }

        for primitive in self.primitives.values() {
            for plane in &self.planes {
                contacts.extend(self.generator.against_plane(primitive, plane, bodies)?);
            }
        }

        Ok(contacts)
    }
}

/// What one frame did, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepStats {
    /// Contacts generated by the narrow phase this frame.
    pub contacts: usize,
    /// Penetration-resolver iterations used this frame.
    pub resolver_iterations: usize,
}

/// The simulation world.
///
/// Bodies, force generators, and collision generators are registered once
/// and persist across frames; the per-frame contact batch is transient.
pub struct World {
    bodies: BodyArena,
    force_generators: Vec<Box<dyn ForceGenerator>>,
    contact_sources: Vec<Box<dyn ContactSource>>,
    resolver: ContactResolver,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self {
            bodies: BodyArena::new(),
            force_generators: Vec::new(),
            contact_sources: Vec::new(),
            resolver: ContactResolver::default(),
            config: WorldConfig::default(),
        }
    }
}

impl World {
    /// Create a world with the given configuration.
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bodies: BodyArena::new(),
            force_generators: Vec::new(),
            contact_sources: Vec::new(),
            resolver: ContactResolver::new(config.max_resolver_iterations)?,
            config,
        })
    }

    /// The world's configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Register a body, returning its stable handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        self.bodies.add(body)
    }

    /// Unregister a body, returning it.
    ///
    /// Any collision set still holding the body's primitive should have it
    /// removed as well; contacts and forces referring to the stale handle
    /// are skipped from then on.
    pub fn remove_body(&mut self, id: BodyId) -> Result<RigidBody> {
        self.bodies.remove(id)
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    /// Look up a body mutably.
    #[must_use]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    /// A body's current position (read-only frame query for rendering).
    pub fn position(&self, id: BodyId) -> Result<Point3<f64>> {
        Ok(self.bodies.try_get(id)?.position())
    }

    /// A body's current orientation (read-only frame query for rendering).
    pub fn orientation(&self, id: BodyId) -> Result<UnitQuaternion<f64>> {
        Ok(self.bodies.try_get(id)?.orientation())
    }

    /// The body arena, for constructing generators against live handles.
    #[must_use]
    pub fn bodies(&self) -> &BodyArena {
        &self.bodies
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Register a force generator.
    pub fn add_force_generator(&mut self, generator: Box<dyn ForceGenerator>) {
        self.force_generators.push(generator);
    }

    /// Register a collision generator.
    pub fn add_contact_source(&mut self, source: Box<dyn ContactSource>) {
        self.contact_sources.push(source);
    }

    /// Wake a body.
    pub fn wake_body(&mut self, id: BodyId) -> Result<()> {
        self.bodies.try_get_mut(id)?.wake();
        Ok(())
    }

    /// Put a sleep-capable body to sleep.
    ///
    /// Fails with [`PhysError::CannotSleep`] on a body that was never made
    /// sleep-capable.
    pub fn sleep_body(&mut self, id: BodyId) -> Result<()> {
        let body = self.bodies.try_get_mut(id)?;
        if !body.can_sleep() {
            return Err(PhysError::CannotSleep(id.raw()));
        }
        body.fall_asleep();
        Ok(())
    }

    /// Total linear kinetic energy of all finite-mass bodies (diagnostic).
    #[must_use]
    pub fn total_linear_kinetic_energy(&self) -> f64 {
        self.bodies
            .iter()
            .filter(|(_, b)| b.has_finite_mass())
            .map(|(_, b)| 0.5 * b.mass() * b.velocity().norm_squared())
            .sum()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Fails with [`PhysError::InvalidTimestep`] on a non-positive or
    /// non-finite duration. The pipeline: (1) every force generator runs
    /// once; (2) every awake body integrates; (3) every collision
    /// generator produces contacts under the frame's candidate budget;
    /// (4) the whole batch goes through one penetration-then-velocity
    /// resolution pass.
    pub fn step(&mut self, dt: f64) -> Result<StepStats> {
        if dt <= 0.0 || !dt.is_finite() {
            return Err(PhysError::InvalidTimestep(dt));
        }

        for generator in &self.force_generators {
            generator.apply(&mut self.bodies);
        }

        for (_, body) in self.bodies.iter_mut() {
            body.integrate(dt);
        }

        let mut contacts = Vec::new();
        let mut remaining = self.config.max_broadphase_contacts;
        for source in &self.contact_sources {
            if remaining == 0 {
                break;
            }
            let found = source.generate(&self.bodies, remaining)?;
            remaining = remaining.saturating_sub(found.len());
            contacts.extend(found);
        }

        let stats: ResolveStats = self.resolver.resolve(&mut contacts, &mut self.bodies, dt);
        debug!(
            contacts = contacts.len(),
            iterations = stats.iterations_used,
            "frame resolved"
        );

        Ok(StepStats {
            contacts: contacts.len(),
            resolver_iterations: stats.iterations_used,
        })
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
    use crate::force::Gravity;
    use crate::shapes::Shape;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rbd_types::inertia;

    fn sphere_body(y: f64) -> RigidBody {
        RigidBody::new(
            1.0,
            inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
            Point3::new(0.0, y, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_step_rejects_bad_duration() {
        let mut world = World::default();
        assert!(matches!(
            world.step(0.0),
            Err(PhysError::InvalidTimestep(_))
        ));
        assert!(matches!(
            world.step(-0.1),
            Err(PhysError::InvalidTimestep(_))
        ));
        assert!(matches!(
            world.step(f64::NAN),
            Err(PhysError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn test_gravity_makes_body_fall() {
        let mut world = World::default();
        let ball = world.add_body(sphere_body(10.0));
        let gravity = Gravity::new(Gravity::earth(), vec![ball], world.bodies()).unwrap();
        world.add_force_generator(Box::new(gravity));

        for _ in 0..60 {
            world.step(1.0 / 60.0).unwrap();
        }

        let position = world.position(ball).unwrap();
        assert!(position.y < 10.0, "body should have fallen");
        assert!(world.body(ball).unwrap().velocity().y < 0.0);
    }

    #[test]
    fn test_queries_and_registration() {
        let mut world = World::default();
        let ball = world.add_body(sphere_body(2.0));

        assert_eq!(world.body_count(), 1);
        assert_relative_eq!(world.position(ball).unwrap().y, 2.0, epsilon = 1e-12);
        assert_eq!(
            world.orientation(ball).unwrap(),
            UnitQuaternion::identity()
        );

        world.remove_body(ball).unwrap();
        assert_eq!(world.body_count(), 0);
        assert!(world.position(ball).is_err());
    }

    #[test]
    fn test_sleep_controls() {
        let mut world = World::default();
        let plain = world.add_body(sphere_body(0.0));
        assert_eq!(
            world.sleep_body(plain),
            Err(PhysError::CannotSleep(plain.raw()))
        );

        let sleepy = world.add_body(sphere_body(1.0).with_sleep(0.1));
        world.sleep_body(sleepy).unwrap();
        assert!(!world.body(sleepy).unwrap().is_awake());
        world.wake_body(sleepy).unwrap();
        assert!(world.body(sleepy).unwrap().is_awake());
    }

    #[test]
    fn test_collision_set_generates_scenery_contacts() {
        let mut world = World::default();
        let ball = world.add_body(sphere_body(0.5));

        let mut collisions = CollisionSet::new(ContactParams::new(0.0, 0.0, 0.0).unwrap()).unwrap();
        collisions
            .add_primitive(
                Primitive::new(ball, Shape::sphere(1.0).unwrap()),
                world.bodies(),
            )
            .unwrap();
        collisions.add_plane(Plane::new(Vector3::y(), 0.0).unwrap());

        let contacts = collisions.generate(world.bodies(), 16).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].penetration(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_falling_sphere_lands_on_plane() {
        let mut world = World::default();
        let ball = world.add_body(sphere_body(3.0).with_damping(0.95, 0.95));
        let gravity = Gravity::new(Gravity::earth(), vec![ball], world.bodies()).unwrap();
        world.add_force_generator(Box::new(gravity));

        let mut collisions = CollisionSet::new(ContactParams::new(0.0, 0.0, 0.01).unwrap()).unwrap();
        collisions
            .add_primitive(
                Primitive::new(ball, Shape::sphere(1.0).unwrap()),
                world.bodies(),
            )
            .unwrap();
        collisions.add_plane(Plane::new(Vector3::y(), 0.0).unwrap());
        world.add_contact_source(Box::new(collisions));

        let mut saw_contact = false;
        for _ in 0..240 {
            let stats = world.step(1.0 / 60.0).unwrap();
            saw_contact |= stats.contacts > 0;
        }

        assert!(saw_contact, "the sphere should have hit the plane");
        // Resting near one radius above the plane, never sunk through it.
        let y = world.position(ball).unwrap().y;
        assert!(y > 0.5 && y < 1.5, "unexpected resting height {y}");
    }

    #[test]
    fn test_candidate_budget_respected() {
        let mut world = World::default();
        let mut ids = Vec::new();
        for i in 0..4 {
            let body = world.add_body(RigidBody::new(
                1.0,
                inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
                Point3::new(1.5 * f64::from(i), 0.0, 0.0),
            )
            .unwrap());
            ids.push(body);
        }

        let mut collisions = CollisionSet::new(ContactParams::new(0.0, 0.0, 0.0).unwrap()).unwrap();
        for &id in &ids {
            collisions
                .add_primitive(Primitive::new(id, Shape::sphere(1.0).unwrap()), world.bodies())
                .unwrap();
        }

        let unbudgeted = collisions.generate(world.bodies(), 16).unwrap();
        let budgeted = collisions.generate(world.bodies(), 1).unwrap();
        assert!(budgeted.len() <= 1);
        assert!(budgeted.len() <= unbudgeted.len());
    }
}
