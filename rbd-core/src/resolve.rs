//! Iterative contact resolution.
//!
//! The resolver takes one frame's batch of contacts and fixes penetration
//! and velocity in two passes:
//!
//! 1. **Penetration**: worst-first. Each iteration scans the pending
//!    contacts for the greatest positive penetration, wakes sleepers paired
//!    with awake bodies, projects the pair apart, removes the contact from
//!    the pending set, and propagates the positional change into the
//!    penetration of every other pending contact that shares a body.
//! 2. **Velocity**: a single pass in insertion order, each contact
//!    computing and applying its own frictionless impulse.
//!
//! Exhausting the iteration budget is graceful degradation, not an error:
//! an overconstrained scene keeps some penetration for the next frame.

use rbd_types::{PhysError, Result};
use tracing::debug;

use crate::arena::BodyArena;
use crate::contact::{Contact, DEFAULT_ANGULAR_LIMIT};

/// Default penetration-iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Iterative, priority-ordered impulse and penetration solver.
#[derive(Debug, Clone)]
pub struct ContactResolver {
    max_iterations: usize,
    angular_limit: f64,
}

impl Default for ContactResolver {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            angular_limit: DEFAULT_ANGULAR_LIMIT,
        }
    }
}

/// What one resolution pass did, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveStats {
    /// Penetration iterations actually used.
    pub iterations_used: usize,
    /// Contacts whose penetration was resolved.
    pub penetrations_resolved: usize,
}

impl ContactResolver {
    /// Create a resolver with the given iteration budget.
    pub fn new(max_iterations: usize) -> Result<Self> {
        if max_iterations == 0 {
            return Err(PhysError::invalid_config(
                "resolver iteration budget must be at least 1",
            ));
        }
        Ok(Self {
            max_iterations,
            angular_limit: DEFAULT_ANGULAR_LIMIT,
        })
    }

    /// Set the angular share limit for positional projection.
    #[must_use]
    pub fn with_angular_limit(mut self, angular_limit: f64) -> Self {
        self.angular_limit = angular_limit;
        self
    }

    /// The iteration budget.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Resolve one frame's contact batch: penetration first, then
    /// velocity.
    pub fn resolve(
        &self,
        contacts: &mut [Contact],
        bodies: &mut BodyArena,
        dt: f64,
    ) -> ResolveStats {
        let stats = self.resolve_penetrations(contacts, bodies);
        self.resolve_velocities(contacts, bodies, dt);
        stats
    }

    fn resolve_penetrations(&self, contacts: &mut [Contact], bodies: &mut BodyArena) -> ResolveStats {
        let mut pending: Vec<usize> = (0..contacts.len()).collect();
        let mut stats = ResolveStats::default();

        while stats.iterations_used < self.max_iterations {
            // Worst positive penetration; a strict comparison keeps the
            // first of equals.
            let mut worst: Option<(usize, f64)> = None;
            for (position, &index) in pending.iter().enumerate() {
                let penetration = contacts[index].penetration();
                if penetration > 0.0 && worst.map_or(true, |(_, depth)| penetration > depth) {
                    worst = Some((position, penetration));
                }
            }
            let Some((position, _)) = worst else {
                break;
            };
            let resolved = pending.remove(position);

            contacts[resolved].wake_pair(bodies);
            let shifts = contacts[resolved].resolve_penetration(self.angular_limit, bodies);

            // Moving a body changes the penetration of every other pending
            // contact it participates in.
            for &index in &pending {
                for shift in shifts.iter().flatten() {
                    let Some(moved) = bodies.get(shift.body) else {
                        continue;
                    };
                    let is_reference = contacts[index].reference() == shift.body;
                    let is_other = contacts[index].other() == Some(shift.body);
                    if !is_reference && !is_other {
                        continue;
                    }
                    let lever = contacts[index].point() - moved.position();
                    let delta = shift.linear + shift.rotation.cross(&lever);
                    let change = delta.dot(&contacts[index].normal());
                    // Moving the reference along the normal separates the
                    // pair; moving the other deepens it.
                    if is_reference {
                        contacts[index].adjust_penetration(-change);
                    } else {
                        contacts[index].adjust_penetration(change);
                    }
                }
            }

            stats.iterations_used += 1;
            stats.penetrations_resolved += 1;
        }

        if !pending.is_empty() {
            debug!(
                remaining = pending.len(),
                iterations = stats.iterations_used,
                "penetration budget exhausted"
            );
        }
        stats
    }

    fn resolve_velocities(&self, contacts: &[Contact], bodies: &mut BodyArena, dt: f64) {
        for contact in contacts {
            contact.resolve_velocity(dt, bodies);
        }
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
    use nalgebra::{Point3, Vector3};
    use rbd_types::{inertia, ContactParams};

    fn contact_params() -> ContactParams {
        ContactParams::new(0.0, 1.0, 0.0).unwrap()
    }

    fn ball(arena: &mut BodyArena, y: f64) -> rbd_types::BodyId {
        arena.add(
            RigidBody::new(
                1.0,
                inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
                Point3::new(0.0, y, 0.0),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(ContactResolver::new(0).is_err());
        assert!(ContactResolver::new(1).is_ok());
    }

    #[test]
    fn test_single_scenery_contact_resolved_in_one_iteration() {
        let mut arena = BodyArena::new();
        let body = ball(&mut arena, 0.5);

        // Sphere of radius 1 sunk 0.5 into the ground. The contact point
        // is straight below the center, so the lever arm is parallel to
        // the normal and the projection is purely linear.
        let mut contacts = vec![Contact::new(
            body,
            None,
            Point3::new(0.0, -0.5, 0.0),
            Vector3::y(),
            0.5,
            &contact_params(),
            &arena,
        )
        .unwrap()];

        let resolver = ContactResolver::default();
        let stats = resolver.resolve_penetrations(&mut contacts, &mut arena);

        assert_eq!(stats.iterations_used, 1);
        // The body moved up by the full penetration.
        assert_relative_eq!(arena.get(body).unwrap().position().y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_worst_penetration_resolved_first() {
        let mut arena = BodyArena::new();
        let shallow_body = ball(&mut arena, 0.9);
        let deep_body = ball(&mut arena, 0.4);

        let shallow = Contact::new(
            shallow_body,
            None,
            Point3::new(0.0, -0.1, 0.0),
            Vector3::y(),
            0.1,
            &contact_params(),
            &arena,
        )
        .unwrap();
        let deep = Contact::new(
            deep_body,
            None,
            Point3::new(0.0, -0.6, 0.0),
            Vector3::y(),
            0.6,
            &contact_params(),
            &arena,
        )
        .unwrap();
        let mut contacts = vec![shallow, deep];

        let resolver = ContactResolver::new(1).unwrap();
        resolver.resolve_penetrations(&mut contacts, &mut arena);

        // Only the deeper contact fit the budget.
        assert_relative_eq!(
            arena.get(deep_body).unwrap().position().y,
            1.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            arena.get(shallow_body).unwrap().position().y,
            0.9,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_shared_body_contacts_get_adjusted() {
        let mut arena = BodyArena::new();
        let body = ball(&mut arena, 0.5);

        // Two scenery contacts under the same body with the same normal:
        // resolving the deeper one lifts the body and shrinks the other.
        let deep = Contact::new(
            body,
            None,
            Point3::new(0.0, -0.5, 0.0),
            Vector3::y(),
            0.5,
            &contact_params(),
            &arena,
        )
        .unwrap();
        let shallow = Contact::new(
            body,
            None,
            Point3::new(0.2, -0.5, 0.0),
            Vector3::y(),
            0.3,
            &contact_params(),
            &arena,
        )
        .unwrap();
        let mut contacts = vec![deep, shallow];

        let resolver = ContactResolver::new(1).unwrap();
        resolver.resolve_penetrations(&mut contacts, &mut arena);

        // The shared-body fixup subtracted the lift from the second
        // contact's stored penetration.
        assert!(contacts[1].penetration() <= 0.0 + 1e-9);
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let mut arena = BodyArena::new();
        let a = ball(&mut arena, 0.5);
        let b = ball(&mut arena, 0.6);

        let mut contacts = vec![
            Contact::new(
                a,
                None,
                Point3::new(0.0, -0.5, 0.0),
                Vector3::y(),
                0.5,
                &contact_params(),
                &arena,
            )
            .unwrap(),
            Contact::new(
                b,
                None,
                Point3::new(0.0, -0.4, 0.0),
                Vector3::y(),
                0.4,
                &contact_params(),
                &arena,
            )
            .unwrap(),
        ];

        let resolver = ContactResolver::new(1).unwrap();
        let stats = resolver.resolve(&mut contacts, &mut arena, 0.01);
        assert_eq!(stats.iterations_used, 1);
    }

    #[test]
    fn test_velocity_pass_in_insertion_order() {
        let mut arena = BodyArena::new();
        let body = ball(&mut arena, 0.0);
        arena
            .get_mut(body)
            .unwrap()
            .set_velocity(Vector3::new(0.0, -2.0, 0.0));

        let mut contacts = vec![Contact::new(
            body,
            None,
            Point3::origin(),
            Vector3::y(),
            0.0,
            &contact_params(),
            &arena,
        )
        .unwrap()];

        let resolver = ContactResolver::default();
        resolver.resolve(&mut contacts, &mut arena, 0.01);

        // Elastic bounce: velocity reversed.
        assert!(arena.get(body).unwrap().velocity().y > 0.0);
    }
}
