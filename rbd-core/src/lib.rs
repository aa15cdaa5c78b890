//! Rigid-body dynamics core.
//!
//! This crate provides the simulation loop and every stage of the per-frame
//! pipeline. It builds on [`rbd_types`] for handles, errors and
//! configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         World                                │
//! │  forces → integration → broad phase → narrow phase → solve  │
//! └───────┬──────────┬───────────┬────────────┬─────────┬───────┘
//!         │          │           │            │         │
//!         ▼          ▼           ▼            ▼         ▼
//!   ForceGenerator RigidBody BoundingVolume ContactGen ContactResolver
//!   (gravity,      (semi-    Tree (sphere-  (SAT, 5    (worst-first
//!    springs,       implicit  BVH, budgeted  pair       penetration +
//!    torques)       step)     pair query)    tests)     impulse pass)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use rbd_core::{CollisionSet, Gravity, Primitive, RigidBody, Shape, World};
//! use rbd_types::{inertia, ContactParams, Point3, Vector3, WorldConfig};
//!
//! # fn main() -> rbd_types::Result<()> {
//! let mut world = World::new(WorldConfig::default())?;
//!
//! // A falling unit sphere, 5 m up.
//! let inv_inertia = inertia::inv_solid_sphere(1.0, 1.0)?;
//! let ball = world.add_body(RigidBody::new(1.0, inv_inertia, Point3::new(0.0, 5.0, 0.0))?);
//!
//! // Gravity acts on it.
//! let gravity = Gravity::new(Vector3::new(0.0, -9.81, 0.0), vec![ball], world.bodies())?;
//! world.add_force_generator(Box::new(gravity));
//!
//! // A ground plane catches it.
//! let mut collisions = CollisionSet::new(ContactParams::default())?;
//! collisions.add_primitive(Primitive::new(ball, Shape::sphere(1.0)?), world.bodies())?;
//! collisions.add_plane(rbd_core::Plane::new(Vector3::new(0.0, 1.0, 0.0), 0.0)?);
//! world.add_contact_source(Box::new(collisions));
//!
//! // Advance one frame.
//! let stats = world.step(1.0 / 60.0)?;
//! assert_eq!(stats.contacts, 0); // still falling
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod arena;
mod body;
pub mod broad_phase;
mod contact;
mod force;
pub mod narrow;
mod resolve;
mod shapes;
mod world;

pub use arena::BodyArena;
pub use body::RigidBody;
pub use broad_phase::{BoundingSphere, BoundingVolumeTree, PotentialContact};
pub use contact::{Contact, DEFAULT_ANGULAR_LIMIT, DEFAULT_MIN_CONTACT_VELOCITY};
pub use force::{AnchoredSpring, ConstantTorque, ForceGenerator, Gravity, Spring};
pub use narrow::{ContactGenerator, WorldCuboid};
pub use resolve::{ContactResolver, ResolveStats, DEFAULT_MAX_ITERATIONS};
pub use shapes::{Plane, Primitive, Shape};
pub use world::{CollisionSet, ContactSource, StepStats, World};

// Re-export key types from rbd-types for convenience
pub use rbd_types::{BodyId, ContactParams, PhysError, Result, WorldConfig};
