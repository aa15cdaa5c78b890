//! Shared types for rigid-body dynamics simulation.
//!
//! This crate provides the vocabulary common to every layer of the engine:
//!
//! - [`BodyId`] - Stable handle to a body in the simulation
//! - [`PhysError`] - Error type for construction and stepping failures
//! - [`WorldConfig`] - Resolver and broad-phase budgets
//! - [`ContactParams`] - Friction, restitution, penetration offset
//! - [`inertia`] - Inertia-tensor constructors for common solids
//!
//! # Design Philosophy
//!
//! These types are **pure data** plus validation. They have no physics, no
//! integration, no collision logic. They're the common language between the
//! engine core, embedding applications, and test harnesses.
//!
//! # Coordinate System
//!
//! Right-handed, Y up. Plane scenery is usually expressed as a normal of
//! `[0, 1, 0]` and a signed distance from the origin.
//!
//! # Example
//!
//! ```
//! use rbd_types::{BodyId, WorldConfig};
//!
//! let id = BodyId::new(7);
//! assert_eq!(id.raw(), 7);
//!
//! let config = WorldConfig::default();
//! assert!(config.validate().is_ok());
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
// Allow certain clippy lints that are overly pedantic for type definitions
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod config;
mod error;
mod id;
pub mod inertia;
mod params;

pub use config::WorldConfig;
pub use error::PhysError;
pub use id::BodyId;
pub use params::ContactParams;

// Re-export math types for convenience
pub use nalgebra::{Isometry3, Matrix3, Point3, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, PhysError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_compose() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let v = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!((p + v).x, 2.0);

        let q = UnitQuaternion::identity();
        assert_eq!((q * v).x, 1.0);
    }
}
