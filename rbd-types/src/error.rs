//! Error types for simulation operations.

use thiserror::Error;

/// Errors that can occur during simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysError {
    /// Invalid body ID referenced.
    #[error("invalid body ID: {0}")]
    InvalidBodyId(u64),

    /// Invalid mass for a body.
    #[error("invalid mass: {reason}")]
    InvalidMass {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid spring constant or rest length.
    #[error("invalid spring: {reason}")]
    InvalidSpring {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid shape dimension (non-positive radius or half-extent).
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// A contact was constructed without a movable body on either side.
    #[error("degenerate contact: {reason}")]
    DegenerateContact {
        /// Description of what's wrong.
        reason: String,
    },

    /// An inertia tensor with zero determinant cannot be inverted.
    #[error("inertia tensor is singular and cannot be inverted")]
    SingularInertia,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A body that is not sleep-capable was asked to sleep.
    #[error("body {0} is not sleep-capable")]
    CannotSleep(u64),
}

impl PhysError {
    /// Create an invalid mass error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMass {
            reason: reason.into(),
        }
    }

    /// Create an invalid spring error.
    #[must_use]
    pub fn invalid_spring(reason: impl Into<String>) -> Self {
        Self::InvalidSpring {
            reason: reason.into(),
        }
    }

    /// Create an invalid shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create a degenerate contact error.
    #[must_use]
    pub fn degenerate_contact(reason: impl Into<String>) -> Self {
        Self::DegenerateContact {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this is a construction-time validation error.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMass { .. }
                | Self::InvalidSpring { .. }
                | Self::InvalidShape { .. }
                | Self::InvalidConfig { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhysError::InvalidBodyId(42);
        assert!(err.to_string().contains("42"));

        let err = PhysError::InvalidTimestep(-0.5);
        assert!(err.to_string().contains("-0.5"));

        let err = PhysError::invalid_mass("mass must be positive");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_error_predicates() {
        let err = PhysError::invalid_config("bad budget");
        assert!(err.is_config_error());
        assert!(err.is_validation_error());

        let err = PhysError::SingularInertia;
        assert!(!err.is_config_error());
        assert!(!err.is_validation_error());
    }
}
