//! World configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{PhysError, Result};

/// Budgets for the per-frame pipeline.
///
/// Both budgets degrade gracefully when exhausted: the broad phase stops
/// emitting candidate pairs, and the resolver leaves the remaining
/// penetration for the next frame. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Maximum iterations of the penetration-resolution loop per frame.
    ///
    /// Each iteration resolves the single worst remaining penetration, so
    /// heavily stacked scenes need more. An overconstrained scene simply
    /// keeps some penetration after the budget is spent.
    pub max_resolver_iterations: usize,

    /// Maximum candidate pairs any broad-phase query may emit per frame.
    pub max_broadphase_contacts: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_resolver_iterations: 1000,
            max_broadphase_contacts: 256,
        }
    }
}

impl WorldConfig {
    /// Configuration optimized for real-time use (fast, bounded cost).
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            max_resolver_iterations: 200,
            max_broadphase_contacts: 128,
        }
    }

    /// Configuration for high-fidelity simulation.
    #[must_use]
    pub fn high_fidelity() -> Self {
        Self {
            max_resolver_iterations: 4000,
            max_broadphase_contacts: 1024,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_resolver_iterations == 0 {
            return Err(PhysError::invalid_config(
                "max_resolver_iterations must be at least 1",
            ));
        }
        if self.max_broadphase_contacts == 0 {
            return Err(PhysError::invalid_config(
                "max_broadphase_contacts must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        assert!(WorldConfig::default().validate().is_ok());
        assert!(WorldConfig::realtime().validate().is_ok());
        assert!(WorldConfig::high_fidelity().validate().is_ok());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = WorldConfig {
            max_resolver_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config_error());
    }
}
