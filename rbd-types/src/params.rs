//! Per-generator contact material parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{PhysError, Result};

/// Default penetration offset for pessimistic collision detection (m).
///
/// Every measured penetration is reduced by this margin, so contacts are
/// generated slightly before true geometric overlap, which smooths the
/// simulation around resting configurations.
pub const DEFAULT_PENETRATION_OFFSET: f64 = 0.005;

/// Material parameters shared by every contact a generator produces.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactParams {
    /// Friction coefficient carried on each contact.
    pub friction: f64,
    /// Restitution (elasticity): fraction of closing velocity preserved as
    /// separating velocity after a collision. 0 = perfectly inelastic,
    /// 1 = perfectly elastic.
    pub restitution: f64,
    /// Pessimism margin subtracted from every measured penetration (m).
    pub penetration_offset: f64,
}

impl Default for ContactParams {
    fn default() -> Self {
        Self {
            friction: 0.0,
            restitution: 1.0,
            penetration_offset: DEFAULT_PENETRATION_OFFSET,
        }
    }
}

impl ContactParams {
    /// Create contact parameters, validating each value.
    pub fn new(friction: f64, restitution: f64, penetration_offset: f64) -> Result<Self> {
        let params = Self {
            friction,
            restitution,
            penetration_offset,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.friction < 0.0 || !self.friction.is_finite() {
            return Err(PhysError::invalid_config(
                "friction must be non-negative and finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysError::invalid_config(
                "restitution must be in [0, 1]",
            ));
        }
        if self.penetration_offset < 0.0 || !self.penetration_offset.is_finite() {
            return Err(PhysError::invalid_config(
                "penetration_offset must be non-negative and finite",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = ContactParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.penetration_offset, DEFAULT_PENETRATION_OFFSET);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(ContactParams::new(-0.1, 0.5, 0.005).is_err());
        assert!(ContactParams::new(0.0, 1.5, 0.005).is_err());
        assert!(ContactParams::new(0.0, 0.5, -0.005).is_err());
        assert!(ContactParams::new(0.3, 0.5, 0.005).is_ok());
    }
}
