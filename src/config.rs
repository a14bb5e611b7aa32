#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{OrbitError, Result};

/// The gravitational constant used by [`OrbitConfig::from_central_mass`],
/// in m^3 kg^-1 s^-2.
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67e-11;

/// The default amount of simulated time advanced by one
/// [`update`][crate::Orbit::update] call, in seconds.
pub const DEFAULT_TIME_STEP: f64 = 0.01;

/// The default step used to differentiate the on-rails position
/// into a velocity, in seconds.
pub const DEFAULT_DIFFERENTIATION_STEP: f64 = 1e-4;

/// Immutable simulation settings shared by an orbit for its whole life.
///
/// The gravitational parameter is copied into every [`Orbit`][crate::Orbit]
/// at construction and can never change afterwards. To simulate a different
/// central body, build a new config and new orbits.
///
/// # Example
/// ```
/// use orbit_rails::OrbitConfig;
///
/// # fn main() -> Result<(), orbit_rails::OrbitError> {
/// let config = OrbitConfig::new(100_000.0)?.with_time_step(0.05)?;
///
/// assert_eq!(config.get_gravitational_parameter(), 100_000.0);
/// assert_eq!(config.get_time_step(), 0.05);
///
/// assert!(OrbitConfig::new(0.0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbitConfig {
    /// The gravitational parameter of the central body.
    ///
    /// In other words, mu = GM.
    mu: f64,

    /// Seconds advanced per update.
    time_step: f64,

    /// Seconds between the two samples of the rails velocity estimate.
    differentiation_step: f64,
}

impl OrbitConfig {
    /// Creates a new config from a gravitational parameter (mu = GM),
    /// using the default time and differentiation steps.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidGravitationalParameter`] if `mu` is
    /// not finite or not strictly positive.
    pub fn new(mu: f64) -> Result<Self> {
        let config = Self {
            mu,
            time_step: DEFAULT_TIME_STEP,
            differentiation_step: DEFAULT_DIFFERENTIATION_STEP,
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a new config from the mass of the central body, in kilograms.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidGravitationalParameter`] if the
    /// resulting mu is not finite or not strictly positive.
    pub fn from_central_mass(mass: f64) -> Result<Self> {
        Self::new(GRAVITATIONAL_CONSTANT * mass)
    }

    /// Returns a copy of this config with a different time step.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidTimeStep`] if `time_step` is not
    /// finite or not strictly positive.
    pub fn with_time_step(self, time_step: f64) -> Result<Self> {
        let config = Self { time_step, ..self };
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy of this config with a different finite-difference step.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidDifferentiationStep`] if the step is not
    /// finite or not strictly positive.
    pub fn with_differentiation_step(self, differentiation_step: f64) -> Result<Self> {
        let config = Self {
            differentiation_step,
            ..self
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field.
    ///
    /// Configs built through the constructors are always valid; this exists
    /// for configs that arrive through deserialization.
    ///
    /// # Errors
    /// Returns the error for the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !is_positive_finite(self.mu) {
            return Err(OrbitError::InvalidGravitationalParameter(self.mu));
        }
        if !is_positive_finite(self.time_step) {
            return Err(OrbitError::InvalidTimeStep(self.time_step));
        }
        if !is_positive_finite(self.differentiation_step) {
            return Err(OrbitError::InvalidDifferentiationStep(
                self.differentiation_step,
            ));
        }
        Ok(())
    }

    /// Gets the gravitational parameter of the central body.
    pub fn get_gravitational_parameter(&self) -> f64 {
        self.mu
    }

    /// Gets the time step, in seconds.
    pub fn get_time_step(&self) -> f64 {
        self.time_step
    }

    /// Gets the finite-difference step, in seconds.
    pub fn get_differentiation_step(&self) -> f64 {
        self.differentiation_step
    }
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
