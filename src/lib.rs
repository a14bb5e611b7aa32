//! # On-rails Keplerian orbits
//! This library crate models the two-body Keplerian orbit of a point mass
//! around a central body, in two dimensions.
//!
//! Keplerian orbits don't use time steps to calculate the next position of an
//! object: the position at any time follows in closed form from a handful of
//! orbital elements. That makes them cheap and exact, as long as nothing but
//! the central body pulls on the object.
//!
//! Once something else does (an engine, a collision, a scripted impulse), the
//! orbital elements stop being valid. The way Kerbal Space Program handles this
//! is to have an "on-rails" physics system utilizing Keplerian orbits, and an
//! "active" physics system integrating state vectors. An [`Orbit`] supports
//! both, and converts between them on demand:
//!
//! - **Rails** ([`OrbitMode::Rails`]): every [`Orbit::update`] re-evaluates the
//!   position from the elements, solving Kepler's equation on the way.
//! - **Physics** ([`OrbitMode::Physics`]): every [`Orbit::update`] moves the
//!   position along an authoritative velocity.
//!
//! ## Getting started
//! This crate provides these main items:
//! - [`OrbitConfig`]: The immutable settings of a simulation, most importantly
//!   the gravitational parameter of the central body.
//! - [`Orbit`]: An orbiting body, with its elements, time, position, and mode.
//! - [`OrbitElements`]: The orbital elements and the closed-form evaluators
//!   built on top of them.
//! - [`StateVectors2D`]: A position and a velocity.
//! - [`solve_keplers_equation`]: The Newton-Raphson Kepler solver.
//!
//! ## Example
//!
//! ```rust
//! use orbit_rails::{Orbit, OrbitConfig, OrbitMode};
//!
//! # fn main() -> Result<(), orbit_rails::OrbitError> {
//! let config = OrbitConfig::new(100_000.0)?;
//! let mut orbit = Orbit::new(1990.0, 100.0, config)?;
//!
//! assert!((orbit.get_eccentricity() - 0.904).abs() < 1e-3);
//! assert_eq!(orbit.get_semi_major_axis(), 1045.0);
//!
//! for _ in 0..100 {
//!     orbit.update();
//! }
//!
//! orbit.to_physics_mode();
//! assert_eq!(orbit.get_mode(), OrbitMode::Physics);
//!
//! orbit.update();
//! orbit.to_rails_mode()?;
//! assert!((orbit.get_eccentricity() - 0.904).abs() < 1e-3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//! The crate logs through the [`log`] facade: mode transitions at `debug`,
//! every Kepler solve at `trace`, and solver non-convergence at `warn`.
//! It never installs a logger itself.

#![warn(missing_docs)]

mod config;
mod elements;
mod error;
mod orbit;
mod solvers;

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use config::{
    OrbitConfig, DEFAULT_DIFFERENTIATION_STEP, DEFAULT_TIME_STEP, GRAVITATIONAL_CONSTANT,
};
pub use elements::{OrbitElements, CIRCULAR_ECCENTRICITY_TOLERANCE};
pub use error::{OrbitError, Result};
pub use orbit::{Orbit, OrbitMode};
pub use solvers::{solve_keplers_equation, KeplerSolution};

/// The maximum number of iterations for the Kepler solver.
///
/// This is used to prevent infinite loops in case the method fails to converge.
pub const NUMERIC_MAX_ITERS: u32 = 1_000_000;

/// A struct representing a position and velocity at a point in the orbit.
///
/// The position and velocity vectors are two-dimensional.
///
/// State vectors can be used to form an orbit using
/// [`Orbit::from_state_vectors`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVectors2D {
    /// The 2D position at a point in the orbit.
    pub position: DVec2,
    /// The 2D velocity at a point in the orbit.
    pub velocity: DVec2,
}

#[cfg(test)]
mod tests;

#[inline]
fn keplers_equation(mean_anomaly: f64, eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_anomaly - (eccentricity * eccentric_anomaly.sin()) - mean_anomaly
}
#[inline]
fn keplers_equation_derivative(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    1.0 - (eccentricity * eccentric_anomaly.cos())
}
