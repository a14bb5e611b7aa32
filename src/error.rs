use glam::DVec2;
use thiserror::Error;

use crate::OrbitMode;

/// An error describing why an orbit could not be built, configured,
/// or converted between representations.
///
/// Every variant carries the offending values so that callers can
/// report them without re-deriving anything.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum OrbitError {
    /// ### The gravitational parameter is zero, negative, or not finite.
    /// Mu scales every derived quantity (mean motion, period, speed).
    /// A non-positive mu would produce an infinite or undefined mean motion.
    #[error("gravitational parameter must be finite and positive, got {0}")]
    InvalidGravitationalParameter(f64),

    /// ### The simulation time step is zero, negative, or not finite.
    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f64),

    /// ### The finite-difference step is zero, negative, or not finite.
    #[error("differentiation step must be finite and positive, got {0}")]
    InvalidDifferentiationStep(f64),

    /// ### Attempt to use a periapsis that is not strictly positive.
    /// A periapsis of zero is a degenerate (radial) ellipse with an
    /// eccentricity of exactly one.
    #[error("periapsis must be positive, got {0}")]
    NonPositivePeriapsis(f64),

    /// ### Attempt to use an apoapsis lower than the periapsis.
    /// By definition, an orbit's apoapsis is the highest point in the orbit,
    /// and its periapsis is the lowest point in the orbit.
    #[error("apoapsis {apoapsis} is less than periapsis {periapsis}")]
    ApoapsisLessThanPeriapsis {
        /// The rejected apoapsis.
        apoapsis: f64,
        /// The periapsis it was compared against.
        periapsis: f64,
    },

    /// ### An orbital element was NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFiniteElement {
        /// The name of the element.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// ### The state vectors do not describe a closed ellipse.
    /// Parabolic and hyperbolic trajectories are not supported.
    #[error("eccentricity {eccentricity} does not describe a closed ellipse")]
    NonElliptical {
        /// The eccentricity derived from the state vectors.
        eccentricity: f64,
    },

    /// ### The state vectors cannot be turned into orbital elements.
    /// This happens when the position is at the origin, when a component
    /// is not finite, or when the motion is purely radial.
    #[error("degenerate state vectors: position {position}, velocity {velocity}")]
    DegenerateStateVectors {
        /// The rejected position.
        position: DVec2,
        /// The rejected velocity.
        velocity: DVec2,
    },

    /// ### The operation is only valid in another mode.
    #[error("operation requires {expected} mode")]
    WrongMode {
        /// The mode the orbit must be in.
        expected: OrbitMode,
    },
}

/// A result whose error type defaults to [`OrbitError`].
pub type Result<T, E = OrbitError> = core::result::Result<T, E>;
