use core::fmt;

use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    solve_keplers_equation, OrbitConfig, OrbitElements, OrbitError, Result, StateVectors2D,
};

/// How an [`Orbit`] currently advances its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitMode {
    /// The position is evaluated in closed form from the orbital elements.
    ///
    /// Exact for unperturbed two-body motion, no matter how many
    /// updates are run.
    Rails,
    /// The position is integrated from an authoritative velocity.
    ///
    /// Needed once a collaborator starts applying forces.
    Physics,
}

impl fmt::Display for OrbitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rails => f.write_str("rails"),
            Self::Physics => f.write_str("physics"),
        }
    }
}

// Each state owns its own stepping and velocity behavior.
// The state is only ever swapped by the mode-transition methods.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
enum Motion {
    Rails,
    Physics { velocity: DVec2 },
}

impl Motion {
    fn mode(&self) -> OrbitMode {
        match self {
            Self::Rails => OrbitMode::Rails,
            Self::Physics { .. } => OrbitMode::Physics,
        }
    }

    fn step(&self, elements: &OrbitElements, dt: f64, time: &mut f64, position: &mut DVec2) {
        match self {
            Self::Rails => {
                *time = elements.wrap_time(*time + dt);
                *position = elements.get_position_at_time(*time);
            }
            Self::Physics { velocity } => {
                *time += dt;
                *position += *velocity * dt;
            }
        }
    }

    fn velocity(&self, elements: &OrbitElements, time: f64, step: f64) -> DVec2 {
        match self {
            Self::Rails => elements.get_velocity_at_time(time, step),
            Self::Physics { velocity } => *velocity,
        }
    }
}

/// A point mass orbiting a central body in a closed 2D Keplerian ellipse.
///
/// The orbit starts "on rails": every [`update`][Self::update] advances the
/// time and re-evaluates the position from the orbital elements.
/// Call [`to_physics_mode`][Self::to_physics_mode] before perturbing it; the
/// position is then integrated from a velocity that a collaborator may change
/// through [`apply_velocity_change`][Self::apply_velocity_change].
/// Call [`to_rails_mode`][Self::to_rails_mode] to fit new elements to the
/// current position and velocity.
///
/// # Example
/// ```
/// use orbit_rails::{Orbit, OrbitConfig, OrbitMode};
/// use glam::DVec2;
///
/// # fn main() -> Result<(), orbit_rails::OrbitError> {
/// let config = OrbitConfig::new(100_000.0)?;
/// let mut orbit = Orbit::new(1990.0, 100.0, config)?;
///
/// // Starts at periapsis
/// assert_eq!(orbit.get_time(), 0.0);
/// assert!((orbit.get_position() - DVec2::new(100.0, 0.0)).length() < 1e-9);
///
/// orbit.to_physics_mode();
/// orbit.apply_velocity_change(DVec2::new(0.0, -1.0))?;
/// orbit.update();
/// orbit.to_rails_mode()?;
///
/// assert_eq!(orbit.get_mode(), OrbitMode::Rails);
/// assert!(orbit.get_apoapsis() < 1990.0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Orbit {
    elements: OrbitElements,
    config: OrbitConfig,

    /// Simulation time, in seconds.
    /// Kept within `[0, period)` while on rails.
    time: f64,

    /// Authoritative in both modes.
    position: DVec2,

    motion: Motion,
}

// Construction
impl Orbit {
    /// Creates a new on-rails orbit at periapsis, with the periapsis
    /// pointing along the reference axis.
    ///
    /// This is shorthand for [`Orbit::with_anomaly`] with a true anomaly and
    /// angle of periapsis of zero, turning counterclockwise.
    ///
    /// # Errors
    /// See [`Orbit::with_anomaly`].
    pub fn new(apoapsis: f64, periapsis: f64, config: OrbitConfig) -> Result<Self> {
        Self::with_anomaly(apoapsis, periapsis, 0.0, 0.0, false, config)
    }

    /// Creates a new on-rails orbit.
    ///
    /// # Parameters
    /// - `apoapsis`: The farthest distance from the central body.
    /// - `periapsis`: The nearest distance from the central body.
    /// - `true_anomaly`: Where on the orbit the body starts, in radians.
    ///   Zero is periapsis.
    /// - `angle_of_periapsis`: The orientation of the periapsis, in radians.
    /// - `clockwise`: The orientation flag.
    /// - `config`: The central body and step settings.
    ///
    /// The epoch is anchored at time zero; the starting time is the time at
    /// which the body reaches `true_anomaly`.
    ///
    /// # Errors
    /// - The config is invalid (see [`OrbitConfig::validate`]).
    /// - An input is not finite.
    /// - [`OrbitError::NonPositivePeriapsis`]: `periapsis <= 0`.
    /// - [`OrbitError::ApoapsisLessThanPeriapsis`]: `apoapsis < periapsis`.
    pub fn with_anomaly(
        apoapsis: f64,
        periapsis: f64,
        true_anomaly: f64,
        angle_of_periapsis: f64,
        clockwise: bool,
        config: OrbitConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (elements, time) = OrbitElements::from_apsides(
            apoapsis,
            periapsis,
            true_anomaly,
            angle_of_periapsis,
            clockwise,
            config.get_gravitational_parameter(),
        )?;

        log::debug!(
            "Created orbit (Ap = {apoapsis}, Pe = {periapsis}, e = {}, T = {}) at t = {time}",
            elements.eccentricity,
            elements.orbital_period
        );

        Ok(Self {
            position: elements.get_position_at_time(time),
            elements,
            config,
            time,
            motion: Motion::Rails,
        })
    }

    /// Creates a new on-rails orbit from a position and velocity observed
    /// at a given time.
    ///
    /// The elements are fitted to the state vectors and the epoch is
    /// anchored at `time`, wrapped into the new orbital period. The given
    /// position is kept as the current position.
    ///
    /// # Errors
    /// - The config is invalid (see [`OrbitConfig::validate`]).
    /// - The state vectors are degenerate or not bound to an ellipse;
    ///   see [`OrbitElements::from_state_vectors`].
    pub fn from_state_vectors(
        state_vectors: StateVectors2D,
        time: f64,
        config: OrbitConfig,
    ) -> Result<Self> {
        config.validate()?;

        let elements = OrbitElements::from_state_vectors(
            state_vectors,
            time,
            config.get_gravitational_parameter(),
        )?;

        log::debug!(
            "Created orbit from state vectors (e = {}, a = {}, T = {}) at t = {}",
            elements.eccentricity,
            elements.semi_major_axis,
            elements.orbital_period,
            elements.time_at_epoch
        );

        Ok(Self {
            elements,
            config,
            time: elements.time_at_epoch,
            position: state_vectors.position,
            motion: Motion::Rails,
        })
    }
}

// Stepping and mode transitions
impl Orbit {
    /// Advances the simulation by one time step.
    ///
    /// - Rails: the time wraps around the orbital period and the position is
    ///   re-evaluated from the elements.
    /// - Physics: the position is moved along the velocity (explicit Euler).
    ///   The velocity itself is left untouched.
    pub fn update(&mut self) {
        self.motion.step(
            &self.elements,
            self.config.get_time_step(),
            &mut self.time,
            &mut self.position,
        );
    }

    /// Forces the on-rails time to a value, wrapped into the orbital period,
    /// and moves the body there.
    ///
    /// # Errors
    /// - [`OrbitError::WrongMode`] in physics mode, where the elements are
    ///   not authoritative.
    /// - [`OrbitError::NonFiniteElement`] if `t` is not finite.
    pub fn set_time(&mut self, t: f64) -> Result<()> {
        if self.motion != Motion::Rails {
            return Err(OrbitError::WrongMode {
                expected: OrbitMode::Rails,
            });
        }
        if !t.is_finite() {
            return Err(OrbitError::NonFiniteElement {
                name: "time",
                value: t,
            });
        }

        self.time = self.elements.wrap_time(t);
        self.position = self.elements.get_position_at_time(self.time);
        Ok(())
    }

    /// Switches to physics mode.
    ///
    /// The current on-rails velocity estimate becomes the authoritative
    /// velocity. The position does not change.
    /// Does nothing if the orbit is already in physics mode.
    pub fn to_physics_mode(&mut self) {
        if let Motion::Rails = self.motion {
            let velocity = self.get_velocity();
            log::debug!(
                "Switching to physics mode at t = {} (r = {}, v = {velocity})",
                self.time,
                self.position
            );
            self.motion = Motion::Physics { velocity };
        }
    }

    /// Switches back to rails mode, fitting new orbital elements to the
    /// current position and velocity and re-anchoring the epoch at the
    /// current time.
    ///
    /// The position does not change. Once a conversion has found the body
    /// heading towards periapsis, [`is_clockwise`][Self::is_clockwise]
    /// stays set.
    /// Does nothing if the orbit is already on rails.
    ///
    /// # Errors
    /// Fails if the state vectors are degenerate or no longer describe a
    /// closed ellipse (see [`OrbitElements::from_state_vectors`]).
    /// On failure, the orbit is left in physics mode, unchanged.
    pub fn to_rails_mode(&mut self) -> Result<()> {
        let Motion::Physics { velocity } = self.motion else {
            return Ok(());
        };

        let state_vectors = StateVectors2D {
            position: self.position,
            velocity,
        };

        let mut elements = OrbitElements::from_state_vectors(
            state_vectors,
            self.time,
            self.config.get_gravitational_parameter(),
        )
        .inspect_err(|err| log::debug!("Staying in physics mode: {err}"))?;

        elements.clockwise |= self.elements.clockwise;

        log::debug!(
            "Switching to rails mode at t = {} (e = {}, a = {}, T = {})",
            elements.time_at_epoch,
            elements.eccentricity,
            elements.semi_major_axis,
            elements.orbital_period
        );

        self.time = elements.time_at_epoch;
        self.elements = elements;
        self.motion = Motion::Rails;
        Ok(())
    }

    /// Replaces the velocity.
    ///
    /// # Errors
    /// Returns [`OrbitError::WrongMode`] while on rails.
    pub fn set_velocity(&mut self, velocity: DVec2) -> Result<()> {
        match &mut self.motion {
            Motion::Physics { velocity: current } => {
                *current = velocity;
                Ok(())
            }
            Motion::Rails => Err(OrbitError::WrongMode {
                expected: OrbitMode::Physics,
            }),
        }
    }

    /// Adds an impulse (a change in velocity) to the velocity.
    ///
    /// # Errors
    /// Returns [`OrbitError::WrongMode`] while on rails.
    pub fn apply_velocity_change(&mut self, delta_v: DVec2) -> Result<()> {
        match &mut self.motion {
            Motion::Physics { velocity } => {
                *velocity += delta_v;
                Ok(())
            }
            Motion::Rails => Err(OrbitError::WrongMode {
                expected: OrbitMode::Physics,
            }),
        }
    }
}

// Queries
impl Orbit {
    /// Gets the current position.
    pub fn get_position(&self) -> DVec2 {
        self.position
    }

    /// Gets the current velocity.
    ///
    /// In physics mode this is the authoritative velocity.
    /// On rails it is estimated from the positions half a differentiation
    /// step before and after the current time, so it is recomputed on every
    /// call.
    pub fn get_velocity(&self) -> DVec2 {
        self.motion.velocity(
            &self.elements,
            self.time,
            self.config.get_differentiation_step(),
        )
    }

    /// Gets the current position and velocity.
    pub fn get_state_vectors(&self) -> StateVectors2D {
        StateVectors2D {
            position: self.position,
            velocity: self.get_velocity(),
        }
    }

    /// Gets the on-rails position at a given time.
    ///
    /// This always evaluates the current elements, even in physics mode.
    pub fn get_position_at_time(&self, t: f64) -> DVec2 {
        self.elements.get_position_at_time(t)
    }

    /// Gets the signed true anomaly at which the body is placed at a given
    /// time; see [`OrbitElements::get_true_anomaly_at_time`].
    pub fn get_true_anomaly_at_time(&self, t: f64) -> f64 {
        self.elements.get_true_anomaly_at_time(t)
    }

    /// Gets the (unwrapped) mean anomaly at a given time.
    pub fn get_mean_anomaly_at_time(&self, t: f64) -> f64 {
        self.elements.get_mean_anomaly_at_time(t)
    }

    /// Gets the eccentric anomaly at a given mean anomaly, by solving
    /// Kepler's equation for this orbit's eccentricity.
    pub fn get_eccentric_anomaly_at_mean_anomaly(&self, mean_anomaly: f64) -> f64 {
        solve_keplers_equation(mean_anomaly, self.elements.eccentricity).eccentric_anomaly
    }

    /// Gets the distance from the central body in the direction of an angle.
    /// See [`OrbitElements::get_radius_at_angle`].
    pub fn get_radius_at_angle(&self, angle: f64) -> f64 {
        self.elements.get_radius_at_angle(angle)
    }

    /// Gets the speed at a given distance from the central body, from the
    /// vis-viva equation.
    pub fn get_speed_at_radius(&self, radius: f64) -> f64 {
        self.elements.get_speed_at_radius(radius)
    }

    /// Gets the vis-viva speed at the current distance from the central body.
    pub fn get_speed(&self) -> f64 {
        self.get_speed_at_radius(self.position.length())
    }

    /// Gets the current simulation time, in seconds.
    pub fn get_time(&self) -> f64 {
        self.time
    }

    /// Gets the current mode.
    pub fn get_mode(&self) -> OrbitMode {
        self.motion.mode()
    }

    /// Gets the orbital elements.
    ///
    /// In physics mode these describe the orbit as it was before the
    /// switch, not the current motion.
    pub fn get_elements(&self) -> &OrbitElements {
        &self.elements
    }

    /// Gets the config the orbit was built with.
    pub fn get_config(&self) -> &OrbitConfig {
        &self.config
    }

    /// Gets the apoapsis.
    pub fn get_apoapsis(&self) -> f64 {
        self.elements.apoapsis
    }

    /// Gets the periapsis.
    pub fn get_periapsis(&self) -> f64 {
        self.elements.periapsis
    }

    /// Gets the eccentricity.
    pub fn get_eccentricity(&self) -> f64 {
        self.elements.eccentricity
    }

    /// Gets the semi-major axis.
    pub fn get_semi_major_axis(&self) -> f64 {
        self.elements.semi_major_axis
    }

    /// Gets the semi-minor axis.
    pub fn get_semi_minor_axis(&self) -> f64 {
        self.elements.semi_minor_axis
    }

    /// Gets the angle of periapsis, in radians.
    pub fn get_angle_of_periapsis(&self) -> f64 {
        self.elements.angle_of_periapsis
    }

    /// Gets the orientation flag.
    pub fn is_clockwise(&self) -> bool {
        self.elements.clockwise
    }

    /// Gets the mean motion, in radians per second.
    pub fn get_mean_motion(&self) -> f64 {
        self.elements.mean_motion
    }

    /// Gets the orbital period, in seconds.
    pub fn get_orbital_period(&self) -> f64 {
        self.elements.orbital_period
    }

    /// Gets the mean anomaly at epoch, in radians.
    pub fn get_mean_anomaly_at_epoch(&self) -> f64 {
        self.elements.mean_anomaly_at_epoch
    }

    /// Gets the time at epoch, in seconds.
    pub fn get_time_at_epoch(&self) -> f64 {
        self.elements.time_at_epoch
    }

    /// Gets the gravitational parameter of the central body.
    pub fn get_gravitational_parameter(&self) -> f64 {
        self.elements.mu
    }
}
