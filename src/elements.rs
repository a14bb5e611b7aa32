use core::f64::consts::TAU;

use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::solvers::{
    eccentric_anomaly_at_true_anomaly, mean_anomaly_at_eccentric_anomaly, principal_true_anomaly,
};
use crate::{solve_keplers_equation, OrbitError, Result, StateVectors2D};

/// Below this eccentricity, state vectors are treated as circular and the
/// periapsis is placed from the time instead of the eccentricity vector.
///
/// Sits well above the eccentricity that the finite-difference velocity
/// estimate of an exactly circular orbit produces.
pub const CIRCULAR_ECCENTRICITY_TOLERANCE: f64 = 1e-6;

/// A snapshot of the orbital elements of an on-rails orbit.
///
/// Every field is derived once, when the elements are built, from either
/// the apsides or a pair of state vectors. The struct is plain data;
/// [`Orbit`][crate::Orbit] owns one and replaces it wholesale whenever the
/// elements are recomputed.
///
/// # Angle convention
/// A body at true anomaly `v` sits at the polar angle
/// `v - angle_of_periapsis` from the reference (+X) axis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbitElements {
    /// The farthest distance from the central body.
    pub apoapsis: f64,

    /// The nearest distance from the central body.
    pub periapsis: f64,

    /// The eccentricity of the orbit, in `[0, 1)`.
    ///
    /// See more: <https://en.wikipedia.org/wiki/Orbital_eccentricity>
    pub eccentricity: f64,

    /// Half of the longest diameter of the ellipse.
    pub semi_major_axis: f64,

    /// Half of the shortest diameter of the ellipse.
    pub semi_minor_axis: f64,

    /// The orientation of the periapsis relative to the reference axis,
    /// in radians.
    pub angle_of_periapsis: f64,

    /// Set once a state vector conversion finds the body heading back
    /// towards periapsis. Never cleared by a conversion.
    pub clockwise: bool,

    /// The mean anomaly at [`time_at_epoch`][Self::time_at_epoch], in radians.
    pub mean_anomaly_at_epoch: f64,

    /// The time at which the elements were anchored, in seconds.
    pub time_at_epoch: f64,

    /// The average angular speed, in radians per second.
    ///
    /// <https://en.wikipedia.org/wiki/Mean_motion>
    pub mean_motion: f64,

    /// The time of one full revolution, in seconds.
    pub orbital_period: f64,

    /// The gravitational parameter of the central body (mu = GM).
    pub mu: f64,
}

impl OrbitElements {
    /// Builds elements from the apsides, anchoring the epoch at time zero.
    ///
    /// Returns the elements together with the time, in `[0, period)`, at
    /// which the body is at the given true anomaly.
    ///
    /// # Errors
    /// Returns an error if mu is not positive, if an input is not finite,
    /// if the periapsis is not positive, or if the apoapsis is below the
    /// periapsis. Apsides whose semi-major axis, mean motion, or period
    /// overflow are rejected with [`OrbitError::NonFiniteElement`].
    pub fn from_apsides(
        apoapsis: f64,
        periapsis: f64,
        true_anomaly: f64,
        angle_of_periapsis: f64,
        clockwise: bool,
        mu: f64,
    ) -> Result<(Self, f64)> {
        ensure_gravitational_parameter(mu)?;
        ensure_finite("apoapsis", apoapsis)?;
        ensure_finite("periapsis", periapsis)?;
        ensure_finite("true anomaly", true_anomaly)?;
        ensure_finite("angle of periapsis", angle_of_periapsis)?;

        if periapsis <= 0.0 {
            return Err(OrbitError::NonPositivePeriapsis(periapsis));
        }
        if apoapsis < periapsis {
            return Err(OrbitError::ApoapsisLessThanPeriapsis {
                apoapsis,
                periapsis,
            });
        }

        let semi_major_axis = (apoapsis + periapsis) / 2.0;
        ensure_finite("semi-major axis", semi_major_axis)?;
        let (mean_motion, orbital_period) = mean_motion_and_period(mu, semi_major_axis)?;
        let eccentricity = (apoapsis - periapsis) / (apoapsis + periapsis);

        let elements = Self {
            apoapsis,
            periapsis,
            eccentricity,
            semi_major_axis,
            semi_minor_axis: (apoapsis * periapsis).sqrt(),
            angle_of_periapsis,
            clockwise,
            mean_anomaly_at_epoch: 0.0,
            time_at_epoch: 0.0,
            mean_motion,
            orbital_period,
            mu,
        };

        let eccentric_anomaly = eccentric_anomaly_at_true_anomaly(true_anomaly, eccentricity);
        let mean_anomaly = mean_anomaly_at_eccentric_anomaly(eccentric_anomaly, eccentricity);
        let time = elements.wrap_time(mean_anomaly / mean_motion);

        Ok((elements, time))
    }

    /// Rebuilds the elements from a position and velocity, re-anchoring the
    /// epoch at the given time.
    ///
    /// The time is wrapped into `[0, period)` of the new orbit and stored as
    /// [`time_at_epoch`][Self::time_at_epoch].
    ///
    /// # Circular orbits
    /// When the eccentricity is below [`CIRCULAR_ECCENTRICITY_TOLERANCE`]
    /// the periapsis direction is undefined. It is then placed so that the
    /// body passed it at time zero, i.e. the true anomaly at the epoch is
    /// `mean_motion * time_at_epoch`. This keeps the time-based branch of
    /// [`get_true_anomaly_at_time`][Self::get_true_anomaly_at_time] on the
    /// body's actual half of the orbit.
    ///
    /// # Errors
    /// - [`OrbitError::InvalidGravitationalParameter`] if mu is not positive.
    /// - [`OrbitError::DegenerateStateVectors`] if the position is at the
    ///   origin, a component is not finite, or the motion is radial.
    /// - [`OrbitError::NonElliptical`] if the body is not bound to a
    ///   closed ellipse.
    /// - [`OrbitError::NonFiniteElement`] if the mean motion or the period
    ///   overflows.
    pub fn from_state_vectors(state_vectors: StateVectors2D, time: f64, mu: f64) -> Result<Self> {
        // Reference:
        // https://orbital-mechanics.space/classical-orbital-elements/orbital-elements-and-the-state-vector.html
        ensure_gravitational_parameter(mu)?;
        let StateVectors2D { position, velocity } = state_vectors;
        let degenerate = OrbitError::DegenerateStateVectors { position, velocity };

        let altitude = position.length();
        if !position.is_finite() || !velocity.is_finite() || altitude == 0.0 {
            return Err(degenerate);
        }
        ensure_finite("time", time)?;

        // Step 1: Specific angular momentum (the Z component of r x v)
        let angular_momentum = position.perp_dot(velocity);
        if angular_momentum == 0.0 {
            return Err(degenerate);
        }

        // Step 2: Eccentricity vector
        let speed_squared = velocity.length_squared();
        let radial_dot = position.dot(velocity);
        let eccentricity_vector =
            ((speed_squared - mu / altitude) * position - radial_dot * velocity) / mu;
        let eccentricity = eccentricity_vector.length();

        // Step 3: Specific orbital energy and semi-major axis
        let specific_energy = speed_squared / 2.0 - mu / altitude;
        let semi_major_axis = -mu / (2.0 * specific_energy);

        let bound = eccentricity < 1.0 && specific_energy < 0.0 && semi_major_axis.is_finite();
        if !bound {
            return Err(OrbitError::NonElliptical { eccentricity });
        }

        // Step 4: Apsides
        let periapsis = semi_major_axis * (1.0 - eccentricity);
        let apoapsis = semi_major_axis * (1.0 + eccentricity);

        // Step 5: Period, and the new epoch
        let (mean_motion, orbital_period) = mean_motion_and_period(mu, semi_major_axis)?;
        let time_at_epoch = wrap_into_period(time, orbital_period);

        // Step 6: True anomaly
        let mut clockwise = false;
        let true_anomaly = if eccentricity < CIRCULAR_ECCENTRICITY_TOLERANCE {
            mean_motion * time_at_epoch
        } else {
            let cos_true_anomaly = eccentricity_vector.dot(position) / (eccentricity * altitude);
            let true_anomaly = cos_true_anomaly.clamp(-1.0, 1.0).acos();

            if radial_dot < 0.0 {
                clockwise = true;
                TAU - true_anomaly
            } else {
                true_anomaly
            }
        };

        // Step 7: Mean anomaly at the new epoch
        let eccentric_anomaly = eccentric_anomaly_at_true_anomaly(true_anomaly, eccentricity);
        let mean_anomaly_at_epoch =
            mean_anomaly_at_eccentric_anomaly(eccentric_anomaly, eccentricity);

        Ok(Self {
            apoapsis,
            periapsis,
            eccentricity,
            semi_major_axis,
            semi_minor_axis: (periapsis * apoapsis).sqrt(),
            // Step 8: Orientation
            angle_of_periapsis: true_anomaly - position.y.atan2(position.x),
            clockwise,
            mean_anomaly_at_epoch,
            time_at_epoch,
            mean_motion,
            orbital_period,
            mu,
        })
    }

    /// Wraps a time into `[0, orbital_period)`.
    pub fn wrap_time(&self, t: f64) -> f64 {
        wrap_into_period(t, self.orbital_period)
    }

    /// Gets the mean anomaly at a given time, in radians.
    ///
    /// This grows linearly from the epoch and is not wrapped.
    pub fn get_mean_anomaly_at_time(&self, t: f64) -> f64 {
        self.mean_anomaly_at_epoch + self.mean_motion * (t - self.time_at_epoch)
    }

    /// Gets the true anomaly used to place the body at a given time.
    ///
    /// The time is first wrapped into `[0, period)`. The principal true
    /// anomaly (in `[0, pi]`) is negated when that time lies past half of the
    /// period. The branch is chosen by the time alone: for elements whose
    /// epoch was re-anchored away from periapsis this disagrees with the
    /// actual half of the orbit, and the body is mirrored across the apse
    /// line.
    pub fn get_true_anomaly_at_time(&self, t: f64) -> f64 {
        let t = self.wrap_time(t);
        let mean_anomaly = self.get_mean_anomaly_at_time(t);
        let eccentric_anomaly =
            solve_keplers_equation(mean_anomaly, self.eccentricity).eccentric_anomaly;
        let true_anomaly = principal_true_anomaly(eccentric_anomaly, self.eccentricity);

        if t > self.orbital_period / 2.0 {
            -true_anomaly
        } else {
            true_anomaly
        }
    }

    /// Gets the distance from the central body at a given true anomaly,
    /// using the orbit equation.
    pub fn get_radius_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        let e = self.eccentricity;

        self.semi_major_axis * (1.0 - e * e) / (1.0 + e * true_anomaly.cos())
    }

    /// Gets the position at a given time.
    pub fn get_position_at_time(&self, t: f64) -> DVec2 {
        let true_anomaly = self.get_true_anomaly_at_time(t);
        let radius = self.get_radius_at_true_anomaly(true_anomaly);
        let angle = true_anomaly - self.angle_of_periapsis;

        DVec2::from_angle(angle) * radius
    }

    /// Estimates the velocity at a given time with a symmetric finite
    /// difference of the position, using the given step.
    pub fn get_velocity_at_time(&self, t: f64, step: f64) -> DVec2 {
        let ahead = self.get_position_at_time(t + step);
        let behind = self.get_position_at_time(t - step);

        (ahead - behind) / (2.0 * step)
    }

    /// Gets the distance from the central body in the direction of a given
    /// angle, offset by the angle of periapsis.
    ///
    /// This is closed-form and does not touch the Kepler solver. Passing the
    /// angle of periapsis itself yields the periapsis.
    pub fn get_radius_at_angle(&self, angle: f64) -> f64 {
        self.get_radius_at_true_anomaly(angle - self.angle_of_periapsis)
    }

    /// Gets the speed at a given distance from the central body.
    ///
    /// Uses the vis-viva equation: `v = sqrt(mu (2/r - 1/a))`.
    ///
    /// <https://en.wikipedia.org/wiki/Vis-viva_equation>
    pub fn get_speed_at_radius(&self, radius: f64) -> f64 {
        (self.mu * (2.0 / radius - self.semi_major_axis.recip())).sqrt()
    }
}

/// Mean motion, `n = sqrt(mu / a^3)`, and the period `2 pi / n`.
///
/// Both must be finite: an extreme semi-major axis can overflow the cube
/// or underflow the mean motion to zero.
fn mean_motion_and_period(mu: f64, semi_major_axis: f64) -> Result<(f64, f64)> {
    let mean_motion = (mu / (semi_major_axis * semi_major_axis * semi_major_axis)).sqrt();
    ensure_finite("mean motion", mean_motion)?;

    let orbital_period = TAU / mean_motion;
    ensure_finite("orbital period", orbital_period)?;

    Ok((mean_motion, orbital_period))
}

fn wrap_into_period(t: f64, period: f64) -> f64 {
    let wrapped = t.rem_euclid(period);

    // `rem_euclid` may round up to the modulus itself
    if wrapped >= period {
        0.0
    } else {
        wrapped
    }
}

fn ensure_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(OrbitError::NonFiniteElement { name, value })
    }
}

fn ensure_gravitational_parameter(mu: f64) -> Result<()> {
    if mu.is_finite() && mu > 0.0 {
        Ok(())
    } else {
        Err(OrbitError::InvalidGravitationalParameter(mu))
    }
}
