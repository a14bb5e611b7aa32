use core::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{keplers_equation, keplers_equation_derivative, NUMERIC_MAX_ITERS};

/// The outcome of solving Kepler's equation for the eccentric anomaly.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerSolution {
    /// The eccentric anomaly, in radians.
    ///
    /// When [`converged`][Self::converged] is false, this is the last
    /// iterate computed before giving up.
    pub eccentric_anomaly: f64,

    /// The number of Newton-Raphson updates performed.
    pub iterations: u32,

    /// Whether two successive iterates became exactly equal.
    pub converged: bool,
}

/// Solves Kepler's equation `E - e sin(E) = M` for the eccentric anomaly `E`.
///
/// # Method
/// Newton-Raphson iteration, seeded with `E = M`:
///
/// ```text
/// E <- E - (E - e sin(E) - M) / (1 - e cos(E))
/// ```
///
/// The iteration stops once an update no longer changes the iterate at all,
/// i.e. the next value compares equal to the current one. There is no
/// tolerance threshold. To bound the worst-case cost, the loop is capped at
/// [`NUMERIC_MAX_ITERS`] updates.
///
/// A circular orbit (`e = 0`) is trivially solved by `E = M`, and no
/// iteration is performed.
///
/// # Non-convergence
/// If the cap is hit (usually a last-bit oscillation for eccentricities
/// close to one), the last iterate is returned with `converged` set to
/// false. This is not treated as an error: the value is still a very
/// good approximation.
///
/// # Example
/// ```
/// use orbit_rails::solve_keplers_equation;
///
/// let solution = solve_keplers_equation(1.2, 0.5);
/// let e = solution.eccentric_anomaly;
///
/// assert!((e - 0.5 * e.sin() - 1.2).abs() < 1e-12);
///
/// let circular = solve_keplers_equation(1.2, 0.0);
/// assert_eq!(circular.eccentric_anomaly, 1.2);
/// assert_eq!(circular.iterations, 0);
/// ```
pub fn solve_keplers_equation(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    if eccentricity == 0.0 {
        return KeplerSolution {
            eccentric_anomaly: mean_anomaly,
            iterations: 0,
            converged: true,
        };
    }

    let mut eccentric_anomaly = mean_anomaly;

    for iteration in 1..=NUMERIC_MAX_ITERS {
        let f = keplers_equation(mean_anomaly, eccentric_anomaly, eccentricity);
        let fp = keplers_equation_derivative(eccentric_anomaly, eccentricity);
        let next = eccentric_anomaly - f / fp;

        if next == eccentric_anomaly {
            log::trace!(
                "Kepler's equation converged after {iteration} iterations \
                (M = {mean_anomaly}, e = {eccentricity}, E = {next})"
            );
            return KeplerSolution {
                eccentric_anomaly: next,
                iterations: iteration,
                converged: true,
            };
        }

        if !next.is_finite() {
            log::warn!(
                "Kepler's equation diverged to {next} \
                (M = {mean_anomaly}, e = {eccentricity})"
            );
            return KeplerSolution {
                eccentric_anomaly: next,
                iterations: iteration,
                converged: false,
            };
        }

        eccentric_anomaly = next;
    }

    log::warn!(
        "Kepler's equation did not converge after {NUMERIC_MAX_ITERS} iterations \
        (M = {mean_anomaly}, e = {eccentricity}, last E = {eccentric_anomaly})"
    );

    KeplerSolution {
        eccentric_anomaly,
        iterations: NUMERIC_MAX_ITERS,
        converged: false,
    }
}

/// Gets the true anomaly at a given eccentric anomaly, folded into `[0, pi]`.
///
/// This is the principal value of
/// `acos((cos(E) - e) / (1 - e cos(E)))`, i.e. it cannot tell the outbound
/// half of the orbit from the inbound half. Callers pick the branch.
///
/// It is evaluated as `|atan2(sqrt(1 - e^2) sin(E), cos(E) - e)|`, which is
/// the same angle but keeps full precision near the apsides, where the
/// arccosine loses about half of the significant digits.
pub(crate) fn principal_true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
    let semi_axis_ratio = (1.0 - eccentricity * eccentricity).sqrt();

    (semi_axis_ratio * sin_e).atan2(cos_e - eccentricity).abs()
}

/// Gets the eccentric anomaly at a given true anomaly, in `[0, tau)`.
///
/// Uses the identities
///
/// ```text
/// cos(E) = (e + cos(v)) / (1 + e cos(v))
/// sin(E) = sqrt(1 - e^2) sin(v) / (1 + e cos(v))
/// ```
///
/// whose shared denominator is always positive on an ellipse, so it
/// cancels inside `atan2`.
pub(crate) fn eccentric_anomaly_at_true_anomaly(true_anomaly: f64, eccentricity: f64) -> f64 {
    let (sin_v, cos_v) = true_anomaly.sin_cos();
    let semi_axis_ratio = (1.0 - eccentricity * eccentricity).sqrt();

    (semi_axis_ratio * sin_v)
        .atan2(eccentricity + cos_v)
        .rem_euclid(TAU)
}

/// Gets the mean anomaly at a given eccentric anomaly (Kepler's equation).
#[inline]
pub(crate) fn mean_anomaly_at_eccentric_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_anomaly - eccentricity * eccentric_anomaly.sin()
}
