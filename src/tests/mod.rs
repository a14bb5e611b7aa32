#![cfg(test)]

use core::f64::consts::{PI, TAU};

use glam::DVec2;

use crate::{
    solve_keplers_equation, Orbit, OrbitConfig, OrbitError, OrbitMode, StateVectors2D,
    DEFAULT_TIME_STEP, NUMERIC_MAX_ITERS,
};

const ORBIT_POLL_TIMES: usize = 1024;

const MU: f64 = 100_000.0;


use assertions::*;
use logging::*;
use polling::*;
use seeders::*;

fn config() -> OrbitConfig {
    OrbitConfig::new(MU).unwrap()
}

fn round_trip(orbit: &mut Orbit) {
    orbit.to_physics_mode();
    assert_eq!(orbit.get_mode(), OrbitMode::Physics);
    orbit.to_rails_mode().unwrap();
    assert_eq!(orbit.get_mode(), OrbitMode::Rails);
}

#[test]
fn highly_eccentric_starts_at_periapsis() {
    let orbit = Orbit::new(1990.0, 100.0, config()).unwrap();

    assert!((orbit.get_eccentricity() - 0.904).abs() < 1e-3);
    assert_eq!(orbit.get_eccentricity(), 1890.0 / 2090.0);
    assert_eq!(orbit.get_semi_major_axis(), 1045.0);
    assert_almost_eq(orbit.get_semi_minor_axis(), (1990.0f64 * 100.0).sqrt(), "b");
    assert_eq!(orbit.get_time(), 0.0);
    assert_eq!(orbit.get_mode(), OrbitMode::Rails);
    assert!(!orbit.is_clockwise());
    assert_almost_eq_vec2(orbit.get_position(), DVec2::new(100.0, 0.0), "periapsis");
}

#[test]
fn radius_at_angle_of_periapsis_is_periapsis() {
    let orbit = Orbit::new(500.0, 6.0, config()).unwrap();

    assert!((orbit.get_eccentricity() - 0.976).abs() < 1e-3);
    assert_almost_eq(
        orbit.get_radius_at_angle(orbit.get_angle_of_periapsis()),
        6.0,
        "radius at periapsis",
    );

    let rotated = Orbit::with_anomaly(500.0, 6.0, 0.0, 1.3, false, config()).unwrap();

    assert_almost_eq(rotated.get_radius_at_angle(1.3), 6.0, "rotated periapsis");
    assert_almost_eq(
        rotated.get_radius_at_angle(1.3 + PI),
        500.0,
        "rotated apoapsis",
    );
}

#[test]
fn circular_orbit_skips_solver() {
    let orbit = Orbit::new(1000.0, 1000.0, config()).unwrap();
    let mean_motion = orbit.get_mean_motion();

    assert_eq!(orbit.get_eccentricity(), 0.0);

    for t in poll_times(&orbit) {
        let mean_anomaly = orbit.get_mean_anomaly_at_time(t);
        let solution = solve_keplers_equation(mean_anomaly, 0.0);

        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.eccentric_anomaly, mean_anomaly);
        assert!(solution.converged);
    }

    for (t, position) in poll_times(&orbit).zip(poll_orbit(&orbit)) {
        assert_almost_eq_rel(position.length(), 1000.0, 1e-12, "circle radius");
        assert_almost_eq_vec2_rel(
            position,
            DVec2::from_angle(mean_motion * t) * 1000.0,
            1e-9,
            &format!("circle position at t = {t}"),
        );
    }
}

#[test]
fn kepler_solver_residual() {
    for i in 0..=19 {
        let eccentricity = i as f64 * 0.05;

        for j in 0..64 {
            let mean_anomaly = j as f64 * TAU / 64.0;
            let solution = solve_keplers_equation(mean_anomaly, eccentricity);
            let e = solution.eccentric_anomaly;
            let residual = (e - eccentricity * e.sin() - mean_anomaly).abs();

            assert!(
                residual < 1e-9,
                "residual {residual} for M = {mean_anomaly}, e = {eccentricity}"
            );
            assert!(solution.iterations <= NUMERIC_MAX_ITERS);
        }
    }
}

#[test]
fn kepler_solver_counts_iterations() {
    // Already a root: the first update changes nothing
    let solution = solve_keplers_equation(0.0, 0.5);

    assert_eq!(solution.eccentric_anomaly, 0.0);
    assert_eq!(solution.iterations, 1);
    assert!(solution.converged);

    let solution = solve_keplers_equation(2.0, 0.3);
    assert!(solution.iterations > 1);
}

#[test]
fn true_anomaly_branch_follows_time() {
    let orbit = Orbit::new(1990.0, 100.0, config()).unwrap();
    let half_period = orbit.get_orbital_period() / 2.0;

    for (t, true_anomaly) in poll_times(&orbit).zip(poll_true_anomaly(&orbit)) {
        if t > half_period {
            assert!(true_anomaly <= 0.0, "t = {t}, v = {true_anomaly}");
        } else {
            assert!(true_anomaly >= 0.0, "t = {t}, v = {true_anomaly}");
        }
        assert!(true_anomaly.abs() <= PI);
    }
}

#[test]
fn position_is_periodic() {
    for _ in 0..32 {
        let orbit = random_any(config());
        let period = orbit.get_orbital_period();

        for t in poll_times(&orbit).step_by(16) {
            let a = orbit.get_position_at_time(t);

            assert_almost_eq_vec2_rel(
                a,
                orbit.get_position_at_time(t + period),
                1e-6,
                &format!("one period later, t = {t}"),
            );
            assert_almost_eq_vec2_rel(
                a,
                orbit.get_position_at_time(t - 3.0 * period),
                1e-6,
                &format!("three periods earlier, t = {t}"),
            );
        }
    }
}

#[test]
fn rails_velocity_matches_vis_viva() {
    for eccentricity in [0.0, 0.3, 0.6, 0.9] {
        let periapsis = 200.0;
        let mut orbit = Orbit::with_anomaly(
            apoapsis_for(periapsis, eccentricity),
            periapsis,
            0.0,
            0.7,
            false,
            config(),
        )
        .unwrap();
        let period = orbit.get_orbital_period();

        for i in 0..16 {
            orbit.set_time(i as f64 * period / 16.0).unwrap();
            let velocity = orbit.get_velocity();

            assert_almost_eq_rel(
                velocity.length(),
                orbit.get_speed(),
                1e-3,
                &format!("speed at e = {eccentricity}, t = {}", orbit.get_time()),
            );
            assert!(
                orbit.get_position().perp_dot(velocity) > 0.0,
                "rails orbits turn counterclockwise"
            );
        }
    }
}

#[test]
fn rails_velocity_is_recomputed_after_time_changes() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();
    let at_periapsis = orbit.get_velocity();

    orbit.set_time(orbit.get_orbital_period() / 2.0).unwrap();
    let at_apoapsis = orbit.get_velocity();

    assert!(at_periapsis.length() > at_apoapsis.length());
    assert_almost_eq_rel(at_apoapsis.length(), orbit.get_speed(), 1e-6, "apoapsis");
}

#[test]
fn round_trip_preserves_elements() {
    const FRACTIONS: [f64; 4] = [0.1, 0.3, 0.65, 0.85];

    for eccentricity in [0.05, 0.2, 0.5, 0.75, 0.9] {
        for k in 0..8 {
            let angle_of_periapsis = k as f64 * TAU / 8.0;
            let original = Orbit::with_anomaly(
                apoapsis_for(100.0, eccentricity),
                100.0,
                0.0,
                angle_of_periapsis,
                false,
                config(),
            )
            .unwrap();

            for fraction in FRACTIONS {
                let what = format!("e = {eccentricity}, w = {angle_of_periapsis}, f = {fraction}");
                let mut orbit = original.clone();
                orbit.set_time(fraction * orbit.get_orbital_period()).unwrap();

                let position = orbit.get_position();
                let velocity = orbit.get_velocity();

                round_trip(&mut orbit);

                assert_same_shape(&orbit, &original, &what);
                assert_eq_vec2(orbit.get_position(), position, &what);
                assert_almost_eq_vec2_rel(
                    orbit.get_position_at_time(orbit.get_time()),
                    position,
                    1e-6,
                    &format!("re-anchored position, {what}"),
                );
                assert_almost_eq_vec2_rel(
                    orbit.get_velocity(),
                    velocity,
                    1e-5,
                    &format!("re-anchored velocity, {what}"),
                );
            }
        }
    }
}

#[test]
fn round_trip_random_orbits() {
    for _ in 0..256 {
        let original = random_elliptic(config());
        let mut orbit = original.clone();

        round_trip(&mut orbit);

        assert_same_shape(&orbit, &original, &format!("{original:?}"));
        assert_eq!(orbit.get_time(), orbit.get_time_at_epoch());
        assert!(orbit.get_time() < orbit.get_orbital_period());
    }
}

#[test]
fn round_trip_circular_orbit() {
    for _ in 0..64 {
        let original = random_circular(config());
        let mut orbit = original.clone();
        let position = orbit.get_position();
        let step = orbit.get_speed() * DEFAULT_TIME_STEP;

        round_trip(&mut orbit);

        assert!(orbit.get_eccentricity() < 1e-6);
        assert_almost_eq_rel(orbit.get_apoapsis(), original.get_apoapsis(), 1e-6, "Ap");
        assert_almost_eq_rel(orbit.get_periapsis(), original.get_periapsis(), 1e-6, "Pe");
        assert_eq_vec2(orbit.get_position(), position, "kept position");
        assert_almost_eq_vec2_rel(
            orbit.get_position_at_time(orbit.get_time()),
            position,
            1e-6,
            &format!("re-anchored position of {original:?}"),
        );

        orbit.update();
        assert_almost_eq_rel(
            orbit.get_position().distance(position),
            step,
            1e-3,
            &format!("distance covered by one update of {original:?}"),
        );
    }
}

#[test]
fn round_trip_circular_orbit_does_not_jump() {
    for i in 0..16 {
        let true_anomaly = i as f64 * TAU / 16.0 + 0.1;
        let mut orbit = Orbit::with_anomaly(1000.0, 1000.0, true_anomaly, 0.0, false, config()).unwrap();
        let position = orbit.get_position();

        round_trip(&mut orbit);
        orbit.update();

        // One step at 10 m/s
        assert_almost_eq_rel(
            orbit.get_position().distance(position),
            0.1,
            1e-3,
            &format!("jump at v = {true_anomaly}"),
        );
    }
}

#[test]
fn exactly_circular_state_vectors_keep_phase() {
    let orbit = Orbit::from_state_vectors(
        StateVectors2D {
            position: DVec2::new(0.0, 1000.0),
            velocity: DVec2::new(-10.0, 0.0),
        },
        0.0,
        config(),
    )
    .unwrap();

    assert_eq!(orbit.get_eccentricity(), 0.0);
    assert_eq!(orbit.get_semi_major_axis(), 1000.0);
    assert_eq!(orbit.get_angle_of_periapsis(), -PI / 2.0);
    assert_eq!(orbit.get_mean_anomaly_at_epoch(), 0.0);
    assert_almost_eq_vec2(
        orbit.get_position_at_time(0.0),
        DVec2::new(0.0, 1000.0),
        "position at epoch",
    );
}

#[test]
fn circular_state_vectors_past_half_period() {
    let state_vectors = StateVectors2D {
        position: DVec2::new(1000.0, 0.0),
        velocity: DVec2::new(0.0, 10.0),
    };
    let period = TAU * 100.0;

    let orbit = Orbit::from_state_vectors(state_vectors, 0.75 * period, config()).unwrap();

    assert_eq!(orbit.get_eccentricity(), 0.0);
    assert_almost_eq(orbit.get_angle_of_periapsis(), 1.5 * PI, "angle of periapsis");
    assert_almost_eq_vec2(
        orbit.get_position_at_time(orbit.get_time()),
        state_vectors.position,
        "position at epoch",
    );
    assert!(
        state_vectors
            .position
            .perp_dot(orbit.get_velocity())
            > 0.0,
        "keeps turning counterclockwise"
    );
}

#[test]
fn state_vectors_reproduce_orbit() {
    let original = Orbit::with_anomaly(1500.0, 85.0, 1.0, 4.0, false, config()).unwrap();
    let state_vectors = original.get_state_vectors();

    let orbit = Orbit::from_state_vectors(state_vectors, original.get_time(), config()).unwrap();

    assert_same_shape(&orbit, &original, "from state vectors");
    assert_almost_eq(orbit.get_angle_of_periapsis(), 4.0, "angle of periapsis");
    assert_almost_eq(orbit.get_time(), original.get_time(), "time");
    assert_eq_vec2(orbit.get_position(), state_vectors.position, "position");
    assert_almost_eq_vec2_rel(
        orbit.get_position_at_time(orbit.get_time()),
        state_vectors.position,
        1e-6,
        "position at epoch",
    );
}

#[test]
fn re_anchored_epoch_mirrors_inbound_half() {
    // The body is heading back towards periapsis, but the new epoch sits at
    // time zero, so the time-based branch picks the outbound half.
    let original = Orbit::with_anomaly(2000.0, 500.0, 1.5 * PI, 0.0, false, config()).unwrap();
    let state_vectors = original.get_state_vectors();
    let position = state_vectors.position;

    let orbit = Orbit::from_state_vectors(state_vectors, 0.0, config()).unwrap();

    assert!(orbit.is_clockwise());
    assert_eq!(orbit.get_time(), 0.0);
    assert_eq_vec2(orbit.get_position(), position, "kept position");
    assert_almost_eq_vec2_rel(
        orbit.get_position_at_time(0.0),
        DVec2::new(position.x, -position.y),
        1e-6,
        "mirrored position",
    );
}

#[test]
fn clockwise_flag_is_sticky() {
    let mut orbit = Orbit::with_anomaly(2000.0, 500.0, 1.5 * PI, 0.0, false, config()).unwrap();

    round_trip(&mut orbit);
    assert!(orbit.is_clockwise());

    orbit.set_time(0.1 * orbit.get_orbital_period()).unwrap();
    round_trip(&mut orbit);
    assert!(orbit.is_clockwise());
}

#[test]
fn rails_update_wraps_time() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();
    let period = orbit.get_orbital_period();

    orbit.set_time(period - 0.005).unwrap();
    orbit.update();

    assert!(orbit.get_time() < period);
    assert!((orbit.get_time() - 0.005).abs() < 1e-9);
    assert_eq_vec2(
        orbit.get_position(),
        orbit.get_position_at_time(orbit.get_time()),
        "position after wrap",
    );
}

#[test]
fn rails_update_advances_along_orbit() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();

    for i in 1..=500 {
        orbit.update();
        assert_almost_eq(
            orbit.get_time(),
            i as f64 * DEFAULT_TIME_STEP,
            "time after update",
        );
    }

    let true_anomaly = orbit.get_true_anomaly_at_time(orbit.get_time());
    assert_almost_eq_rel(
        orbit.get_position().length(),
        orbit.get_radius_at_angle(true_anomaly),
        1e-9,
        "radius after updates",
    );
}

#[test]
fn physics_update_integrates_velocity() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();
    orbit.update();
    orbit.to_physics_mode();

    let position = orbit.get_position();
    let velocity = orbit.get_velocity();
    let time = orbit.get_time();

    orbit.update();

    assert_eq_vec2(
        orbit.get_position(),
        position + velocity * DEFAULT_TIME_STEP,
        "integrated position",
    );
    assert_eq_vec2(orbit.get_velocity(), velocity, "untouched velocity");
    assert_eq!(orbit.get_time(), time + DEFAULT_TIME_STEP);
}

#[test]
fn to_physics_mode_keeps_position() {
    let mut orbit = random_elliptic(config());
    let position = orbit.get_position();
    let velocity = orbit.get_velocity();

    orbit.to_physics_mode();

    assert_eq_vec2(orbit.get_position(), position, "position");
    assert_eq_vec2(orbit.get_velocity(), velocity, "captured velocity");

    // Already in physics mode
    orbit.set_velocity(DVec2::new(1.0, 2.0)).unwrap();
    orbit.to_physics_mode();
    assert_eq_vec2(orbit.get_velocity(), DVec2::new(1.0, 2.0), "kept velocity");
}

#[test]
fn physics_time_is_not_wrapped() {
    let mut orbit = Orbit::new(10.0, 10.0, config()).unwrap();
    let period = orbit.get_orbital_period();
    assert!(period < 1.0);

    orbit.to_physics_mode();
    for _ in 0..100 {
        orbit.update();
    }

    assert!(orbit.get_time() > period);
}

#[test]
fn impulse_changes_orbit() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();

    orbit.to_physics_mode();
    let prograde = orbit.get_velocity().normalize();
    orbit.apply_velocity_change(prograde * 0.5).unwrap();
    orbit.to_rails_mode().unwrap();

    assert!(orbit.get_apoapsis() > 1990.0);
    assert_almost_eq_rel(orbit.get_periapsis(), 100.0, 1e-3, "periapsis");
}

#[test]
fn escape_velocity_keeps_physics_mode() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();
    orbit.to_physics_mode();

    let position = orbit.get_position();
    let escape_speed = (2.0 * MU / position.length()).sqrt();
    let velocity = orbit.get_velocity().normalize() * escape_speed * 1.5;
    orbit.set_velocity(velocity).unwrap();

    let err = orbit.to_rails_mode().unwrap_err();

    assert!(matches!(err, OrbitError::NonElliptical { eccentricity } if eccentricity > 1.0));
    assert_eq!(orbit.get_mode(), OrbitMode::Physics);
    assert_eq_vec2(orbit.get_position(), position, "position");
    assert_eq_vec2(orbit.get_velocity(), velocity, "velocity");
}

#[test]
fn mode_guards() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();

    assert_eq!(
        orbit.set_velocity(DVec2::ONE),
        Err(OrbitError::WrongMode {
            expected: OrbitMode::Physics
        })
    );
    assert_eq!(
        orbit.apply_velocity_change(DVec2::ONE),
        Err(OrbitError::WrongMode {
            expected: OrbitMode::Physics
        })
    );

    // Already on rails
    let before = orbit.clone();
    orbit.to_rails_mode().unwrap();
    assert_eq!(orbit, before);

    orbit.to_physics_mode();
    assert_eq!(
        orbit.set_time(1.0),
        Err(OrbitError::WrongMode {
            expected: OrbitMode::Rails
        })
    );
}

#[test]
fn set_time_wraps_into_period() {
    let mut orbit = Orbit::new(1990.0, 100.0, config()).unwrap();
    let period = orbit.get_orbital_period();

    orbit.set_time(2.5 * period).unwrap();
    assert_almost_eq_rel(orbit.get_time(), 0.5 * period, 1e-9, "positive wrap");

    orbit.set_time(-0.25 * period).unwrap();
    assert_almost_eq_rel(orbit.get_time(), 0.75 * period, 1e-9, "negative wrap");

    assert!(matches!(
        orbit.set_time(f64::NAN),
        Err(OrbitError::NonFiniteElement { name: "time", .. })
    ));
}

#[test]
fn invalid_apsides_are_rejected() {
    assert_eq!(
        Orbit::new(100.0, 0.0, config()),
        Err(OrbitError::NonPositivePeriapsis(0.0))
    );
    assert_eq!(
        Orbit::new(50.0, 100.0, config()),
        Err(OrbitError::ApoapsisLessThanPeriapsis {
            apoapsis: 50.0,
            periapsis: 100.0
        })
    );
    assert!(matches!(
        Orbit::new(f64::INFINITY, 100.0, config()),
        Err(OrbitError::NonFiniteElement {
            name: "apoapsis",
            ..
        })
    ));

    // Finite apsides whose derived elements overflow
    assert!(matches!(
        Orbit::new(1e308, 1e308, config()),
        Err(OrbitError::NonFiniteElement {
            name: "semi-major axis",
            ..
        })
    ));
    assert!(matches!(
        Orbit::new(1e200, 1e200, config()),
        Err(OrbitError::NonFiniteElement {
            name: "orbital period",
            ..
        })
    ));
}

#[test]
fn invalid_config_is_rejected() {
    assert_eq!(
        OrbitConfig::new(0.0),
        Err(OrbitError::InvalidGravitationalParameter(0.0))
    );
    assert!(OrbitConfig::new(f64::NAN).is_err());
    assert!(OrbitConfig::from_central_mass(-5.0).is_err());
    assert_eq!(
        config().with_time_step(-1.0),
        Err(OrbitError::InvalidTimeStep(-1.0))
    );
    assert_eq!(
        config().with_differentiation_step(0.0),
        Err(OrbitError::InvalidDifferentiationStep(0.0))
    );

    let from_mass = OrbitConfig::from_central_mass(1.5e15).unwrap();
    assert_almost_eq_rel(
        from_mass.get_gravitational_parameter(),
        1.5e15 * 6.67e-11,
        1e-12,
        "mu from mass",
    );
}

#[test]
fn degenerate_state_vectors_are_rejected() {
    let radial = StateVectors2D {
        position: DVec2::new(100.0, 0.0),
        velocity: DVec2::new(5.0, 0.0),
    };
    assert!(matches!(
        Orbit::from_state_vectors(radial, 0.0, config()),
        Err(OrbitError::DegenerateStateVectors { .. })
    ));

    let at_origin = StateVectors2D {
        position: DVec2::ZERO,
        velocity: DVec2::new(0.0, 5.0),
    };
    assert!(matches!(
        Orbit::from_state_vectors(at_origin, 0.0, config()),
        Err(OrbitError::DegenerateStateVectors { .. })
    ));

    let non_finite = StateVectors2D {
        position: DVec2::new(100.0, 0.0),
        velocity: DVec2::new(0.0, f64::NAN),
    };
    assert!(matches!(
        Orbit::from_state_vectors(non_finite, 0.0, config()),
        Err(OrbitError::DegenerateStateVectors { .. })
    ));
}

#[test]
fn custom_steps_are_used() {
    let config = config()
        .with_time_step(0.5)
        .unwrap()
        .with_differentiation_step(1e-3)
        .unwrap();
    let mut orbit = Orbit::new(1990.0, 100.0, config).unwrap();

    orbit.update();
    assert_eq!(orbit.get_time(), 0.5);
    assert_almost_eq_rel(orbit.get_velocity().length(), orbit.get_speed(), 1e-3, "speed");
}

#[test]
fn construction_is_logged() {
    capture_logs();

    Orbit::from_state_vectors(
        StateVectors2D {
            position: DVec2::new(1234.5, 0.0),
            velocity: DVec2::new(0.0, 9.0),
        },
        12.345,
        config(),
    )
    .unwrap();
    Orbit::new(4321.5, 1234.5, config()).unwrap();

    assert!(logged(&["Created orbit from state vectors", "at t = 12.345"]));
    assert!(logged(&["Created orbit", "Ap = 4321.5", "Pe = 1234.5"]));
}
