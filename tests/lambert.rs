use std::error::Error;

use lunar_trajectory_planner::core::state::TrajectoryState;
use lunar_trajectory_planner::core::vector;
use lunar_trajectory_planner::ephemeris::circular_moon_position;
use lunar_trajectory_planner::impulsive::lambert::{self, LambertDirection, LambertOptions};
use lunar_trajectory_planner::impulsive::{LambertError, hohmann};
use lunar_trajectory_planner::orbits::propagate_kepler;

const MU_EARTH: f64 = 398_600.0;
const TOF_72H: f64 = 259_200.0;

#[test]
fn leo_to_moon_in_72_hours_costs_about_3_2_km_s() -> Result<(), Box<dyn Error>> {
    let r1 = [6_556.0, 0.0, 0.0];
    let r2 = circular_moon_position(130.0, TOF_72H);

    let sol = lambert::solve(r1, r2, TOF_72H, MU_EARTH)?;

    assert!(sol.converged, "{sol:?}");
    let dv_m_s = sol.delta_v_km_s * 1_000.0;
    assert!(
        (3_000.0..=3_400.0).contains(&dv_m_s),
        "departure dv {dv_m_s:.1} m/s"
    );
    // The transfer is planar, so the departure burn is tangential-ish and in the xy plane.
    assert!(sol.departure_velocity_km_s[2].abs() < 1e-12);
    Ok(())
}

#[test]
fn converged_solutions_reach_r2_under_two_body_motion() -> Result<(), Box<dyn Error>> {
    let r1 = [7_000.0, 0.0, 100.0];
    let mut converged = 0;

    // Short arcs through periapsis, lunar-distance hyperbolas and multi-day ellipses.
    for angle_deg in (5..360).step_by(7) {
        let angle = f64::from(angle_deg).to_radians();
        for radius_ratio in [1.0, 3.0, 60.0] {
            for out_of_plane_km in [-300.0, 0.0, 2_500.0] {
                let r2 = [
                    7_000.0 * radius_ratio * angle.cos(),
                    7_000.0 * radius_ratio * angle.sin(),
                    out_of_plane_km,
                ];
                for tof in [300.0, 2_000.0, 1.0e4, 1.0e5, 4.0e5] {
                    for direction in LambertDirection::BOTH {
                        let sol = lambert::solve_with(
                            r1,
                            r2,
                            tof,
                            MU_EARTH,
                            direction,
                            &LambertOptions::default(),
                        )?;
                        if !sol.converged {
                            continue;
                        }
                        converged += 1;

                        let start = TrajectoryState::new(r1, sol.departure_velocity_km_s, 0.0);
                        let end = propagate_kepler(&start, tof, MU_EARTH)?;
                        let miss = vector::norm(&vector::sub(&end.position_km, &r2));
                        assert!(
                            miss < 0.01 * vector::norm(&r2),
                            "{direction:?} {angle_deg} deg x{radius_ratio} tof {tof}: miss {miss} km"
                        );
                        let arrival_miss = vector::norm(&vector::sub(
                            &end.velocity_km_s,
                            &sol.arrival_velocity_km_s,
                        ));
                        assert!(
                            arrival_miss < 1e-4 * vector::norm(&sol.arrival_velocity_km_s),
                            "arrival velocity off by {arrival_miss} km/s"
                        );
                    }
                }
            }
        }
    }

    assert!(converged > 4_000, "only {converged} converged");
    Ok(())
}

#[test]
fn unconverged_geometry_is_a_status_not_an_error() -> Result<(), Box<dyn Error>> {
    let sol = lambert::solve([7_000.0, 0.0, 0.0], [-20_000.0, 0.0, 0.0], 20_000.0, MU_EARTH)?;
    assert!(!sol.converged);
    assert_eq!(sol.departure_velocity_km_s, [0.0; 3]);
    Ok(())
}

#[test]
fn boundary_validation_is_a_hard_error() {
    assert!(matches!(
        lambert::solve([7_000.0, 0.0, 0.0], [0.0, 7_000.0, 0.0], -1.0, MU_EARTH),
        Err(LambertError::InvalidTimeOfFlight(_))
    ));
    assert!(matches!(
        lambert::solve([f64::NAN, 0.0, 0.0], [0.0, 7_000.0, 0.0], 100.0, MU_EARTH),
        Err(LambertError::InvalidPosition)
    ));
}

#[test]
fn hohmann_bounds_the_72_hour_transfer_from_below() -> Result<(), Box<dyn Error>> {
    let h = hohmann(6_556.0, 384_400.0, MU_EARTH).ok_or("hohmann estimate")?;
    let sol = lambert::solve(
        [6_556.0, 0.0, 0.0],
        circular_moon_position(130.0, TOF_72H),
        TOF_72H,
        MU_EARTH,
    )?;
    assert!(h.departure_dv_km_s < sol.delta_v_km_s);
    assert!(h.time_of_flight_s > TOF_72H);
    Ok(())
}
