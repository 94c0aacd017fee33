//! Departure point selection around the parking orbit.

use std::cmp::Ordering;

use log::debug;
use lunar_core::state::TrajectoryState;
use lunar_core::vector::{self, Vector3};
use lunar_impulsive::lambert::{self, LambertDirection, LambertOptions, LambertSolution};
use lunar_orbits::circular_speed;
use lunar_window::geometry::{node_vector, orbit_normal};
use serde::Serialize;

use super::TransferError;

/// Circular parking orbit the transfer departs from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingOrbit {
    pub radius_km: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub mu_km3_s2: f64,
}

impl ParkingOrbit {
    pub fn circular_speed_km_s(&self) -> f64 {
        circular_speed(self.mu_km3_s2, self.radius_km)
    }

    /// State at argument of latitude `u_deg` (measured from the ascending node).
    pub fn state_at(&self, argument_of_latitude_deg: f64, epoch_s: f64) -> TrajectoryState {
        let h = orbit_normal(self.inclination_deg, self.raan_deg);
        let n = node_vector(self.raan_deg);
        let q = vector::cross(&h, &n);
        let u = argument_of_latitude_deg.to_radians();
        let r_hat = vector::add(&vector::scale(&n, u.cos()), &vector::scale(&q, u.sin()));
        let v_hat = vector::cross(&h, &r_hat);
        TrajectoryState::new(
            vector::scale(&r_hat, self.radius_km),
            vector::scale(&v_hat, self.circular_speed_km_s()),
            epoch_s,
        )
    }
}

/// Cheapest departure found by [`scan_departure`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepartureGeometry {
    pub argument_of_latitude_deg: f64,
    /// Parking-orbit state before the burn.
    pub state: TrajectoryState,
    pub direction: LambertDirection,
    pub lambert: LambertSolution,
    /// Impulsive ΔV against the parking-orbit velocity (km/s).
    pub delta_v_km_s: f64,
}

/// Try every `step_deg` around the orbit and both transfer directions; keep the minimum ΔV.
pub fn scan_departure(
    orbit: &ParkingOrbit,
    epoch_s: f64,
    target_position_km: &Vector3,
    time_of_flight_s: f64,
    step_deg: f64,
    options: &LambertOptions,
) -> Result<DepartureGeometry, TransferError> {
    if !(step_deg.is_finite() && step_deg > 0.0 && step_deg <= 360.0) {
        return Err(TransferError::InvalidRequest(
            "departure scan step must lie in (0, 360] deg",
        ));
    }

    let samples = (360.0 / step_deg).round().max(1.0) as usize;
    let mut candidates = Vec::new();
    for k in 0..samples {
        let u = k as f64 * step_deg;
        let state = orbit.state_at(u, epoch_s);
        for direction in LambertDirection::BOTH {
            let solution = lambert::solve_with(
                state.position_km,
                *target_position_km,
                time_of_flight_s,
                orbit.mu_km3_s2,
                direction,
                options,
            )?;
            if !solution.converged {
                continue;
            }
            candidates.push(DepartureGeometry {
                argument_of_latitude_deg: u,
                state,
                direction,
                delta_v_km_s: solution.delta_v_from(&state.velocity_km_s),
                lambert: solution,
            });
        }
    }
    debug!(
        "departure scan: {} converged of {} trials",
        candidates.len(),
        samples * LambertDirection::BOTH.len()
    );

    candidates
        .into_iter()
        .min_by(|a, b| {
            a.delta_v_km_s
                .partial_cmp(&b.delta_v_km_s)
                .unwrap_or(Ordering::Equal)
        })
        .ok_or(TransferError::NoDeparture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunar_core::constants::MU_EARTH_KM3_S2;

    fn leo() -> ParkingOrbit {
        ParkingOrbit {
            radius_km: 6_563.0,
            inclination_deg: 28.5,
            raan_deg: 40.0,
            mu_km3_s2: MU_EARTH_KM3_S2,
        }
    }

    #[test]
    fn parking_state_is_circular_and_in_plane() {
        let orbit = leo();
        let h = orbit_normal(orbit.inclination_deg, orbit.raan_deg);
        for u in [0.0, 90.0, 217.0] {
            let s = orbit.state_at(u, 0.0);
            assert!((s.radius_km() - orbit.radius_km).abs() < 1e-9);
            assert!((s.speed_km_s() - orbit.circular_speed_km_s()).abs() < 1e-12);
            assert!(vector::dot(&s.position_km, &h).abs() < 1e-9);
            assert!(vector::dot(&s.position_km, &s.velocity_km_s).abs() < 1e-9);
            // prograde
            let l = vector::cross(&s.position_km, &s.velocity_km_s);
            assert!(vector::dot(&l, &h) > 0.0);
        }
    }

    #[test]
    fn ascending_node_is_at_zero_latitude() {
        let s = leo().state_at(0.0, 0.0);
        assert!(s.position_km[2].abs() < 1e-9);
        assert!(s.velocity_km_s[2] > 0.0);
    }

    #[test]
    fn scan_finds_translunar_injection() {
        let orbit = leo();
        let target = orbit.state_at(180.0, 0.0).position_km;
        let target = vector::scale(&target, 384_400.0 / orbit.radius_km);
        let best = scan_departure(
            &orbit,
            0.0,
            &target,
            3.0 * 86_400.0,
            5.0,
            &LambertOptions::default(),
        )
        .unwrap();
        assert!(best.lambert.converged);
        assert!(
            best.delta_v_km_s > 2.9 && best.delta_v_km_s < 3.5,
            "dv {}",
            best.delta_v_km_s
        );
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = scan_departure(&leo(), 0.0, &[384_400.0, 0.0, 0.0], 1.0, 0.0, &LambertOptions::default());
        assert!(matches!(err, Err(TransferError::InvalidRequest(_))));
    }
}
