//! Universal-variable Lambert solver.
//!
//! Newton iteration on `z = αx²` (the universal anomaly squared times the reciprocal semi-major
//! axis), with the Stumpff functions evaluated in trigonometric, hyperbolic or series form
//! depending on the sign of `z`. Single-revolution transfers only.

use std::f64::consts::{PI, TAU};

use lunar_core::vector::{self, Vector3};
use serde::Serialize;
use thiserror::Error;

/// Below this `|z|` the Stumpff functions switch to their power series.
const SERIES_THRESHOLD: f64 = 1.0e-6;
/// `1 ∓ cos Δν` below this is treated as a collinear (0° or 180°) geometry.
const COLLINEAR_TOLERANCE: f64 = 1.0e-10;
/// Step halvings allowed while an iterate lands on `y(z) ≤ 0`.
const MAX_STEP_HALVINGS: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum LambertError {
    #[error("position vectors must be finite and non-zero")]
    InvalidPosition,
    #[error("position vectors are coincident")]
    CoincidentPositions,
    #[error("time of flight must be positive and finite (got {0} s)")]
    InvalidTimeOfFlight(f64),
    #[error("gravitational parameter must be positive and finite (got {0})")]
    InvalidMu(f64),
}

/// Which way round the central body the transfer goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LambertDirection {
    /// Angular momentum along +z (counter-clockwise seen from the north).
    #[default]
    Prograde,
    Retrograde,
}

impl LambertDirection {
    pub const BOTH: [LambertDirection; 2] = [LambertDirection::Prograde, LambertDirection::Retrograde];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertOptions {
    /// Convergence threshold on the Newton step in `z`.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for LambertOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-8,
            max_iterations: 100,
        }
    }
}

/// Velocities of the conic connecting two positions in a given time.
///
/// A non-converged solution carries zero velocities; callers are expected to try another
/// time of flight or direction rather than treat it as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LambertSolution {
    pub departure_velocity_km_s: Vector3,
    pub arrival_velocity_km_s: Vector3,
    pub time_of_flight_s: f64,
    /// Departure burn from a circular orbit through `r1` lying in the transfer plane.
    pub delta_v_km_s: f64,
    pub converged: bool,
    pub iterations: usize,
    pub z: f64,
}

impl LambertSolution {
    fn unconverged(time_of_flight_s: f64, iterations: usize) -> Self {
        Self {
            departure_velocity_km_s: vector::ZERO,
            arrival_velocity_km_s: vector::ZERO,
            time_of_flight_s,
            delta_v_km_s: 0.0,
            converged: false,
            iterations,
            z: f64::NAN,
        }
    }

    /// Departure ΔV magnitude against an arbitrary initial velocity.
    pub fn delta_v_from(&self, initial_velocity_km_s: &Vector3) -> f64 {
        vector::norm(&vector::sub(
            &self.departure_velocity_km_s,
            initial_velocity_km_s,
        ))
    }
}

/// Prograde solve with default options.
pub fn solve(
    r1_km: Vector3,
    r2_km: Vector3,
    time_of_flight_s: f64,
    mu_km3_s2: f64,
) -> Result<LambertSolution, LambertError> {
    solve_with(
        r1_km,
        r2_km,
        time_of_flight_s,
        mu_km3_s2,
        LambertDirection::Prograde,
        &LambertOptions::default(),
    )
}

pub fn solve_with(
    r1_km: Vector3,
    r2_km: Vector3,
    time_of_flight_s: f64,
    mu_km3_s2: f64,
    direction: LambertDirection,
    options: &LambertOptions,
) -> Result<LambertSolution, LambertError> {
    validate(&r1_km, &r2_km, time_of_flight_s, mu_km3_s2)?;

    let r1 = vector::norm(&r1_km);
    let r2 = vector::norm(&r2_km);
    let cos_dnu = (vector::dot(&r1_km, &r2_km) / (r1 * r2)).clamp(-1.0, 1.0);

    if (1.0 - cos_dnu).abs() < COLLINEAR_TOLERANCE || (1.0 + cos_dnu).abs() < COLLINEAR_TOLERANCE {
        return Ok(LambertSolution::unconverged(time_of_flight_s, 0));
    }

    let cross_z = vector::cross(&r1_km, &r2_km)[2];
    let mut dnu = cos_dnu.acos();
    let long_way = match direction {
        LambertDirection::Prograde => cross_z < 0.0,
        LambertDirection::Retrograde => cross_z >= 0.0,
    };
    if long_way {
        dnu = TAU - dnu;
    }

    let a = dnu.sin() * (r1 * r2 / (1.0 - cos_dnu)).sqrt();
    let geometry = Geometry { r1, r2, a };
    let sqrt_mu = mu_km3_s2.sqrt();

    let Some((z, iterations)) = newton_z(&geometry, sqrt_mu * time_of_flight_s, options) else {
        return Ok(LambertSolution::unconverged(
            time_of_flight_s,
            options.max_iterations,
        ));
    };

    let y = geometry.y(z);
    let f = 1.0 - y / r1;
    let g = a * (y / mu_km3_s2).sqrt();
    let g_dot = 1.0 - y / r2;

    let v1 = vector::scale(&vector::sub(&r2_km, &vector::scale(&r1_km, f)), 1.0 / g);
    let v2 = vector::scale(&vector::sub(&vector::scale(&r2_km, g_dot), &r1_km), 1.0 / g);

    if !vector::is_finite(&v1) || !vector::is_finite(&v2) {
        return Ok(LambertSolution::unconverged(time_of_flight_s, iterations));
    }

    Ok(LambertSolution {
        departure_velocity_km_s: v1,
        arrival_velocity_km_s: v2,
        time_of_flight_s,
        delta_v_km_s: circular_departure_delta_v(&r1_km, &r2_km, &v1, mu_km3_s2),
        converged: true,
        iterations,
        z,
    })
}

fn validate(r1: &Vector3, r2: &Vector3, tof: f64, mu: f64) -> Result<(), LambertError> {
    if !vector::is_finite(r1) || !vector::is_finite(r2) {
        return Err(LambertError::InvalidPosition);
    }
    if vector::norm(r1) <= 0.0 || vector::norm(r2) <= 0.0 {
        return Err(LambertError::InvalidPosition);
    }
    if vector::norm(&vector::sub(r1, r2)) <= 0.0 {
        return Err(LambertError::CoincidentPositions);
    }
    if !(tof.is_finite() && tof > 0.0) {
        return Err(LambertError::InvalidTimeOfFlight(tof));
    }
    if !(mu.is_finite() && mu > 0.0) {
        return Err(LambertError::InvalidMu(mu));
    }
    Ok(())
}

struct Geometry {
    r1: f64,
    r2: f64,
    a: f64,
}

impl Geometry {
    fn y(&self, z: f64) -> f64 {
        self.r1 + self.r2 + self.a * (z * stumpff_s(z) - 1.0) / stumpff_c(z).sqrt()
    }

    /// `√μ·t(z)`; the root of `time(z) - √μ·tof` is the transfer.
    fn time(&self, z: f64) -> f64 {
        let y = self.y(z);
        let c = stumpff_c(z);
        (y / c).powf(1.5) * stumpff_s(z) + self.a * y.sqrt()
    }

    fn time_derivative(&self, z: f64) -> f64 {
        if z.abs() < SERIES_THRESHOLD {
            let y0 = self.y(0.0);
            return 2.0_f64.sqrt() / 40.0 * y0.powf(1.5)
                + self.a / 8.0 * (y0.sqrt() + self.a * (1.0 / (2.0 * y0)).sqrt());
        }
        let y = self.y(z);
        let c = stumpff_c(z);
        let s = stumpff_s(z);
        (y / c).powf(1.5) * (1.0 / (2.0 * z) * (c - 1.5 * s / c) + 0.75 * s * s / c)
            + self.a / 8.0 * (3.0 * s / c * y.sqrt() + self.a * (c / y).sqrt())
    }
}

/// Returns the converged `z` and the number of Newton steps taken.
fn newton_z(geometry: &Geometry, target: f64, options: &LambertOptions) -> Option<(f64, usize)> {
    // One full revolution: beyond this the single-rev branch no longer exists.
    let z_max = (2.0 * PI).powi(2);
    let mut z = 0.0;
    if geometry.y(z) <= 0.0 {
        return None;
    }

    for iteration in 1..=options.max_iterations {
        let residual = geometry.time(z) - target;
        let slope = geometry.time_derivative(z);
        if slope == 0.0 || !slope.is_finite() || !residual.is_finite() {
            return None;
        }

        let mut next = z - residual / slope;
        if next >= z_max {
            next = 0.5 * (z + z_max);
        }
        let mut halvings = 0;
        while geometry.y(next) <= 0.0 && halvings < MAX_STEP_HALVINGS {
            next = 0.5 * (z + next);
            halvings += 1;
        }
        if geometry.y(next) <= 0.0 {
            return None;
        }

        if (next - z).abs() < options.tolerance {
            return Some((next, iteration));
        }
        z = next;
    }
    None
}

/// Magnitude of `v1` minus the circular velocity at `r1` turning the same way as the transfer.
fn circular_departure_delta_v(r1: &Vector3, r2: &Vector3, v1: &Vector3, mu: f64) -> f64 {
    let Some(r_hat) = vector::unit(r1) else {
        return vector::norm(v1);
    };
    let h_hat = vector::unit(&vector::cross(r1, v1))
        .or_else(|| vector::unit(&vector::cross(r1, r2)))
        .unwrap_or([0.0, 0.0, 1.0]);
    let v_circ = vector::scale(
        &vector::cross(&h_hat, &r_hat),
        (mu / vector::norm(r1)).sqrt(),
    );
    vector::norm(&vector::sub(v1, &v_circ))
}

/// Stumpff `C(z)`.
pub fn stumpff_c(z: f64) -> f64 {
    if z > SERIES_THRESHOLD {
        let s = z.sqrt();
        (1.0 - s.cos()) / z
    } else if z < -SERIES_THRESHOLD {
        let s = (-z).sqrt();
        (s.cosh() - 1.0) / (-z)
    } else {
        0.5 - z / 24.0 + z * z / 720.0 - z * z * z / 40_320.0
    }
}

/// Stumpff `S(z)`.
pub fn stumpff_s(z: f64) -> f64 {
    if z > SERIES_THRESHOLD {
        let s = z.sqrt();
        (s - s.sin()) / s.powi(3)
    } else if z < -SERIES_THRESHOLD {
        let s = (-z).sqrt();
        (s.sinh() - s) / s.powi(3)
    } else {
        1.0 / 6.0 - z / 120.0 + z * z / 5_040.0 - z * z * z / 362_880.0
    }
}
