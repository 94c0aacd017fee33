//! Universal-variable Kepler propagation (elliptic, parabolic and hyperbolic alike).

use lunar_core::state::TrajectoryState;
use lunar_core::vector;
use lunar_impulsive::lambert::{stumpff_c, stumpff_s};

use crate::propagator::PropagationError;

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1.0e-10;
/// Doublings allowed while pushing the far end of the bracket out.
const MAX_BRACKET_EXPANSIONS: usize = 200;
/// `|α|` below this is handled with the parabolic starting guess.
const PARABOLIC_ALPHA: f64 = 1.0e-12;

/// Propagate `state` by `dt_s` seconds (negative for backwards) under point-mass gravity.
///
/// The universal Kepler equation is monotone in `x`, so Newton steps are kept inside a
/// sign-change bracket and replaced by bisection whenever they would leave it.
pub fn propagate_kepler(
    state: &TrajectoryState,
    dt_s: f64,
    mu_km3_s2: f64,
) -> Result<TrajectoryState, PropagationError> {
    if !state.is_finite() || state.radius_km() <= 0.0 {
        return Err(PropagationError::InvalidState);
    }
    if !(mu_km3_s2.is_finite() && mu_km3_s2 > 0.0) {
        return Err(PropagationError::InvalidMu(mu_km3_s2));
    }
    if dt_s == 0.0 {
        return Ok(*state);
    }

    let r0_vec = state.position_km;
    let v0_vec = state.velocity_km_s;
    let r0 = state.radius_km();
    let v0 = state.speed_km_s();
    let sqrt_mu = mu_km3_s2.sqrt();
    let kepler = UniversalKepler {
        r0,
        sigma0: vector::dot(&r0_vec, &v0_vec) / sqrt_mu,
        // Reciprocal semi-major axis.
        alpha: 2.0 / r0 - v0 * v0 / mu_km3_s2,
        target: sqrt_mu * dt_s,
    };

    let x = kepler
        .solve(initial_guess(state, dt_s, mu_km3_s2, kepler.alpha))
        .ok_or(PropagationError::KeplerDidNotConverge { dt_s })?;

    let z = kepler.alpha * x * x;
    let c = stumpff_c(z);
    let s = stumpff_s(z);
    let f = 1.0 - x * x / r0 * c;
    let g = dt_s - x.powi(3) / sqrt_mu * s;
    let position = vector::add(&vector::scale(&r0_vec, f), &vector::scale(&v0_vec, g));
    let r = vector::norm(&position);
    let f_dot = sqrt_mu / (r * r0) * (kepler.alpha * x.powi(3) * s - x);
    let g_dot = 1.0 - x * x / r * c;
    let velocity = vector::add(
        &vector::scale(&r0_vec, f_dot),
        &vector::scale(&v0_vec, g_dot),
    );

    Ok(TrajectoryState::new(position, velocity, state.epoch_s + dt_s))
}

/// Universal Kepler equation `F(x) = √μ·Δt(x) − √μ·dt` for one starting state.
struct UniversalKepler {
    r0: f64,
    /// `r·v / √μ` at the start.
    sigma0: f64,
    alpha: f64,
    target: f64,
}

impl UniversalKepler {
    /// Residual of the time equation. Overflow at very large `|x|` is reported as an infinite
    /// residual with the sign `x` has, which keeps the bracket logic monotone.
    fn residual(&self, x: f64) -> f64 {
        let z = self.alpha * x * x;
        let value = self.sigma0 * x * x * stumpff_c(z)
            + (1.0 - self.alpha * self.r0) * x.powi(3) * stumpff_s(z)
            + self.r0 * x
            - self.target;
        if value.is_finite() {
            value
        } else {
            f64::INFINITY.copysign(x)
        }
    }

    /// `dF/dx`, which is the radius `r(x)` and therefore positive.
    fn slope(&self, x: f64) -> f64 {
        let z = self.alpha * x * x;
        self.sigma0 * x * (1.0 - z * stumpff_s(z))
            + (1.0 - self.alpha * self.r0) * x * x * stumpff_c(z)
            + self.r0
    }

    fn solve(&self, guess: f64) -> Option<f64> {
        // F(0) = −target, so zero is always one end of the bracket.
        let (mut lo, mut hi) = if self.target > 0.0 {
            (0.0, guess)
        } else {
            (guess, 0.0)
        };
        let mut expansions = 0;
        while self.target > 0.0 && self.residual(hi) < 0.0 {
            if expansions == MAX_BRACKET_EXPANSIONS {
                return None;
            }
            lo = hi;
            hi *= 2.0;
            expansions += 1;
        }
        while self.target < 0.0 && self.residual(lo) > 0.0 {
            if expansions == MAX_BRACKET_EXPANSIONS {
                return None;
            }
            hi = lo;
            lo *= 2.0;
            expansions += 1;
        }

        let mut x = if lo < guess && guess < hi {
            guess
        } else {
            0.5 * (lo + hi)
        };
        for _ in 0..MAX_ITERATIONS {
            let f = self.residual(x);
            if f == 0.0 {
                return Some(x);
            }
            if f < 0.0 {
                lo = x;
            } else {
                hi = x;
            }

            let df = self.slope(x);
            let newton = x - f / df;
            let next = if df > 0.0 && newton.is_finite() && lo < newton && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
            let step = next - x;
            x = next;
            if step.abs() < TOLERANCE || hi - lo < TOLERANCE {
                return Some(x);
            }
        }
        None
    }
}

/// Vallado's starting values: mean motion for ellipses, a log form for hyperbolas and the
/// circular-rate guess near parabolic energy. Falls back to the latter if a guess points the
/// wrong way.
fn initial_guess(state: &TrajectoryState, dt_s: f64, mu_km3_s2: f64, alpha: f64) -> f64 {
    let sqrt_mu = mu_km3_s2.sqrt();
    let fallback = sqrt_mu * dt_s / state.radius_km();
    let guess = if alpha > PARABOLIC_ALPHA {
        sqrt_mu * dt_s * alpha
    } else if alpha < -PARABOLIC_ALPHA {
        let a = 1.0 / alpha;
        let sign = dt_s.signum();
        let rv = vector::dot(&state.position_km, &state.velocity_km_s);
        let denominator = rv + sign * (-mu_km3_s2 * a).sqrt() * (1.0 - state.radius_km() * alpha);
        let argument = -2.0 * mu_km3_s2 * alpha * dt_s / denominator;
        sign * (-a).sqrt() * argument.ln()
    } else {
        fallback
    };
    if guess.is_finite() && guess * dt_s > 0.0 {
        guess
    } else {
        fallback
    }
}
