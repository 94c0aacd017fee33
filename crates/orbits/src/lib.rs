//! Two-body propagation helpers and the propagator capability consumed by the corrector.

pub mod kepler;
pub mod propagator;

pub use kepler::propagate_kepler;
pub use propagator::{KeplerPropagator, PropagationError, Propagator};

/// Circular orbital speed at radius `r_km` (km/s).
pub fn circular_speed(mu_km3_s2: f64, r_km: f64) -> f64 {
    (mu_km3_s2 / r_km).sqrt()
}
