//! Propagator capability and the Keplerian finite-burn implementation.

use lunar_core::state::TrajectoryState;
use lunar_core::units::m_to_km;
use lunar_core::vector::{self, Vector3};
use lunar_finiteburn::{BurnSegment, BurnSequence};
use thiserror::Error;

use crate::kepler::propagate_kepler;

#[derive(Debug, Error, PartialEq)]
pub enum PropagationError {
    #[error("initial state must be finite with a non-zero radius")]
    InvalidState,
    #[error("gravitational parameter must be positive and finite (got {0})")]
    InvalidMu(f64),
    #[error("integration step must be positive and finite (got {0} s)")]
    InvalidStep(f64),
    #[error("Kepler solver did not converge for a {dt_s} s arc")]
    KeplerDidNotConverge { dt_s: f64 },
    #[error("target epoch {target_s} s precedes the end of the last burn at {burn_end_s} s")]
    TargetBeforeBurnEnd { target_s: f64, burn_end_s: f64 },
    #[error("vehicle mass reached {0} kg during a burn")]
    MassDepleted(f64),
}

/// Anything that can fly a state through a burn plan up to a target epoch.
///
/// Segment offsets are measured from `initial.epoch_s`.
pub trait Propagator {
    fn propagate(
        &self,
        initial: &TrajectoryState,
        burns: &BurnSequence,
        target_time_s: f64,
    ) -> Result<TrajectoryState, PropagationError>;
}

impl<F> Propagator for F
where
    F: Fn(&TrajectoryState, &BurnSequence, f64) -> Result<TrajectoryState, PropagationError>,
{
    fn propagate(
        &self,
        initial: &TrajectoryState,
        burns: &BurnSequence,
        target_time_s: f64,
    ) -> Result<TrajectoryState, PropagationError> {
        self(initial, burns, target_time_s)
    }
}

/// Analytic two-body coasts with RK4-integrated thrust arcs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerPropagator {
    pub mu_km3_s2: f64,
    pub integration_step_s: f64,
}

impl KeplerPropagator {
    pub fn new(mu_km3_s2: f64, integration_step_s: f64) -> Result<Self, PropagationError> {
        if !(mu_km3_s2.is_finite() && mu_km3_s2 > 0.0) {
            return Err(PropagationError::InvalidMu(mu_km3_s2));
        }
        if !(integration_step_s.is_finite() && integration_step_s > 0.0) {
            return Err(PropagationError::InvalidStep(integration_step_s));
        }
        Ok(Self {
            mu_km3_s2,
            integration_step_s,
        })
    }

    fn acceleration(&self, r: &Vector3, mass_kg: f64, seg: &BurnSegment) -> Vector3 {
        let radius = vector::norm(r);
        let gravity = vector::scale(r, -self.mu_km3_s2 / radius.powi(3));
        // N / kg is m/s²; the state is in km.
        let thrust = vector::scale(&seg.direction, m_to_km(seg.thrust_n / mass_kg));
        vector::add(&gravity, &thrust)
    }

    /// Integrate one thrust arc from its start state.
    fn burn_arc(
        &self,
        state: &TrajectoryState,
        seg: &BurnSegment,
    ) -> Result<TrajectoryState, PropagationError> {
        let mut r = state.position_km;
        let mut v = state.velocity_km_s;
        let mut mass = seg.start_mass_kg;
        let mut elapsed = 0.0;

        while elapsed < seg.duration_s - 1e-12 {
            let h = self.integration_step_s.min(seg.duration_s - elapsed);
            let mid_mass = mass - seg.mass_flow_kg_s * h / 2.0;
            let end_mass = mass - seg.mass_flow_kg_s * h;
            if end_mass <= 0.0 {
                return Err(PropagationError::MassDepleted(end_mass));
            }

            let half = h / 2.0;
            let k1r = v;
            let k1v = self.acceleration(&r, mass, seg);
            let k2r = vector::add(&v, &vector::scale(&k1v, half));
            let r2 = vector::add(&r, &vector::scale(&k1r, half));
            let k2v = self.acceleration(&r2, mid_mass, seg);
            let k3r = vector::add(&v, &vector::scale(&k2v, half));
            let r3 = vector::add(&r, &vector::scale(&k2r, half));
            let k3v = self.acceleration(&r3, mid_mass, seg);
            let k4r = vector::add(&v, &vector::scale(&k3v, h));
            let r4 = vector::add(&r, &vector::scale(&k3r, h));
            let k4v = self.acceleration(&r4, end_mass, seg);

            r = vector::add(&r, &vector::scale(&rk4_sum(&k1r, &k2r, &k3r, &k4r), h / 6.0));
            v = vector::add(&v, &vector::scale(&rk4_sum(&k1v, &k2v, &k3v, &k4v), h / 6.0));
            mass = end_mass;
            elapsed += h;
        }

        Ok(TrajectoryState::new(r, v, state.epoch_s + seg.duration_s))
    }
}

fn rk4_sum(k1: &Vector3, k2: &Vector3, k3: &Vector3, k4: &Vector3) -> Vector3 {
    let mid = vector::scale(&vector::add(k2, k3), 2.0);
    vector::add(&vector::add(k1, &mid), k4)
}

impl Propagator for KeplerPropagator {
    fn propagate(
        &self,
        initial: &TrajectoryState,
        burns: &BurnSequence,
        target_time_s: f64,
    ) -> Result<TrajectoryState, PropagationError> {
        let reference = initial.epoch_s;
        let mut state = *initial;

        for seg in &burns.segments {
            let start = reference + seg.start_offset_s;
            // Centred burns begin before the reference epoch: coast backwards to the ignition.
            if start != state.epoch_s {
                state = propagate_kepler(&state, start - state.epoch_s, self.mu_km3_s2)?;
            }
            state = self.burn_arc(&state, seg)?;
        }

        if target_time_s < state.epoch_s && !burns.is_empty() {
            return Err(PropagationError::TargetBeforeBurnEnd {
                target_s: target_time_s,
                burn_end_s: state.epoch_s,
            });
        }
        propagate_kepler(&state, target_time_s - state.epoch_s, self.mu_km3_s2)
    }
}
