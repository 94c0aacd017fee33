//! Newton-Raphson residual projector.
//!
//! Flies the finite-burn version of a Lambert transfer through a propagator, measures how far
//! the arrival state lands from the impulsive target, and corrects the departure velocity and
//! time of flight with a finite-difference Jacobian until the miss is within tolerance.

use log::{debug, info, warn};
use lunar_core::state::TrajectoryState;
use lunar_core::units::kms_to_ms;
use lunar_core::vector::{self, Vector3};
use lunar_finiteburn::{BurnError, BurnSequence, FiniteBurnExecutor};
use lunar_impulsive::lambert::{self, LambertDirection, LambertError, LambertOptions, LambertSolution};
use lunar_orbits::{PropagationError, Propagator};
use nalgebra::{SMatrix, SVector, Vector6};
use serde::Serialize;
use thiserror::Error;

/// Singular values below this are dropped by the least-squares solve.
const PSEUDO_INVERSE_EPS: f64 = 1.0e-12;

type Jacobian = SMatrix<f64, 6, 4>;

#[derive(Debug, Error)]
pub enum CorrectorError {
    #[error("the initial Lambert solution did not converge")]
    UnconvergedInitialSolution,
    #[error("invalid corrector configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("lambert solve failed: {0}")]
    Lambert(#[from] LambertError),
    #[error("burn planning failed: {0}")]
    Burn(#[from] BurnError),
    #[error("propagation failed: {0}")]
    Propagation(#[from] PropagationError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectorConfig {
    pub max_iterations: usize,
    pub position_tolerance_km: f64,
    pub velocity_tolerance_km_s: f64,
    /// Allowed drift of the departure ΔV magnitude away from the impulsive value.
    pub delta_v_tolerance_km_s: f64,
    pub velocity_perturbation_km_s: f64,
    pub tof_perturbation_s: f64,
    pub max_velocity_step_km_s: f64,
    pub max_tof_step_s: f64,
    /// Weight of `|Δt|` (per second) in [`ResidualState::total_error`].
    pub time_weight: f64,
    pub direction: LambertDirection,
    pub lambert: LambertOptions,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            position_tolerance_km: 1.0,
            velocity_tolerance_km_s: 0.005,
            delta_v_tolerance_km_s: 0.005,
            velocity_perturbation_km_s: 0.001,
            tof_perturbation_s: 60.0,
            max_velocity_step_km_s: 0.2,
            max_tof_step_s: 3_600.0,
            time_weight: 0.0,
            direction: LambertDirection::Prograde,
            lambert: LambertOptions::default(),
        }
    }
}

impl CorrectorConfig {
    pub fn validate(&self) -> Result<(), CorrectorError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if self.max_iterations == 0 {
            return Err(CorrectorError::InvalidConfig("max_iterations must be at least 1"));
        }
        if !(positive(self.position_tolerance_km)
            && positive(self.velocity_tolerance_km_s)
            && positive(self.delta_v_tolerance_km_s))
        {
            return Err(CorrectorError::InvalidConfig("tolerances must be positive"));
        }
        if !(positive(self.velocity_perturbation_km_s) && positive(self.tof_perturbation_s)) {
            return Err(CorrectorError::InvalidConfig("perturbation steps must be positive"));
        }
        if !(positive(self.max_velocity_step_km_s) && positive(self.max_tof_step_s)) {
            return Err(CorrectorError::InvalidConfig("step limits must be positive"));
        }
        if !(self.time_weight.is_finite() && self.time_weight >= 0.0) {
            return Err(CorrectorError::InvalidConfig("time_weight must be non-negative"));
        }
        Ok(())
    }
}

/// Actual minus target arrival state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResidualState {
    pub position_error_km: Vector3,
    pub velocity_error_km_s: Vector3,
    pub time_error_s: f64,
    /// Position and velocity errors normalised by their tolerances, plus the weighted time error.
    pub total_error: f64,
}

impl ResidualState {
    pub fn between(
        actual: &TrajectoryState,
        target: &TrajectoryState,
        config: &CorrectorConfig,
    ) -> Self {
        let position_error_km = vector::sub(&actual.position_km, &target.position_km);
        let velocity_error_km_s = vector::sub(&actual.velocity_km_s, &target.velocity_km_s);
        let time_error_s = actual.epoch_s - target.epoch_s;
        let total_error = vector::norm(&position_error_km) / config.position_tolerance_km
            + vector::norm(&velocity_error_km_s) / config.velocity_tolerance_km_s
            + config.time_weight * time_error_s.abs();
        Self {
            position_error_km,
            velocity_error_km_s,
            time_error_s,
            total_error,
        }
    }

    pub fn position_error_norm_km(&self) -> f64 {
        vector::norm(&self.position_error_km)
    }

    pub fn velocity_error_norm_km_s(&self) -> f64 {
        vector::norm(&self.velocity_error_km_s)
    }

    fn as_vector(&self) -> Vector6<f64> {
        let (r, v) = (self.position_error_km, self.velocity_error_km_s);
        Vector6::new(r[0], r[1], r[2], v[0], v[1], v[2])
    }
}

/// One Newton step on (departure velocity, time of flight).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectionVector {
    pub delta_v_km_s: Vector3,
    pub delta_tof_s: f64,
    /// `|delta_v_km_s|`.
    pub magnitude_km_s: f64,
}

impl CorrectionVector {
    pub fn zero() -> Self {
        Self {
            delta_v_km_s: vector::ZERO,
            delta_tof_s: 0.0,
            magnitude_km_s: 0.0,
        }
    }

    fn from_step(step: &SVector<f64, 4>) -> Self {
        let delta_v_km_s = [step[0], step[1], step[2]];
        Self {
            delta_v_km_s,
            delta_tof_s: step[3],
            magnitude_km_s: vector::norm(&delta_v_km_s),
        }
    }
}

/// Audit-trail entry for one pass of the corrector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationResult {
    pub iteration: usize,
    pub residual: ResidualState,
    /// Correction computed on this pass; zero when the pass converged.
    pub correction: CorrectionVector,
    pub converged: bool,
    /// Size of the ΔV correction requested on this pass.
    pub delta_v_error_km_s: f64,
    /// `| |ΔV_current| − |ΔV_initial| |`.
    pub delta_v_drift_km_s: f64,
    pub delta_v_km_s: f64,
    pub time_of_flight_s: f64,
}

/// Geometry of the transfer being refined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferLeg {
    /// State just before the departure burn; its epoch is the burn reference epoch.
    pub departure: TrajectoryState,
    pub arrival_position_km: Vector3,
    pub mu_km3_s2: f64,
    pub initial_mass_kg: f64,
}

/// Outcome of a correction run; `converged == false` means the iteration budget ran out or a
/// later pass could not be flown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionRun {
    /// Refined transfer: corrected departure velocity and time of flight.
    pub solution: LambertSolution,
    pub burn: BurnSequence,
    /// Arrival state realised by the last evaluated solution.
    pub arrival: TrajectoryState,
    pub target: TrajectoryState,
    pub iterations: Vec<IterationResult>,
    pub converged: bool,
    pub final_delta_v_km_s: f64,
}

impl CorrectionRun {
    pub fn final_iteration(&self) -> Option<&IterationResult> {
        self.iterations.last()
    }
}

/// Last pass that was actually flown.
struct Evaluated {
    burn: BurnSequence,
    arrival: TrajectoryState,
    velocity: Vector3,
    tof: f64,
    lambert: LambertSolution,
}

pub struct ResidualProjector {
    config: CorrectorConfig,
    executor: FiniteBurnExecutor,
}

impl ResidualProjector {
    pub fn new(config: CorrectorConfig, executor: FiniteBurnExecutor) -> Result<Self, CorrectorError> {
        config.validate()?;
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &CorrectorConfig {
        &self.config
    }

    pub fn executor(&self) -> &FiniteBurnExecutor {
        &self.executor
    }

    pub fn refine_lambert_solution<P>(
        &self,
        propagator: &P,
        leg: &TransferLeg,
        initial: &LambertSolution,
    ) -> Result<CorrectionRun, CorrectorError>
    where
        P: Propagator + ?Sized,
    {
        if !initial.converged {
            return Err(CorrectorError::UnconvergedInitialSolution);
        }

        let cfg = &self.config;
        let v_initial = leg.departure.velocity_km_s;
        let initial_dv = initial.delta_v_from(&v_initial);
        let target = TrajectoryState::new(
            leg.arrival_position_km,
            initial.arrival_velocity_km_s,
            leg.departure.epoch_s + initial.time_of_flight_s,
        );

        let mut lambert_base = *initial;
        let mut offset = vector::ZERO;
        let mut tof = initial.time_of_flight_s;
        let mut velocity = initial.departure_velocity_km_s;
        let mut iterations = Vec::with_capacity(cfg.max_iterations);
        let mut converged = false;
        let mut evaluated: Option<Evaluated> = None;

        for iteration in 0..cfg.max_iterations {
            let (burn, arrival) = match self.fly(propagator, leg, &velocity, tof) {
                Ok(flown) => flown,
                // Nothing flown yet means the inputs themselves are bad.
                Err(err) if evaluated.is_none() => return Err(err),
                Err(err) => {
                    warn!("corrector #{iteration}: propagation failed ({err}); stopping");
                    break;
                }
            };
            let residual = ResidualState::between(&arrival, &target, cfg);
            let current_dv = vector::norm(&vector::sub(&velocity, &v_initial));
            let drift = (current_dv - initial_dv).abs();

            debug!(
                "corrector #{iteration}: |dr| = {:.4} km, |dv| = {:.6} km/s, dV drift = {:.2} m/s, tof = {:.1} s",
                residual.position_error_norm_km(),
                residual.velocity_error_norm_km_s(),
                kms_to_ms(drift),
                tof
            );

            let within = residual.position_error_norm_km() < cfg.position_tolerance_km
                && residual.velocity_error_norm_km_s() < cfg.velocity_tolerance_km_s
                && drift < cfg.delta_v_tolerance_km_s;

            let mut record = IterationResult {
                iteration,
                residual,
                correction: CorrectionVector::zero(),
                converged: within,
                delta_v_error_km_s: 0.0,
                delta_v_drift_km_s: drift,
                delta_v_km_s: current_dv,
                time_of_flight_s: tof,
            };
            evaluated = Some(Evaluated {
                burn,
                arrival,
                velocity,
                tof,
                lambert: lambert_base,
            });

            if within {
                iterations.push(record);
                converged = true;
                if iteration == 0 {
                    info!("Corrector -- CONVERGED in 1 iteration");
                } else {
                    info!("Corrector -- CONVERGED in {} iterations", iteration + 1);
                }
                break;
            }

            let jacobian =
                self.jacobian(propagator, leg, &target, &residual, &velocity, &offset, tof);
            debug!("Jacobian {jacobian}");

            let Some(correction) = self.solve_correction(jacobian, &residual) else {
                warn!("corrector #{iteration}: Jacobian could not be inverted; stopping");
                iterations.push(record);
                break;
            };
            record.correction = correction;
            record.delta_v_error_km_s = correction.magnitude_km_s;
            iterations.push(record);

            if iteration + 1 == cfg.max_iterations {
                break;
            }

            offset = vector::add(&offset, &correction.delta_v_km_s);
            let next_tof = tof + correction.delta_tof_s;
            match self.resolve(leg, next_tof) {
                Some(solution) => {
                    lambert_base = solution;
                    tof = next_tof;
                }
                None => warn!(
                    "corrector #{iteration}: Lambert re-solve failed at tof = {next_tof:.1} s; keeping {tof:.1} s"
                ),
            }
            velocity = vector::add(&lambert_base.departure_velocity_km_s, &offset);
        }

        let Some(Evaluated {
            burn,
            arrival,
            velocity,
            tof,
            lambert: lambert_base,
        }) = evaluated
        else {
            return Err(CorrectorError::InvalidConfig("max_iterations must be at least 1"));
        };
        if !converged {
            warn!(
                "Corrector -- did not converge in {} iterations",
                iterations.len()
            );
        }

        let final_delta_v_km_s = vector::norm(&vector::sub(&velocity, &v_initial));
        let solution = LambertSolution {
            departure_velocity_km_s: velocity,
            time_of_flight_s: tof,
            delta_v_km_s: final_delta_v_km_s,
            ..lambert_base
        };

        Ok(CorrectionRun {
            solution,
            burn,
            arrival,
            target,
            iterations,
            converged,
            final_delta_v_km_s,
        })
    }

    /// Plan the departure burn for `velocity` and propagate to `tof` after departure.
    fn fly<P>(
        &self,
        propagator: &P,
        leg: &TransferLeg,
        velocity: &Vector3,
        tof: f64,
    ) -> Result<(BurnSequence, TrajectoryState), CorrectorError>
    where
        P: Propagator + ?Sized,
    {
        let delta_v = vector::sub(velocity, &leg.departure.velocity_km_s);
        let burn = self.executor.create_burn_sequence(
            kms_to_ms(vector::norm(&delta_v)),
            &delta_v,
            leg.initial_mass_kg,
        )?;
        let arrival = propagator.propagate(&leg.departure, &burn, leg.departure.epoch_s + tof)?;
        Ok((burn, arrival))
    }

    fn resolve(&self, leg: &TransferLeg, tof: f64) -> Option<LambertSolution> {
        match lambert::solve_with(
            leg.departure.position_km,
            leg.arrival_position_km,
            tof,
            leg.mu_km3_s2,
            self.config.direction,
            &self.config.lambert,
        ) {
            Ok(solution) if solution.converged => Some(solution),
            Ok(_) => None,
            Err(err) => {
                debug!("Lambert rejected tof = {tof:.1} s: {err}");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn jacobian<P>(
        &self,
        propagator: &P,
        leg: &TransferLeg,
        target: &TrajectoryState,
        residual: &ResidualState,
        velocity: &Vector3,
        offset: &Vector3,
        tof: f64,
    ) -> Jacobian
    where
        P: Propagator + ?Sized,
    {
        let base = residual.as_vector();
        let mut jacobian = Jacobian::zeros();

        let h = self.config.velocity_perturbation_km_s;
        for axis in 0..3 {
            let mut perturbed = *velocity;
            perturbed[axis] += h;
            match self.fly(propagator, leg, &perturbed, tof) {
                Ok((_, arrival)) => {
                    let column = (ResidualState::between(&arrival, target, &self.config)
                        .as_vector()
                        - base)
                        / h;
                    jacobian.set_column(axis, &column);
                }
                Err(err) => warn!("perturbed flight on axis {axis} failed ({err}); column left at zero"),
            }
        }

        let dt = self.config.tof_perturbation_s;
        let Some(solution) = self.resolve(leg, tof + dt) else {
            warn!(
                "Lambert re-solve failed at perturbed tof = {:.1} s; time-of-flight column left at zero",
                tof + dt
            );
            return jacobian;
        };
        let perturbed = vector::add(&solution.departure_velocity_km_s, offset);
        match self.fly(propagator, leg, &perturbed, tof + dt) {
            Ok((_, arrival)) => {
                let column =
                    (ResidualState::between(&arrival, target, &self.config).as_vector() - base) / dt;
                jacobian.set_column(3, &column);
            }
            Err(err) => warn!("perturbed flight at tof = {:.1} s failed ({err}); column left at zero", tof + dt),
        }
        jacobian
    }

    /// Least-squares `J·δ = −residual`, scaled down to the configured step limits.
    fn solve_correction(
        &self,
        jacobian: Jacobian,
        residual: &ResidualState,
    ) -> Option<CorrectionVector> {
        let pseudo_inverse = jacobian.svd(true, true).pseudo_inverse(PSEUDO_INVERSE_EPS).ok()?;
        let mut step: SVector<f64, 4> = pseudo_inverse * (-residual.as_vector());
        if step.iter().any(|x| !x.is_finite()) {
            return None;
        }

        let dv_norm = step.fixed_rows::<3>(0).norm();
        let mut scale = 1.0_f64;
        if dv_norm > self.config.max_velocity_step_km_s {
            scale = scale.min(self.config.max_velocity_step_km_s / dv_norm);
        }
        if step[3].abs() > self.config.max_tof_step_s {
            scale = scale.min(self.config.max_tof_step_s / step[3].abs());
        }
        if scale < 1.0 {
            debug!("Newton step scaled by {scale:.3}");
            step *= scale;
        }
        Some(CorrectionVector::from_step(&step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_total_error_is_tolerance_normalised() {
        let config = CorrectorConfig {
            time_weight: 0.5,
            ..CorrectorConfig::default()
        };
        let target = TrajectoryState::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], 10.0);
        let actual = TrajectoryState::new([3.0, 0.0, 0.0], [0.0, 1.01, 0.0], 12.0);
        let residual = ResidualState::between(&actual, &target, &config);
        // 2 km / 1 km + 0.01 km/s / 0.005 km/s + 0.5 * 2 s
        assert!((residual.total_error - 5.0).abs() < 1e-9, "{residual:?}");
        assert_eq!(residual.time_error_s, 2.0);
    }

    #[test]
    fn zero_iteration_budget_is_rejected() {
        let config = CorrectorConfig {
            max_iterations: 0,
            ..CorrectorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CorrectorError::InvalidConfig(_))
        ));
    }
}
