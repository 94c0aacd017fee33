//! End-to-end transfer planner: launch window, departure geometry, finite burn, refinement.

pub mod departure;

use std::cmp::Ordering;

use log::{debug, info, warn};
use lunar_core::constants::EARTH_RADIUS_KM;
use lunar_core::state::TrajectoryState;
use lunar_core::units::kms_to_ms;
use lunar_core::vector;
use lunar_ephem::EphemerisError;
use lunar_ephem::moon::{moon_position_km, moon_state};
use lunar_finiteburn::{BurnConfig, BurnError, FiniteBurnExecutor};
use lunar_impulsive::LambertError;
use lunar_orbits::{PropagationError, Propagator};
use lunar_propulsion::Vehicle;
use lunar_window::geometry::orbit_normal;
use lunar_window::{
    LaunchOpportunity, LaunchSite, LaunchWindowPreprocessor, WindowError, WindowSearchConfig,
};
use serde::Serialize;

use self::departure::{DepartureGeometry, ParkingOrbit, scan_departure};
use crate::corrector::{CorrectionRun, CorrectorConfig, CorrectorError, ResidualProjector, TransferLeg};
use crate::midcourse::{MidcourseConfig, MidcourseError, MidcourseScheduler, ScheduledBurn};

/// Top-level planning error.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("window search failed: {0}")]
    Window(#[from] WindowError),
    #[error("epoch error: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("lambert solve failed: {0}")]
    Lambert(#[from] LambertError),
    #[error("burn planning failed: {0}")]
    Burn(#[from] BurnError),
    #[error("propagation failed: {0}")]
    Propagation(#[from] PropagationError),
    #[error("correction failed: {0}")]
    Corrector(#[from] CorrectorError),
    #[error("mid-course scheduling failed: {0}")]
    Midcourse(#[from] MidcourseError),
    #[error("no launch opportunity in the search span")]
    NoWindow,
    #[error("no converged departure around the parking orbit")]
    NoDeparture,
    #[error("invalid transfer request: {0}")]
    InvalidRequest(&'static str),
}

/// Quality scores closer than this are treated as equal when picking the launch.
const SCORE_TIE: f64 = 1.0e-9;

/// Departure epochs to scan and the plane being targeted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSpan {
    pub start_et: f64,
    pub duration_days: f64,
    pub step_s: f64,
    pub target_offset_deg: f64,
    pub target_inclination_deg: f64,
    pub max_windows: usize,
}

/// Inputs for [`plan_transfer`].
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub name: String,
    pub site: LaunchSite,
    pub window: WindowSearchConfig,
    pub span: SearchSpan,
    pub time_of_flight_s: f64,
    pub departure_scan_step_deg: f64,
    pub mu_km3_s2: f64,
    pub vehicle: Vehicle,
    pub burn: BurnConfig,
    pub corrector: CorrectorConfig,
    pub midcourse: MidcourseConfig,
}

/// Planner output handed to downstream trajectory execution.
#[derive(Debug, Clone, Serialize)]
pub struct TransferProfile {
    pub name: String,
    pub vehicle: Vehicle,
    pub opportunity: LaunchOpportunity,
    /// True when no window met the RAAN tolerance and the best overall one was used.
    pub fallback_window: bool,
    pub departure: DepartureGeometry,
    /// Moon state at the nominal arrival epoch.
    pub target: TrajectoryState,
    pub correction: CorrectionRun,
    /// Trajectory correction manoeuvre proposed at mid-flight, if the refined arrival misses.
    pub midcourse: Vec<ScheduledBurn>,
}

impl TransferProfile {
    pub fn converged(&self) -> bool {
        self.correction.converged
    }
}

/// Run the planner: window search, parking-orbit departure scan, finite-burn refinement.
pub fn plan_transfer(
    request: &TransferRequest,
    propagator: &dyn Propagator,
) -> Result<TransferProfile, TransferError> {
    if !(request.time_of_flight_s.is_finite() && request.time_of_flight_s > 0.0) {
        return Err(TransferError::InvalidRequest("time of flight must be positive"));
    }

    let preprocessor = LaunchWindowPreprocessor::new(request.site.clone(), request.window)?;
    let span = &request.span;
    let opportunities = preprocessor.find_alignment_windows(
        span.start_et,
        span.duration_days,
        span.target_offset_deg,
        span.target_inclination_deg,
        span.step_s,
    )?;
    let selection = preprocessor.filter_optimal_windows(&opportunities, span.max_windows.max(1));
    let fallback_window = selection.aligned.is_empty();
    let opportunity = pick_opportunity(request, &opportunities, fallback_window)
        .or_else(|| selection.preferred().cloned())
        .ok_or(TransferError::NoWindow)?;
    if fallback_window {
        warn!(
            "no window within {} deg of the target RAAN; using best overall (error {:.2} deg)",
            request.window.max_raan_error_deg, opportunity.raan_error_deg
        );
    }
    info!(
        "launch {} az {:.1} deg, RAAN error {:.2} deg, score {:.3}",
        opportunity.start_utc,
        opportunity.launch_azimuth_deg,
        opportunity.raan_error_deg,
        opportunity.quality_score
    );

    let orbit = ParkingOrbit {
        radius_km: EARTH_RADIUS_KM + request.window.parking_altitude_km,
        inclination_deg: opportunity.target_inclination_deg,
        raan_deg: opportunity.achieved_raan_deg,
        mu_km3_s2: request.mu_km3_s2,
    };
    let departure_epoch = opportunity.start_et + request.window.ascent_duration_s;
    let arrival_epoch = departure_epoch + request.time_of_flight_s;
    let arrival_position_km = moon_position_km(arrival_epoch);

    let departure = scan_departure(
        &orbit,
        departure_epoch,
        &arrival_position_km,
        request.time_of_flight_s,
        request.departure_scan_step_deg,
        &request.corrector.lambert,
    )?;
    info!(
        "departure at u = {:.0} deg ({:?}), impulsive dV {:.1} m/s",
        departure.argument_of_latitude_deg,
        departure.direction,
        kms_to_ms(departure.delta_v_km_s)
    );

    let executor = FiniteBurnExecutor::for_vehicle(&request.vehicle, request.burn)?;
    let corrector = CorrectorConfig {
        direction: departure.direction,
        ..request.corrector
    };
    let projector = ResidualProjector::new(corrector, executor)?;
    let leg = TransferLeg {
        departure: departure.state,
        arrival_position_km,
        mu_km3_s2: request.mu_km3_s2,
        initial_mass_kg: request.vehicle.initial_mass_kg(),
    };
    let correction = projector.refine_lambert_solution(propagator, &leg, &departure.lambert)?;
    if correction.burn.propellant_limited {
        warn!(
            "{} cannot deliver {:.1} m/s; burn is propellant limited",
            request.vehicle.name, correction.burn.requested_delta_v_m_s
        );
    }

    let midcourse = propose_midcourse(request, propagator, &leg, &correction)?;

    Ok(TransferProfile {
        name: request.name.clone(),
        vehicle: request.vehicle.clone(),
        opportunity,
        fallback_window,
        departure,
        target: moon_state(arrival_epoch),
        correction,
        midcourse,
    })
}

/// Best-scoring window, ties going to the one whose parking plane passes closest to the Moon at
/// the nominal arrival. Aligned windows only, unless none are.
fn pick_opportunity(
    request: &TransferRequest,
    opportunities: &[LaunchOpportunity],
    fallback: bool,
) -> Option<LaunchOpportunity> {
    let max_error = request.window.max_raan_error_deg;
    let pool: Vec<&LaunchOpportunity> = opportunities
        .iter()
        .filter(|o| fallback || o.is_aligned(max_error))
        .collect();
    let top = pool
        .iter()
        .map(|o| o.quality_score)
        .fold(f64::NEG_INFINITY, f64::max);
    let lead_s = request.window.ascent_duration_s + request.time_of_flight_s;
    let tied: Vec<&LaunchOpportunity> = pool
        .into_iter()
        .filter(|o| o.quality_score >= top - SCORE_TIE)
        .collect();
    debug!("{} windows share the top score {:.6}", tied.len(), top);

    tied.into_iter()
        .map(|o| (moon_out_of_plane_deg(o, o.start_et + lead_s), o))
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
        .map(|(_, o)| o.clone())
}

/// Angle of the Moon above or below the window's parking plane at `epoch_s` (degrees).
fn moon_out_of_plane_deg(opportunity: &LaunchOpportunity, epoch_s: f64) -> f64 {
    let normal = orbit_normal(
        opportunity.target_inclination_deg,
        opportunity.achieved_raan_deg,
    );
    let Some(moon) = vector::unit(&moon_position_km(epoch_s)) else {
        return f64::INFINITY;
    };
    vector::dot(&moon, &normal).clamp(-1.0, 1.0).asin().to_degrees().abs()
}

/// Schedule a mid-flight correction against whatever miss the refined trajectory still has.
fn propose_midcourse(
    request: &TransferRequest,
    propagator: &dyn Propagator,
    leg: &TransferLeg,
    correction: &CorrectionRun,
) -> Result<Vec<ScheduledBurn>, TransferError> {
    let mut scheduler = MidcourseScheduler::new(request.midcourse)?;
    let midpoint_s = leg.departure.epoch_s + correction.solution.time_of_flight_s / 2.0;
    let cruise = propagator.propagate(&leg.departure, &correction.burn, midpoint_s)?;
    let delta_v = scheduler.calculate_miss_distance_correction(
        &cruise,
        &leg.arrival_position_km,
        &correction.arrival.position_km,
    );
    if delta_v != vector::ZERO {
        scheduler.schedule_burn(midpoint_s, delta_v, 0.0, "TCM-1")?;
    }
    Ok(scheduler.scheduled().to_vec())
}
