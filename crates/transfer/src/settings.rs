//! Conversion from file-level configuration models into runtime planner inputs.

use lunar_config::{
    BurnSettings, CorrectorSettings, LaunchSiteConfig, MidcourseSettings, MissionFile,
    RaanModelSetting, WindowSettings,
};
use lunar_core::constants::MU_EARTH_KM3_S2;
use lunar_core::time::hours_to_seconds;
use lunar_ephem::epoch_seconds;
use lunar_finiteburn::BurnConfig;
use lunar_propulsion::Vehicle;
use lunar_window::{LaunchSite, RaanModel, ScoreWeights, WindowSearchConfig};

use crate::corrector::CorrectorConfig;
use crate::midcourse::MidcourseConfig;
use crate::mission::{SearchSpan, TransferError, TransferRequest};

pub fn launch_site(config: &LaunchSiteConfig) -> LaunchSite {
    LaunchSite {
        name: config.name.clone(),
        latitude_deg: config.latitude_deg,
        longitude_deg: config.longitude_deg,
        min_azimuth_deg: config.min_azimuth_deg,
        max_azimuth_deg: config.max_azimuth_deg,
    }
}

pub fn window_config(settings: &WindowSettings) -> WindowSearchConfig {
    let raan_model = match settings.raan_model {
        RaanModelSetting::AscentDrift => RaanModel::AscentDrift,
        RaanModelSetting::SiteGeometry => RaanModel::SiteGeometry,
    };
    WindowSearchConfig {
        raan_model,
        max_raan_error_deg: settings.max_raan_error_deg,
        max_beta_angle_deg: settings.max_beta_angle_deg,
        max_plane_change_dv_m_s: settings.max_plane_change_dv_m_s,
        ascent_duration_s: settings.ascent_duration_s,
        parking_altitude_km: settings.parking_altitude_km,
        weights: ScoreWeights::default(),
    }
}

/// Search span of a manifest, with the start epoch parsed.
pub fn search_span(settings: &WindowSettings) -> Result<SearchSpan, TransferError> {
    Ok(SearchSpan {
        start_et: epoch_seconds(&settings.start_epoch)?,
        duration_days: settings.duration_days,
        step_s: settings.step_minutes * 60.0,
        target_offset_deg: settings.target_offset_deg,
        target_inclination_deg: settings.target_inclination_deg,
        max_windows: settings.max_windows,
    })
}

pub fn burn_config(settings: &BurnSettings) -> BurnConfig {
    BurnConfig {
        max_segment_duration_s: settings.max_segment_duration_s,
        min_segment_duration_s: settings.min_segment_duration_s,
        conservation_tolerance: settings.conservation_tolerance,
        centered: settings.centered,
    }
}

pub fn corrector_config(settings: &CorrectorSettings) -> CorrectorConfig {
    CorrectorConfig {
        max_iterations: settings.max_iterations,
        position_tolerance_km: settings.position_tolerance_km,
        velocity_tolerance_km_s: settings.velocity_tolerance_km_s,
        delta_v_tolerance_km_s: settings.delta_v_tolerance_km_s,
        velocity_perturbation_km_s: settings.velocity_perturbation_km_s,
        tof_perturbation_s: settings.tof_perturbation_s,
        max_velocity_step_km_s: settings.max_velocity_step_km_s,
        max_tof_step_s: settings.max_tof_step_s,
        time_weight: settings.time_weight,
        ..CorrectorConfig::default()
    }
}

pub fn midcourse_config(settings: &MidcourseSettings) -> MidcourseConfig {
    MidcourseConfig {
        miss_threshold_km: settings.miss_threshold_km,
        max_correction_km_s: settings.max_correction_km_s,
    }
}

/// Assemble a planner request from a manifest and an already resolved vehicle.
pub fn transfer_request(
    mission: &MissionFile,
    vehicle: Vehicle,
) -> Result<TransferRequest, TransferError> {
    Ok(TransferRequest {
        name: mission.name.clone(),
        site: launch_site(&mission.launch_site),
        window: window_config(&mission.window),
        span: search_span(&mission.window)?,
        time_of_flight_s: hours_to_seconds(mission.transfer.time_of_flight_hours),
        departure_scan_step_deg: mission.transfer.departure_scan_step_deg,
        mu_km3_s2: MU_EARTH_KM3_S2,
        vehicle,
        burn: burn_config(&mission.burn),
        corrector: corrector_config(&mission.corrector),
        midcourse: midcourse_config(&mission.midcourse),
    })
}
