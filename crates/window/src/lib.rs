//! Launch window preprocessor.
//!
//! Scans departure epochs, works out which launch azimuth puts the parking orbit into the
//! requested plane, and scores how closely that plane lines up with the Moon's orbit.

use lunar_ephem::EphemerisError;
use serde::Serialize;
use thiserror::Error;

pub mod geometry;
pub mod search;

pub use search::{LaunchWindowPreprocessor, WindowSelection};

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("launch site `{name}` has invalid coordinates ({latitude_deg}, {longitude_deg})")]
    InvalidSite {
        name: String,
        latitude_deg: f64,
        longitude_deg: f64,
    },
    #[error("azimuth corridor [{min}, {max}] deg is empty or out of range")]
    InvalidCorridor { min: f64, max: f64 },
    #[error("search span must be positive with a positive step (got {duration_days} d, {step_s} s)")]
    InvalidSpan { duration_days: f64, step_s: f64 },
    #[error("target inclination must lie in (0, 180) deg (got {0})")]
    InvalidInclination(f64),
    #[error("invalid window search configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Launch site and its permitted azimuth corridor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchSite {
    pub name: String,
    pub latitude_deg: f64,
    /// East-positive.
    pub longitude_deg: f64,
    pub min_azimuth_deg: f64,
    pub max_azimuth_deg: f64,
}

impl LaunchSite {
    /// Eastward corridor `[45°, 135°]`.
    pub fn new(name: impl Into<String>, latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            name: name.into(),
            latitude_deg,
            longitude_deg,
            min_azimuth_deg: 45.0,
            max_azimuth_deg: 135.0,
        }
    }

    pub fn kennedy() -> Self {
        Self::new("Kennedy LC-39A", 28.5, -80.6)
    }

    pub fn validate(&self) -> Result<(), WindowError> {
        let lat_ok = self.latitude_deg.is_finite() && self.latitude_deg.abs() < 90.0;
        let lon_ok = self.longitude_deg.is_finite() && self.longitude_deg.abs() <= 360.0;
        if !(lat_ok && lon_ok) {
            return Err(WindowError::InvalidSite {
                name: self.name.clone(),
                latitude_deg: self.latitude_deg,
                longitude_deg: self.longitude_deg,
            });
        }
        let (min, max) = (self.min_azimuth_deg, self.max_azimuth_deg);
        let in_range = |az: f64| az.is_finite() && (0.0..=360.0).contains(&az);
        if !(in_range(min) && in_range(max) && min <= max) {
            return Err(WindowError::InvalidCorridor { min, max });
        }
        Ok(())
    }

    pub fn azimuth_allowed(&self, azimuth_deg: f64) -> bool {
        (self.min_azimuth_deg..=self.max_azimuth_deg).contains(&azimuth_deg)
    }
}

/// Relative weights of the quality-score terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub raan: f64,
    pub beta: f64,
    pub delta_v: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            raan: 0.5,
            beta: 0.3,
            delta_v: 0.2,
        }
    }
}

impl ScoreWeights {
    fn total(&self) -> f64 {
        self.raan + self.beta + self.delta_v
    }
}

/// How the RAAN reached at orbit insertion is worked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaanModel {
    /// Desired RAAN advanced by Earth's rotation over the ascent. The launch azimuth is the
    /// heading of the desired plane's ground track at the site's sidereal time.
    #[default]
    AscentDrift,
    /// RAAN of whichever pass of the target plane runs through the site at insertion.
    SiteGeometry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSearchConfig {
    pub raan_model: RaanModel,
    pub max_raan_error_deg: f64,
    pub max_beta_angle_deg: f64,
    pub max_plane_change_dv_m_s: f64,
    pub ascent_duration_s: f64,
    pub parking_altitude_km: f64,
    pub weights: ScoreWeights,
}

impl Default for WindowSearchConfig {
    fn default() -> Self {
        Self {
            raan_model: RaanModel::default(),
            max_raan_error_deg: 5.0,
            max_beta_angle_deg: 5.0,
            max_plane_change_dv_m_s: 180.0,
            ascent_duration_s: 600.0,
            parking_altitude_km: 185.0,
            weights: ScoreWeights::default(),
        }
    }
}

impl WindowSearchConfig {
    pub fn validate(&self) -> Result<(), WindowError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !(positive(self.max_raan_error_deg)
            && positive(self.max_beta_angle_deg)
            && positive(self.max_plane_change_dv_m_s))
        {
            return Err(WindowError::InvalidConfig("score maxima must be positive"));
        }
        if !(self.ascent_duration_s.is_finite() && self.ascent_duration_s >= 0.0) {
            return Err(WindowError::InvalidConfig("ascent duration must be non-negative"));
        }
        if !positive(self.parking_altitude_km) {
            return Err(WindowError::InvalidConfig("parking altitude must be positive"));
        }
        let w = self.weights;
        if [w.raan, w.beta, w.delta_v].iter().any(|x| !x.is_finite() || *x < 0.0)
            || w.total() <= 0.0
        {
            return Err(WindowError::InvalidConfig(
                "score weights must be non-negative with a positive sum",
            ));
        }
        Ok(())
    }

    /// Blend of the three error terms, each falling linearly from 1 at zero error to 0 at its
    /// configured maximum. Weights are normalised so the score lies in `[0, 1]`.
    pub fn quality_score(&self, raan_error_deg: f64, beta_angle_deg: f64, dv_m_s: f64) -> f64 {
        let term = |error: f64, max: f64| (1.0 - error.abs() / max).max(0.0);
        let w = self.weights;
        let raw = w.raan * term(raan_error_deg, self.max_raan_error_deg)
            + w.beta * term(beta_angle_deg, self.max_beta_angle_deg)
            + w.delta_v * term(dv_m_s, self.max_plane_change_dv_m_s);
        (raw / w.total()).clamp(0.0, 1.0)
    }
}

/// One evaluated departure epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchOpportunity {
    pub start_et: f64,
    pub end_et: f64,
    pub start_utc: String,
    pub launch_azimuth_deg: f64,
    /// Whether the site is crossed on the ascending half of the orbit.
    pub ascending_pass: bool,
    pub target_inclination_deg: f64,
    /// Desired parking-orbit RAAN (Moon RAAN plus the requested offset).
    pub target_raan_deg: f64,
    pub achieved_raan_deg: f64,
    /// Signed `achieved − target`, in `[-180, 180)`.
    pub raan_error_deg: f64,
    pub beta_angle_deg: f64,
    pub plane_change_dv_m_s: f64,
    pub moon_phase_deg: f64,
    /// Equatorial RAAN of the lunar orbit.
    pub moon_raan_deg: f64,
    pub moon_inclination_deg: f64,
    pub quality_score: f64,
}

impl LaunchOpportunity {
    pub fn is_aligned(&self, max_raan_error_deg: f64) -> bool {
        self.raan_error_deg.abs() <= max_raan_error_deg
    }
}
