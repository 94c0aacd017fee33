//! Epoch conversion, sidereal time, and analytic Moon/Sun ephemerides.
//!
//! Epochs are seconds past J2000 (2000-01-01T12:00:00 UTC). Leap seconds and the UTC/TT offset are
//! ignored: the secular models below are accurate to a fraction of a degree at best, so the
//! half-minute discrepancy is well below their resolution.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lunar_core::angles::wrap_360;
use lunar_core::time::seconds_to_days;
use thiserror::Error;

pub mod moon;

pub use moon::{
    MoonElements, circular_moon_position, moon_elements, moon_phase_deg, moon_state,
    sun_mean_longitude_deg,
};

/// Unix timestamp of the J2000 epoch.
const J2000_UNIX_SECONDS: i64 = 946_728_000;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Errors surfaced while converting epochs.
#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("invalid epoch string `{epoch}`")]
    InvalidEpoch { epoch: String },
    #[error("epoch {seconds} s past J2000 is outside the representable calendar range")]
    OutOfRange { seconds: f64 },
}

/// Parse a UTC calendar string into seconds past J2000.
///
/// Accepts RFC 3339 (`2026-01-01T00:00:00Z`), naive ISO date-times (with `T` or a space), and bare
/// dates (`2026-01-01`, midnight UTC).
pub fn epoch_seconds(epoch: &str) -> Result<f64, EphemerisError> {
    let trimmed = epoch.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime_to_et(&dt.with_timezone(&Utc)));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime_to_et(&naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(datetime_to_et(&naive.and_utc()));
        }
    }
    Err(EphemerisError::InvalidEpoch {
        epoch: epoch.to_string(),
    })
}

/// Seconds past J2000 for a UTC timestamp.
pub fn datetime_to_et(dt: &DateTime<Utc>) -> f64 {
    (dt.timestamp() - J2000_UNIX_SECONDS) as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

/// UTC timestamp for seconds past J2000.
pub fn et_to_datetime(et: f64) -> Result<DateTime<Utc>, EphemerisError> {
    if !et.is_finite() {
        return Err(EphemerisError::OutOfRange { seconds: et });
    }
    let whole = et.floor();
    let nanos = ((et - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64 + J2000_UNIX_SECONDS, nanos)
        .ok_or(EphemerisError::OutOfRange { seconds: et })
}

/// Format seconds past J2000 as an ISO-8601 UTC string (second resolution).
pub fn format_epoch(et: f64) -> Result<String, EphemerisError> {
    Ok(et_to_datetime(et)?
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string())
}

/// Days (including fraction) past J2000.
#[inline]
pub fn days_since_j2000(et: f64) -> f64 {
    seconds_to_days(et)
}

/// Greenwich mean sidereal time in degrees, `[0, 360)`.
pub fn gmst_deg(et: f64) -> f64 {
    let d = days_since_j2000(et);
    wrap_360(280.460_618_37 + 360.985_647_366_29 * d)
}

/// Local mean sidereal time for an east-positive longitude, in degrees.
pub fn local_sidereal_deg(et: f64, longitude_deg: f64) -> f64 {
    wrap_360(gmst_deg(et) + longitude_deg)
}
