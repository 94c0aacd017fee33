//! Low-precision secular Moon and Sun model.
//!
//! Mean elements follow the short almanac series (a handful of linear terms in days past J2000);
//! the geocentric position keeps only the largest periodic term in longitude, latitude and
//! distance. Good to roughly a degree, which is all the launch-window search needs.

use lunar_core::angles::wrap_360;
use lunar_core::constants::{MOON_ORBIT_RADIUS_KM, MOON_SIDEREAL_PERIOD_DAYS, SECONDS_PER_DAY};
use lunar_core::state::TrajectoryState;
use lunar_core::vector::{self, Vector3};

use crate::days_since_j2000;

/// Inclination of the lunar orbit to the ecliptic (deg).
pub const LUNAR_INCLINATION_DEG: f64 = 5.145;
/// Mean obliquity of the ecliptic (deg).
pub const OBLIQUITY_DEG: f64 = 23.439;

const VELOCITY_DIFFERENCE_STEP_S: f64 = 60.0;

/// Mean lunar elements at an epoch, all in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonElements {
    pub mean_longitude_deg: f64,
    pub mean_anomaly_deg: f64,
    pub argument_of_latitude_deg: f64,
    /// Longitude of the ascending node on the ecliptic.
    pub ecliptic_node_deg: f64,
    /// Inclination of the lunar orbit to Earth's equator.
    pub equatorial_inclination_deg: f64,
    /// Right ascension of the lunar orbit's ascending node on Earth's equator.
    pub equatorial_raan_deg: f64,
}

/// Secular elements of the Moon's orbit at `et` (seconds past J2000).
pub fn moon_elements(et: f64) -> MoonElements {
    let d = days_since_j2000(et);
    let node = wrap_360(125.045 - 0.052_953_8 * d);
    let (equatorial_inclination_deg, equatorial_raan_deg) = equatorial_plane(node);

    MoonElements {
        mean_longitude_deg: wrap_360(218.316 + 13.176_396 * d),
        mean_anomaly_deg: wrap_360(134.963 + 13.064_993 * d),
        argument_of_latitude_deg: wrap_360(93.272 + 13.229_350 * d),
        ecliptic_node_deg: node,
        equatorial_inclination_deg,
        equatorial_raan_deg,
    }
}

/// Rotate the lunar orbit pole from ecliptic to equatorial axes and read off the plane angles.
fn equatorial_plane(ecliptic_node_deg: f64) -> (f64, f64) {
    let inc = LUNAR_INCLINATION_DEG.to_radians();
    let eps = OBLIQUITY_DEG.to_radians();
    let node = ecliptic_node_deg.to_radians();

    let pole_ecl = [inc.sin() * node.sin(), -inc.sin() * node.cos(), inc.cos()];
    let pole = rotate_ecliptic_to_equatorial(&pole_ecl, eps);

    let inclination = pole[2].clamp(-1.0, 1.0).acos().to_degrees();
    let raan = wrap_360(pole[0].atan2(-pole[1]).to_degrees());
    (inclination, raan)
}

fn rotate_ecliptic_to_equatorial(v: &Vector3, eps: f64) -> Vector3 {
    [
        v[0],
        v[1] * eps.cos() - v[2] * eps.sin(),
        v[1] * eps.sin() + v[2] * eps.cos(),
    ]
}

/// Geocentric equatorial position of the Moon (km).
pub fn moon_position_km(et: f64) -> Vector3 {
    let el = moon_elements(et);
    let m = el.mean_anomaly_deg.to_radians();
    let f = el.argument_of_latitude_deg.to_radians();

    let longitude = (el.mean_longitude_deg + 6.289 * m.sin()).to_radians();
    let latitude = (5.128 * f.sin()).to_radians();
    let distance = 385_001.0 - 20_905.0 * m.cos();

    let ecl = [
        distance * latitude.cos() * longitude.cos(),
        distance * latitude.cos() * longitude.sin(),
        distance * latitude.sin(),
    ];
    rotate_ecliptic_to_equatorial(&ecl, OBLIQUITY_DEG.to_radians())
}

/// Geocentric equatorial state of the Moon; velocity by central difference over one minute.
pub fn moon_state(et: f64) -> TrajectoryState {
    let h = VELOCITY_DIFFERENCE_STEP_S;
    let ahead = moon_position_km(et + h);
    let behind = moon_position_km(et - h);
    let velocity = vector::scale(&vector::sub(&ahead, &behind), 1.0 / (2.0 * h));
    TrajectoryState::new(moon_position_km(et), velocity, et)
}

/// Mean longitude of the Sun (deg).
pub fn sun_mean_longitude_deg(et: f64) -> f64 {
    wrap_360(280.460 + 0.985_647_4 * days_since_j2000(et))
}

/// Mean elongation of the Moon from the Sun, `[0, 360)` deg (0 = new Moon).
pub fn moon_phase_deg(et: f64) -> f64 {
    wrap_360(moon_elements(et).mean_longitude_deg - sun_mean_longitude_deg(et))
}

/// Moon on a planar circular orbit of mean radius, `elapsed_s` after it sat at `phase0_deg`.
///
/// Used for quick coplanar transfer estimates where the secular model is overkill.
pub fn circular_moon_position(phase0_deg: f64, elapsed_s: f64) -> Vector3 {
    let rate = 2.0 * std::f64::consts::PI / (MOON_SIDEREAL_PERIOD_DAYS * SECONDS_PER_DAY);
    let angle = phase0_deg.to_radians() + rate * elapsed_s;
    [
        MOON_ORBIT_RADIUS_KM * angle.cos(),
        MOON_ORBIT_RADIUS_KM * angle.sin(),
        0.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equatorial_inclination_stays_between_known_extremes() {
        for day in (0..7000).step_by(250) {
            let el = moon_elements(day as f64 * SECONDS_PER_DAY);
            assert!(
                (18.2..=28.7).contains(&el.equatorial_inclination_deg),
                "inclination {} out of range on day {}",
                el.equatorial_inclination_deg,
                day
            );
        }
    }

    #[test]
    fn moon_distance_is_lunar() {
        let r = vector::norm(&moon_position_km(0.0));
        assert!((356_000.0..=407_000.0).contains(&r), "distance {r}");
    }

    #[test]
    fn moon_speed_is_about_one_km_per_second() {
        let state = moon_state(1.0e8);
        assert!((0.9..1.2).contains(&state.speed_km_s()), "speed {}", state.speed_km_s());
    }
}
