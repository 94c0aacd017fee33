//! Spherical-trigonometry helpers for launch azimuth and plane geometry.

use lunar_core::angles::wrap_360;
use lunar_core::vector::Vector3;

/// Slack allowed on `|cos i / cos φ| ≤ 1` before a geometry is declared unreachable.
const AZIMUTH_SLACK: f64 = 1.0e-12;

/// One of the two daily passes of an orbit plane over a launch site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchPass {
    pub azimuth_deg: f64,
    pub ascending: bool,
    /// Right-ascension difference between the site and the plane's ascending node.
    pub node_offset_deg: f64,
}

/// Both passes of an orbit of `inclination_deg` over a site at `latitude_deg`.
///
/// Returns `None` when the site latitude exceeds what the inclination can reach.
pub fn launch_passes(latitude_deg: f64, inclination_deg: f64) -> Option<[LaunchPass; 2]> {
    let phi = latitude_deg.to_radians();
    let inc = inclination_deg.to_radians();

    let sin_az = inc.cos() / phi.cos();
    if sin_az.abs() > 1.0 + AZIMUTH_SLACK {
        return None;
    }
    let sin_u = phi.sin() / inc.sin();
    if !sin_u.is_finite() || sin_u.abs() > 1.0 + AZIMUTH_SLACK {
        return None;
    }
    let az = sin_az.clamp(-1.0, 1.0).asin().to_degrees();
    // Argument of latitude of the site along the orbit.
    let u = sin_u.clamp(-1.0, 1.0).asin();
    let y = inc.cos() * u.sin();

    Some([
        LaunchPass {
            azimuth_deg: wrap_360(az),
            ascending: true,
            node_offset_deg: y.atan2(u.cos()).to_degrees(),
        },
        LaunchPass {
            azimuth_deg: wrap_360(180.0 - az),
            ascending: false,
            node_offset_deg: y.atan2(-u.cos()).to_degrees(),
        },
    ])
}

/// Heading of a plane's ground track where it crosses a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTrack {
    pub azimuth_deg: f64,
    /// Moving north, i.e. between the descending and ascending node.
    pub northbound: bool,
}

/// Ground-track heading of the plane (`inclination_deg`, RAAN) at a site whose local sidereal
/// time is `hour_angle_deg` past that RAAN.
///
/// The heading is `h × ŝ` resolved onto the site's east and north axes, where `h` is the orbit
/// normal and `ŝ` the site direction. The site need not lie in the plane.
pub fn ground_track(latitude_deg: f64, hour_angle_deg: f64, inclination_deg: f64) -> GroundTrack {
    let phi = latitude_deg.to_radians();
    let lambda = hour_angle_deg.to_radians();
    let inc = inclination_deg.to_radians();

    let east = inc.sin() * phi.sin() * lambda.sin() + inc.cos() * phi.cos();
    let north = inc.sin() * lambda.cos();
    GroundTrack {
        azimuth_deg: wrap_360(east.atan2(north).to_degrees()),
        northbound: north > 0.0,
    }
}

/// Angle between two orbit planes given by inclination and RAAN (degrees).
pub fn beta_angle_deg(inc_a_deg: f64, raan_a_deg: f64, inc_b_deg: f64, raan_b_deg: f64) -> f64 {
    let (ia, ib) = (inc_a_deg.to_radians(), inc_b_deg.to_radians());
    let d_raan = (raan_a_deg - raan_b_deg).to_radians();
    let cos_beta = ia.cos() * ib.cos() + ia.sin() * ib.sin() * d_raan.cos();
    cos_beta.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Plane-change cost `V·sin|ΔΩ|` for an orbit moving at `orbital_speed_m_s`.
pub fn plane_change_dv_m_s(orbital_speed_m_s: f64, raan_error_deg: f64) -> f64 {
    orbital_speed_m_s * raan_error_deg.abs().to_radians().sin()
}

/// Unit angular-momentum vector of the plane with the given inclination and RAAN.
pub fn orbit_normal(inclination_deg: f64, raan_deg: f64) -> Vector3 {
    let (i, raan) = (inclination_deg.to_radians(), raan_deg.to_radians());
    [i.sin() * raan.sin(), -i.sin() * raan.cos(), i.cos()]
}

/// Unit vector toward the ascending node of a plane with the given RAAN.
pub fn node_vector(raan_deg: f64) -> Vector3 {
    let raan = raan_deg.to_radians();
    [raan.cos(), raan.sin(), 0.0]
}
