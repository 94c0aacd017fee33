//! Core units, constants, and shared primitives for the lunar trajectory planner workspace.

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Earth gravitational parameter (km³/s²).
    pub const MU_EARTH_KM3_S2: f64 = 398_600.4418;
    /// Earth equatorial radius (km).
    pub const EARTH_RADIUS_KM: f64 = 6_378.137;
    /// Earth sidereal rotation rate (rad/s).
    pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115_9e-5;
    /// Mean Earth–Moon distance used by the circular Moon model (km).
    pub const MOON_ORBIT_RADIUS_KM: f64 = 384_400.0;
    /// Sidereal month (days).
    pub const MOON_SIDEREAL_PERIOD_DAYS: f64 = 27.321_661;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert metres to kilometres.
    #[inline]
    pub fn m_to_km(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert metres per second to kilometres per second.
    #[inline]
    pub fn ms_to_kms(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert kilometres per second to metres per second.
    #[inline]
    pub fn kms_to_ms(v: f64) -> f64 {
        v * 1_000.0
    }
}

/// Lightweight time utilities shared across crates.
pub mod time {
    use super::constants::SECONDS_PER_DAY;

    /// Convert days to seconds.
    #[inline]
    pub fn days_to_seconds(days: f64) -> f64 {
        days * SECONDS_PER_DAY
    }

    /// Convert seconds to days.
    #[inline]
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    /// Convert hours to seconds.
    #[inline]
    pub fn hours_to_seconds(hours: f64) -> f64 {
        hours * 3_600.0
    }
}

/// Angle wrapping helpers (degrees).
pub mod angles {
    /// Wrap an angle into `[0, 360)`.
    #[inline]
    pub fn wrap_360(deg: f64) -> f64 {
        let wrapped = deg.rem_euclid(360.0);
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// Signed smallest difference, wrapped into `[-180, 180)`.
    #[inline]
    pub fn wrap_180(deg: f64) -> f64 {
        wrap_360(deg + 180.0) - 180.0
    }

    /// Signed smallest angular difference `a - b` in degrees.
    #[inline]
    pub fn signed_difference(a: f64, b: f64) -> f64 {
        wrap_180(a - b)
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// The zero vector.
    pub const ZERO: Vector3 = [0.0, 0.0, 0.0];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product `a × b`.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Unit vector along `v`, or `None` for a zero/non-finite vector.
    #[inline]
    pub fn unit(v: &Vector3) -> Option<Vector3> {
        let n = norm(v);
        if n > 0.0 && n.is_finite() {
            Some(scale(v, 1.0 / n))
        } else {
            None
        }
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(v: &Vector3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}

/// Sampled or propagated spacecraft state.
pub mod state {
    use serde::{Deserialize, Serialize};

    use super::vector::{self, Vector3};

    /// Immutable position/velocity snapshot at an epoch (seconds past J2000 or mission time).
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct TrajectoryState {
        pub position_km: Vector3,
        pub velocity_km_s: Vector3,
        pub epoch_s: f64,
    }

    impl TrajectoryState {
        pub fn new(position_km: Vector3, velocity_km_s: Vector3, epoch_s: f64) -> Self {
            Self {
                position_km,
                velocity_km_s,
                epoch_s,
            }
        }

        pub fn radius_km(&self) -> f64 {
            vector::norm(&self.position_km)
        }

        pub fn speed_km_s(&self) -> f64 {
            vector::norm(&self.velocity_km_s)
        }

        /// Same position and epoch with `delta_v_km_s` added to the velocity.
        pub fn with_impulse(&self, delta_v_km_s: &Vector3) -> Self {
            Self {
                velocity_km_s: vector::add(&self.velocity_km_s, delta_v_km_s),
                ..*self
            }
        }

        pub fn is_finite(&self) -> bool {
            vector::is_finite(&self.position_km)
                && vector::is_finite(&self.velocity_km_s)
                && self.epoch_s.is_finite()
        }
    }
}
