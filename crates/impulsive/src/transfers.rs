//! Coplanar circular-orbit estimate used as a sanity baseline for the Lambert departure burn.

use serde::Serialize;

/// Hohmann transfer between two circular coplanar orbits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HohmannResult {
    /// Departure burn; negative for an inward (retro) transfer.
    pub departure_dv_km_s: f64,
    /// Arrival circularisation burn; negative when arriving inward.
    pub arrival_dv_km_s: f64,
    pub total_dv_km_s: f64,
    pub time_of_flight_s: f64,
}

/// Classical Hohmann transfer from radius `r1_km` to `r2_km`.
///
/// Returns `None` unless both radii and `mu` are positive and finite.
pub fn hohmann(r1_km: f64, r2_km: f64, mu_km3_s2: f64) -> Option<HohmannResult> {
    let valid = |x: f64| x.is_finite() && x > 0.0;
    if !(valid(r1_km) && valid(r2_km) && valid(mu_km3_s2)) {
        return None;
    }

    let a_transfer = 0.5 * (r1_km + r2_km);
    let vis_viva = |r: f64| (mu_km3_s2 * (2.0 / r - 1.0 / a_transfer)).sqrt();
    let circular = |r: f64| (mu_km3_s2 / r).sqrt();

    let departure = vis_viva(r1_km) - circular(r1_km);
    let arrival = circular(r2_km) - vis_viva(r2_km);

    Some(HohmannResult {
        departure_dv_km_s: departure,
        arrival_dv_km_s: arrival,
        total_dv_km_s: departure.abs() + arrival.abs(),
        time_of_flight_s: std::f64::consts::PI * (a_transfer.powi(3) / mu_km3_s2).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leo_to_lunar_distance() {
        let h = hohmann(6_563.137, 384_400.0, 398_600.4418).unwrap();
        // Textbook TLI from a 185 km parking orbit is ~3.1 km/s over ~5 days.
        assert!((3.05..3.20).contains(&h.departure_dv_km_s), "{h:?}");
        assert!((4.8..5.1).contains(&(h.time_of_flight_s / 86_400.0)), "{h:?}");
    }

    #[test]
    fn rejects_non_positive_radius() {
        assert!(hohmann(0.0, 384_400.0, 398_600.0).is_none());
    }
}
