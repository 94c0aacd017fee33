//! Epoch scan and ranking of launch opportunities.

use std::cmp::Ordering;

use log::debug;
use lunar_core::angles::{signed_difference, wrap_360};
use lunar_core::constants::{EARTH_RADIUS_KM, EARTH_ROTATION_RAD_S, MU_EARTH_KM3_S2};
use lunar_core::time::days_to_seconds;
use lunar_core::units::kms_to_ms;
use lunar_ephem as ephemeris;
use serde::Serialize;

use crate::geometry;
use crate::{LaunchOpportunity, LaunchSite, RaanModel, WindowError, WindowSearchConfig};

/// Launch azimuth and the plane it puts the vehicle into.
#[derive(Debug, Clone, Copy)]
struct Insertion {
    azimuth_deg: f64,
    ascending: bool,
    achieved_raan_deg: f64,
}

/// Sampled departure span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start_et: f64,
    pub end_et: f64,
    pub step_seconds: f64,
}

impl TimeWindow {
    /// Sample epochs from start to end inclusive.
    pub fn epochs(&self) -> impl Iterator<Item = f64> + '_ {
        let count = ((self.end_et - self.start_et) / self.step_seconds + 1e-9).floor() as usize;
        (0..=count).map(move |k| self.start_et + k as f64 * self.step_seconds)
    }
}

/// Result of [`LaunchWindowPreprocessor::filter_optimal_windows`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowSelection {
    /// Highest-scoring window regardless of alignment.
    pub best: Option<LaunchOpportunity>,
    /// Top windows within the RAAN tolerance, best first. Empty when none qualify.
    pub aligned: Vec<LaunchOpportunity>,
    /// Top windows overall, best first.
    pub ranked: Vec<LaunchOpportunity>,
}

impl WindowSelection {
    /// Best aligned window, falling back to the best overall one.
    pub fn preferred(&self) -> Option<&LaunchOpportunity> {
        self.aligned.first().or(self.best.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct LaunchWindowPreprocessor {
    site: LaunchSite,
    config: WindowSearchConfig,
}

impl LaunchWindowPreprocessor {
    pub fn new(site: LaunchSite, config: WindowSearchConfig) -> Result<Self, WindowError> {
        site.validate()?;
        config.validate()?;
        Ok(Self { site, config })
    }

    pub fn site(&self) -> &LaunchSite {
        &self.site
    }

    pub fn config(&self) -> &WindowSearchConfig {
        &self.config
    }

    /// Circular speed of the parking orbit (m/s).
    pub fn parking_speed_m_s(&self) -> f64 {
        let r = EARTH_RADIUS_KM + self.config.parking_altitude_km;
        kms_to_ms((MU_EARTH_KM3_S2 / r).sqrt())
    }

    /// Evaluate every `time_step_s` from `start_et` over `duration_days`.
    ///
    /// Epochs where the inclination is unreachable from the site, or where no launch azimuth
    /// lies in the corridor, are skipped.
    pub fn find_alignment_windows(
        &self,
        start_et: f64,
        duration_days: f64,
        target_offset_deg: f64,
        target_inclination_deg: f64,
        time_step_s: f64,
    ) -> Result<Vec<LaunchOpportunity>, WindowError> {
        if !(duration_days.is_finite()
            && duration_days > 0.0
            && time_step_s.is_finite()
            && time_step_s > 0.0
            && start_et.is_finite())
        {
            return Err(WindowError::InvalidSpan {
                duration_days,
                step_s: time_step_s,
            });
        }
        if !(target_inclination_deg.is_finite()
            && target_inclination_deg > 0.0
            && target_inclination_deg < 180.0)
        {
            return Err(WindowError::InvalidInclination(target_inclination_deg));
        }

        let window = TimeWindow {
            start_et,
            end_et: start_et + days_to_seconds(duration_days),
            step_seconds: time_step_s,
        };

        let mut opportunities = Vec::new();
        let mut skipped = 0usize;
        for et in window.epochs() {
            match self.evaluate(et, target_offset_deg, target_inclination_deg, time_step_s)? {
                Some(opportunity) => opportunities.push(opportunity),
                None => skipped += 1,
            }
        }
        debug!(
            "window search from {}: {} evaluated, {} skipped",
            start_et,
            opportunities.len(),
            skipped
        );
        Ok(opportunities)
    }

    /// Evaluate a single departure epoch.
    pub fn evaluate(
        &self,
        et: f64,
        target_offset_deg: f64,
        target_inclination_deg: f64,
        time_step_s: f64,
    ) -> Result<Option<LaunchOpportunity>, WindowError> {
        let moon = ephemeris::moon_elements(et);
        let target_raan_deg = wrap_360(moon.equatorial_raan_deg + target_offset_deg);

        let insertion = match self.config.raan_model {
            RaanModel::AscentDrift => {
                self.ascent_drift_insertion(et, target_raan_deg, target_inclination_deg)
            }
            RaanModel::SiteGeometry => {
                self.site_geometry_insertion(et, target_raan_deg, target_inclination_deg)
            }
        };
        let Some(Insertion {
            azimuth_deg,
            ascending,
            achieved_raan_deg,
        }) = insertion
        else {
            return Ok(None);
        };
        let raan_error_deg = signed_difference(achieved_raan_deg, target_raan_deg);

        let beta_angle_deg = geometry::beta_angle_deg(
            target_inclination_deg,
            achieved_raan_deg,
            moon.equatorial_inclination_deg,
            moon.equatorial_raan_deg,
        );
        let plane_change_dv_m_s =
            geometry::plane_change_dv_m_s(self.parking_speed_m_s(), raan_error_deg);
        let quality_score = self
            .config
            .quality_score(raan_error_deg, beta_angle_deg, plane_change_dv_m_s);

        Ok(Some(LaunchOpportunity {
            start_et: et,
            end_et: et + time_step_s,
            start_utc: ephemeris::format_epoch(et)?,
            launch_azimuth_deg: azimuth_deg,
            ascending_pass: ascending,
            target_inclination_deg,
            target_raan_deg,
            achieved_raan_deg,
            raan_error_deg,
            beta_angle_deg,
            plane_change_dv_m_s,
            moon_phase_deg: ephemeris::moon_phase_deg(et),
            moon_raan_deg: moon.equatorial_raan_deg,
            moon_inclination_deg: moon.equatorial_inclination_deg,
            quality_score,
        }))
    }

    /// Launch along the desired plane's ground track at `et`; the plane then slips east by the
    /// Earth rotation accumulated over the ascent.
    fn ascent_drift_insertion(
        &self,
        et: f64,
        target_raan_deg: f64,
        target_inclination_deg: f64,
    ) -> Option<Insertion> {
        // Unreachable inclination: no real azimuth exists.
        geometry::launch_passes(self.site.latitude_deg, target_inclination_deg)?;
        let sidereal = ephemeris::local_sidereal_deg(et, self.site.longitude_deg);
        let track = geometry::ground_track(
            self.site.latitude_deg,
            sidereal - target_raan_deg,
            target_inclination_deg,
        );
        if !self.site.azimuth_allowed(track.azimuth_deg) {
            return None;
        }
        let drift_deg = EARTH_ROTATION_RAD_S.to_degrees() * self.config.ascent_duration_s;
        Some(Insertion {
            azimuth_deg: track.azimuth_deg,
            ascending: track.northbound,
            achieved_raan_deg: wrap_360(target_raan_deg + drift_deg),
        })
    }

    /// Fly whichever in-corridor pass through the site lands closest to the desired RAAN. The
    /// plane is fixed in inertial space at orbit insertion, after the ascent.
    fn site_geometry_insertion(
        &self,
        et: f64,
        target_raan_deg: f64,
        target_inclination_deg: f64,
    ) -> Option<Insertion> {
        let passes = geometry::launch_passes(self.site.latitude_deg, target_inclination_deg)?;
        let sidereal = ephemeris::local_sidereal_deg(
            et + self.config.ascent_duration_s,
            self.site.longitude_deg,
        );
        let miss = |i: &Insertion| signed_difference(i.achieved_raan_deg, target_raan_deg).abs();

        passes
            .iter()
            .filter(|pass| self.site.azimuth_allowed(pass.azimuth_deg))
            .map(|pass| Insertion {
                azimuth_deg: pass.azimuth_deg,
                ascending: pass.ascending,
                achieved_raan_deg: wrap_360(sidereal - pass.node_offset_deg),
            })
            .min_by(|a, b| miss(a).partial_cmp(&miss(b)).unwrap_or(Ordering::Equal))
    }

    /// Rank by quality score and keep the best `max_count` aligned and overall windows.
    pub fn filter_optimal_windows(
        &self,
        opportunities: &[LaunchOpportunity],
        max_count: usize,
    ) -> WindowSelection {
        let mut ranked = opportunities.to_vec();
        ranked.sort_by(by_score_descending);

        let best = ranked.first().cloned();
        let aligned: Vec<LaunchOpportunity> = ranked
            .iter()
            .filter(|o| o.is_aligned(self.config.max_raan_error_deg))
            .take(max_count)
            .cloned()
            .collect();
        ranked.truncate(max_count);

        if aligned.is_empty() {
            debug!(
                "no window within {} deg of the target RAAN",
                self.config.max_raan_error_deg
            );
        }

        WindowSelection {
            best,
            aligned,
            ranked,
        }
    }
}

fn by_score_descending(a: &LaunchOpportunity, b: &LaunchOpportunity) -> Ordering {
    b.quality_score
        .partial_cmp(&a.quality_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.start_et.partial_cmp(&b.start_et).unwrap_or(Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_includes_both_ends() {
        let window = TimeWindow {
            start_et: 0.0,
            end_et: 3_600.0,
            step_seconds: 1_800.0,
        };
        let epochs: Vec<f64> = window.epochs().collect();
        assert_eq!(epochs, vec![0.0, 1_800.0, 3_600.0]);
    }

    #[test]
    fn inclination_below_latitude_yields_nothing() {
        let pre =
            LaunchWindowPreprocessor::new(LaunchSite::kennedy(), WindowSearchConfig::default())
                .unwrap();
        let found = pre
            .find_alignment_windows(0.0, 1.0, 65.0, 10.0, 3_600.0)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn perfect_alignment_scores_one() {
        let config = WindowSearchConfig::default();
        assert!((config.quality_score(0.0, 0.0, 0.0) - 1.0).abs() < 1e-12);
        assert_eq!(config.quality_score(10.0, 10.0, 400.0), 0.0);
    }
}
