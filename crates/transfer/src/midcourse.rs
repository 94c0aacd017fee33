//! Mid-course correction scheduling.

use log::{debug, info};
use lunar_core::state::TrajectoryState;
use lunar_core::units::kms_to_ms;
use lunar_core::vector::{self, Vector3};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MidcourseError {
    #[error("burn time must be finite (got {0})")]
    InvalidTime(f64),
    #[error("burn delta-v must be finite")]
    InvalidDeltaV,
    #[error("burn duration must be finite and non-negative (got {0})")]
    InvalidDuration(f64),
    #[error("invalid mid-course configuration: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidcourseConfig {
    /// Misses closer than this need no correction.
    pub miss_threshold_km: f64,
    pub max_correction_km_s: f64,
}

impl Default for MidcourseConfig {
    fn default() -> Self {
        Self {
            miss_threshold_km: 1.0,
            max_correction_km_s: 0.1,
        }
    }
}

impl MidcourseConfig {
    pub fn validate(&self) -> Result<(), MidcourseError> {
        if !(self.miss_threshold_km.is_finite() && self.miss_threshold_km >= 0.0) {
            return Err(MidcourseError::InvalidConfig("miss threshold must be non-negative"));
        }
        if !(self.max_correction_km_s.is_finite() && self.max_correction_km_s > 0.0) {
            return Err(MidcourseError::InvalidConfig("correction cap must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledBurn {
    pub id: u64,
    pub time_s: f64,
    pub delta_v_km_s: Vector3,
    pub duration_s: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedBurn {
    pub burn: ScheduledBurn,
    /// Time at which the scheduler noticed the burn was due.
    pub executed_at_s: f64,
}

/// Pending burns ordered by time, plus the audit trail of those already applied.
#[derive(Debug, Clone, Default)]
pub struct MidcourseScheduler {
    config: MidcourseConfig,
    scheduled: Vec<ScheduledBurn>,
    executed: Vec<ExecutedBurn>,
    next_id: u64,
}

impl MidcourseScheduler {
    pub fn new(config: MidcourseConfig) -> Result<Self, MidcourseError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &MidcourseConfig {
        &self.config
    }

    pub fn scheduled(&self) -> &[ScheduledBurn] {
        &self.scheduled
    }

    pub fn executed(&self) -> &[ExecutedBurn] {
        &self.executed
    }

    /// Queue a burn and return its id. Burns at equal times keep their insertion order.
    pub fn schedule_burn(
        &mut self,
        time_s: f64,
        delta_v_km_s: Vector3,
        duration_s: f64,
        description: impl Into<String>,
    ) -> Result<u64, MidcourseError> {
        if !time_s.is_finite() {
            return Err(MidcourseError::InvalidTime(time_s));
        }
        if !vector::is_finite(&delta_v_km_s) {
            return Err(MidcourseError::InvalidDeltaV);
        }
        if !(duration_s.is_finite() && duration_s >= 0.0) {
            return Err(MidcourseError::InvalidDuration(duration_s));
        }

        let id = self.next_id;
        self.next_id += 1;
        let burn = ScheduledBurn {
            id,
            time_s,
            delta_v_km_s,
            duration_s,
            description: description.into(),
        };
        debug!("scheduled burn #{id} `{}` at t = {time_s:.1} s", burn.description);
        let index = self.scheduled.partition_point(|b| b.time_s <= time_s);
        self.scheduled.insert(index, burn);
        Ok(id)
    }

    /// Remove a pending burn. Returns it if it had not executed yet.
    pub fn cancel_burn(&mut self, id: u64) -> Option<ScheduledBurn> {
        let index = self.scheduled.iter().position(|b| b.id == id)?;
        Some(self.scheduled.remove(index))
    }

    /// Apply every burn due by `current_time_s` as an impulse on `state`.
    ///
    /// Applied burns move to the executed list, so a second call at the same time is a no-op.
    pub fn check_and_execute_burns(
        &mut self,
        current_time_s: f64,
        state: &TrajectoryState,
    ) -> TrajectoryState {
        let due = self.scheduled.partition_point(|b| b.time_s <= current_time_s);
        let mut updated = *state;
        for burn in self.scheduled.drain(..due) {
            info!(
                "executing burn #{} `{}`: |dv| = {:.2} m/s",
                burn.id,
                burn.description,
                kms_to_ms(vector::norm(&burn.delta_v_km_s))
            );
            updated = updated.with_impulse(&burn.delta_v_km_s);
            self.executed.push(ExecutedBurn {
                burn,
                executed_at_s: current_time_s,
            });
        }
        updated
    }

    /// Velocity change that would carry `state` to `target_position_km` in a straight line by
    /// `target_time_s`. Zero once the target time has passed.
    pub fn calculate_corrective_burn(
        &self,
        state: &TrajectoryState,
        target_position_km: &Vector3,
        target_time_s: f64,
        current_time_s: f64,
    ) -> Vector3 {
        let dt = target_time_s - current_time_s;
        if !(dt > 0.0) {
            return vector::ZERO;
        }
        let displacement = vector::sub(target_position_km, &state.position_km);
        let required = vector::scale(&displacement, 1.0 / dt);
        vector::sub(&required, &state.velocity_km_s)
    }

    /// Correction pushing against the predicted miss vector.
    ///
    /// The miss is removed over the estimated time to closest approach, capped at
    /// `max_correction_km_s`; misses under `miss_threshold_km` return zero.
    pub fn calculate_miss_distance_correction(
        &self,
        state: &TrajectoryState,
        target_center_km: &Vector3,
        predicted_closest_approach_km: &Vector3,
    ) -> Vector3 {
        let miss = vector::sub(predicted_closest_approach_km, target_center_km);
        let miss_km = vector::norm(&miss);
        if miss_km < self.config.miss_threshold_km {
            return vector::ZERO;
        }
        let Some(direction) = vector::unit(&miss) else {
            return vector::ZERO;
        };

        let cap = self.config.max_correction_km_s;
        let range_km = vector::norm(&vector::sub(
            predicted_closest_approach_km,
            &state.position_km,
        ));
        let speed = state.speed_km_s();
        let magnitude = if speed > 0.0 && range_km > 0.0 {
            (miss_km * speed / range_km).min(cap)
        } else {
            cap
        };
        vector::scale(&direction, -magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> MidcourseScheduler {
        MidcourseScheduler::new(MidcourseConfig::default()).unwrap()
    }

    #[test]
    fn burns_stay_sorted_by_time() {
        let mut s = scheduler();
        s.schedule_burn(300.0, [0.0, 0.0, 0.001], 5.0, "late").unwrap();
        s.schedule_burn(100.0, [0.0, 0.001, 0.0], 5.0, "early").unwrap();
        s.schedule_burn(200.0, [0.001, 0.0, 0.0], 5.0, "middle").unwrap();
        let times: Vec<f64> = s.scheduled().iter().map(|b| b.time_s).collect();
        assert_eq!(times, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn cancelled_burn_never_executes() {
        let mut s = scheduler();
        let id = s.schedule_burn(10.0, [0.01, 0.0, 0.0], 1.0, "tcm-1").unwrap();
        assert!(s.cancel_burn(id).is_some());
        assert!(s.cancel_burn(id).is_none());
        let state = TrajectoryState::new([7000.0, 0.0, 0.0], [0.0, 7.5, 0.0], 0.0);
        assert_eq!(s.check_and_execute_burns(100.0, &state), state);
        assert!(s.executed().is_empty());
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        let mut s = scheduler();
        assert!(matches!(
            s.schedule_burn(f64::NAN, vector::ZERO, 0.0, "bad"),
            Err(MidcourseError::InvalidTime(_))
        ));
        assert_eq!(
            s.schedule_burn(0.0, [f64::INFINITY, 0.0, 0.0], 0.0, "bad"),
            Err(MidcourseError::InvalidDeltaV)
        );
        assert!(s.scheduled().is_empty());
    }
}
