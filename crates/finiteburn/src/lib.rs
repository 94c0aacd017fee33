//! Finite-burn executor: turns an impulsive ΔV into a sequence of thrust segments.
//!
//! Segments run at maximum throttle and are capped in length; the tail segment is sized
//! exactly from the rocket equation and throttled down when it would otherwise be shorter than
//! the minimum segment. When the vehicle cannot deliver the request the sequence burns to dry
//! mass and is flagged rather than rejected.

use log::{debug, warn};
use lunar_core::units::ms_to_kms;
use lunar_core::vector::{self, Vector3};
use lunar_propulsion::{EngineParams, PropulsionError, Vehicle};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BurnError {
    #[error(transparent)]
    Engine(#[from] PropulsionError),
    #[error("requested delta-v must be non-negative and finite (got {0} m/s)")]
    InvalidDeltaV(f64),
    #[error("thrust direction must be a finite non-zero vector")]
    InvalidDirection,
    #[error("initial mass {initial_kg} kg must be finite and at least the dry mass {dry_kg} kg")]
    InvalidMass { initial_kg: f64, dry_kg: f64 },
    #[error("invalid burn configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Segmentation knobs for [`FiniteBurnExecutor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnConfig {
    pub max_segment_duration_s: f64,
    pub min_segment_duration_s: f64,
    /// Allowed relative mismatch between requested and planned ΔV.
    pub conservation_tolerance: f64,
    /// Centre the burn on the reference epoch instead of starting there.
    pub centered: bool,
}

impl Default for BurnConfig {
    fn default() -> Self {
        Self {
            max_segment_duration_s: 60.0,
            min_segment_duration_s: 1.0,
            conservation_tolerance: 0.005,
            centered: true,
        }
    }
}

impl BurnConfig {
    fn validate(&self) -> Result<(), BurnError> {
        if !(self.max_segment_duration_s.is_finite() && self.max_segment_duration_s > 0.0) {
            return Err(BurnError::InvalidConfig("max_segment_duration_s must be positive"));
        }
        if !(self.min_segment_duration_s.is_finite()
            && self.min_segment_duration_s >= 0.0
            && self.min_segment_duration_s <= self.max_segment_duration_s)
        {
            return Err(BurnError::InvalidConfig(
                "min_segment_duration_s must lie in [0, max_segment_duration_s]",
            ));
        }
        if !(self.conservation_tolerance.is_finite() && self.conservation_tolerance > 0.0) {
            return Err(BurnError::InvalidConfig("conservation_tolerance must be positive"));
        }
        Ok(())
    }
}

/// One constant-throttle thrust arc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurnSegment {
    /// Offset from the reference epoch (s); negative for centred burns.
    pub start_offset_s: f64,
    pub duration_s: f64,
    pub direction: Vector3,
    pub throttle: f64,
    pub thrust_n: f64,
    pub mass_flow_kg_s: f64,
    pub start_mass_kg: f64,
    pub delta_v_m_s: f64,
}

impl BurnSegment {
    pub fn end_offset_s(&self) -> f64 {
        self.start_offset_s + self.duration_s
    }

    pub fn end_mass_kg(&self) -> f64 {
        self.start_mass_kg - self.mass_flow_kg_s * self.duration_s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnSequence {
    pub segments: Vec<BurnSegment>,
    pub total_duration_s: f64,
    pub total_delta_v_m_s: f64,
    pub requested_delta_v_m_s: f64,
    pub initial_mass_kg: f64,
    pub final_mass_kg: f64,
    /// Set when the vehicle ran dry before delivering the requested ΔV.
    pub propellant_limited: bool,
}

impl BurnSequence {
    /// A sequence with no thrust arcs (coast only).
    pub fn empty(initial_mass_kg: f64) -> Self {
        Self {
            segments: Vec::new(),
            total_duration_s: 0.0,
            total_delta_v_m_s: 0.0,
            requested_delta_v_m_s: 0.0,
            initial_mass_kg,
            final_mass_kg: initial_mass_kg,
            propellant_limited: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn propellant_used_kg(&self) -> f64 {
        self.initial_mass_kg - self.final_mass_kg
    }

    /// Relative mismatch `|planned − requested| / requested` (zero for a null request).
    pub fn conservation_error(&self) -> f64 {
        if self.requested_delta_v_m_s <= 0.0 {
            return self.total_delta_v_m_s.abs();
        }
        (self.total_delta_v_m_s - self.requested_delta_v_m_s).abs() / self.requested_delta_v_m_s
    }

    /// Planned impulse as a vector in km/s (segments share one direction).
    pub fn delta_v_vector_km_s(&self) -> Vector3 {
        self.segments.iter().fold(vector::ZERO, |acc, seg| {
            vector::add(&acc, &vector::scale(&seg.direction, ms_to_kms(seg.delta_v_m_s)))
        })
    }

    pub fn start_offset_s(&self) -> f64 {
        self.segments.first().map_or(0.0, |s| s.start_offset_s)
    }

    pub fn end_offset_s(&self) -> f64 {
        self.segments.last().map_or(0.0, BurnSegment::end_offset_s)
    }

    /// True when every segment starts no earlier than the previous one ends.
    pub fn is_time_ordered(&self) -> bool {
        self.segments
            .windows(2)
            .all(|pair| pair[1].start_offset_s >= pair[0].end_offset_s() - 1e-9)
    }
}

/// Builds burn sequences for one engine and dry mass.
#[derive(Debug, Clone)]
pub struct FiniteBurnExecutor {
    engine: EngineParams,
    dry_mass_kg: f64,
    config: BurnConfig,
}

impl FiniteBurnExecutor {
    pub fn new(
        engine: EngineParams,
        dry_mass_kg: f64,
        config: BurnConfig,
    ) -> Result<Self, BurnError> {
        engine.validate()?;
        config.validate()?;
        if !(dry_mass_kg.is_finite() && dry_mass_kg > 0.0) {
            return Err(BurnError::InvalidMass {
                initial_kg: f64::NAN,
                dry_kg: dry_mass_kg,
            });
        }
        Ok(Self {
            engine,
            dry_mass_kg,
            config,
        })
    }

    pub fn for_vehicle(vehicle: &Vehicle, config: BurnConfig) -> Result<Self, BurnError> {
        Self::new(vehicle.engine, vehicle.dry_mass_kg, config)
    }

    pub fn engine(&self) -> &EngineParams {
        &self.engine
    }

    pub fn config(&self) -> &BurnConfig {
        &self.config
    }

    /// ΔV available from `initial_mass_kg` down to dry mass (m/s).
    pub fn available_delta_v_m_s(&self, initial_mass_kg: f64) -> f64 {
        if initial_mass_kg <= self.dry_mass_kg {
            return 0.0;
        }
        self.engine.exhaust_velocity_m_s() * (initial_mass_kg / self.dry_mass_kg).ln()
    }

    pub fn create_burn_sequence(
        &self,
        delta_v_m_s: f64,
        direction: &Vector3,
        initial_mass_kg: f64,
    ) -> Result<BurnSequence, BurnError> {
        if !(delta_v_m_s.is_finite() && delta_v_m_s >= 0.0) {
            return Err(BurnError::InvalidDeltaV(delta_v_m_s));
        }
        if !(initial_mass_kg.is_finite() && initial_mass_kg >= self.dry_mass_kg) {
            return Err(BurnError::InvalidMass {
                initial_kg: initial_mass_kg,
                dry_kg: self.dry_mass_kg,
            });
        }
        if delta_v_m_s == 0.0 {
            return Ok(BurnSequence::empty(initial_mass_kg));
        }
        let unit = vector::unit(direction).ok_or(BurnError::InvalidDirection)?;

        let available = self.available_delta_v_m_s(initial_mass_kg);
        let propellant_limited = delta_v_m_s > available;
        if propellant_limited {
            warn!(
                "requested {:.1} m/s exceeds the {:.1} m/s available; burning to dry mass",
                delta_v_m_s, available
            );
        }
        let target = delta_v_m_s.min(available);

        let segments = self.segment(target, &unit, initial_mass_kg);
        let total_duration_s: f64 = segments.iter().map(|s| s.duration_s).sum();
        let total_delta_v_m_s: f64 = segments.iter().map(|s| s.delta_v_m_s).sum();
        let final_mass_kg = segments
            .last()
            .map_or(initial_mass_kg, BurnSegment::end_mass_kg)
            .max(self.dry_mass_kg);

        let shift = if self.config.centered {
            -0.5 * total_duration_s
        } else {
            0.0
        };
        let segments: Vec<BurnSegment> = segments
            .into_iter()
            .map(|s| BurnSegment {
                start_offset_s: s.start_offset_s + shift,
                ..s
            })
            .collect();

        let sequence = BurnSequence {
            segments,
            total_duration_s,
            total_delta_v_m_s,
            requested_delta_v_m_s: delta_v_m_s,
            initial_mass_kg,
            final_mass_kg,
            propellant_limited,
        };

        if !propellant_limited && sequence.conservation_error() > self.config.conservation_tolerance
        {
            warn!(
                "burn plan delivers {:.3} m/s for a {:.3} m/s request",
                sequence.total_delta_v_m_s, delta_v_m_s
            );
        }
        debug!(
            "burn plan: {} segment(s), {:.1} s, {:.1} kg propellant",
            sequence.segments.len(),
            sequence.total_duration_s,
            sequence.propellant_used_kg()
        );
        Ok(sequence)
    }

    /// Uncentred segments delivering `target_m_s` starting at offset zero.
    fn segment(
        &self,
        target_m_s: f64,
        direction: &Vector3,
        initial_mass_kg: f64,
    ) -> Vec<BurnSegment> {
        let ve = self.engine.exhaust_velocity_m_s();
        let mut segments = Vec::new();
        let mut remaining = target_m_s;
        let mut mass = initial_mass_kg;
        let mut offset = 0.0;

        while remaining > 0.0 {
            let mut throttle = self.engine.max_throttle;
            let mut mass_flow = self.engine.mass_flow_kg_s(throttle);
            // Propellant fraction needed for the rest of the burn.
            let fraction = 1.0 - (-remaining / ve).exp();
            let full_duration = mass / mass_flow * fraction;

            let is_tail = full_duration <= self.config.max_segment_duration_s;
            let duration = if !is_tail {
                self.config.max_segment_duration_s
            } else if full_duration < self.config.min_segment_duration_s {
                let needed = mass * ve * fraction
                    / (self.engine.thrust_n * self.config.min_segment_duration_s);
                throttle = needed.clamp(self.engine.min_throttle, self.engine.max_throttle);
                mass_flow = self.engine.mass_flow_kg_s(throttle);
                mass / mass_flow * fraction
            } else {
                full_duration
            };

            let end_mass = mass - mass_flow * duration;
            let delta_v = ve * (mass / end_mass).ln();
            segments.push(BurnSegment {
                start_offset_s: offset,
                duration_s: duration,
                direction: *direction,
                throttle,
                thrust_n: self.engine.thrust_at(throttle),
                mass_flow_kg_s: mass_flow,
                start_mass_kg: mass,
                delta_v_m_s: delta_v,
            });

            if is_tail {
                break;
            }
            offset += duration;
            mass = end_mass;
            remaining -= delta_v;
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(thrust_n: f64) -> FiniteBurnExecutor {
        let engine = EngineParams::new(thrust_n, 450.0, 0.4, 1.0).unwrap();
        FiniteBurnExecutor::new(engine, 8_000.0, BurnConfig::default()).unwrap()
    }

    #[test]
    fn long_burn_is_split_into_capped_segments() {
        let seq = executor(100_000.0)
            .create_burn_sequence(3_100.0, &[0.0, 1.0, 0.0], 30_000.0)
            .unwrap();
        assert!(seq.segments.len() > 1);
        assert!(seq.segments.iter().all(|s| s.duration_s <= 60.0 + 1e-9));
        assert!(seq.is_time_ordered());
        assert!(seq.conservation_error() < 1e-9, "{}", seq.conservation_error());
        assert!(!seq.propellant_limited);
    }

    #[test]
    fn centred_burn_straddles_reference_epoch() {
        let seq = executor(100_000.0)
            .create_burn_sequence(500.0, &[1.0, 0.0, 0.0], 30_000.0)
            .unwrap();
        assert!((seq.start_offset_s() + seq.end_offset_s()).abs() < 1e-9);
    }

    #[test]
    fn tiny_burn_throttles_down_but_not_below_minimum() {
        let seq = executor(100_000.0)
            .create_burn_sequence(0.5, &[1.0, 0.0, 0.0], 30_000.0)
            .unwrap();
        assert_eq!(seq.segments.len(), 1);
        let seg = seq.segments[0];
        assert!((0.4..=1.0).contains(&seg.throttle));
        assert!((seq.total_delta_v_m_s - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_request_gives_empty_sequence() {
        let seq = executor(100_000.0)
            .create_burn_sequence(0.0, &vector::ZERO, 30_000.0)
            .unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.final_mass_kg, 30_000.0);
    }

    #[test]
    fn rejects_zero_direction() {
        let err = executor(100_000.0)
            .create_burn_sequence(10.0, &vector::ZERO, 30_000.0)
            .unwrap_err();
        assert_eq!(err, BurnError::InvalidDirection);
    }
}
