//! Engine parameters and vehicle mass properties.

use lunar_core::constants::G0;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PropulsionError {
    #[error("thrust must be positive and finite (got {0} N)")]
    InvalidThrust(f64),
    #[error("specific impulse must be positive and finite (got {0} s)")]
    InvalidIsp(f64),
    #[error("throttle range [{min}, {max}] must satisfy 0 < min <= max <= 1")]
    InvalidThrottle { min: f64, max: f64 },
    #[error("{field} must be positive and finite (got {value} kg)")]
    InvalidMass { field: &'static str, value: f64 },
}

/// Single main engine with a throttleable range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineParams {
    /// Full-throttle thrust (N).
    pub thrust_n: f64,
    pub isp_s: f64,
    pub min_throttle: f64,
    pub max_throttle: f64,
}

impl EngineParams {
    pub fn new(
        thrust_n: f64,
        isp_s: f64,
        min_throttle: f64,
        max_throttle: f64,
    ) -> Result<Self, PropulsionError> {
        let engine = Self {
            thrust_n,
            isp_s,
            min_throttle,
            max_throttle,
        };
        engine.validate()?;
        Ok(engine)
    }

    pub fn validate(&self) -> Result<(), PropulsionError> {
        if !(self.thrust_n.is_finite() && self.thrust_n > 0.0) {
            return Err(PropulsionError::InvalidThrust(self.thrust_n));
        }
        if !(self.isp_s.is_finite() && self.isp_s > 0.0) {
            return Err(PropulsionError::InvalidIsp(self.isp_s));
        }
        let (min, max) = (self.min_throttle, self.max_throttle);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max && max <= 1.0) {
            return Err(PropulsionError::InvalidThrottle { min, max });
        }
        Ok(())
    }

    /// Effective exhaust velocity (m/s).
    pub fn exhaust_velocity_m_s(&self) -> f64 {
        self.isp_s * G0
    }

    /// Thrust at a throttle setting (N).
    pub fn thrust_at(&self, throttle: f64) -> f64 {
        self.thrust_n * throttle
    }

    /// Propellant mass flow at a throttle setting (kg/s), `F / (Isp·g0)`.
    pub fn mass_flow_kg_s(&self, throttle: f64) -> f64 {
        self.thrust_at(throttle) / self.exhaust_velocity_m_s()
    }
}

/// Basic vehicle definition used to size burns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub name: String,
    pub dry_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub engine: EngineParams,
}

impl Vehicle {
    pub fn new(
        name: impl Into<String>,
        dry_mass_kg: f64,
        propellant_mass_kg: f64,
        engine: EngineParams,
    ) -> Result<Self, PropulsionError> {
        if !(dry_mass_kg.is_finite() && dry_mass_kg > 0.0) {
            return Err(PropulsionError::InvalidMass {
                field: "dry_mass_kg",
                value: dry_mass_kg,
            });
        }
        if !(propellant_mass_kg.is_finite() && propellant_mass_kg >= 0.0) {
            return Err(PropulsionError::InvalidMass {
                field: "propellant_mass_kg",
                value: propellant_mass_kg,
            });
        }
        engine.validate()?;
        Ok(Self {
            name: name.into(),
            dry_mass_kg,
            propellant_mass_kg,
            engine,
        })
    }

    /// Convenience accessor for total initial mass.
    pub fn initial_mass_kg(&self) -> f64 {
        self.dry_mass_kg + self.propellant_mass_kg
    }

    /// Ideal rocket-equation ΔV with all propellant burned (m/s).
    pub fn delta_v_capacity_m_s(&self) -> f64 {
        self.engine.exhaust_velocity_m_s() * (self.initial_mass_kg() / self.dry_mass_kg).ln()
    }
}
