//! Re-exported APIs for consumers of the transfer crate.

pub use crate::corrector::{
    CorrectionRun, CorrectionVector, CorrectorConfig, CorrectorError, IterationResult,
    ResidualProjector, ResidualState, TransferLeg,
};
pub use crate::midcourse::{
    ExecutedBurn, MidcourseConfig, MidcourseError, MidcourseScheduler, ScheduledBurn,
};
pub use crate::mission::departure::DepartureGeometry;
pub use crate::mission::{SearchSpan, TransferError, TransferProfile, TransferRequest, plan_transfer};
pub use lunar_propulsion::{EngineParams, Vehicle};

pub mod vehicle {
    use lunar_config::{MissionFile, VehicleConfig};
    use lunar_propulsion::{EngineParams, PropulsionError, Vehicle};
    use thiserror::Error;

    /// Errors surfaced when selecting or converting vehicles.
    #[derive(Debug, Error)]
    pub enum VehicleError {
        #[error("vehicle '{0}' not found in catalog")]
        NotFound(String),
        #[error("vehicle catalog is empty")]
        EmptyCatalog,
        #[error("mission names no vehicle and no catalog was supplied")]
        Unspecified,
        #[error("vehicle '{name}' is invalid: {source}")]
        Invalid {
            name: String,
            source: PropulsionError,
        },
    }

    /// Convert a `VehicleConfig` into runtime `Vehicle` representation.
    pub fn from_config(config: &VehicleConfig) -> Result<Vehicle, VehicleError> {
        let invalid = |source| VehicleError::Invalid {
            name: config.name.clone(),
            source,
        };
        let engine = EngineParams::new(
            config.engine.thrust_n,
            config.engine.isp_s,
            config.engine.min_throttle,
            config.engine.max_throttle,
        )
        .map_err(invalid)?;
        Vehicle::new(
            config.name.clone(),
            config.dry_mass_kg,
            config.propellant_mass_kg,
            engine,
        )
        .map_err(invalid)
    }

    /// Select a vehicle from the catalog by optional name (case-insensitive), defaulting to the
    /// first entry.
    pub fn select(
        configs: &[VehicleConfig],
        requested: Option<&str>,
    ) -> Result<Vehicle, VehicleError> {
        let Some(first) = configs.first() else {
            return Err(VehicleError::EmptyCatalog);
        };

        let chosen = if let Some(name) = requested {
            let upper = name.to_uppercase();
            configs
                .iter()
                .find(|cfg| cfg.name.to_uppercase() == upper)
                .ok_or_else(|| VehicleError::NotFound(name.to_string()))?
        } else {
            first
        };

        from_config(chosen)
    }

    /// Vehicle for a mission: an explicit `requested` name wins, then the manifest's inline
    /// vehicle, then its `vehicle_name` looked up in `catalog`.
    pub fn resolve(
        mission: &MissionFile,
        catalog: Option<&[VehicleConfig]>,
        requested: Option<&str>,
    ) -> Result<Vehicle, VehicleError> {
        if requested.is_none() {
            if let Some(inline) = &mission.vehicle {
                return from_config(inline);
            }
        }
        let name = requested.or(mission.vehicle_name.as_deref());
        match catalog {
            Some(configs) => select(configs, name),
            None => Err(VehicleError::Unspecified),
        }
    }

}
