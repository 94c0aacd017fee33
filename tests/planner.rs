use std::error::Error;

use lunar_trajectory_planner::config::{load_mission, load_vehicle_configs};
use lunar_trajectory_planner::core::vector;
use lunar_trajectory_planner::orbits::KeplerPropagator;
use lunar_trajectory_planner::transfer::vehicle;
use lunar_trajectory_planner::transfer::{TransferError, plan_transfer, settings};
use lunar_trajectory_planner::window::geometry::orbit_normal;

#[test]
fn inline_vehicle_manifest_plans_end_to_end() -> Result<(), Box<dyn Error>> {
    let mission = load_mission("configs/missions/inline_vehicle.yaml")?;
    let stage = vehicle::resolve(&mission, None, None)?;
    assert_eq!(stage.name, "Heavy TLI Stage");

    let request = settings::transfer_request(&mission, stage)?;
    let propagator =
        KeplerPropagator::new(request.mu_km3_s2, mission.transfer.integration_step_s)?;
    let profile = plan_transfer(&request, &propagator)?;

    assert!(!profile.fallback_window);
    assert!(profile.opportunity.raan_error_deg.abs() <= request.window.max_raan_error_deg);

    let departure = &profile.departure;
    assert!(departure.lambert.converged);
    // Every window scores the same here; the Moon-at-arrival tie-break keeps the leg coplanar.
    let normal = orbit_normal(
        profile.opportunity.target_inclination_deg,
        profile.opportunity.achieved_raan_deg,
    );
    let moon = vector::unit(&profile.target.position_km).ok_or("moon at origin")?;
    assert!(vector::dot(&moon, &normal).abs() < 0.5_f64.to_radians().sin());
    assert!(
        departure.delta_v_km_s > 3.10 && departure.delta_v_km_s < 3.25,
        "impulsive dv {} km/s",
        departure.delta_v_km_s
    );
    let radius = vector::norm(&departure.state.position_km);
    assert!((radius - (6_378.137 + 185.0)).abs() < 1e-6);
    assert_eq!(
        departure.state.epoch_s,
        profile.opportunity.start_et + request.window.ascent_duration_s
    );

    let run = &profile.correction;
    assert!(!run.burn.propellant_limited);
    assert!(run.burn.conservation_error() <= 0.005);
    let first = run.iterations.first().ok_or("empty audit trail")?;
    let last = run.final_iteration().ok_or("empty audit trail")?;
    assert!(last.residual.position_error_norm_km() < first.residual.position_error_norm_km());
    assert!(last.delta_v_error_km_s <= first.delta_v_error_km_s || !run.converged);
    if run.converged {
        assert!(last.residual.position_error_norm_km() < 1.0);
    }
    assert_eq!(profile.converged(), run.converged);

    for tcm in &profile.midcourse {
        assert!(vector::norm(&tcm.delta_v_km_s) <= request.midcourse.max_correction_km_s + 1e-12);
        assert!(tcm.time_s > departure.state.epoch_s);
    }
    Ok(())
}

#[test]
fn catalog_vehicle_is_resolved_by_manifest_name() -> Result<(), Box<dyn Error>> {
    let mission = load_mission("configs/missions/lunar_transfer.toml")?;
    let catalog = load_vehicle_configs("configs/vehicles")?;
    assert_eq!(catalog.len(), 3);

    let stage = vehicle::resolve(&mission, Some(catalog.as_slice()), None)?;
    assert_eq!(stage.name, "Cryogenic Upper Stage");
    let override_stage =
        vehicle::resolve(&mission, Some(catalog.as_slice()), Some("heavy tli stage"))?;
    assert_eq!(override_stage.engine.thrust_n, 2.0e6);

    assert!(matches!(
        vehicle::resolve(&mission, None, None),
        Err(vehicle::VehicleError::Unspecified)
    ));
    Ok(())
}

#[test]
fn unreachable_inclination_has_no_window() -> Result<(), Box<dyn Error>> {
    let mut mission = load_mission("configs/missions/inline_vehicle.yaml")?;
    mission.window.target_inclination_deg = 10.0;
    let stage = vehicle::resolve(&mission, None, None)?;
    let request = settings::transfer_request(&mission, stage)?;
    let propagator = KeplerPropagator::new(request.mu_km3_s2, 2.0)?;
    assert!(matches!(
        plan_transfer(&request, &propagator),
        Err(TransferError::NoWindow)
    ));
    Ok(())
}
