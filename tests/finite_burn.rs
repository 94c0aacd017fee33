use std::error::Error;

use lunar_trajectory_planner::core::vector;
use lunar_trajectory_planner::finiteburn::{BurnConfig, BurnError, FiniteBurnExecutor};
use lunar_trajectory_planner::propulsion::{EngineParams, Vehicle};

fn executor(thrust_n: f64, isp_s: f64, dry_kg: f64) -> FiniteBurnExecutor {
    let engine = EngineParams::new(thrust_n, isp_s, 0.4, 1.0).expect("engine");
    FiniteBurnExecutor::new(engine, dry_kg, BurnConfig::default()).expect("executor")
}

#[test]
fn planned_delta_v_matches_request_within_half_a_percent() -> Result<(), Box<dyn Error>> {
    let engines = [(2.0e6, 450.0), (1.0e6, 450.0), (45_000.0, 320.0), (300_000.0, 380.0)];
    let requests = [0.5, 12.0, 85.0, 640.0, 1_900.0, 3_170.0];

    for (thrust, isp) in engines {
        let exec = executor(thrust, isp, 8_000.0);
        for dv in requests {
            let seq = exec.create_burn_sequence(dv, &[0.3, 0.9, -0.1], 30_000.0)?;
            assert!(!seq.propellant_limited);
            let relative = (seq.total_delta_v_m_s - dv).abs() / dv;
            assert!(
                relative <= 0.005,
                "{thrust} N / {dv} m/s: planned {} m/s",
                seq.total_delta_v_m_s
            );
            assert!(seq.is_time_ordered());
            assert!(seq.conservation_error() <= 0.005);
        }
    }
    Ok(())
}

#[test]
fn segments_chain_mass_and_time() -> Result<(), Box<dyn Error>> {
    let exec = executor(1.0e6, 450.0, 8_000.0);
    let seq = exec.create_burn_sequence(3_170.0, &[0.0, 1.0, 0.0], 30_000.0)?;
    assert!(seq.segments.len() > 1, "expected a multi-segment burn");
    for pair in seq.segments.windows(2) {
        assert!((pair[0].end_offset_s() - pair[1].start_offset_s).abs() < 1e-9);
        assert!((pair[0].end_mass_kg() - pair[1].start_mass_kg).abs() < 1e-6);
    }
    for segment in &seq.segments {
        assert!(segment.duration_s <= exec.config().max_segment_duration_s + 1e-9);
        assert!(segment.throttle >= exec.engine().min_throttle - 1e-12);
    }
    // Centred on the reference epoch.
    assert!((seq.start_offset_s() + seq.end_offset_s()).abs() < 1e-6);
    let propellant = seq.initial_mass_kg - seq.final_mass_kg;
    assert!((propellant - seq.propellant_used_kg()).abs() < 1e-9);
    Ok(())
}

#[test]
fn delta_v_vector_points_along_the_requested_direction() -> Result<(), Box<dyn Error>> {
    let exec = executor(2.0e6, 450.0, 8_000.0);
    let seq = exec.create_burn_sequence(1_000.0, &[0.0, 0.0, -4.0], 20_000.0)?;
    let dv = seq.delta_v_vector_km_s();
    assert!((vector::norm(&dv) - seq.total_delta_v_m_s / 1_000.0).abs() < 1e-12);
    assert!(dv[2] < 0.0 && dv[0].abs() < 1e-12 && dv[1].abs() < 1e-12);
    Ok(())
}

#[test]
fn insufficient_propellant_is_flagged_not_rejected() -> Result<(), Box<dyn Error>> {
    let vehicle = Vehicle::new(
        "Storable Kick Stage",
        1_500.0,
        3_500.0,
        EngineParams::new(45_000.0, 320.0, 0.4, 1.0)?,
    )?;
    let exec = FiniteBurnExecutor::for_vehicle(&vehicle, BurnConfig::default())?;
    let capacity = vehicle.delta_v_capacity_m_s();
    let seq = exec.create_burn_sequence(capacity + 500.0, &[1.0, 0.0, 0.0], vehicle.initial_mass_kg())?;

    assert!(seq.propellant_limited);
    assert!((seq.total_delta_v_m_s - capacity).abs() / capacity < 1e-6);
    assert!((seq.final_mass_kg - vehicle.dry_mass_kg).abs() < 1e-6);
    Ok(())
}

#[test]
fn zero_request_is_an_empty_plan() -> Result<(), Box<dyn Error>> {
    let seq = executor(1.0e6, 450.0, 8_000.0).create_burn_sequence(0.0, &[0.0; 3], 30_000.0)?;
    assert!(seq.is_empty());
    assert_eq!(seq.total_delta_v_m_s, 0.0);
    Ok(())
}

#[test]
fn invalid_inputs_fail_at_the_boundary() {
    let exec = executor(1.0e6, 450.0, 8_000.0);
    assert_eq!(
        exec.create_burn_sequence(100.0, &[0.0; 3], 30_000.0),
        Err(BurnError::InvalidDirection)
    );
    assert!(matches!(
        exec.create_burn_sequence(100.0, &[1.0, 0.0, 0.0], 5_000.0),
        Err(BurnError::InvalidMass { .. })
    ));
    assert!(EngineParams::new(0.0, 450.0, 0.4, 1.0).is_err());
}
