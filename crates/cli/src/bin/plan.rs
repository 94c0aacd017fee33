use std::path::PathBuf;

use clap::Parser;
use log::info;
use lunar_trajectory_planner::config::{load_mission, load_vehicle_configs};
use lunar_trajectory_planner::core::constants::{EARTH_RADIUS_KM, MOON_ORBIT_RADIUS_KM};
use lunar_trajectory_planner::core::time::{days_to_seconds, seconds_to_days};
use lunar_trajectory_planner::core::units::kms_to_ms;
use lunar_trajectory_planner::core::vector;
use lunar_trajectory_planner::ephemeris;
use lunar_trajectory_planner::orbits::KeplerPropagator;
use lunar_trajectory_planner::transfer::vehicle as transfer_vehicle;
use lunar_trajectory_planner::transfer::{TransferProfile, plan_transfer, settings};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Plan a lunar transfer: launch window, finite departure burn, Newton-Raphson refinement"
)]
struct Cli {
    /// Mission manifest (TOML or YAML)
    #[arg(long)]
    config: PathBuf,

    /// Vehicle catalog: YAML list, TOML record, or directory of TOML records
    #[arg(long)]
    vehicles: Option<PathBuf>,

    /// Vehicle name from the catalog (overrides the manifest)
    #[arg(long)]
    vehicle: Option<String>,

    /// Print the full profile as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print coplanar circular Hohmann estimate (Δv, TOF)
    #[arg(long, default_value_t = false)]
    estimate_hohmann: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if pretty_env_logger::try_init().is_err() {
        eprintln!("could not init logger");
    }

    let mission = load_mission(&cli.config)?;
    info!("Loaded mission `{}`", mission.name);
    let catalog = cli.vehicles.as_ref().map(load_vehicle_configs).transpose()?;
    let vehicle =
        transfer_vehicle::resolve(&mission, catalog.as_deref(), cli.vehicle.as_deref())?;

    let request = settings::transfer_request(&mission, vehicle)?;
    let propagator =
        KeplerPropagator::new(request.mu_km3_s2, mission.transfer.integration_step_s)?;
    let profile = plan_transfer(&request, &propagator)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    print_profile(&profile)?;

    if cli.estimate_hohmann {
        use lunar_trajectory_planner::impulsive::hohmann;
        let r1 = EARTH_RADIUS_KM + request.window.parking_altitude_km;
        match hohmann(r1, MOON_ORBIT_RADIUS_KM, request.mu_km3_s2) {
            Some(h) => println!(
                "Hohmann est.    : Δv_total = {:.3} km/s (dv1={:.3}, dv2={:.3}), TOF = {:.2} days",
                h.total_dv_km_s,
                h.departure_dv_km_s,
                h.arrival_dv_km_s,
                seconds_to_days(h.time_of_flight_s)
            ),
            None => println!("Hohmann est.    : unavailable"),
        }
    }

    Ok(())
}

fn print_profile(profile: &TransferProfile) -> anyhow::Result<()> {
    let window = &profile.opportunity;
    let departure = &profile.departure;
    let run = &profile.correction;
    let burn = &run.burn;
    let (d, h, m) = format_duration(run.solution.time_of_flight_s);

    println!("=== Lunar Transfer: {} ===", profile.name);
    println!("Vehicle         : {}", profile.vehicle.name);
    println!(
        "Launch          : {} az {:.1}° ({} pass){}",
        window.start_utc,
        window.launch_azimuth_deg,
        if window.ascending_pass { "ascending" } else { "descending" },
        if profile.fallback_window { " [outside RAAN tolerance]" } else { "" }
    );
    println!(
        "Plane           : RAAN {:.2}° (error {:+.2}°), β = {:.2}°, plane-change penalty {:.1} m/s",
        window.achieved_raan_deg,
        window.raan_error_deg,
        window.beta_angle_deg,
        window.plane_change_dv_m_s
    );
    println!(
        "Departure       : {} at u = {:.0}°, impulsive Δv = {:.1} m/s",
        ephemeris::format_epoch(departure.state.epoch_s)?,
        departure.argument_of_latitude_deg,
        kms_to_ms(departure.delta_v_km_s)
    );
    println!(
        "Burn            : {} segments, {:.1} s, Δv = {:.1} m/s, propellant = {:.1} kg{}",
        burn.segments.len(),
        burn.total_duration_s,
        burn.total_delta_v_m_s,
        burn.propellant_used_kg(),
        if burn.propellant_limited { " [PROPELLANT LIMITED]" } else { "" }
    );
    println!(
        "Arrival         : {} (TOF {}d {}h {}m), miss = {:.3} km",
        ephemeris::format_epoch(run.target.epoch_s)?,
        d,
        h,
        m,
        vector::norm(&vector::sub(&run.arrival.position_km, &run.target.position_km))
    );

    println!("--- Corrector ---");
    for it in &run.iterations {
        println!(
            "  #{:<2} |Δr| = {:>12.4} km  |Δv| = {:>9.6} km/s  drift = {:>7.2} m/s  step = {:>8.3} m/s{}",
            it.iteration,
            it.residual.position_error_norm_km(),
            it.residual.velocity_error_norm_km_s(),
            kms_to_ms(it.delta_v_drift_km_s),
            kms_to_ms(it.delta_v_error_km_s),
            if it.converged { "  converged" } else { "" }
        );
    }
    println!(
        "Converged       : {}",
        if run.converged { "yes" } else { "NO (burn plan not verified)" }
    );
    println!("Final Δv        : {:.1} m/s", kms_to_ms(run.final_delta_v_km_s));

    for tcm in &profile.midcourse {
        println!(
            "Mid-course      : {} at {}, Δv = {:.2} m/s",
            tcm.description,
            ephemeris::format_epoch(tcm.time_s)?,
            kms_to_ms(vector::norm(&tcm.delta_v_km_s))
        );
    }
    Ok(())
}

fn format_duration(seconds: f64) -> (i64, i64, i64) {
    let total_seconds = seconds.max(0.0);
    let days = seconds_to_days(total_seconds).floor() as i64;
    let remaining = total_seconds - days_to_seconds(days as f64);
    let hours = (remaining / 3_600.0).floor() as i64;
    let minutes = ((remaining - hours as f64 * 3_600.0) / 60.0).floor() as i64;
    (days, hours, minutes)
}
