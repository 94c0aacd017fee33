use std::path::PathBuf;

use clap::Parser;
use lunar_trajectory_planner::config::load_mission;
use lunar_trajectory_planner::ephemeris;
use lunar_trajectory_planner::transfer::settings;
use lunar_trajectory_planner::window::{LaunchOpportunity, LaunchWindowPreprocessor};

#[derive(Parser)]
#[command(author, version, about = "Search launch windows aligned with the lunar orbit plane")]
struct Cli {
    /// Mission manifest (TOML or YAML)
    #[arg(long)]
    config: PathBuf,

    /// Search start epoch (overrides the manifest)
    #[arg(long)]
    start: Option<String>,

    /// Search span in days (overrides the manifest)
    #[arg(long)]
    days: Option<f64>,

    /// Print the selection as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if pretty_env_logger::try_init().is_err() {
        eprintln!("could not init logger");
    }

    let mission = load_mission(&cli.config)?;
    let mut span = settings::search_span(&mission.window)?;
    if let Some(start) = &cli.start {
        span.start_et = ephemeris::epoch_seconds(start)?;
    }
    if let Some(days) = cli.days {
        span.duration_days = days;
    }

    let preprocessor = LaunchWindowPreprocessor::new(
        settings::launch_site(&mission.launch_site),
        settings::window_config(&mission.window),
    )?;
    let opportunities = preprocessor.find_alignment_windows(
        span.start_et,
        span.duration_days,
        span.target_offset_deg,
        span.target_inclination_deg,
        span.step_s,
    )?;
    let selection = preprocessor.filter_optimal_windows(&opportunities, span.max_windows);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
        return Ok(());
    }

    println!("=== Launch Windows: {} ===", preprocessor.site().name);
    println!(
        "Searched        : {} from {} ({} samples)",
        format_days(span.duration_days),
        ephemeris::format_epoch(span.start_et)?,
        opportunities.len()
    );
    match &selection.best {
        Some(best) => println!("Best overall    : {}", describe(best)),
        None => println!("Best overall    : none (inclination unreachable from site)"),
    }
    if selection.aligned.is_empty() {
        println!(
            "Aligned         : none within {:.1}° of the target RAAN",
            preprocessor.config().max_raan_error_deg
        );
    } else {
        println!("Aligned         :");
        for window in &selection.aligned {
            println!("  {}", describe(window));
        }
    }
    Ok(())
}

fn describe(window: &LaunchOpportunity) -> String {
    format!(
        "{} az {:6.2}°  RAAN err {:+6.2}°  β {:5.2}°  Δv {:6.1} m/s  score {:.3}",
        window.start_utc,
        window.launch_azimuth_deg,
        window.raan_error_deg,
        window.beta_angle_deg,
        window.plane_change_dv_m_s,
        window.quality_score
    )
}

fn format_days(days: f64) -> String {
    if (days - 1.0).abs() < f64::EPSILON {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}
