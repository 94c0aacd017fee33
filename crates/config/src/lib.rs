//! Configuration models and loaders for the lunar trajectory planner.
//!
//! Mission manifests and vehicle catalogs are TOML or YAML, picked by file extension; a
//! directory is read as a sorted set of TOML records.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Launch site entry of a mission manifest.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LaunchSiteConfig {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default = "default_min_azimuth")]
    pub min_azimuth_deg: f64,
    #[serde(default = "default_max_azimuth")]
    pub max_azimuth_deg: f64,
}

fn default_min_azimuth() -> f64 {
    45.0
}

fn default_max_azimuth() -> f64 {
    135.0
}

/// `raan_model` key of the window settings.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RaanModelSetting {
    #[default]
    AscentDrift,
    SiteGeometry,
}

/// Launch-window search parameters.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowSettings {
    /// UTC start of the search (`2026-01-01T00:00:00Z`).
    pub start_epoch: String,
    pub duration_days: f64,
    pub step_minutes: f64,
    /// Desired parking-orbit RAAN relative to the lunar orbit RAAN.
    pub target_offset_deg: f64,
    pub target_inclination_deg: f64,
    pub raan_model: RaanModelSetting,
    pub max_raan_error_deg: f64,
    pub max_beta_angle_deg: f64,
    pub max_plane_change_dv_m_s: f64,
    pub ascent_duration_s: f64,
    pub parking_altitude_km: f64,
    pub max_windows: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            start_epoch: "2026-01-01T00:00:00Z".to_string(),
            duration_days: 7.0,
            step_minutes: 30.0,
            target_offset_deg: 65.0,
            target_inclination_deg: 28.5,
            raan_model: RaanModelSetting::default(),
            max_raan_error_deg: 5.0,
            max_beta_angle_deg: 5.0,
            max_plane_change_dv_m_s: 180.0,
            ascent_duration_s: 600.0,
            parking_altitude_km: 185.0,
            max_windows: 5,
        }
    }
}

/// Transfer leg shaping.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransferSettings {
    pub time_of_flight_hours: f64,
    pub departure_scan_step_deg: f64,
    /// RK4 step used while integrating thrust arcs.
    pub integration_step_s: f64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            time_of_flight_hours: 72.0,
            departure_scan_step_deg: 5.0,
            integration_step_s: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BurnSettings {
    pub max_segment_duration_s: f64,
    pub min_segment_duration_s: f64,
    pub conservation_tolerance: f64,
    pub centered: bool,
}

impl Default for BurnSettings {
    fn default() -> Self {
        Self {
            max_segment_duration_s: 60.0,
            min_segment_duration_s: 1.0,
            conservation_tolerance: 0.005,
            centered: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CorrectorSettings {
    pub max_iterations: usize,
    pub position_tolerance_km: f64,
    pub velocity_tolerance_km_s: f64,
    pub delta_v_tolerance_km_s: f64,
    pub velocity_perturbation_km_s: f64,
    pub tof_perturbation_s: f64,
    pub max_velocity_step_km_s: f64,
    pub max_tof_step_s: f64,
    pub time_weight: f64,
}

impl Default for CorrectorSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            position_tolerance_km: 1.0,
            velocity_tolerance_km_s: 0.005,
            delta_v_tolerance_km_s: 0.005,
            velocity_perturbation_km_s: 0.001,
            tof_perturbation_s: 60.0,
            max_velocity_step_km_s: 0.2,
            max_tof_step_s: 3_600.0,
            time_weight: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MidcourseSettings {
    pub miss_threshold_km: f64,
    pub max_correction_km_s: f64,
}

impl Default for MidcourseSettings {
    fn default() -> Self {
        Self {
            miss_threshold_km: 1.0,
            max_correction_km_s: 0.1,
        }
    }
}

/// Main engine of a catalogued vehicle.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    pub thrust_n: f64,
    pub isp_s: f64,
    #[serde(default = "default_min_throttle")]
    pub min_throttle: f64,
    #[serde(default = "default_max_throttle")]
    pub max_throttle: f64,
}

fn default_min_throttle() -> f64 {
    0.4
}

fn default_max_throttle() -> f64 {
    1.0
}

/// Vehicle configuration parsed from catalogs or inline in a manifest.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VehicleConfig {
    pub name: String,
    pub dry_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub engine: EngineConfig,
}

/// Top-level mission manifest.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MissionFile {
    pub name: String,
    pub launch_site: LaunchSiteConfig,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub burn: BurnSettings,
    #[serde(default)]
    pub corrector: CorrectorSettings,
    #[serde(default)]
    pub midcourse: MidcourseSettings,
    /// Inline vehicle; takes precedence over `vehicle_name`.
    #[serde(default)]
    pub vehicle: Option<VehicleConfig>,
    /// Name of a vehicle in a separate catalog.
    #[serde(default)]
    pub vehicle_name: Option<String>,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no records found in {}", .0.display())]
    Empty(PathBuf),
}

/// Load a single mission manifest.
pub fn load_mission<P: AsRef<Path>>(path: P) -> Result<MissionFile, ConfigError> {
    let path = path.as_ref();
    if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(serde_yaml::from_reader(File::open(path)?)?)
    }
}

/// Load vehicle configurations from a YAML list, a TOML record, or a directory of TOML records.
pub fn load_vehicle_configs<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleConfig>, ConfigError> {
    let path = path.as_ref();
    let vehicles: Vec<VehicleConfig> = load_records(path)?;
    if vehicles.is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }
    Ok(vehicles)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mission_sections_fall_back_to_defaults() {
        let toml = r#"
            name = "minimal"
            [launch_site]
            name = "KSC"
            latitude_deg = 28.5
            longitude_deg = -80.6
        "#;
        let mission: MissionFile = toml::from_str(toml).unwrap();
        assert_eq!(mission.window, WindowSettings::default());
        assert_eq!(mission.corrector.max_iterations, 10);
        assert_eq!(mission.launch_site.min_azimuth_deg, 45.0);
        assert!(mission.vehicle.is_none());
    }

    #[test]
    fn raan_model_is_read_in_snake_case() {
        let toml = r#"
            name = "geometry"
            [launch_site]
            name = "KSC"
            latitude_deg = 28.5
            longitude_deg = -80.6
            [window]
            raan_model = "site_geometry"
        "#;
        let mission: MissionFile = toml::from_str(toml).unwrap();
        assert_eq!(mission.window.raan_model, RaanModelSetting::SiteGeometry);
        assert_eq!(WindowSettings::default().raan_model, RaanModelSetting::AscentDrift);
    }

    #[test]
    fn vehicle_directory_is_read_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for (file, name) in [("b.toml", "beta"), ("a.toml", "alpha")] {
            let mut f = File::create(dir.path().join(file)).unwrap();
            writeln!(
                f,
                "name = \"{name}\"\ndry_mass_kg = 1000.0\npropellant_mass_kg = 500.0\n\
                 [engine]\nthrust_n = 1000.0\nisp_s = 300.0"
            )
            .unwrap();
        }
        let vehicles = load_vehicle_configs(dir.path()).unwrap();
        let names: Vec<_> = vehicles.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta"]);
        assert_eq!(vehicles[0].engine.min_throttle, 0.4);
    }

    #[test]
    fn yaml_catalog_is_a_list() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "- name: lander\n  dry_mass_kg: 2000\n  propellant_mass_kg: 3000\n  engine:\n    thrust_n: 45000\n    isp_s: 320\n    min_throttle: 0.2"
        )
        .unwrap();
        let vehicles = load_vehicle_configs(file.path()).unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].engine.min_throttle, 0.2);
    }
}
