//! Lunar transfer targeting.
//!
//! The member crates cover the Lambert solver, the finite-burn executor, the launch-window
//! preprocessor and the Newton-Raphson residual projector; this crate re-exports them so the CLI
//! and integration tests share one entry point.

pub use lunar_config as config;
pub use lunar_core as core;
pub use lunar_ephem as ephemeris;
pub use lunar_finiteburn as finiteburn;
pub use lunar_impulsive as impulsive;
pub use lunar_orbits as orbits;
pub use lunar_propulsion as propulsion;
pub use lunar_transfer as transfer;
pub use lunar_window as window;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
