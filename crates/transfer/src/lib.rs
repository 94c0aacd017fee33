//! Transfer façade crate: residual projector, mid-course scheduler and the end-to-end planner.

pub mod corrector;
pub mod midcourse;
pub mod mission;
pub mod settings;

pub use facade::*;
pub use lunar_finiteburn as finiteburn;
pub use lunar_impulsive as impulsive;
pub use lunar_propulsion as propulsion;

mod facade;
