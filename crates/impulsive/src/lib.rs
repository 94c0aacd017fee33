//! Impulsive transfer utilities: Lambert solver and classical transfer approximations.

pub mod lambert;
pub mod transfers;

pub use lambert::{
    LambertDirection, LambertError, LambertOptions, LambertSolution, solve as lambert_solve,
    solve_with as lambert_solve_with,
};
pub use transfers::{HohmannResult, hohmann};
