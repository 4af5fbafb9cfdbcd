//! Compute module - Network operator evaluation, robot simulation and search.

mod controller;
mod model;
mod operations;
mod operator;

pub mod evolution;

pub use controller::*;
pub use model::*;
pub use operations::*;
pub use operator::*;
