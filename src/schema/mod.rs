//! Schema module - Graph, problem and evolution configuration types.

mod config;
mod evolution;
mod problem;

pub use config::*;
pub use evolution::*;
pub use problem::*;
