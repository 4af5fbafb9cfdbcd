//! Trajectory sets on disk.
//!
//! Trajectories are stored as CSV with the header `Trajectory,Time,X,Y,Theta`,
//! one row per sample.

mod loader;
mod recorder;

pub use loader::*;
pub use recorder::*;

/// CSV header shared by the loader and the recorder.
pub const TRAJECTORY_HEADER: &str = "Trajectory,Time,X,Y,Theta";
