//! Network operator GA - Multi-objective evolution of symbolic controllers.
//!
//! This crate evolves the topology and numeric parameters of a network
//! operator, a small DAG of unary and binary operations stored as a matrix,
//! and uses it as a feedback controller for a differential-drive robot.
//!
//! # Architecture
//!
//! The crate is split into three main modules:
//!
//! - `schema`: Configuration, genome and result types
//! - `compute`: Operator evaluation, robot simulation and evolutionary search
//! - `trajectory`: CSV loading and recording of trajectory sets
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netop_ga::{
//!     compute::{NetworkOperator, OperationTable},
//!     schema::GraphConfig,
//! };
//!
//! // Build the reference controller graph
//! let config = GraphConfig::robot_controller();
//! let mut operator = NetworkOperator::from_config(&config, Arc::new(OperationTable::standard()));
//!
//! // Wheel commands for a goal error of (1, -2, 0.5)
//! let outputs = operator.evaluate(&[1.0, -2.0, 0.5]);
//! println!("left = {}, right = {}", outputs[0], outputs[1]);
//! ```

pub mod compute;
pub mod schema;
pub mod trajectory;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, FitnessEvaluator, Solution};
pub use compute::{NetworkOperator, OperationTable, State};
pub use schema::{EvolutionConfig, GraphConfig, RunConfig};
