//! Evolutionary search over network operator structure and parameters.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Codec** (`codec`): Gray-coded fixed-point parameters and structural decoding
//! - **Genome Operations** (`genome`): Random generation, four-way crossover, and mutation
//! - **Solutions** (`solution`): Genome-to-operator decoding behind the `Solution` trait
//! - **Fitness Evaluators** (`fitness`): Robot trajectory and curve-fitting objectives
//! - **Population** (`population`): Objective vectors, Pareto ranks and the Pareto set
//! - **Search** (`search`): Steady-state genetic algorithm driver
//!
//! # Example
//!
//! ```rust,no_run
//! use netop_ga::compute::evolution::{EvolutionEngine, GraphSolution, RobotFitnessEvaluator};
//! use netop_ga::schema::{EvolutionConfig, RobotProblemConfig};
//!
//! let config = EvolutionConfig::default();
//! let problem = RobotProblemConfig::default();
//! let factory = GraphSolution::factory(problem.graph.clone(), config.encoding.clone());
//! let evaluator = Box::new(RobotFitnessEvaluator::new(problem));
//!
//! let mut engine = EvolutionEngine::new(config, evaluator, factory).unwrap();
//! let result = engine
//!     .run_with_callback(|report| {
//!         println!("Generation {}: average = {:.3}", report.generation, report.average);
//!     })
//!     .unwrap();
//!
//! println!("Best objectives: {:?}", result.best.objectives);
//! ```
//!
//! # Selection and Replacement
//!
//! Each crossover picks parent 1 by a rank tournament and parent 2 at random,
//! produces four offspring, and lets each offspring replace the worst-ranked
//! member if it ranks strictly better. Ranks are refreshed locally after a
//! replacement and fully at the end of every generation.

mod codec;
mod fitness;
mod genome;
mod population;
mod search;
mod solution;

pub use codec::{
    apply_structural_genome, binary_to_gray, gray_to_binary, gray_to_parameters,
    parameters_to_gray,
};
pub use fitness::{
    CurveFitEvaluator, EvaluationError, FitnessEvaluator, RobotFitnessEvaluator, SENTINEL,
    TrajectoryTotals, evaluator_for, rmse,
};
pub use genome::{GenomeRng, crossover_at};
pub use population::{Population, dominates};
pub use search::{EngineError, EvolutionEngine, acceptance};
pub use solution::{GraphSolution, Solution, SolutionFactory};
