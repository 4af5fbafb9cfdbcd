//! Network operator GA CLI - Evolve a controller from JSON configuration.

use std::fs;
use std::path::{Path, PathBuf};

use netop_ga::{
    compute::evolution::{
        CurveFitEvaluator, EvolutionEngine, GraphSolution, RobotFitnessEvaluator, Solution,
        evaluator_for,
    },
    schema::{EvolutionResult, ProblemConfig, RunConfig},
    trajectory::{load_initial_states, save_curve_fit, save_trajectories},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [output_dir] [trajectories.csv]", args[0]);
        eprintln!();
        eprintln!("Evolve a network operator from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json       Path to run configuration file");
        eprintln!("  output_dir        Directory for results (default: results)");
        eprintln!("  trajectories.csv  Training start states for the robot problem");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let output_dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("results"));

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(csv) = args.get(3) {
        match &mut config.problem {
            ProblemConfig::Robot(robot) => match load_initial_states(csv) {
                Ok(states) => robot.custom_trajectories = states,
                Err(e) => log::warn!("Ignoring {}: {}; using corner start states", csv, e),
            },
            ProblemConfig::CurveFit(_) => {
                log::warn!("Trajectory file {} ignored for curve fitting", csv);
            }
        }
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let graph = config.problem.graph();
    println!("Network Operator GA");
    println!("===================");
    println!(
        "Graph: {} nodes ({} inputs, {} parameters, {} outputs)",
        graph.num_nodes(),
        graph.nodes_for_vars.len(),
        graph.nodes_for_params.len(),
        graph.nodes_for_output.len()
    );
    println!(
        "Population: {}, generations: {}, crossovers per generation: {}",
        config.evolution.population.size,
        config.evolution.population.generations,
        config.evolution.population.crossovers_per_generation
    );
    println!();

    let evaluator = evaluator_for(&config.problem);
    let factory = GraphSolution::factory(graph.clone(), config.evolution.encoding.clone());
    let mut engine = EvolutionEngine::new(config.evolution.clone(), evaluator, factory)
        .unwrap_or_else(|e| {
            eprintln!("Error creating engine: {}", e);
            std::process::exit(1);
        });

    let mut best: Option<Box<dyn Solution>> = None;
    let result = engine
        .run_with_callbacks(
            |report| {
                println!(
                    "  Generation {}/{}: average={:.4}, best={:.4}, pareto={}",
                    report.generation,
                    report.total_generations,
                    report.average,
                    report.best,
                    report.pareto_size
                );
            },
            |solution| best = Some(solution.clone_box()),
        )
        .unwrap_or_else(|e| {
            eprintln!("Evolution failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Best solution (index {}):", result.best.index);
    println!("  Objectives: {:?}", result.best.objectives);
    println!("  Parameters: {:?}", result.best.parameters);
    println!(
        "Time: {:.2}s ({:.1} evaluations/s, seed {})",
        result.stats.elapsed_seconds, result.stats.evaluations_per_second, result.stats.seed
    );

    let Some(mut best) = best else {
        eprintln!("Evolution produced no solution");
        std::process::exit(1);
    };

    if let Err(e) = write_artifacts(&output_dir, &config.problem, best.as_mut(), &result) {
        eprintln!("Error writing results: {}", e);
        std::process::exit(1);
    }
    println!("Results written to {}", output_dir.display());
}

/// Write matrix, parameters, trajectories and the JSON result.
fn write_artifacts(
    dir: &Path,
    problem: &ProblemConfig,
    best: &mut dyn Solution,
    result: &EvolutionResult,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;

    best.operator().save_matrix(dir.join("best_matrix.txt"))?;
    best.operator().save_parameters(dir.join("best_params.txt"))?;

    match problem {
        ProblemConfig::Robot(robot) => {
            let evaluator = RobotFitnessEvaluator::new(robot.clone());
            let trajectories: Vec<_> = robot
                .test_states()
                .into_iter()
                .map(|initial| evaluator.simulate(best.operator_mut(), initial))
                .collect();
            let reached = trajectories.iter().filter(|t| t.reached).count();
            println!("Test trajectories reaching the goal: {}/{}", reached, trajectories.len());
            save_trajectories(dir.join("trajectories.csv"), &trajectories)?;
        }
        ProblemConfig::CurveFit(fit) => {
            let evaluator = CurveFitEvaluator::new(fit.clone());
            let outputs = evaluator.predict(best.operator_mut())?;
            save_curve_fit(
                dir.join("curve_fit.csv"),
                evaluator.points(),
                evaluator.targets(),
                &outputs,
            )?;
        }
    }

    fs::write(dir.join("result.json"), serde_json::to_string_pretty(result)?)?;
    Ok(())
}

fn print_example_config() {
    let config = RunConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("Example configuration (config.json):");
            println!("{}", json);
        }
        Err(e) => eprintln!("Error serializing example config: {}", e),
    }
}
