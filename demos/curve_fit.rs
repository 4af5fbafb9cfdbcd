//! Evolve a 14-node operator to fit `sin(x) + 2.5 cos(x)`.
//!
//! Run with `cargo run --example curve_fit`.

use netop_ga::{
    compute::evolution::{CurveFitEvaluator, EvolutionEngine, GraphSolution},
    schema::{CurveFitConfig, EncodingConfig, EvolutionConfig, PopulationConfig},
};

fn main() {
    env_logger::init();

    let problem = CurveFitConfig {
        num_samples: 200,
        ..Default::default()
    };
    let config = EvolutionConfig {
        population: PopulationConfig {
            size: 200,
            generations: 20,
            crossovers_per_generation: 32,
        },
        encoding: EncodingConfig {
            num_params: 2,
            int_bits: 4,
            frac_bits: 12,
            struct_variations: 8,
        },
        random_seed: Some(42),
        ..Default::default()
    };

    let factory = GraphSolution::factory(problem.graph.clone(), config.encoding.clone());
    let evaluator = Box::new(CurveFitEvaluator::new(problem));

    let mut engine = match EvolutionEngine::new(config, evaluator, factory) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error creating engine: {}", e);
            return;
        }
    };

    let result = engine.run_with_callback(|report| {
        println!(
            "Generation {:>2}: average RMSE = {:.4}, best = {:.4}",
            report.generation, report.average, report.best
        );
    });

    match result {
        Ok(result) => {
            println!("Best RMSE: {:.5}", result.best.objectives[0]);
            println!("Parameters: {:?}", result.best.parameters);
            for row in &result.best.matrix {
                let row: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("  {}", row.join(" "));
            }
        }
        Err(e) => eprintln!("Evolution failed: {}", e),
    }
}
