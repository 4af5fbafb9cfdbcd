//! Steady-state Pareto-rank genetic search.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionResult, EvolutionStats,
    GenerationReport, Genome, SolutionSnapshot,
};

use super::fitness::FitnessEvaluator;
use super::genome::GenomeRng;
use super::population::Population;
use super::solution::{Solution, SolutionFactory};

/// Fatal engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Evaluator reports zero objectives")]
    NoObjectives,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] EvolutionConfigError),
    #[error("Evaluator returned {got} objectives, expected {expected}")]
    ObjectiveCountMismatch { got: usize, expected: usize },
    #[error("Pareto set is empty")]
    EmptyPareto,
    #[error("Population has not been initialized")]
    NotInitialized,
}

/// Acceptance probability for a parent of the given rank.
///
/// 1 at rank 0, approaching `alpha` as the rank grows.
pub fn acceptance(alpha: f32, rank: usize) -> f32 {
    let rank = rank as f32;
    (1.0 + alpha * rank) / (1.0 + rank)
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    seed: u64,
    rng: GenomeRng,
    evaluator: Box<dyn FitnessEvaluator>,
    factory: SolutionFactory,
    template: Box<dyn Solution>,
    num_objectives: usize,
    population: Population,
    history: EvolutionHistory,
    generation: usize,
    evaluations: u64,
    replacements: u64,
    failed_evaluations: u64,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    ///
    /// `factory` must produce solutions configured with the base graph.
    pub fn new(
        config: EvolutionConfig,
        evaluator: Box<dyn FitnessEvaluator>,
        factory: SolutionFactory,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let num_objectives = evaluator.num_objectives();
        if num_objectives == 0 {
            return Err(EngineError::NoObjectives);
        }

        let template = factory();
        let nodes = template.operator().nodes_for_params().len();
        if config.encoding.num_params != nodes {
            return Err(EvolutionConfigError::ParameterCountMismatch {
                encoded: config.encoding.num_params,
                nodes,
            }
            .into());
        }

        let seed = config.random_seed.unwrap_or_else(rand::random);

        Ok(Self {
            config,
            seed,
            rng: GenomeRng::new(seed),
            evaluator,
            factory,
            template,
            num_objectives,
            population: Population::new(Vec::new(), Vec::new()),
            history: EvolutionHistory::default(),
            generation: 0,
            evaluations: 0,
            replacements: 0,
            failed_evaluations: 0,
        })
    }

    /// Seed driving this run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Index of the objective used for averages and final selection.
    pub fn report_index(&self) -> usize {
        self.config.report_index(self.num_objectives)
    }

    /// Build and evaluate the initial population.
    ///
    /// Individual 0 reproduces the base graph and parameters; the rest are random.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        let encoding = self.config.encoding.clone();
        let size = self.config.population.size;
        let operator = self.template.operator();

        let mut genomes = Vec::with_capacity(size);
        let mut baseline = GenomeRng::baseline_genome(
            operator,
            encoding.struct_variations,
            encoding.int_bits,
            encoding.frac_bits,
        );
        baseline.bits.resize(encoding.total_bits(), false);
        genomes.push(baseline);
        for _ in 1..size {
            genomes.push(self.rng.random_genome(
                operator,
                encoding.struct_variations,
                encoding.total_bits(),
            ));
        }

        let mut objectives = Vec::with_capacity(size);
        for genome in &genomes {
            objectives.push(self.evaluate_guarded(genome)?);
        }

        self.population = Population::new(genomes, objectives);
        self.generation = 0;
        Ok(())
    }

    /// Decode and evaluate one genome.
    ///
    /// Evaluator errors and panics score as the sentinel vector; only a
    /// wrong-length objective vector is fatal.
    fn evaluate_guarded(&mut self, genome: &Genome) -> Result<Vec<f32>, EngineError> {
        let mut solution = (self.factory)();
        solution.decode(genome);
        self.evaluations += 1;

        let evaluator = &mut self.evaluator;
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(solution.as_mut())));
        let objectives = match outcome {
            Ok(Ok(objectives)) => objectives,
            Ok(Err(e)) => {
                log::warn!("Evaluation failed, scoring as worst: {}", e);
                self.failed_evaluations += 1;
                self.evaluator.sentinel()
            }
            Err(_) => {
                log::warn!("Evaluator panicked, scoring as worst");
                self.failed_evaluations += 1;
                self.evaluator.sentinel()
            }
        };

        if objectives.len() != self.num_objectives {
            return Err(EngineError::ObjectiveCountMismatch {
                got: objectives.len(),
                expected: self.num_objectives,
            });
        }
        Ok(objectives)
    }

    /// Tournament for parent 1, uniform draw for parent 2.
    fn select_parents(&mut self) -> (usize, usize) {
        let n = self.population.len();
        let mut parent1 = self.rng.index(n);
        let mut best_rank = self.population.rank(parent1);
        for _ in 0..self.config.selection.search_neighbors {
            let candidate = self.rng.index(n);
            if self.population.rank(candidate) < best_rank {
                parent1 = candidate;
                best_rank = self.population.rank(candidate);
            }
        }
        let parent2 = self.rng.index(n);
        (parent1, parent2)
    }

    /// Run one generation of crossovers. Returns the number of replacements.
    pub fn step_generation(&mut self) -> Result<usize, EngineError> {
        if self.population.is_empty() {
            return Err(EngineError::NotInitialized);
        }

        let alpha = self.config.selection.alpha;
        let mut replacements = 0;

        for _ in 0..self.config.population.crossovers_per_generation {
            let (parent1, parent2) = self.select_parents();
            let ksi = self.rng.uniform();
            let accept1 = acceptance(alpha, self.population.rank(parent1));
            let accept2 = acceptance(alpha, self.population.rank(parent2));
            if !(ksi < accept1 || ksi < accept2) {
                continue;
            }

            let offspring = self.rng.crossover(
                self.population.genome(parent1),
                self.population.genome(parent2),
            );

            for mut child in offspring {
                if self.rng.uniform() < self.config.mutation_probability {
                    self.rng.mutate(&mut child, self.template.operator());
                }

                let objectives = self.evaluate_guarded(&child)?;
                let (worst, max_rank) = self.population.worst();
                let rank = self.population.compute_rank(&objectives);
                if rank < max_rank {
                    log::debug!("Offspring rank {} replaces slot {} (rank {})", rank, worst, max_rank);
                    self.population.replace(worst, child, objectives);
                    self.population
                        .refresh_local(worst, self.config.local_refresh, self.seed);
                    replacements += 1;
                }
            }
        }

        self.population.refresh_ranks();
        self.replacements += replacements as u64;
        Ok(replacements)
    }

    /// Progress summary for the current population.
    fn report(&self, replacements: usize) -> GenerationReport {
        let index = self.report_index();
        GenerationReport {
            generation: self.generation,
            total_generations: self.config.population.generations,
            average: self.population.average(index),
            best: self.population.best(index),
            pareto_size: self.population.pareto().len(),
            replacements,
            evaluations: self.evaluations,
        }
    }

    /// Decode a population member into a fresh solution.
    pub fn decode(&self, index: usize) -> Box<dyn Solution> {
        let mut solution = (self.factory)();
        solution.decode(self.population.genome(index));
        solution
    }

    /// Run evolution with generation and end-of-run callbacks.
    ///
    /// `on_generation` fires after the initial evaluation and after every
    /// generation; `on_end` receives the selected Pareto member.
    pub fn run_with_callbacks<G, E>(
        &mut self,
        mut on_generation: G,
        on_end: E,
    ) -> Result<EvolutionResult, EngineError>
    where
        G: FnMut(&GenerationReport),
        E: FnOnce(&dyn Solution),
    {
        let start_time = Instant::now();
        log::info!(
            "Starting evolution: population {}, generations {}, seed {}",
            self.config.population.size,
            self.config.population.generations,
            self.seed
        );

        self.history = EvolutionHistory::default();
        self.initialize()?;
        let report = self.report(0);
        self.history.record(&report);
        on_generation(&report);

        for generation in 1..=self.config.population.generations {
            let replacements = self.step_generation()?;
            self.generation = generation;

            let report = self.report(replacements);
            log::info!(
                "Generation {}/{}: average {:.4}, best {:.4}, pareto {}, replaced {}",
                generation,
                report.total_generations,
                report.average,
                report.best,
                report.pareto_size,
                replacements
            );
            self.history.record(&report);
            on_generation(&report);
        }

        self.population.refresh_ranks();
        let index = self.report_index();
        let best = self
            .population
            .best_pareto(index)
            .ok_or(EngineError::EmptyPareto)?;

        let solution = self.decode(best);
        log::info!(
            "Selected Pareto member {} with objective {}",
            best,
            self.population.objectives(best)[index]
        );
        on_end(solution.as_ref());

        let elapsed = start_time.elapsed().as_secs_f64();
        let snapshot = SolutionSnapshot {
            index: best,
            rank: self.population.rank(best),
            objectives: self.population.objectives(best).to_vec(),
            parameters: solution.parameters().to_vec(),
            matrix: solution.operator().matrix().clone(),
            genome: self.population.genome(best).clone(),
        };

        Ok(EvolutionResult {
            best: snapshot,
            pareto: self.population.pareto().to_vec(),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                replacements: self.replacements,
                failed_evaluations: self.failed_evaluations,
                elapsed_seconds: elapsed,
                evaluations_per_second: self.evaluations as f64 / elapsed.max(1e-9),
                seed: self.seed,
            },
            history: self.history.clone(),
        })
    }

    /// Run evolution with a generation callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EngineError>
    where
        F: FnMut(&GenerationReport),
    {
        self.run_with_callbacks(callback, |_| {})
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EngineError> {
        self.run_with_callback(|_| {})
    }
}
