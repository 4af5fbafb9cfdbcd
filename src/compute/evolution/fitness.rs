//! Fitness evaluators for decoded solutions.
//!
//! Evaluators reduce a solution to a fixed-length objective vector where
//! lower is better. Failures are reported as [`EvaluationError`]; the engine
//! maps them to the [`SENTINEL`] vector so one bad individual never stops a run.

use crate::compute::{
    KinematicModel, NetworkOperator, NopController, RunLimits, Runner, State, Trajectory,
};
use crate::schema::{CurveFitConfig, ObjectiveTerm, ProblemConfig, RobotProblemConfig};

use super::solution::Solution;

/// Objective value assigned to every component of a failed evaluation.
pub const SENTINEL: f32 = 1e9;

/// Per-individual evaluation failure.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Objective {index} is not finite ({value})")]
    NonFinite { index: usize, value: f32 },
    #[error("Operator produced {got} outputs, expected at least {expected}")]
    MissingOutput { got: usize, expected: usize },
    #[error("Cannot compare {predicted} predictions with {target} targets")]
    LengthMismatch { predicted: usize, target: usize },
    #[error("No samples to evaluate")]
    NoSamples,
}

/// Scores a decoded solution.
pub trait FitnessEvaluator {
    /// Objective vector of length [`num_objectives`](Self::num_objectives).
    fn evaluate(&mut self, solution: &mut dyn Solution) -> Result<Vec<f32>, EvaluationError>;

    /// Fixed objective count.
    fn num_objectives(&self) -> usize;

    /// Worst-case objective vector.
    fn sentinel(&self) -> Vec<f32> {
        vec![SENTINEL; self.num_objectives()]
    }
}

/// Build the evaluator for a problem.
pub fn evaluator_for(problem: &ProblemConfig) -> Box<dyn FitnessEvaluator> {
    match problem {
        ProblemConfig::Robot(config) => Box::new(RobotFitnessEvaluator::new(config.clone())),
        ProblemConfig::CurveFit(config) => Box::new(CurveFitEvaluator::new(config.clone())),
    }
}

// ============================================================================
// Robot control
// ============================================================================

/// Sums over all simulated trajectories.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrajectoryTotals {
    pub time: f32,
    pub error: f32,
    pub path: f32,
    pub smoothness: f32,
    pub failures: f32,
}

impl TrajectoryTotals {
    /// Add one trajectory.
    pub fn accumulate(&mut self, trajectory: &Trajectory, goal: &State, dt: f32, weight: f32) {
        self.time += trajectory.duration();
        self.error += trajectory.final_state().dist(goal);
        self.path += trajectory.path_length();
        self.smoothness += trajectory.smoothness(dt, weight);
        if !trajectory.reached {
            self.failures += 1.0;
        }
    }

    /// Weighted sum for one objective.
    pub fn combine(&self, term: &ObjectiveTerm) -> f32 {
        term.time * self.time
            + term.error * self.error
            + term.path * self.path
            + term.smoothness * self.smoothness
            + term.failures * self.failures
    }
}

/// Simulates the controller from each training start state.
pub struct RobotFitnessEvaluator {
    config: RobotProblemConfig,
    states: Vec<State>,
}

impl RobotFitnessEvaluator {
    pub fn new(config: RobotProblemConfig) -> Self {
        let states = config.training_states();
        Self { config, states }
    }

    pub fn config(&self) -> &RobotProblemConfig {
        &self.config
    }

    /// Training start states.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Run one closed-loop trajectory with `operator` as the controller.
    pub fn simulate(&self, operator: &mut NetworkOperator, initial: State) -> Trajectory {
        let config = &self.config;
        let model = KinematicModel::new(initial, config.dt, &config.kinematics);
        let controller = NopController::new(operator, config.goal, config.control_limit);
        let mut runner = Runner::new(model, controller);
        runner.simulate(
            initial,
            RunLimits {
                time_limit: config.time_limit,
                epsilon: config.epsilon,
            },
        )
    }

    /// Totals over the training states.
    pub fn totals(&self, operator: &mut NetworkOperator) -> TrajectoryTotals {
        let mut totals = TrajectoryTotals::default();
        for &initial in &self.states {
            let trajectory = self.simulate(operator, initial);
            totals.accumulate(
                &trajectory,
                &self.config.goal,
                self.config.dt,
                self.config.smoothness_weight,
            );
        }
        totals
    }
}

impl FitnessEvaluator for RobotFitnessEvaluator {
    fn evaluate(&mut self, solution: &mut dyn Solution) -> Result<Vec<f32>, EvaluationError> {
        let totals = self.totals(solution.operator_mut());
        let objectives: Vec<f32> = self
            .config
            .objectives
            .iter()
            .map(|term| totals.combine(term))
            .collect();
        check_finite(&objectives)?;
        Ok(objectives)
    }

    fn num_objectives(&self) -> usize {
        self.config.objectives.len()
    }
}

// ============================================================================
// Curve fitting
// ============================================================================

/// Single objective: RMSE against `sin(x) + q cos(x)`.
pub struct CurveFitEvaluator {
    points: Vec<f32>,
    targets: Vec<f32>,
}

impl CurveFitEvaluator {
    pub fn new(config: CurveFitConfig) -> Self {
        let points = config.sample_points();
        let targets = points.iter().map(|&x| config.target(x)).collect();
        Self { points, targets }
    }

    pub fn points(&self) -> &[f32] {
        &self.points
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Graph output at every sample point.
    pub fn predict(&self, operator: &mut NetworkOperator) -> Result<Vec<f32>, EvaluationError> {
        self.points
            .iter()
            .map(|&x| {
                let outputs = operator.evaluate(&[x]);
                outputs.first().copied().ok_or(EvaluationError::MissingOutput {
                    got: outputs.len(),
                    expected: 1,
                })
            })
            .collect()
    }
}

impl FitnessEvaluator for CurveFitEvaluator {
    fn evaluate(&mut self, solution: &mut dyn Solution) -> Result<Vec<f32>, EvaluationError> {
        let predicted = self.predict(solution.operator_mut())?;
        let objectives = vec![rmse(&predicted, &self.targets)?];
        check_finite(&objectives)?;
        Ok(objectives)
    }

    fn num_objectives(&self) -> usize {
        1
    }
}

/// Root-mean-square error between equal-length series.
pub fn rmse(predicted: &[f32], target: &[f32]) -> Result<f32, EvaluationError> {
    if predicted.len() != target.len() {
        return Err(EvaluationError::LengthMismatch {
            predicted: predicted.len(),
            target: target.len(),
        });
    }
    if predicted.is_empty() {
        return Err(EvaluationError::NoSamples);
    }
    let sum: f64 = predicted
        .iter()
        .zip(target)
        .map(|(p, t)| {
            let d = f64::from(p - t);
            d * d
        })
        .sum();
    Ok((sum / predicted.len() as f64).sqrt() as f32)
}

fn check_finite(objectives: &[f32]) -> Result<(), EvaluationError> {
    match objectives.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(EvaluationError::NonFinite {
            index,
            value: objectives[index],
        }),
        None => Ok(()),
    }
}
