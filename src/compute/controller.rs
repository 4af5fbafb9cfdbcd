//! Network operator controller and trajectory runner.

use super::model::{Control, State, StateTransition};
use super::operator::NetworkOperator;

/// Feedback controller driven by a network operator.
///
/// The operator receives the goal error `(goal - state)` componentwise;
/// outputs 0 and 1 become the left and right wheel commands.
pub struct NopController<'a> {
    operator: &'a mut NetworkOperator,
    goal: State,
    control_limit: f32,
}

impl<'a> NopController<'a> {
    pub fn new(operator: &'a mut NetworkOperator, goal: State, control_limit: f32) -> Self {
        Self {
            operator,
            goal,
            control_limit,
        }
    }

    pub fn goal(&self) -> State {
        self.goal
    }

    /// Compute the command for `state`.
    pub fn control(&mut self, state: &State) -> Control {
        let inputs = [
            self.goal.x - state.x,
            self.goal.y - state.y,
            self.goal.yaw - state.yaw,
        ];
        let outputs = self.operator.evaluate(&inputs);
        let left = outputs.first().copied().unwrap_or(0.0);
        let right = outputs.get(1).copied().unwrap_or(0.0);
        Control::new(left, right).clamped(self.control_limit)
    }
}

/// Stop conditions for one simulated trajectory.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    /// Simulated time budget in seconds.
    pub time_limit: f32,
    /// Distance to goal that counts as arrival.
    pub epsilon: f32,
}

/// One simulated trajectory.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// `(time, state)` samples, starting with the initial state at time 0.
    pub samples: Vec<(f32, State)>,
    /// Whether the goal tolerance was reached inside the time budget.
    pub reached: bool,
}

impl Trajectory {
    /// Elapsed simulated time.
    pub fn duration(&self) -> f32 {
        self.samples.last().map(|(t, _)| *t).unwrap_or(0.0)
    }

    /// Final state.
    pub fn final_state(&self) -> State {
        self.samples.last().map(|(_, s)| *s).unwrap_or_default()
    }

    /// Sum of planar displacements between consecutive samples.
    pub fn path_length(&self) -> f32 {
        self.samples
            .windows(2)
            .map(|w| w[1].1.dist_xy(&w[0].1))
            .sum()
    }

    /// Sum of planar acceleration magnitudes, scaled by `weight`.
    ///
    /// Velocity starts at zero, so the first step contributes its launch.
    pub fn smoothness(&self, dt: f32, weight: f32) -> f32 {
        let mut prev_velocity = (0.0f32, 0.0f32);
        let mut total = 0.0;
        for w in self.samples.windows(2) {
            let vx = (w[1].1.x - w[0].1.x) / dt;
            let vy = (w[1].1.y - w[0].1.y) / dt;
            let ax = (vx - prev_velocity.0) / dt;
            let ay = (vy - prev_velocity.1) / dt;
            total += ax.hypot(ay) * weight;
            prev_velocity = (vx, vy);
        }
        total
    }
}

/// Couples a state-transition model with a controller.
pub struct Runner<'a, M: StateTransition> {
    model: M,
    controller: NopController<'a>,
}

impl<'a, M: StateTransition> Runner<'a, M> {
    pub fn new(model: M, controller: NopController<'a>) -> Self {
        Self { model, controller }
    }

    /// Reset the model to an initial state.
    pub fn init(&mut self, state: State) {
        self.model.set_state(state);
    }

    /// One closed-loop step.
    pub fn step(&mut self) -> State {
        let state = self.model.state();
        let control = self.controller.control(&state);
        self.model.step(control)
    }

    /// Simulate from `initial` until the goal is reached or time runs out.
    pub fn simulate(&mut self, initial: State, limits: RunLimits) -> Trajectory {
        self.init(initial);
        let goal = self.controller.goal();
        let dt = self.model.dt();

        let mut samples = vec![(0.0, initial)];
        let mut time = 0.0f32;
        let mut reached = false;

        while time < limits.time_limit {
            let state = self.step();
            time += dt;
            samples.push((time, state));
            if state.dist(&goal) < limits.epsilon {
                reached = true;
                break;
            }
        }

        Trajectory { samples, reached }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::compute::model::KinematicModel;
    use crate::compute::operations::OperationTable;
    use crate::schema::KinematicsConfig;

    /// Proportional controller: left = dx - dyaw, right = dx + dyaw.
    fn proportional_operator() -> NetworkOperator {
        let matrix = vec![
            vec![0, 0, 0, 1, 1],
            vec![0, 0, 0, 0, 0],
            vec![0, 0, 0, 3, 1],
            vec![0, 0, 0, 1, 0],
            vec![0, 0, 0, 0, 1],
        ];
        let mut op = NetworkOperator::new(Arc::new(OperationTable::standard()));
        op.set_node_groups(vec![0, 1, 2], vec![], vec![3, 4]);
        op.set_matrix(matrix);
        op
    }

    #[test]
    fn test_controller_inputs_are_goal_error() {
        let mut op = proportional_operator();
        let mut controller = NopController::new(&mut op, State::default(), 100.0);
        let u = controller.control(&State::new(-2.0, 0.0, 0.5));
        assert!((u.left - 2.5).abs() < 1e-6);
        assert!((u.right - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_controller_clamps_output() {
        let mut op = proportional_operator();
        let mut controller = NopController::new(&mut op, State::default(), 1.0);
        let u = controller.control(&State::new(-50.0, 0.0, 0.0));
        assert_eq!(u, Control::new(1.0, 1.0));
    }

    #[test]
    fn test_runner_reaches_goal_on_straight_line() {
        let mut op = proportional_operator();
        let controller = NopController::new(&mut op, State::default(), 10.0);
        let model = KinematicModel::new(State::default(), 0.05, &KinematicsConfig::default());
        let mut runner = Runner::new(model, controller);

        let limits = RunLimits {
            time_limit: 20.0,
            epsilon: 0.05,
        };
        let trajectory = runner.simulate(State::new(-1.0, 0.0, 0.0), limits);

        assert!(trajectory.reached);
        assert!(trajectory.duration() < 20.0);
        assert!(trajectory.final_state().dist(&State::default()) < 0.05);
        assert!((trajectory.path_length() - (1.0 - trajectory.final_state().x.abs())).abs() < 1e-3);
    }

    #[test]
    fn test_runner_stops_at_time_limit() {
        let mut op = NetworkOperator::new(Arc::new(OperationTable::standard()));
        op.set_node_groups(vec![0, 1, 2], vec![], vec![]);
        op.set_matrix(vec![vec![0; 3]; 3]);
        let controller = NopController::new(&mut op, State::default(), 10.0);
        let model = KinematicModel::new(State::default(), 0.1, &KinematicsConfig::default());
        let mut runner = Runner::new(model, controller);

        let limits = RunLimits {
            time_limit: 1.0,
            epsilon: 0.1,
        };
        let trajectory = runner.simulate(State::new(3.0, 0.0, 0.0), limits);
        assert!(!trajectory.reached);
        assert!(trajectory.duration() >= 1.0 - 1e-5);
        assert_eq!(trajectory.path_length(), 0.0);
        assert_eq!(trajectory.smoothness(0.1, 0.1), 0.0);
    }

    #[test]
    fn test_smoothness_counts_launch() {
        let trajectory = Trajectory {
            samples: vec![
                (0.0, State::new(0.0, 0.0, 0.0)),
                (1.0, State::new(1.0, 0.0, 0.0)),
                (2.0, State::new(2.0, 0.0, 0.0)),
            ],
            reached: false,
        };
        // Launch from rest then constant velocity.
        assert!((trajectory.smoothness(1.0, 0.1) - 0.1).abs() < 1e-6);
        assert!((trajectory.path_length() - 2.0).abs() < 1e-6);
    }
}
