//! Problem definitions: robot trajectory control and curve fitting.

use serde::{Deserialize, Serialize};

use super::{ConfigError, EvolutionConfig, EvolutionConfigError, GraphConfig};
use crate::compute::State;

/// Differential-drive kinematic gains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Wheel-to-body velocity gain.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Extra gain on the turn rate.
    #[serde(default = "default_turn_gain")]
    pub turn_gain: f32,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            gain: default_gain(),
            turn_gain: default_turn_gain(),
        }
    }
}

fn default_gain() -> f32 {
    0.5
}
fn default_turn_gain() -> f32 {
    1.0
}

/// One objective as a weighted sum of trajectory totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub error: f32,
    #[serde(default)]
    pub path: f32,
    #[serde(default)]
    pub smoothness: f32,
    /// Weight per trajectory that missed the goal.
    #[serde(default)]
    pub failures: f32,
}

/// Default four objectives: time, penalized error, path, composite.
fn default_objectives() -> Vec<ObjectiveTerm> {
    vec![
        ObjectiveTerm {
            time: 1.0,
            ..Default::default()
        },
        ObjectiveTerm {
            error: 2.0,
            failures: 100.0,
            ..Default::default()
        },
        ObjectiveTerm {
            path: 1.0,
            ..Default::default()
        },
        ObjectiveTerm {
            time: 1.0,
            error: 3.0,
            path: 1.5,
            smoothness: 1.0,
            failures: 100.0,
        },
    ]
}

/// Robot trajectory-control problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotProblemConfig {
    /// Controller graph.
    #[serde(default = "GraphConfig::robot_controller")]
    pub graph: GraphConfig,
    /// Simulation timestep in seconds.
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Per-trajectory time budget in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: f32,
    /// Distance to goal that ends a trajectory successfully.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Number of corner start states used for training.
    #[serde(default = "default_num_trajectories")]
    pub num_trajectories: usize,
    /// Number of edge start states used for the final report.
    #[serde(default = "default_num_test_trajectories")]
    pub num_test_trajectories: usize,
    /// Lower corner of the start-state box `(x, y, yaw)`.
    #[serde(default = "default_state_min")]
    pub state_min: [f32; 3],
    /// Upper corner of the start-state box `(x, y, yaw)`.
    #[serde(default = "default_state_max")]
    pub state_max: [f32; 3],
    /// Target pose.
    #[serde(default)]
    pub goal: State,
    /// Wheel command saturation.
    #[serde(default = "default_control_limit")]
    pub control_limit: f32,
    /// Scale of the per-step acceleration penalty.
    #[serde(default = "default_smoothness_weight")]
    pub smoothness_weight: f32,
    /// Kinematic model gains.
    #[serde(default)]
    pub kinematics: KinematicsConfig,
    /// Objective composition; its length is the objective count.
    #[serde(default = "default_objectives")]
    pub objectives: Vec<ObjectiveTerm>,
    /// Explicit training start states; replaces the corner set when non-empty.
    #[serde(default)]
    pub custom_trajectories: Vec<State>,
}

impl Default for RobotProblemConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::robot_controller(),
            dt: default_dt(),
            time_limit: default_time_limit(),
            epsilon: default_epsilon(),
            num_trajectories: default_num_trajectories(),
            num_test_trajectories: default_num_test_trajectories(),
            state_min: default_state_min(),
            state_max: default_state_max(),
            goal: State::default(),
            control_limit: default_control_limit(),
            smoothness_weight: default_smoothness_weight(),
            kinematics: KinematicsConfig::default(),
            objectives: default_objectives(),
            custom_trajectories: Vec::new(),
        }
    }
}

fn default_dt() -> f32 {
    0.033333
}
fn default_time_limit() -> f32 {
    15.0
}
fn default_epsilon() -> f32 {
    0.1
}
fn default_num_trajectories() -> usize {
    8
}
fn default_num_test_trajectories() -> usize {
    16
}
fn default_state_min() -> [f32; 3] {
    [-5.5, -5.5, -1.31]
}
fn default_state_max() -> [f32; 3] {
    [5.5, 5.5, 1.31]
}
fn default_control_limit() -> f32 {
    10.0
}
fn default_smoothness_weight() -> f32 {
    0.1
}

impl RobotProblemConfig {
    /// Start states for fitness evaluation.
    ///
    /// Custom states win when present; otherwise state `i` picks the upper or
    /// lower bound of x, y and yaw from bits 4, 2 and 1 of `i`.
    pub fn training_states(&self) -> Vec<State> {
        if !self.custom_trajectories.is_empty() {
            return self.custom_trajectories.clone();
        }
        let pick = |i: usize, bit: usize, axis: usize| {
            if i & bit != 0 {
                self.state_max[axis]
            } else {
                self.state_min[axis]
            }
        };
        (0..self.num_trajectories)
            .map(|i| State::new(pick(i, 4, 0), pick(i, 2, 1), pick(i, 1, 2)))
            .collect()
    }

    /// Start states spread along the four edges of the box at mid heading.
    ///
    /// The first `n % 4` edges get one extra state, so exactly `n` are made.
    pub fn test_states(&self) -> Vec<State> {
        let n = self.num_test_trajectories;
        let [x_min, y_min, t_min] = self.state_min;
        let [x_max, y_max, t_max] = self.state_max;
        let t_mid = (t_min + t_max) / 2.0;

        let per_edge = n / 4;
        let mut remaining = n % 4;
        let fraction = |i: usize| {
            if per_edge > 0 {
                i as f32 / per_edge as f32
            } else {
                0.0
            }
        };

        let edges: [&dyn Fn(f32) -> State; 4] = [
            &|t: f32| State::new(x_min + t * (x_max - x_min), y_min, t_mid),
            &|t: f32| State::new(x_max - t * (x_max - x_min), y_max, t_mid),
            &|t: f32| State::new(x_min, y_min + t * (y_max - y_min), t_mid),
            &|t: f32| State::new(x_max, y_max - t * (y_max - y_min), t_mid),
        ];

        let mut states = Vec::with_capacity(n);
        for edge in edges {
            let count = per_edge + usize::from(remaining > 0);
            states.extend((0..count).map(|i| edge(fraction(i))));
            remaining = remaining.saturating_sub(1);
        }

        states
    }

    /// Validate simulation settings and the controller graph.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        if !(self.dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep);
        }
        if !(self.time_limit > 0.0) {
            return Err(ConfigError::InvalidTimeLimit);
        }
        if !(self.epsilon > 0.0) {
            return Err(ConfigError::InvalidTolerance);
        }
        if !(self.control_limit > 0.0) {
            return Err(ConfigError::InvalidBounds(format!(
                "control limit {} must be positive",
                self.control_limit
            )));
        }
        for axis in 0..3 {
            if self.state_min[axis] > self.state_max[axis] {
                return Err(ConfigError::InvalidBounds(format!(
                    "axis {} min ({}) > max ({})",
                    axis, self.state_min[axis], self.state_max[axis]
                )));
            }
        }
        if self.num_trajectories == 0 && self.custom_trajectories.is_empty() {
            return Err(ConfigError::InvalidSamples);
        }
        if self.objectives.is_empty() {
            return Err(ConfigError::NoObjectives);
        }
        Ok(())
    }
}

/// Fit `sin(x) + free_param * cos(x)` by RMSE over a sample grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFitConfig {
    #[serde(default = "GraphConfig::curve_fit")]
    pub graph: GraphConfig,
    #[serde(default)]
    pub x_start: f32,
    #[serde(default = "default_x_step")]
    pub x_step: f32,
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    #[serde(default = "default_free_param")]
    pub free_param: f32,
}

impl Default for CurveFitConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::curve_fit(),
            x_start: 0.0,
            x_step: default_x_step(),
            num_samples: default_num_samples(),
            free_param: default_free_param(),
        }
    }
}

fn default_x_step() -> f32 {
    0.2
}
fn default_num_samples() -> usize {
    1000
}
fn default_free_param() -> f32 {
    2.5
}

impl CurveFitConfig {
    /// Target value at `x`.
    pub fn target(&self, x: f32) -> f32 {
        x.sin() + self.free_param * x.cos()
    }

    /// Sample abscissae, accumulated step by step.
    pub fn sample_points(&self) -> Vec<f32> {
        let mut x = self.x_start;
        let mut points = Vec::with_capacity(self.num_samples);
        for _ in 0..self.num_samples {
            points.push(x);
            x += self.x_step;
        }
        points
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        if self.num_samples == 0 {
            return Err(ConfigError::InvalidSamples);
        }
        Ok(())
    }
}

/// Problem selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProblemConfig {
    /// Robot trajectory control.
    Robot(RobotProblemConfig),
    /// Symbolic curve fitting.
    CurveFit(CurveFitConfig),
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self::Robot(RobotProblemConfig::default())
    }
}

impl ProblemConfig {
    pub fn graph(&self) -> &GraphConfig {
        match self {
            Self::Robot(config) => &config.graph,
            Self::CurveFit(config) => &config.graph,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Robot(config) => config.validate(),
            Self::CurveFit(config) => config.validate(),
        }
    }
}

/// Everything the CLI needs for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub problem: ProblemConfig,
}

impl RunConfig {
    /// Validate both halves and their agreement on parameter count.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.evolution.validate()?;
        self.problem.validate()?;
        let nodes = self.problem.graph().nodes_for_params.len();
        if self.evolution.encoding.num_params != nodes {
            return Err(EvolutionConfigError::ParameterCountMismatch {
                encoded: self.evolution.encoding.num_params,
                nodes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_curve_fit_needs_matching_encoding() {
        let config = RunConfig {
            problem: ProblemConfig::CurveFit(CurveFitConfig::default()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::ParameterCountMismatch { encoded: 4, nodes: 2 })
        ));
    }

    #[test]
    fn test_training_states_are_corners() {
        let config = RobotProblemConfig::default();
        let states = config.training_states();
        assert_eq!(states.len(), 8);
        assert_eq!(states[0], State::new(-5.5, -5.5, -1.31));
        assert_eq!(states[5], State::new(5.5, -5.5, 1.31));
        assert_eq!(states[7], State::new(5.5, 5.5, 1.31));
    }

    #[test]
    fn test_custom_states_replace_corners() {
        let config = RobotProblemConfig {
            custom_trajectories: vec![State::new(1.0, 2.0, 0.0)],
            ..Default::default()
        };
        assert_eq!(config.training_states(), vec![State::new(1.0, 2.0, 0.0)]);
    }

    #[test]
    fn test_test_states_cover_edges() {
        let config = RobotProblemConfig::default();
        let states = config.test_states();
        assert_eq!(states.len(), 16);
        assert_eq!(states[0], State::new(-5.5, -5.5, 0.0));
        assert_eq!(states[4], State::new(5.5, 5.5, 0.0));
        assert_eq!(states[8], State::new(-5.5, -5.5, 0.0));
        assert!(states.iter().all(|s| s.yaw == 0.0));

        let odd = RobotProblemConfig {
            num_test_trajectories: 6,
            ..Default::default()
        };
        let states = odd.test_states();
        assert_eq!(states.len(), 6);
        assert_eq!(states[0], State::new(-5.5, -5.5, 0.0));
        assert_eq!(states[1], State::new(5.5, -5.5, 0.0));
        assert_eq!(states[2], State::new(5.5, 5.5, 0.0));
        assert_eq!(states[3], State::new(-5.5, 5.5, 0.0));

        for n in 0..12 {
            let config = RobotProblemConfig {
                num_test_trajectories: n,
                ..Default::default()
            };
            assert_eq!(config.test_states().len(), n);
        }
    }

    #[test]
    fn test_invalid_robot_config() {
        let config = RobotProblemConfig {
            dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeStep)));

        let config = RobotProblemConfig {
            state_min: [1.0, 0.0, 0.0],
            state_max: [0.0, 1.0, 1.0],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds(_))));
    }

    #[test]
    fn test_curve_fit_samples() {
        let config = CurveFitConfig {
            num_samples: 3,
            ..Default::default()
        };
        let points = config.sample_points();
        assert_eq!(points.len(), 3);
        assert!((points[2] - 0.4).abs() < 1e-6);
        assert!((config.target(0.0) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_problem_json_tagged() {
        let config = RunConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""type":"Robot""#));
        let parsed: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.problem.graph(), config.problem.graph());

        let parsed: RunConfig =
            serde_json::from_str(r#"{"problem": {"type": "CurveFit"}}"#).unwrap();
        assert_eq!(parsed.problem.graph().num_nodes(), 14);
    }
}
