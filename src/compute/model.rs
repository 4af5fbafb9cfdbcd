//! Robot state, control and state-transition models.

use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

use crate::schema::KinematicsConfig;

/// Planar pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
}

impl State {
    pub const fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self { x, y, yaw }
    }

    /// Euclidean distance over all three components (yaw not wrapped).
    pub fn dist(&self, other: &State) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dyaw = self.yaw - other.yaw;
        (dx * dx + dy * dy + dyaw * dyaw).sqrt()
    }

    /// Planar distance ignoring heading.
    pub fn dist_xy(&self, other: &State) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for State {
    type Output = State;

    fn add(self, rhs: State) -> State {
        State::new(self.x + rhs.x, self.y + rhs.y, self.yaw + rhs.yaw)
    }
}

impl Mul<f32> for State {
    type Output = State;

    fn mul(self, k: f32) -> State {
        State::new(self.x * k, self.y * k, self.yaw * k)
    }
}

/// Wheel command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Control {
    pub left: f32,
    pub right: f32,
}

impl Control {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Clamp both wheels to `[-limit, limit]`.
    pub fn clamped(self, limit: f32) -> Self {
        Self::new(
            self.left.clamp(-limit, limit),
            self.right.clamp(-limit, limit),
        )
    }
}

/// One-step state transition with a fixed timestep.
pub trait StateTransition {
    /// Current state.
    fn state(&self) -> State;

    /// Overwrite the current state.
    fn set_state(&mut self, state: State);

    /// Advance one timestep under `control` and return the new state.
    fn step(&mut self, control: Control) -> State;

    /// Timestep in seconds.
    fn dt(&self) -> f32;
}

/// Differential-drive kinematics integrated with explicit Euler.
#[derive(Debug, Clone)]
pub struct KinematicModel {
    state: State,
    dt: f32,
    gain: f32,
    turn_gain: f32,
}

impl KinematicModel {
    pub fn new(state: State, dt: f32, config: &KinematicsConfig) -> Self {
        Self {
            state,
            dt,
            gain: config.gain,
            turn_gain: config.turn_gain,
        }
    }

    /// Body velocity `(vx, vy, omega)` at the current heading.
    pub fn velocity(&self, control: Control) -> State {
        let forward = self.gain * (control.left + control.right);
        State::new(
            forward * self.state.yaw.cos(),
            forward * self.state.yaw.sin(),
            self.turn_gain * self.gain * (control.left - control.right),
        )
    }
}

impl StateTransition for KinematicModel {
    fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
    }

    fn step(&mut self, control: Control) -> State {
        let velocity = self.velocity(control);
        self.state = self.state + velocity * self.dt;
        self.state
    }

    fn dt(&self) -> f32 {
        self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dist_includes_heading() {
        let a = State::new(0.0, 0.0, 0.0);
        let b = State::new(3.0, 0.0, 4.0);
        assert!((a.dist(&b) - 5.0).abs() < 1e-6);
        assert!((a.dist_xy(&b) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_straight_line_motion() {
        let mut model = KinematicModel::new(State::default(), 0.1, &KinematicsConfig::default());
        for _ in 0..10 {
            model.step(Control::new(1.0, 1.0));
        }
        let s = model.state();
        assert!((s.x - 1.0).abs() < 1e-5);
        assert!(s.y.abs() < 1e-6);
        assert_eq!(s.yaw, 0.0);
    }

    #[test]
    fn test_differential_turn() {
        let mut model = KinematicModel::new(State::default(), 0.5, &KinematicsConfig::default());
        let s = model.step(Control::new(1.0, -1.0));
        assert_eq!(s.x, 0.0);
        assert!((s.yaw - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_control_clamp() {
        let c = Control::new(25.0, -0.5).clamped(10.0);
        assert_eq!(c, Control::new(10.0, -0.5));
    }
}
