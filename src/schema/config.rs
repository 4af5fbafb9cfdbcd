//! Graph configuration for network operator problems.

use serde::{Deserialize, Serialize};

/// Adjacency matrix of operation codes. Row/column `i` is node `i`.
pub type OpMatrix = Vec<Vec<u8>>;

/// Base topology, base parameters and node roles of a network operator.
///
/// The three node sets are positional: the k-th input lands on
/// `nodes_for_vars[k]`, the k-th parameter on `nodes_for_params[k]`, and
/// outputs are gathered in `nodes_for_output` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Square matrix the structural genome is applied to.
    pub base_matrix: OpMatrix,
    /// Known-good parameter values; encoded as the first individual.
    pub base_params: Vec<f32>,
    /// Nodes receiving external inputs.
    pub nodes_for_vars: Vec<usize>,
    /// Nodes receiving tunable parameters.
    pub nodes_for_params: Vec<usize>,
    /// Nodes read out as outputs.
    pub nodes_for_output: Vec<usize>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::robot_controller()
    }
}

impl GraphConfig {
    /// Number of nodes in the base graph.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.base_matrix.len()
    }

    /// Reference 32-node trajectory controller.
    ///
    /// Inputs are the goal error `(dx, dy, dyaw)`, outputs are the left and
    /// right wheel commands.
    pub fn robot_controller() -> Self {
        #[rustfmt::skip]
        let base_matrix = vec![
            vec![1, 0, 0, 0, 0, 0, 1,10, 0, 0,12, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,10, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,19, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 2, 9, 0, 0, 0, 0,10, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 6, 0, 0, 0, 0,13, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0,22, 0, 0, 0, 0,11, 0, 0, 0,25, 0, 0,19, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 1, 0, 0, 0, 6, 0, 0, 8, 0, 5, 0, 4,13,10, 0, 0, 0,14,15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 2, 0, 1,10, 9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 2, 1, 0, 0, 8, 0, 0, 0,12, 0, 0, 1,19, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 1, 0, 0, 0, 2, 0, 0, 0, 1, 1, 8, 0, 0, 0, 1, 8, 0, 0, 0,14,12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 1,26, 5, 4,23, 0, 0, 0, 0,15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,17,10,10, 0, 0, 0, 0,16, 0,16, 0,16, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0,14, 0,25, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1,10, 0, 1, 0, 0,14, 0,13, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 0,27, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,22, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0,15, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 7, 0, 0, 0, 0, 0, 0, 0, 0,17, 0, 0, 0, 1, 0, 0, 0, 7, 0, 0,17,13, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2,21, 0,16, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 6, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 1,16,16, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 4, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 4, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
        ];

        Self {
            base_matrix,
            base_params: vec![41974.2, 29423.1, 53775.6, 16406.0],
            nodes_for_vars: vec![0, 1, 2],
            nodes_for_params: vec![3, 4, 5, 6],
            nodes_for_output: vec![22, 23],
        }
    }

    /// 14-node graph with one input, two parameters and one output.
    pub fn curve_fit() -> Self {
        #[rustfmt::skip]
        let base_matrix = vec![
            vec![0, 0, 0, 0, 0, 1, 1, 26, 0, 2, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 1, 0, 2, 0, 0, 0, 0, 0],
            vec![0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0],
            vec![0, 0, 0, 0, 4, 0, 0, 3, 0, 22, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 12],
            vec![0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 1, 16, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 8, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 14, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 6, 0, 0, 1, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 0, 11, 8],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 13],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 18],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        ];

        Self {
            base_matrix,
            base_params: vec![0.0, 0.0],
            nodes_for_vars: vec![0],
            nodes_for_params: vec![1, 2],
            nodes_for_output: vec![13],
        }
    }

    /// Validate matrix shape and node roles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.num_nodes();
        if n == 0 {
            return Err(ConfigError::EmptyMatrix);
        }
        for (row, values) in self.base_matrix.iter().enumerate() {
            if values.len() != n {
                return Err(ConfigError::NonSquareMatrix {
                    row,
                    len: values.len(),
                    expected: n,
                });
            }
        }

        let groups = [
            ("vars", &self.nodes_for_vars),
            ("params", &self.nodes_for_params),
            ("output", &self.nodes_for_output),
        ];

        let mut owner: Vec<Option<&'static str>> = vec![None; n];
        for (group, nodes) in groups {
            for &node in nodes.iter() {
                if node >= n {
                    return Err(ConfigError::NodeOutOfRange {
                        group,
                        node,
                        nodes: n,
                    });
                }
                if let Some(first) = owner[node] {
                    return Err(ConfigError::OverlappingNodes {
                        node,
                        first,
                        second: group,
                    });
                }
                owner[node] = Some(group);
            }
        }

        if self.base_params.len() != self.nodes_for_params.len() {
            return Err(ConfigError::ParameterCountMismatch {
                params: self.base_params.len(),
                nodes: self.nodes_for_params.len(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Base matrix must have at least one node")]
    EmptyMatrix,
    #[error("Base matrix row {row} has {len} entries, expected {expected}")]
    NonSquareMatrix {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("Node {node} in {group} set is outside 0..{nodes}")]
    NodeOutOfRange {
        group: &'static str,
        node: usize,
        nodes: usize,
    },
    #[error("Node {node} appears in both {first} and {second} sets")]
    OverlappingNodes {
        node: usize,
        first: &'static str,
        second: &'static str,
    },
    #[error("{params} base parameters given for {nodes} parameter nodes")]
    ParameterCountMismatch { params: usize, nodes: usize },
    #[error("Time step must be positive")]
    InvalidTimeStep,
    #[error("Time limit must be positive")]
    InvalidTimeLimit,
    #[error("Goal tolerance must be positive")]
    InvalidTolerance,
    #[error("State bounds are invalid: {0}")]
    InvalidBounds(String),
    #[error("Sample count must be positive")]
    InvalidSamples,
    #[error("No objectives configured")]
    NoObjectives,
}
