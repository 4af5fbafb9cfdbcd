//! Network operator: a DAG of unary/binary operations stored as a matrix.
//!
//! Node `i`'s value is seeded from its diagonal marker, overwritten by an
//! input or parameter if the node has that role, then every edge `(i, j)`
//! with `i < j` folds `unary(m[i][j], z[i])` into `z[j]` using the binary
//! operation `m[j][j]`. Index order is evaluation order.

use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use rand::Rng;

use super::operations::{OperationTable, diagonal_seed};
use crate::schema::{EditKind, GraphConfig, OpMatrix, Variation};

/// Errors from matrix/parameter persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("File contains no data")]
    Empty,
    #[error("Row {row} has {len} entries, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("Matrix has {rows} rows of {cols} entries, expected a square matrix")]
    NotSquare { rows: usize, cols: usize },
    #[error("Invalid value {token:?} on line {line}")]
    Parse { line: usize, token: String },
}

/// Evolvable computation graph.
#[derive(Clone)]
pub struct NetworkOperator {
    operations: Arc<OperationTable>,
    matrix: OpMatrix,
    parameters: Vec<f32>,
    nodes_for_vars: Vec<usize>,
    nodes_for_params: Vec<usize>,
    nodes_for_output: Vec<usize>,
    values: Vec<f32>,
}

impl NetworkOperator {
    /// Create an empty operator over the given operation table.
    pub fn new(operations: Arc<OperationTable>) -> Self {
        Self {
            operations,
            matrix: Vec::new(),
            parameters: Vec::new(),
            nodes_for_vars: Vec::new(),
            nodes_for_params: Vec::new(),
            nodes_for_output: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Create an operator configured with a graph's base topology and roles.
    pub fn from_config(config: &GraphConfig, operations: Arc<OperationTable>) -> Self {
        let mut operator = Self::new(operations);
        operator.set_node_groups(
            config.nodes_for_vars.clone(),
            config.nodes_for_params.clone(),
            config.nodes_for_output.clone(),
        );
        operator.set_matrix(config.base_matrix.clone());
        operator.set_parameters(config.base_params.clone());
        operator
    }

    /// Record the input, parameter and output node sets. Not validated here.
    pub fn set_node_groups(&mut self, vars: Vec<usize>, params: Vec<usize>, outputs: Vec<usize>) {
        self.nodes_for_vars = vars;
        self.nodes_for_params = params;
        self.nodes_for_output = outputs;
    }

    pub fn nodes_for_vars(&self) -> &[usize] {
        &self.nodes_for_vars
    }

    pub fn nodes_for_params(&self) -> &[usize] {
        &self.nodes_for_params
    }

    pub fn nodes_for_output(&self) -> &[usize] {
        &self.nodes_for_output
    }

    pub fn set_parameters(&mut self, parameters: Vec<f32>) {
        self.parameters = parameters;
    }

    pub fn parameters(&self) -> &[f32] {
        &self.parameters
    }

    /// Mutable access; callers may resize or overwrite in place.
    pub fn parameters_mut(&mut self) -> &mut Vec<f32> {
        &mut self.parameters
    }

    /// Replace the matrix wholesale and resize the scratch vector.
    pub fn set_matrix(&mut self, matrix: OpMatrix) {
        self.values.resize(matrix.len(), 0.0);
        self.matrix = matrix;
    }

    pub fn matrix(&self) -> &OpMatrix {
        &self.matrix
    }

    /// Number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.matrix.len()
    }

    /// Evaluate the graph for one input vector.
    ///
    /// Missing inputs or parameters leave their nodes at the diagonal seed;
    /// edges with unknown codes contribute nothing.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Vec<f32> {
        let n = self.matrix.len();
        self.values.resize(n, 0.0);

        for (i, value) in self.values.iter_mut().enumerate() {
            *value = diagonal_seed(self.matrix[i][i]);
        }
        for (&node, &input) in self.nodes_for_vars.iter().zip(inputs) {
            if let Some(slot) = self.values.get_mut(node) {
                *slot = input;
            }
        }
        for (&node, &param) in self.nodes_for_params.iter().zip(&self.parameters) {
            if let Some(slot) = self.values.get_mut(node) {
                *slot = param;
            }
        }

        for i in 0..n.saturating_sub(1) {
            for j in (i + 1)..n {
                let code = self.matrix[i][j];
                if code == 0 {
                    continue;
                }
                let (Some(unary), Some(binary)) = (
                    self.operations.unary(code),
                    self.operations.binary(self.matrix[j][j]),
                ) else {
                    continue;
                };
                let contribution = unary(self.values[i]);
                self.values[j] = binary(self.values[j], contribution);
            }
        }

        self.nodes_for_output
            .iter()
            .map(|&node| self.values.get(node).copied().unwrap_or(0.0))
            .collect()
    }

    /// Apply one structural edit to the current matrix.
    ///
    /// Returns whether the matrix changed. Edits whose preconditions fail,
    /// or whose indices fall outside the matrix, are ignored.
    pub fn apply_variation(&mut self, variation: &Variation) -> bool {
        if variation.is_noop() {
            return false;
        }
        let n = self.matrix.len();
        let Variation { kind, from: i, to: j, op } = *variation;
        if i >= n || j >= n {
            log::debug!("Ignoring out-of-range edit {:?} on {n} nodes", variation);
            return false;
        }

        match kind {
            EditKind::ReplaceEdge => {
                if self.matrix[i][j] != 0 {
                    self.matrix[i][j] = op;
                    return true;
                }
            }
            EditKind::ReplaceNode => {
                if self.matrix[i][i] != 0 {
                    self.matrix[i][i] = op;
                    return true;
                }
            }
            EditKind::AddEdge => {
                if self.matrix[i][j] == 0 && self.matrix[j][j] != 0 {
                    self.matrix[i][j] = op;
                    return true;
                }
            }
            EditKind::RemoveEdge => {
                if self.matrix[i][j] == 0 {
                    log::debug!("Ignoring edit {:?}: no edge to remove", variation);
                    return false;
                }
                let incoming = (0..j).filter(|&k| self.matrix[k][j] != 0).count();
                let outgoing = ((i + 1)..n).filter(|&k| self.matrix[i][k] != 0).count();
                if incoming > 1 && outgoing > 1 {
                    self.matrix[i][j] = 0;
                    return true;
                }
            }
        }
        log::debug!("Ignoring edit {:?}: precondition not met", variation);
        false
    }

    /// Draw a random edit for this graph's size and operation table.
    pub fn random_variation<R: Rng>(&self, rng: &mut R) -> Variation {
        let n = self.matrix.len();
        if n < 2 {
            return Variation::NOOP;
        }

        let kind = match rng.gen_range(0..4u8) {
            0 => EditKind::ReplaceEdge,
            1 => EditKind::ReplaceNode,
            2 => EditKind::AddEdge,
            _ => EditKind::RemoveEdge,
        };

        if kind == EditKind::ReplaceNode {
            let mut node = rng.gen_range(0..n);
            while node < n && self.is_source_node(node) {
                node += 1;
            }
            if node >= n {
                node = (0..n).rev().find(|&k| !self.is_source_node(k)).unwrap_or(n - 1);
            }
            let op = draw_code(rng, self.operations.num_binary());
            return Variation {
                kind,
                from: node,
                to: node,
                op,
            };
        }

        let from = rng.gen_range(0..n - 1);
        let to = rng.gen_range(from + 1..n);
        let op = draw_code(rng, self.operations.num_unary());
        Variation { kind, from, to, op }
    }

    fn is_source_node(&self, node: usize) -> bool {
        self.nodes_for_vars.contains(&node) || self.nodes_for_params.contains(&node)
    }

    /// Load the matrix from whitespace-separated integers, one row per line.
    ///
    /// On failure the current matrix is left unchanged.
    pub fn load_matrix<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        match read_matrix(path) {
            Ok(matrix) => {
                log::info!("Loaded {}x{} matrix from {}", matrix.len(), matrix.len(), path.display());
                self.set_matrix(matrix);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to load matrix from {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Save the matrix, one row per line.
    pub fn save_matrix<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let result = write_rows(path, self.matrix.iter().map(|row| join(row)));
        if let Err(e) = &result {
            log::warn!("Failed to save matrix to {}: {}", path.display(), e);
        }
        result
    }

    /// Load parameters from whitespace-separated floats.
    ///
    /// On failure the current parameters are left unchanged.
    pub fn load_parameters<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        match read_parameters(path) {
            Ok(params) => {
                log::info!("Loaded {} parameters from {}", params.len(), path.display());
                self.parameters = params;
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to load parameters from {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Save parameters on a single line.
    pub fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let result = write_rows(path, std::iter::once(join(&self.parameters)));
        if let Err(e) = &result {
            log::warn!("Failed to save parameters to {}: {}", path.display(), e);
        }
        result
    }
}

impl fmt::Debug for NetworkOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkOperator")
            .field("nodes", &self.matrix.len())
            .field("parameters", &self.parameters)
            .field("nodes_for_vars", &self.nodes_for_vars)
            .field("nodes_for_params", &self.nodes_for_params)
            .field("nodes_for_output", &self.nodes_for_output)
            .finish()
    }
}

/// Matrix dump, one row per line.
impl fmt::Display for NetworkOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.matrix {
            let line: Vec<String> = row.iter().map(|v| format!("{v:>2}")).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Draw an operation code in `[0, count)`, remapping 0 to 1.
fn draw_code<R: Rng>(rng: &mut R, count: usize) -> u8 {
    let code = if count > 1 { rng.gen_range(0..count) } else { 0 };
    u8::try_from(code.max(1)).unwrap_or(u8::MAX)
}

fn read_matrix(path: &Path) -> Result<OpMatrix, PersistenceError> {
    let text = fs::read_to_string(path)?;
    let mut matrix: OpMatrix = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<u8>().map_err(|_| PersistenceError::Parse {
                    line: line_no + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        if let Some(first) = matrix.first()
            && first.len() != row.len()
        {
            return Err(PersistenceError::RaggedRow {
                row: matrix.len(),
                len: row.len(),
                expected: first.len(),
            });
        }
        matrix.push(row);
    }
    if matrix.is_empty() {
        return Err(PersistenceError::Empty);
    }
    if matrix[0].len() != matrix.len() {
        return Err(PersistenceError::NotSquare {
            rows: matrix.len(),
            cols: matrix[0].len(),
        });
    }
    Ok(matrix)
}

fn read_parameters(path: &Path) -> Result<Vec<f32>, PersistenceError> {
    let text = fs::read_to_string(path)?;
    let mut params = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            let value = token.parse::<f32>().map_err(|_| PersistenceError::Parse {
                line: line_no + 1,
                token: token.to_string(),
            })?;
            params.push(value);
        }
    }
    if params.is_empty() {
        return Err(PersistenceError::Empty);
    }
    Ok(params)
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_rows<I>(path: &Path, rows: I) -> Result<(), PersistenceError>
where
    I: IntoIterator<Item = String>,
{
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    fn operator(matrix: OpMatrix, vars: Vec<usize>, params: Vec<usize>, outputs: Vec<usize>) -> NetworkOperator {
        let mut op = NetworkOperator::new(Arc::new(OperationTable::standard()));
        op.set_node_groups(vars, params, outputs);
        op.set_matrix(matrix);
        op
    }

    #[test]
    fn test_evaluate_sum_and_product() {
        // z2 = x0 + x1 ; z3 = z2 * (-x1)
        let matrix = vec![
            vec![0, 0, 1, 0],
            vec![0, 0, 1, 3],
            vec![0, 0, 1, 1],
            vec![0, 0, 0, 2],
        ];
        let mut op = operator(matrix, vec![0, 1], vec![], vec![2, 3]);
        let out = op.evaluate(&[2.0, 3.0]);
        assert_eq!(out, vec![5.0, -15.0]);
    }

    #[test]
    fn test_parameters_assigned_by_position() {
        let matrix = vec![vec![0, 0, 1], vec![0, 0, 1], vec![0, 0, 1]];
        let mut op = operator(matrix, vec![0], vec![1], vec![2]);
        op.set_parameters(vec![0.5]);
        assert_eq!(op.evaluate(&[2.0]), vec![2.5]);
    }

    #[test]
    fn test_max_node_seeded_with_negative_infinity() {
        let matrix = vec![vec![0, 0, 1], vec![0, 0, 1], vec![0, 0, 3]];
        let mut op = operator(matrix, vec![0, 1], vec![], vec![2]);
        assert_eq!(op.evaluate(&[-7.0, -2.0]), vec![-2.0]);
    }

    #[test]
    fn test_reference_graph_evaluates_finite() {
        let config = GraphConfig::robot_controller();
        let mut op = NetworkOperator::from_config(&config, Arc::new(OperationTable::standard()));
        let out = op.evaluate(&[1.0, -2.0, 0.3]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_replace_and_add_edge_preconditions() {
        let matrix = vec![vec![1, 5, 0], vec![0, 1, 0], vec![0, 0, 0]];
        let mut op = operator(matrix, vec![0], vec![], vec![1]);

        let replace = Variation { kind: EditKind::ReplaceEdge, from: 0, to: 1, op: 7 };
        assert!(op.apply_variation(&replace));
        assert_eq!(op.matrix()[0][1], 7);

        // Target node 2 has no binary operation yet.
        let add = Variation { kind: EditKind::AddEdge, from: 1, to: 2, op: 4 };
        assert!(!op.apply_variation(&add));
        assert_eq!(op.matrix()[1][2], 0);

        let set_node = Variation { kind: EditKind::ReplaceNode, from: 2, to: 2, op: 2 };
        assert!(!op.apply_variation(&set_node));
        op.set_matrix(vec![vec![1, 5, 0], vec![0, 1, 0], vec![0, 0, 1]]);
        assert!(op.apply_variation(&add));
        assert_eq!(op.matrix()[1][2], 4);
    }

    #[test]
    fn test_remove_edge_keeps_last_link() {
        let matrix = vec![vec![0, 1, 0], vec![0, 1, 0], vec![0, 0, 0]];
        let mut op = operator(matrix.clone(), vec![0], vec![], vec![1]);
        let remove = Variation { kind: EditKind::RemoveEdge, from: 0, to: 1, op: 0 };
        assert!(!op.apply_variation(&remove));
        assert_eq!(op.matrix(), &matrix);
    }

    #[test]
    fn test_remove_edge_when_redundant() {
        // Node 3 has two inputs and node 0 has two outputs.
        let matrix = vec![
            vec![0, 0, 1, 1],
            vec![0, 0, 1, 1],
            vec![0, 0, 1, 0],
            vec![0, 0, 0, 1],
        ];
        let mut op = operator(matrix, vec![0, 1], vec![], vec![2, 3]);
        let remove = Variation { kind: EditKind::RemoveEdge, from: 0, to: 3, op: 0 };
        assert!(op.apply_variation(&remove));
        assert_eq!(op.matrix()[0][3], 0);

        // Node 0 now has a single outgoing edge left.
        let again = Variation { kind: EditKind::RemoveEdge, from: 0, to: 2, op: 0 };
        assert!(!op.apply_variation(&again));
    }

    #[test]
    fn test_remove_missing_edge_reports_no_change() {
        // Both degree checks pass for (0, 3), but there is no edge there.
        let matrix = vec![
            vec![0, 1, 0, 0, 1],
            vec![0, 1, 0, 1, 0],
            vec![0, 0, 1, 1, 0],
            vec![0, 0, 0, 1, 0],
            vec![0, 0, 0, 0, 1],
        ];
        let mut op = operator(matrix.clone(), vec![0], vec![], vec![3, 4]);
        let remove = Variation { kind: EditKind::RemoveEdge, from: 0, to: 3, op: 0 };
        assert!(!op.apply_variation(&remove));
        assert_eq!(op.matrix(), &matrix);
    }

    #[test]
    fn test_remove_edge_never_disconnects() {
        let config = GraphConfig::robot_controller();
        let mut op = NetworkOperator::from_config(&config, Arc::new(OperationTable::standard()));
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..2000 {
            let v = op.random_variation(&mut rng);
            if v.kind != EditKind::RemoveEdge || op.matrix()[v.from][v.to] == 0 {
                continue;
            }
            if op.apply_variation(&v) {
                let m = op.matrix();
                assert!((0..v.to).any(|k| m[k][v.to] != 0));
                assert!(((v.from + 1)..m.len()).any(|k| m[v.from][k] != 0));
            }
        }
    }

    #[test]
    fn test_noop_and_out_of_range_ignored() {
        let matrix = vec![vec![1, 1], vec![0, 1]];
        let mut op = operator(matrix.clone(), vec![], vec![], vec![1]);
        assert!(!op.apply_variation(&Variation::NOOP));
        let far = Variation { kind: EditKind::ReplaceEdge, from: 0, to: 5, op: 3 };
        assert!(!op.apply_variation(&far));
        assert_eq!(op.matrix(), &matrix);
    }

    #[test]
    fn test_random_variation_ranges() {
        let config = GraphConfig::robot_controller();
        let op = NetworkOperator::from_config(&config, Arc::new(OperationTable::standard()));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..5000 {
            let v = op.random_variation(&mut rng);
            assert!(v.op >= 1);
            match v.kind {
                EditKind::ReplaceNode => {
                    assert_eq!(v.from, v.to);
                    assert!(!config.nodes_for_vars.contains(&v.from));
                    assert!(!config.nodes_for_params.contains(&v.from));
                    assert!((v.op as usize) < 8);
                }
                _ => {
                    assert!(v.from < v.to);
                    assert!(v.to < 32);
                    assert!((v.op as usize) < 28);
                }
            }
        }
    }

    #[test]
    fn test_matrix_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.txt");

        let config = GraphConfig::curve_fit();
        let op = NetworkOperator::from_config(&config, Arc::new(OperationTable::standard()));
        op.save_matrix(&path).unwrap();

        let mut loaded = operator(vec![vec![1]], vec![], vec![], vec![]);
        loaded.load_matrix(&path).unwrap();
        assert_eq!(loaded.matrix(), &config.base_matrix);
    }

    #[test]
    fn test_failed_loads_leave_state_unchanged() {
        let dir = tempdir().unwrap();
        let ragged = dir.path().join("ragged.txt");
        let empty = dir.path().join("empty.txt");
        fs::write(&ragged, "1 0 0\n0 1\n0 0 1\n").unwrap();
        fs::write(&empty, "\n\n").unwrap();

        let original = vec![vec![1, 2], vec![0, 1]];
        let mut op = operator(original.clone(), vec![], vec![], vec![]);
        op.set_parameters(vec![1.5, 2.5]);

        assert!(matches!(op.load_matrix(&ragged), Err(PersistenceError::RaggedRow { row: 1, .. })));
        assert!(matches!(op.load_matrix(&empty), Err(PersistenceError::Empty)));
        assert!(matches!(op.load_matrix(dir.path().join("missing.txt")), Err(PersistenceError::Io(_))));
        assert!(matches!(op.load_parameters(&empty), Err(PersistenceError::Empty)));

        assert_eq!(op.matrix(), &original);
        assert_eq!(op.parameters(), &[1.5, 2.5]);
    }

    #[test]
    fn test_parameter_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.txt");

        let mut op = operator(vec![vec![1]], vec![], vec![], vec![]);
        op.set_parameters(vec![41974.2, 0.125, 3.0]);
        op.save_parameters(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);

        let mut loaded = operator(vec![vec![1]], vec![], vec![], vec![]);
        loaded.load_parameters(&path).unwrap();
        assert_eq!(loaded.parameters(), &[41974.2, 0.125, 3.0]);
    }
}
