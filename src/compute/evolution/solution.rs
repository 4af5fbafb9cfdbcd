//! Decoded candidate solutions.
//!
//! The engine only sees [`Solution`]; concrete problems decide how a
//! genome turns into a live network operator.

use std::sync::Arc;

use crate::compute::{NetworkOperator, OperationTable};
use crate::schema::{EncodingConfig, Genome, GraphConfig, OpMatrix};

use super::codec::{apply_structural_genome, gray_to_parameters};

/// A genome decoded into an evaluable network operator.
pub trait Solution {
    /// Reset to the base topology and apply `genome`.
    fn decode(&mut self, genome: &Genome);

    /// Boxed deep copy.
    fn clone_box(&self) -> Box<dyn Solution>;

    /// Currently decoded parameters.
    fn parameters(&self) -> &[f32] {
        self.operator().parameters()
    }

    /// The underlying operator.
    fn operator(&self) -> &NetworkOperator;

    /// Mutable access to the underlying operator.
    fn operator_mut(&mut self) -> &mut NetworkOperator;
}

impl Clone for Box<dyn Solution> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Builds fresh solutions configured with the base graph.
pub type SolutionFactory = Box<dyn Fn() -> Box<dyn Solution>>;

/// Network operator solution over a fixed base graph.
#[derive(Debug, Clone)]
pub struct GraphSolution {
    operator: NetworkOperator,
    base_matrix: OpMatrix,
    int_bits: usize,
    frac_bits: usize,
}

impl GraphSolution {
    /// Solution configured with `graph`'s base topology and parameters.
    pub fn new(graph: &GraphConfig, encoding: &EncodingConfig, operations: Arc<OperationTable>) -> Self {
        Self {
            operator: NetworkOperator::from_config(graph, operations),
            base_matrix: graph.base_matrix.clone(),
            int_bits: encoding.int_bits,
            frac_bits: encoding.frac_bits,
        }
    }

    /// Factory sharing one operation table across all solutions.
    pub fn factory(graph: GraphConfig, encoding: EncodingConfig) -> SolutionFactory {
        let operations = Arc::new(OperationTable::standard());
        Box::new(move || Box::new(GraphSolution::new(&graph, &encoding, Arc::clone(&operations))))
    }
}

impl Solution for GraphSolution {
    fn decode(&mut self, genome: &Genome) {
        apply_structural_genome(&mut self.operator, &self.base_matrix, &genome.structure);
        let num_params = self.operator.nodes_for_params().len();
        let params = gray_to_parameters(&genome.bits, self.int_bits, self.frac_bits, num_params);
        self.operator.set_parameters(params);
    }

    fn clone_box(&self) -> Box<dyn Solution> {
        Box::new(self.clone())
    }

    fn operator(&self) -> &NetworkOperator {
        &self.operator
    }

    fn operator_mut(&mut self) -> &mut NetworkOperator {
        &mut self.operator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::codec::parameters_to_gray;
    use crate::schema::{EditKind, Variation};

    fn encoding() -> EncodingConfig {
        EncodingConfig {
            num_params: 2,
            int_bits: 8,
            frac_bits: 8,
            struct_variations: 2,
        }
    }

    #[test]
    fn test_decode_applies_structure_and_parameters() {
        let graph = GraphConfig::curve_fit();
        let factory = GraphSolution::factory(graph.clone(), encoding());
        let mut solution = factory();

        let edit = Variation {
            kind: EditKind::ReplaceEdge,
            from: 0,
            to: 5,
            op: 11,
        };
        let genome = Genome {
            structure: vec![edit, Variation::NOOP],
            bits: parameters_to_gray(&[1.5, 3.25], 8, 8),
        };
        solution.decode(&genome);

        assert_eq!(solution.parameters(), &[1.5, 3.25]);
        assert_eq!(solution.operator().matrix()[0][5], 11);

        // Decoding again starts from the base matrix.
        solution.decode(&Genome {
            structure: vec![Variation::NOOP; 2],
            bits: genome.bits.clone(),
        });
        assert_eq!(solution.operator().matrix(), &graph.base_matrix);
    }

    #[test]
    fn test_clone_box_is_independent() {
        let factory = GraphSolution::factory(GraphConfig::curve_fit(), encoding());
        let mut original = factory();
        let copy = original.clone();

        original.operator_mut().set_parameters(vec![9.0, 9.0]);
        assert_eq!(copy.parameters(), GraphConfig::curve_fit().base_params.as_slice());
    }
}
