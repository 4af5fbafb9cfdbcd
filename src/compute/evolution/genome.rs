//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random generation, four-way crossover, and mutation of split
//! structural/parametric genomes.

use rand::prelude::*;

use crate::compute::NetworkOperator;
use crate::schema::{Genome, Variation};

use super::codec::parameters_to_gray;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Genome that reproduces the operator's current topology and parameters.
    ///
    /// Every structural slot is a no-op and the parameter bits encode the
    /// operator's parameters.
    pub fn baseline_genome(
        operator: &NetworkOperator,
        struct_variations: usize,
        int_bits: usize,
        frac_bits: usize,
    ) -> Genome {
        Genome {
            structure: vec![Variation::NOOP; struct_variations],
            bits: parameters_to_gray(operator.parameters(), int_bits, frac_bits),
        }
    }

    /// Random genome: an independent edit per slot and uniform bits.
    pub fn random_genome(
        &mut self,
        operator: &NetworkOperator,
        struct_variations: usize,
        total_bits: usize,
    ) -> Genome {
        let structure = (0..struct_variations)
            .map(|_| operator.random_variation(&mut self.rng))
            .collect();
        let bits = self.random_bits(total_bits);
        Genome { structure, bits }
    }

    /// Uniformly random bit string.
    pub fn random_bits(&mut self, len: usize) -> Vec<bool> {
        (0..len).map(|_| self.rng.r#gen::<bool>()).collect()
    }

    /// Uniform index in `[0, len)`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    /// Four-way crossover at independently drawn cut points.
    ///
    /// Offspring 0 and 2 take parent 1's parameter prefix, 1 and 3 take
    /// parent 2's. Offspring 0 and 1 take parent 1's structural prefix,
    /// 2 and 3 take parent 2's. Together they cover every combination.
    pub fn crossover(&mut self, parent1: &Genome, parent2: &Genome) -> [Genome; 4] {
        let struct_cut = self.index(parent1.structure.len().max(1));
        let param_cut = self.index(parent1.bits.len().max(1));
        crossover_at(parent1, parent2, struct_cut, param_cut)
    }

    /// Mutate a genome: flip one random bit and regenerate one random slot.
    ///
    /// Both edits happen together as a single mutation event.
    pub fn mutate(&mut self, genome: &mut Genome, operator: &NetworkOperator) {
        if !genome.bits.is_empty() {
            let bit = self.index(genome.bits.len());
            genome.bits[bit] = !genome.bits[bit];
        }
        if !genome.structure.is_empty() {
            let slot = self.index(genome.structure.len());
            genome.structure[slot] = operator.random_variation(&mut self.rng);
        }
    }
}

/// Four-way crossover with explicit cut points.
pub fn crossover_at(
    parent1: &Genome,
    parent2: &Genome,
    struct_cut: usize,
    param_cut: usize,
) -> [Genome; 4] {
    let bits_a = splice(&parent1.bits, &parent2.bits, param_cut);
    let bits_b = splice(&parent2.bits, &parent1.bits, param_cut);
    let structure_a = splice(&parent1.structure, &parent2.structure, struct_cut);
    let structure_b = splice(&parent2.structure, &parent1.structure, struct_cut);

    [
        Genome {
            structure: structure_a.clone(),
            bits: bits_a.clone(),
        },
        Genome {
            structure: structure_a,
            bits: bits_b.clone(),
        },
        Genome {
            structure: structure_b.clone(),
            bits: bits_a,
        },
        Genome {
            structure: structure_b,
            bits: bits_b,
        },
    ]
}

/// `head[..cut]` followed by `tail[cut..]`.
fn splice<T: Clone>(head: &[T], tail: &[T], cut: usize) -> Vec<T> {
    let cut = cut.min(head.len()).min(tail.len());
    head[..cut].iter().chain(&tail[cut..]).cloned().collect()
}
