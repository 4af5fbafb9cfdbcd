//! Evolution configuration, genome representation and run results.
//!
//! This module provides types for configuring the steady-state genetic
//! search over network operator structure and parameters.

use serde::{Deserialize, Serialize};

use super::OpMatrix;

/// Top-level configuration for the evolutionary search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Parent selection settings.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Genome layout.
    #[serde(default)]
    pub encoding: EncodingConfig,
    /// Probability that an offspring is mutated (0.0-1.0).
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f32,
    /// Extra random ranks refreshed after each replacement.
    #[serde(default = "default_local_refresh")]
    pub local_refresh: usize,
    /// Objective used for progress averages and final selection.
    /// Defaults to the last objective.
    #[serde(default)]
    pub report_objective: Option<usize>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            selection: SelectionConfig::default(),
            encoding: EncodingConfig::default(),
            mutation_probability: default_mutation_probability(),
            local_refresh: default_local_refresh(),
            report_objective: None,
            random_seed: None,
        }
    }
}

fn default_mutation_probability() -> f32 {
    0.5
}
fn default_local_refresh() -> usize {
    10
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations after the initial evaluation.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Crossover attempts per generation.
    #[serde(default = "default_crossovers")]
    pub crossovers_per_generation: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            generations: default_generations(),
            crossovers_per_generation: default_crossovers(),
        }
    }
}

fn default_population_size() -> usize {
    500
}
fn default_generations() -> usize {
    16
}
fn default_crossovers() -> usize {
    24
}

/// Parent selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Acceptance floor for high-rank parents: `(1 + alpha * r) / (1 + r)`.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Extra candidates drawn for the first parent's tournament.
    #[serde(default = "default_search_neighbors")]
    pub search_neighbors: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            search_neighbors: default_search_neighbors(),
        }
    }
}

fn default_alpha() -> f32 {
    0.5
}
fn default_search_neighbors() -> usize {
    8
}

/// Genome layout: structural slots plus fixed-point parameter blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Number of encoded parameters.
    #[serde(default = "default_num_params")]
    pub num_params: usize,
    /// Integer bits per parameter.
    #[serde(default = "default_int_bits")]
    pub int_bits: usize,
    /// Fraction bits per parameter.
    #[serde(default = "default_frac_bits")]
    pub frac_bits: usize,
    /// Structural edits per genome.
    #[serde(default = "default_struct_variations")]
    pub struct_variations: usize,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            num_params: default_num_params(),
            int_bits: default_int_bits(),
            frac_bits: default_frac_bits(),
            struct_variations: default_struct_variations(),
        }
    }
}

impl EncodingConfig {
    /// Bits per parameter block.
    #[inline]
    pub fn block_bits(&self) -> usize {
        self.int_bits + self.frac_bits
    }

    /// Total parametric genome length.
    #[inline]
    pub fn total_bits(&self) -> usize {
        self.num_params * self.block_bits()
    }
}

fn default_num_params() -> usize {
    4
}
fn default_int_bits() -> usize {
    16
}
fn default_frac_bits() -> usize {
    16
}
fn default_struct_variations() -> usize {
    10
}

// ============================================================================
// Genome Representation
// ============================================================================

/// Kind of elementary graph edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditKind {
    /// Overwrite an existing edge's unary operation.
    ReplaceEdge,
    /// Overwrite an existing node's binary operation.
    ReplaceNode,
    /// Create an edge into a node that already combines inputs.
    AddEdge,
    /// Delete an edge unless it is a last incoming or outgoing link.
    RemoveEdge,
}

impl EditKind {
    /// Numeric opcode (0..=3).
    pub fn code(self) -> u8 {
        match self {
            Self::ReplaceEdge => 0,
            Self::ReplaceNode => 1,
            Self::AddEdge => 2,
            Self::RemoveEdge => 3,
        }
    }

    /// Parse a numeric opcode.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::ReplaceEdge),
            1 => Some(Self::ReplaceNode),
            2 => Some(Self::AddEdge),
            3 => Some(Self::RemoveEdge),
            _ => None,
        }
    }
}

/// One structural edit `(kind, from, to, op)`.
///
/// `ReplaceEdge` from node 0 to node 0 is the no-op sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variation {
    pub kind: EditKind,
    pub from: usize,
    pub to: usize,
    pub op: u8,
}

impl Variation {
    /// Slot filler meaning "apply nothing".
    pub const NOOP: Self = Self {
        kind: EditKind::ReplaceEdge,
        from: 0,
        to: 0,
        op: 0,
    };

    /// Whether this edit is the no-op sentinel.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.kind == EditKind::ReplaceEdge && self.from == 0 && self.to == 0
    }

    /// Build from the `(opcode, i, j, value)` tuple form.
    pub fn from_tuple(tuple: [usize; 4]) -> Option<Self> {
        let kind = EditKind::from_code(u8::try_from(tuple[0]).ok()?)?;
        Some(Self {
            kind,
            from: tuple[1],
            to: tuple[2],
            op: u8::try_from(tuple[3]).ok()?,
        })
    }

    /// The `(opcode, i, j, value)` tuple form.
    pub fn to_tuple(&self) -> [usize; 4] {
        [
            self.kind.code() as usize,
            self.from,
            self.to,
            self.op as usize,
        ]
    }
}

/// Split genome: structural edits plus Gray-coded parameter bits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Genome {
    /// Edits applied in order to the base matrix.
    pub structure: Vec<Variation>,
    /// Concatenated Gray-coded parameter blocks.
    pub bits: Vec<bool>,
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress report fired after the initial evaluation and each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation number (0 = initial population).
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Population average of the reported objective.
    pub average: f32,
    /// Population minimum of the reported objective.
    pub best: f32,
    /// Number of rank-0 individuals.
    pub pareto_size: usize,
    /// Offspring accepted into the population this generation.
    pub replacements: usize,
    /// Evaluations performed so far.
    pub evaluations: u64,
}

/// Decoded individual for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    /// Population slot.
    pub index: usize,
    /// Pareto rank at snapshot time.
    pub rank: usize,
    /// Objective vector.
    pub objectives: Vec<f32>,
    /// Decoded parameters.
    pub parameters: Vec<f32>,
    /// Decoded adjacency matrix.
    pub matrix: OpMatrix,
    /// Genome the solution was decoded from.
    pub genome: Genome,
}

/// Per-generation history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Average of the reported objective per generation.
    pub average: Vec<f32>,
    /// Minimum of the reported objective per generation.
    pub best: Vec<f32>,
    /// Pareto set size per generation.
    pub pareto_size: Vec<usize>,
}

impl EvolutionHistory {
    pub fn record(&mut self, report: &GenerationReport) {
        self.average.push(report.average);
        self.best.push(report.best);
        self.pareto_size.push(report.pareto_size);
    }
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Pareto member with the lowest reported objective.
    pub best: SolutionSnapshot,
    /// Final Pareto set indices.
    pub pareto: Vec<usize>,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations run.
    pub generations: usize,
    /// Evaluations performed.
    pub total_evaluations: u64,
    /// Offspring accepted into the population.
    pub replacements: u64,
    /// Individuals scored with the failure sentinel.
    pub failed_evaluations: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Seed the run was driven by.
    pub seed: u64,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f32 },
    #[error("Parameter blocks must have at least one bit")]
    EmptyEncoding,
    #[error("Integer plus fraction bits must not exceed 63, got {0}")]
    EncodingTooWide(usize),
    #[error("At least one structural variation is required")]
    NoStructuralVariations,
    #[error("Encoding has {encoded} parameters but the graph has {nodes} parameter nodes")]
    ParameterCountMismatch { encoded: usize, nodes: usize },
    #[error("Problem config validation failed: {0}")]
    ProblemConfigError(#[from] super::ConfigError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        if self.population.size == 0 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        let probabilities = [
            ("mutation_probability", self.mutation_probability),
            ("alpha", self.selection.alpha),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvolutionConfigError::InvalidProbability { name, value });
            }
        }

        let block = self.encoding.block_bits();
        if block == 0 {
            return Err(EvolutionConfigError::EmptyEncoding);
        }
        if block > 63 {
            return Err(EvolutionConfigError::EncodingTooWide(block));
        }
        if self.encoding.struct_variations == 0 {
            return Err(EvolutionConfigError::NoStructuralVariations);
        }

        Ok(())
    }

    /// Index of the reported objective for a given objective count.
    pub fn report_index(&self, num_objectives: usize) -> usize {
        self.report_objective
            .unwrap_or(num_objectives.saturating_sub(1))
            .min(num_objectives.saturating_sub(1))
    }
}
