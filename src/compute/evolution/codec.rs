//! Fixed-point Gray codec for parameter genomes and structural decoding.
//!
//! Each parameter occupies one block of `int_bits + frac_bits` bits. Within a
//! block the integer part comes first, MSB first, followed by the fraction,
//! and the whole block is Gray-coded independently of its neighbours.
//! Signs are not encoded: negative values are stored as their magnitude.

use crate::compute::NetworkOperator;
use crate::schema::{OpMatrix, Variation};

/// Encode parameters as concatenated Gray-coded fixed-point blocks.
///
/// Integer parts wrap modulo `2^int_bits`; fractions are truncated to
/// `frac_bits` bits.
pub fn parameters_to_gray(params: &[f32], int_bits: usize, frac_bits: usize) -> Vec<bool> {
    let block = int_bits + frac_bits;
    let mut bits = Vec::with_capacity(params.len() * block);
    let mut binary = vec![false; block];

    for &param in params {
        let magnitude = f64::from(param.abs());
        let whole = magnitude.floor();
        let mut integer = whole as u64;
        let mut fraction = magnitude - whole;

        for slot in binary[..int_bits].iter_mut().rev() {
            *slot = integer % 2 == 1;
            integer /= 2;
        }
        for slot in binary[int_bits..].iter_mut() {
            fraction *= 2.0;
            let bit = fraction.floor();
            *slot = bit >= 1.0;
            fraction -= bit;
        }

        bits.extend(binary_to_gray(&binary));
    }

    bits
}

/// Decode Gray-coded blocks back into at most `num_params` parameters.
///
/// Stops early, yielding fewer parameters, when a block's integer part runs
/// past the end of `bits`; a partial fraction is summed as far as it goes.
pub fn gray_to_parameters(
    bits: &[bool],
    int_bits: usize,
    frac_bits: usize,
    num_params: usize,
) -> Vec<f32> {
    let block = int_bits + frac_bits;
    if block == 0 {
        return Vec::new();
    }
    let binary = gray_to_binary(bits, block);
    let top_weight = 2f64.powi(int_bits as i32 - 1);

    let mut params = Vec::with_capacity(num_params);
    for p in 0..num_params {
        let start = p * block;
        let int_end = start + int_bits;
        if int_end > binary.len() {
            break;
        }
        let end = (start + block).min(binary.len());

        let mut weight = top_weight;
        let mut value = 0.0f64;
        for &bit in &binary[start..end] {
            if bit {
                value += weight;
            }
            weight /= 2.0;
        }
        params.push(value as f32);
    }

    params
}

/// Gray-code one binary block.
pub fn binary_to_gray(binary: &[bool]) -> Vec<bool> {
    binary
        .iter()
        .enumerate()
        .map(|(k, &bit)| if k == 0 { bit } else { bit ^ binary[k - 1] })
        .collect()
}

/// Undo Gray coding, restarting the XOR chain every `block` bits.
pub fn gray_to_binary(gray: &[bool], block: usize) -> Vec<bool> {
    let mut binary = Vec::with_capacity(gray.len());
    for (i, &bit) in gray.iter().enumerate() {
        if block == 0 || i % block == 0 {
            binary.push(bit);
        } else {
            let prev = binary[i - 1];
            binary.push(prev ^ bit);
        }
    }
    binary
}

/// Reset the operator to `base` and apply `structure` in order.
///
/// Returns the number of edits that changed the matrix.
pub fn apply_structural_genome(
    operator: &mut NetworkOperator,
    base: &OpMatrix,
    structure: &[Variation],
) -> usize {
    operator.set_matrix(base.clone());
    structure
        .iter()
        .filter(|variation| operator.apply_variation(variation))
        .count()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::compute::OperationTable;
    use crate::schema::{EditKind, GraphConfig};

    fn bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_fixed_point_example() {
        // 5 = 0101, 0.75 = 1100 -> binary 01011100 -> Gray 01110010
        let gray = parameters_to_gray(&[5.75], 4, 4);
        assert_eq!(gray, bits("01110010"));
        assert_eq!(gray_to_binary(&gray, 8), bits("01011100"));
        assert_eq!(gray_to_parameters(&gray, 4, 4, 1), vec![5.75]);
    }

    #[test]
    fn test_blocks_are_independent() {
        let gray = parameters_to_gray(&[5.75, 3.5], 4, 4);
        assert_eq!(gray.len(), 16);
        assert_eq!(&gray[..8], bits("01110010").as_slice());
        assert_eq!(gray_to_parameters(&gray, 4, 4, 2), vec![5.75, 3.5]);
    }

    #[test]
    fn test_negative_folds_to_magnitude() {
        let gray = parameters_to_gray(&[-2.25], 4, 4);
        assert_eq!(gray_to_parameters(&gray, 4, 4, 1), vec![2.25]);
    }

    #[test]
    fn test_integer_wraps_and_fraction_truncates() {
        let gray = parameters_to_gray(&[17.3], 4, 2);
        // 17 mod 16 = 1, 0.3 truncated to 0.25
        assert_eq!(gray_to_parameters(&gray, 4, 2, 1), vec![1.25]);
    }

    #[test]
    fn test_short_genome_truncates() {
        let gray = parameters_to_gray(&[1.0, 2.0, 3.0], 4, 4);
        assert_eq!(gray_to_parameters(&gray[..19], 4, 4, 3), vec![1.0, 2.0]);
        // Integer part of the third block fits, fraction is partial.
        let partial = gray_to_parameters(&gray[..22], 4, 4, 3);
        assert_eq!(partial, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_reference_parameters_round_trip_within_resolution() {
        let params = GraphConfig::robot_controller().base_params;
        let gray = parameters_to_gray(&params, 16, 16);
        let decoded = gray_to_parameters(&gray, 16, 16, params.len());
        for (a, b) in params.iter().zip(&decoded) {
            assert!((a - b).abs() <= 2f32.powi(-16) + f32::EPSILON * a.abs());
        }
    }

    #[test]
    fn test_structural_genome_resets_to_base() {
        let config = GraphConfig::curve_fit();
        let mut op = NetworkOperator::from_config(&config, Arc::new(OperationTable::standard()));

        let edit = Variation {
            kind: EditKind::ReplaceEdge,
            from: 0,
            to: 5,
            op: 9,
        };
        assert_eq!(apply_structural_genome(&mut op, &config.base_matrix, &[edit]), 1);
        assert_eq!(op.matrix()[0][5], 9);

        let applied =
            apply_structural_genome(&mut op, &config.base_matrix, &[Variation::NOOP; 3]);
        assert_eq!(applied, 0);
        assert_eq!(op.matrix(), &config.base_matrix);

        // Removing an edge that is not there does not count as applied.
        assert_eq!(config.base_matrix[0][3], 0);
        let missing = Variation {
            kind: EditKind::RemoveEdge,
            from: 0,
            to: 3,
            op: 0,
        };
        assert_eq!(apply_structural_genome(&mut op, &config.base_matrix, &[missing]), 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip_on_grid(
            raw in prop::collection::vec((0u32..1 << 8, 0u32..1 << 6), 1..6)
        ) {
            let params: Vec<f32> = raw
                .iter()
                .map(|&(int, frac)| int as f32 + frac as f32 / 64.0)
                .collect();
            let gray = parameters_to_gray(&params, 8, 6);
            prop_assert_eq!(gray.len(), params.len() * 14);
            prop_assert_eq!(gray_to_parameters(&gray, 8, 6, params.len()), params);
        }

        #[test]
        fn prop_adjacent_integers_differ_by_one_bit(n in 0u32..(1 << 10) - 1) {
            let a = parameters_to_gray(&[n as f32], 10, 0);
            let b = parameters_to_gray(&[(n + 1) as f32], 10, 0);
            let differing = a.iter().zip(&b).filter(|(x, y)| x != y).count();
            prop_assert_eq!(differing, 1);
        }

        #[test]
        fn prop_gray_decodes_to_binary(block in prop::collection::vec(any::<bool>(), 1..24)) {
            let gray = binary_to_gray(&block);
            prop_assert_eq!(gray_to_binary(&gray, block.len()), block);
        }
    }
}
