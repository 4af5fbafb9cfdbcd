//! Unary and binary operation tables for network operators.
//!
//! Codes are 1-based; code 0 means "no operation" and never resolves.
//! Binary codes 1..=4 (sum, product, max, min) have identities 0, 1,
//! `-INFINITY` and `INFINITY`, which is why the diagonal markers 2, 3 and 4
//! seed a node with 1, `-INFINITY` and `INFINITY` respectively.

/// Finite stand-in for infinity. Saturating operations clamp to this.
pub const INFINITY: f32 = 1e8;

/// Threshold below which a value is treated as zero.
pub const EPSILON: f32 = 1e-8;

/// Unary operation applied along an edge.
pub type UnaryOp = fn(f32) -> f32;

/// Binary operation combining incoming values at a node.
pub type BinaryOp = fn(f32, f32) -> f32;

/// Immutable lookup from operation code to function.
#[derive(Clone)]
pub struct OperationTable {
    unary: Vec<UnaryOp>,
    binary: Vec<BinaryOp>,
}

impl std::fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTable")
            .field("unary", &self.unary.len())
            .field("binary", &self.binary.len())
            .finish()
    }
}

impl Default for OperationTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl OperationTable {
    /// Build a table from explicit function lists (index 0 is code 1).
    pub fn new(unary: Vec<UnaryOp>, binary: Vec<BinaryOp>) -> Self {
        Self { unary, binary }
    }

    /// The standard set of 28 unary and 8 binary operations.
    pub fn standard() -> Self {
        let unary: Vec<UnaryOp> = vec![
            identity,
            square,
            negate,
            signed_sqrt,
            reciprocal,
            exp,
            log_abs,
            bipolar_sigmoid,
            step,
            sign,
            f32::cos,
            f32::sin,
            f32::atan,
            cube,
            f32::cbrt,
            saturate,
            signed_log1p,
            signed_expm1,
            signed_exp_decay,
            half,
            double,
            exp_decay,
            cubic_bump,
            sigmoid,
            heaviside,
            dead_zone,
            circular_ramp,
            gaussian_gate,
        ];
        let binary: Vec<BinaryOp> = vec![
            add,
            multiply,
            f32::max,
            f32::min,
            probabilistic_or,
            signed_hypot,
            signed_abs_sum,
            signed_abs_max,
        ];
        Self { unary, binary }
    }

    /// Number of unary codes (valid codes are `1..=num_unary()`).
    #[inline]
    pub fn num_unary(&self) -> usize {
        self.unary.len()
    }

    /// Number of binary codes (valid codes are `1..=num_binary()`).
    #[inline]
    pub fn num_binary(&self) -> usize {
        self.binary.len()
    }

    /// Resolve a unary code.
    #[inline]
    pub fn unary(&self, code: u8) -> Option<UnaryOp> {
        (code as usize)
            .checked_sub(1)
            .and_then(|i| self.unary.get(i).copied())
    }

    /// Resolve a binary code.
    #[inline]
    pub fn binary(&self, code: u8) -> Option<BinaryOp> {
        (code as usize)
            .checked_sub(1)
            .and_then(|i| self.binary.get(i).copied())
    }
}

/// Initial node value for a diagonal marker.
#[inline]
pub fn diagonal_seed(marker: u8) -> f32 {
    match marker {
        2 => 1.0,
        3 => -INFINITY,
        4 => INFINITY,
        _ => 0.0,
    }
}

#[inline]
fn clamp_inf(z: f32) -> f32 {
    z.clamp(-INFINITY, INFINITY)
}

#[inline]
fn signum0(z: f32) -> f32 {
    if z > 0.0 {
        1.0
    } else if z < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn identity(z: f32) -> f32 {
    z
}

fn square(z: f32) -> f32 {
    clamp_inf(z * z)
}

fn negate(z: f32) -> f32 {
    -z
}

fn signed_sqrt(z: f32) -> f32 {
    signum0(z) * z.abs().sqrt()
}

fn reciprocal(z: f32) -> f32 {
    if z.abs() < EPSILON {
        if z < 0.0 { -INFINITY } else { INFINITY }
    } else {
        clamp_inf(1.0 / z)
    }
}

fn exp(z: f32) -> f32 {
    clamp_inf(z.exp())
}

fn log_abs(z: f32) -> f32 {
    if z.abs() < EPSILON {
        EPSILON.ln()
    } else {
        z.abs().ln()
    }
}

fn bipolar_sigmoid(z: f32) -> f32 {
    (z / 2.0).tanh()
}

fn step(z: f32) -> f32 {
    if z >= 0.0 { 1.0 } else { 0.0 }
}

fn sign(z: f32) -> f32 {
    signum0(z)
}

fn cube(z: f32) -> f32 {
    clamp_inf(z * z * z)
}

fn saturate(z: f32) -> f32 {
    if z.abs() < 1.0 { z } else { signum0(z) }
}

fn signed_log1p(z: f32) -> f32 {
    signum0(z) * z.abs().ln_1p()
}

fn signed_expm1(z: f32) -> f32 {
    clamp_inf(signum0(z) * z.abs().exp_m1())
}

fn signed_exp_decay(z: f32) -> f32 {
    signum0(z) * (-z.abs()).exp()
}

fn half(z: f32) -> f32 {
    z / 2.0
}

fn double(z: f32) -> f32 {
    clamp_inf(2.0 * z)
}

fn exp_decay(z: f32) -> f32 {
    (-z.abs()).exp()
}

fn cubic_bump(z: f32) -> f32 {
    clamp_inf(z - z * z * z)
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

fn heaviside(z: f32) -> f32 {
    if z > 0.0 { 1.0 } else { 0.0 }
}

fn dead_zone(z: f32) -> f32 {
    if z.abs() < EPSILON { 0.0 } else { signum0(z) }
}

fn circular_ramp(z: f32) -> f32 {
    if z.abs() < 1.0 {
        signum0(z) * (1.0 - (1.0 - z * z).sqrt())
    } else {
        signum0(z)
    }
}

fn gaussian_gate(z: f32) -> f32 {
    z * (1.0 - (-z * z).exp())
}

fn add(a: f32, b: f32) -> f32 {
    clamp_inf(a + b)
}

fn multiply(a: f32, b: f32) -> f32 {
    clamp_inf(a * b)
}

fn probabilistic_or(a: f32, b: f32) -> f32 {
    clamp_inf(a + b - a * b)
}

fn signed_hypot(a: f32, b: f32) -> f32 {
    clamp_inf(signum0(a + b) * a.hypot(b))
}

fn signed_abs_sum(a: f32, b: f32) -> f32 {
    clamp_inf(signum0(a + b) * (a.abs() + b.abs()))
}

fn signed_abs_max(a: f32, b: f32) -> f32 {
    signum0(a + b) * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_sizes() {
        let table = OperationTable::standard();
        assert_eq!(table.num_unary(), 28);
        assert_eq!(table.num_binary(), 8);
    }

    #[test]
    fn test_zero_and_unknown_codes_do_not_resolve() {
        let table = OperationTable::standard();
        assert!(table.unary(0).is_none());
        assert!(table.binary(0).is_none());
        assert!(table.unary(29).is_none());
        assert!(table.binary(9).is_none());
    }

    #[test]
    fn test_binary_identities_match_diagonal_seeds() {
        let table = OperationTable::standard();
        for code in 1..=4u8 {
            let op = table.binary(code).unwrap();
            let seed = diagonal_seed(code);
            for x in [-3.5f32, 0.0, 0.25, 7.0] {
                assert_eq!(op(seed, x), x, "code {code} with {x}");
            }
        }
    }

    #[test]
    fn test_saturating_ops_stay_finite() {
        let table = OperationTable::standard();
        for code in 1..=28u8 {
            let op = table.unary(code).unwrap();
            for x in [-1e6f32, -1.0, 0.0, 1e-12, 1.0, 1e6] {
                assert!(op(x).is_finite(), "unary {code} at {x} = {}", op(x));
            }
        }
    }

    #[test]
    fn test_selected_values() {
        let table = OperationTable::standard();
        assert_eq!(table.unary(1).unwrap()(2.5), 2.5);
        assert_eq!(table.unary(3).unwrap()(2.5), -2.5);
        assert!((table.unary(4).unwrap()(-9.0) + 3.0).abs() < 1e-6);
        assert_eq!(table.unary(5).unwrap()(0.0), INFINITY);
        assert_eq!(table.binary(2).unwrap()(3.0, -2.0), -6.0);
        assert_eq!(table.binary(8).unwrap()(-4.0, 1.0), -4.0);
    }
}
