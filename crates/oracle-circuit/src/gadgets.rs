//! primitive predicates shared by every transition circuit
//!
//! predicates return boolean wires instead of asserting, so callers can
//! combine them (vote counting) or assert them (validation). the `enable`
//! argument of the assertion helpers multiplies every checked value, so a
//! zero flag turns the whole check into `0 <= 0` / `0 == 0`.

use pasta_curves::group::ff::Field;

use crate::constraint::{CircuitBuilder, Var};
use crate::field::Fp;
use crate::params::CircuitParams;

/// 1 iff x == y
pub fn equals(b: &mut CircuitBuilder, x: Var, y: Var) -> Var {
    let diff = b.sub(x, y);
    b.is_zero(diff)
}

/// conjunction of boolean flags
pub fn all(b: &mut CircuitBuilder, flags: &[Var]) -> Var {
    let Some((first, rest)) = flags.split_first() else {
        return b.one();
    };
    rest.iter().fold(*first, |acc, f| b.and(acc, *f))
}

/// enable * x
pub fn gated(b: &mut CircuitBuilder, enable: Var, x: Var) -> Var {
    b.mul(enable, x)
}

/// number of set bits
pub fn set_bit_count(b: &mut CircuitBuilder, bits: &[Var]) -> Var {
    b.sum(bits)
}

/// number of positions where the two bit vectors differ
pub fn bit_difference_count(b: &mut CircuitBuilder, x_bits: &[Var], y_bits: &[Var]) -> Var {
    assert_eq!(x_bits.len(), y_bits.len(), "bit vectors must have equal length");
    let diffs: Vec<Var> = x_bits
        .iter()
        .zip(y_bits)
        .map(|(x, y)| b.xor(*x, *y))
        .collect();
    b.sum(&diffs)
}

/// 1 iff x > 0 and x & (x - 1) == 0
///
/// # range
///
/// `x` must lie in `[0, 2^bits)`. the flag is only defined on that range:
/// a wider `x` fails its bit decomposition, so the constraint system is
/// unsatisfiable rather than yielding 0. size `bits` to the widest value
/// the caller can pass.
pub fn has_exactly_one_bit(b: &mut CircuitBuilder, x: Var, bits: usize) -> Var {
    let zero = b.is_zero(x);
    let nonzero = b.not(zero);
    // x - 1 only when x > 0, so the predecessor stays in range
    let pred = b.add_constant(x, -Fp::ONE);
    let pred = b.mul(nonzero, pred);

    let x_bits = b.to_binary(x, bits);
    let pred_bits = b.to_binary(pred, bits);
    let anded: Vec<Var> = x_bits
        .iter()
        .zip(&pred_bits)
        .map(|(x, p)| b.and(*x, *p))
        .collect();
    let masked = b.from_binary(&anded);
    let power_of_two = b.is_zero(masked);
    b.and(nonzero, power_of_two)
}

/// x <= y whenever enable is set
pub fn assert_less_or_equal_if(
    b: &mut CircuitBuilder,
    enable: Var,
    x: Var,
    y: Var,
    bits: usize,
) {
    let x = gated(b, enable, x);
    let y = gated(b, enable, y);
    b.assert_less_or_equal(x, y, bits);
}

/// x == y whenever enable is set
pub fn assert_equal_if(b: &mut CircuitBuilder, enable: Var, x: Var, y: Var) {
    let diff = b.sub(x, y);
    let diff = gated(b, enable, diff);
    b.assert_zero(diff);
}

/// validate a sequence of change records against the previous state time
///
/// each step must be strictly later than the one before it, carry an index
/// below `data_size`, and a change mask with exactly one bit set. returns
/// the validity flag the checks were enforced under.
pub fn is_valid_time_and_changes(
    b: &mut CircuitBuilder,
    enable: Var,
    previous_time: Var,
    times: &[Var],
    indexes: &[Var],
    changes: &[Var],
    params: &CircuitParams,
) -> Var {
    let max_index = b.constant(Fp::from((params.data_size - 1) as u64));

    let mut prev = previous_time;
    for (time, index) in times.iter().zip(indexes) {
        let bound = b.add_constant(*time, -Fp::ONE);
        assert_less_or_equal_if(b, enable, prev, bound, params.time_bits);
        prev = *time;

        assert_less_or_equal_if(b, enable, *index, max_index, params.time_bits);
    }

    for change in changes {
        let change = gated(b, enable, *change);
        let bits = b.to_binary(change, params.word_bits);
        let count = set_bit_count(b, &bits);
        b.assert_equal(count, enable);
    }

    enable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(v: u64) -> Option<Fp> {
        Some(Fp::from(v))
    }

    fn small_params() -> CircuitParams {
        CircuitParams {
            num_statuses: 3,
            data_size: 4,
            word_bits: 8,
            time_bits: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_equals() {
        let mut b = CircuitBuilder::new();
        let x = b.private(known(5));
        let y = b.private(known(5));
        let z = b.private(known(6));
        let same = equals(&mut b, x, y);
        let differ = equals(&mut b, x, z);
        assert_eq!(b.value(same), known(1));
        assert_eq!(b.value(differ), known(0));
        let (cs, w) = b.build();
        assert!(cs.check(&w).is_ok());
    }

    #[test]
    fn test_has_exactly_one_bit() {
        for v in 0u64..=64 {
            let mut b = CircuitBuilder::new();
            let x = b.private(known(v));
            let flag = has_exactly_one_bit(&mut b, x, 8);
            let expected = (v.count_ones() == 1) as u64;
            assert_eq!(b.value(flag), known(expected), "value {}", v);
            let (cs, w) = b.build();
            assert!(cs.check(&w).is_ok(), "value {}", v);
        }
    }

    #[test]
    fn test_has_exactly_one_bit_outside_range_is_unsatisfiable() {
        for v in [256u64, 512, 300] {
            let mut b = CircuitBuilder::new();
            let x = b.private(known(v));
            has_exactly_one_bit(&mut b, x, 8);
            let (cs, w) = b.build();
            assert!(cs.check(&w).is_err(), "value {}", v);
        }
        // the same values are classified once the width covers them
        let mut b = CircuitBuilder::new();
        let x = b.private(known(256));
        let flag = has_exactly_one_bit(&mut b, x, 9);
        assert_eq!(b.value(flag), known(1));
        let (cs, w) = b.build();
        assert!(cs.check(&w).is_ok());
    }

    #[test]
    fn test_bit_counts() {
        let mut b = CircuitBuilder::new();
        let x = b.private(known(0b1011));
        let y = b.private(known(0b0110));
        let xb = b.to_binary(x, 4);
        let yb = b.to_binary(y, 4);
        let set = set_bit_count(&mut b, &xb);
        let diff = bit_difference_count(&mut b, &xb, &yb);
        assert_eq!(b.value(set), known(3));
        assert_eq!(b.value(diff), known(3));
        let (cs, w) = b.build();
        assert!(cs.check(&w).is_ok());
    }

    #[test]
    fn test_all() {
        let mut b = CircuitBuilder::new();
        let flags: Vec<Var> = [1u64, 1, 0].iter().map(|v| b.private(known(*v))).collect();
        let none = all(&mut b, &flags);
        let both = all(&mut b, &flags[..2]);
        let empty = all(&mut b, &[]);
        assert_eq!(b.value(none), known(0));
        assert_eq!(b.value(both), known(1));
        assert_eq!(b.value(empty), known(1));
    }

    fn run_changes(enable: u64, previous: u64, records: &[(u64, u64, u64)]) -> bool {
        let params = small_params();
        let mut b = CircuitBuilder::new();
        let enable = b.private(known(enable));
        let previous = b.private(known(previous));
        let times: Vec<Var> = records.iter().map(|r| b.private(known(r.0))).collect();
        let indexes: Vec<Var> = records.iter().map(|r| b.private(known(r.1))).collect();
        let changes: Vec<Var> = records.iter().map(|r| b.private(known(r.2))).collect();
        let flag = is_valid_time_and_changes(&mut b, enable, previous, &times, &indexes, &changes, &params);
        assert_eq!(flag, enable);
        let (cs, w) = b.build();
        cs.check(&w).is_ok()
    }

    #[test]
    fn test_valid_change_records() {
        assert!(run_changes(1, 10, &[(11, 0, 1), (12, 3, 0x80), (20, 2, 4)]));
    }

    #[test]
    fn test_change_records_need_strictly_increasing_times() {
        assert!(!run_changes(1, 10, &[(10, 0, 1), (12, 3, 2), (20, 2, 4)]));
        assert!(!run_changes(1, 10, &[(11, 0, 1), (11, 3, 2), (20, 2, 4)]));
        assert!(!run_changes(1, 0, &[(0, 0, 1), (1, 0, 1), (2, 0, 1)]));
    }

    #[test]
    fn test_change_records_bound_index() {
        assert!(!run_changes(1, 10, &[(11, 4, 1), (12, 3, 2), (20, 2, 4)]));
    }

    #[test]
    fn test_change_records_need_one_hot_masks() {
        assert!(!run_changes(1, 10, &[(11, 0, 0), (12, 3, 2), (20, 2, 4)]));
        assert!(!run_changes(1, 10, &[(11, 0, 3), (12, 3, 2), (20, 2, 4)]));
        // wider than word_bits
        assert!(!run_changes(1, 10, &[(11, 0, 256), (12, 3, 2), (20, 2, 4)]));
    }

    #[test]
    fn test_disabled_checks_accept_anything() {
        assert!(run_changes(0, 50, &[(3, 9, 0), (1, 7, 3), (0, 100, 12345)]));
    }
}
