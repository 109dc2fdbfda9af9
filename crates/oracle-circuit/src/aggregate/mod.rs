//! byzantine quorum aggregation over oracle reports
//!
//! every aggregation runs the same protocol:
//!
//! 1. the claimed final transition is validated unconditionally
//! 2. report i is validated under bit i of the public `indicator`; a
//!    report flagged invalid has all of its checks multiplied by zero
//! 3. at every position of the final transition, the reports carrying an
//!    identical value are counted and `f + 1 <= count` is asserted
//!
//! a rejected aggregation is an unsatisfiable constraint system, never a
//! returned status.

mod bsl;
mod cbsl;
mod mt;

pub use bsl::{AggBSLStateReport, AggBSLStateReportInput};
pub use cbsl::{AggCBSLStateReport, AggCBSLStateReportInput};
pub use mt::{AggMTStateReport, AggMTStateReportInput};

use pasta_curves::group::ff::Field;

use crate::constraint::{CircuitBuilder, Var};
use crate::field::Fp;
use crate::gadgets::{all, equals};

/// validity flags, one per oracle, from the public indicator
pub fn indicator_bits(b: &mut CircuitBuilder, indicator: Var, num_oracles: usize) -> Vec<Var> {
    b.to_binary(indicator, num_oracles)
}

/// 1 iff every pair holds equal values
pub fn agreement(b: &mut CircuitBuilder, pairs: &[(Var, Var)]) -> Var {
    let flags: Vec<Var> = pairs.iter().map(|(x, y)| equals(b, *x, *y)).collect();
    all(b, &flags)
}

/// f + 1 <= sum(votes)
///
/// `f` is range-checked to `bits` bits first, so `f + 1` cannot wrap
/// around the modulus to a zero threshold.
pub fn assert_quorum(b: &mut CircuitBuilder, f: Var, votes: &[Var], bits: usize) {
    b.to_binary(f, bits);
    let required = b.add_constant(f, Fp::ONE);
    let count = b.sum(votes);
    b.assert_less_or_equal(required, count, bits);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(v: u64) -> Option<Fp> {
        Some(Fp::from(v))
    }

    fn quorum_holds(f: u64, votes: &[u64]) -> bool {
        quorum_holds_at(Fp::from(f), votes)
    }

    fn quorum_holds_at(f: Fp, votes: &[u64]) -> bool {
        let mut b = CircuitBuilder::new();
        let f = b.public("f", Some(f));
        let votes: Vec<Var> = votes.iter().map(|v| b.private(known(*v))).collect();
        assert_quorum(&mut b, f, &votes, 8);
        let (cs, w) = b.build();
        cs.check(&w).is_ok()
    }

    #[test]
    fn test_quorum_threshold() {
        assert!(quorum_holds(1, &[1, 1, 0, 0]));
        assert!(quorum_holds(0, &[0, 0, 1, 0]));
        assert!(!quorum_holds(1, &[1, 0, 0, 0]));
        assert!(!quorum_holds(4, &[1, 1, 1, 1]));
    }

    #[test]
    fn test_wrapping_fault_bound_rejected() {
        // f = p - 1 makes f + 1 zero in the field
        assert!(!quorum_holds_at(-Fp::ONE, &[0, 0, 0, 0]));
        assert!(!quorum_holds_at(-Fp::ONE, &[1, 1, 1, 1]));
        // f = 2^8 - 1 fits, f + 1 does not
        assert!(!quorum_holds(255, &[1, 1, 1, 1]));
        assert!(!quorum_holds(256, &[1, 1, 1, 1]));
    }

    #[test]
    fn test_agreement_needs_every_pair() {
        let mut b = CircuitBuilder::new();
        let v: Vec<Var> = [3u64, 3, 9, 9, 9, 8].iter().map(|x| b.private(known(*x))).collect();
        let agree = agreement(&mut b, &[(v[0], v[1]), (v[2], v[3])]);
        let differ = agreement(&mut b, &[(v[0], v[1]), (v[4], v[5])]);
        assert_eq!(b.value(agree), known(1));
        assert_eq!(b.value(differ), known(0));
    }

    #[test]
    fn test_indicator_bits() {
        let mut b = CircuitBuilder::new();
        let ind = b.public("indicator", known(0b1010));
        let bits = indicator_bits(&mut b, ind, 4);
        let values: Vec<_> = bits.iter().map(|v| b.value(*v)).collect();
        assert_eq!(values, vec![known(0), known(1), known(0), known(1)]);

        // wider than the oracle count
        let mut b = CircuitBuilder::new();
        let ind = b.public("indicator", known(0b10000));
        indicator_bits(&mut b, ind, 4);
        let (cs, w) = b.build();
        assert!(cs.check(&w).is_err());
    }
}
