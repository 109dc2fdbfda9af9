//! additive merkle state transitions
//!
//! the root of a leaf set is folded pairwise with field addition up a
//! balanced tree of `height` levels. a transition is a sequence of
//! (time, root, leaves) steps where every root matches its leaves, times
//! never decrease, and a leaf may only go from zero to a value, never
//! change once set.

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::constraint::{CircuitBuilder, Var};
use crate::error::Result;
use crate::field::{Felt, Fp};
use crate::gadgets::assert_equal_if;
use crate::input::{flat, nested, Visibility};
use crate::params::CircuitParams;
use crate::registry::CircuitKind;
use crate::transition::assert_time_order;

/// in-circuit root of a power-of-two leaf set
pub fn merkle_root(b: &mut CircuitBuilder, leaves: &[Var]) -> Var {
    debug_assert!(leaves.len().is_power_of_two());
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level.chunks(2).map(|pair| b.add(pair[0], pair[1])).collect();
    }
    level[0]
}

/// native counterpart of [`merkle_root`], for building witnesses
pub fn native_merkle_root(leaves: &[Fp]) -> Fp {
    debug_assert!(leaves.len().is_power_of_two());
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level.chunks(2).map(|pair| pair[0] + pair[1]).collect();
    }
    level[0]
}

/// root == merkle_root(leaves) whenever enable is set
pub fn assert_root(b: &mut CircuitBuilder, enable: Var, root: Var, leaves: &[Var]) {
    let computed = merkle_root(b, leaves);
    assert_equal_if(b, enable, computed, root);
}

/// every leaf set in `before` keeps its value in `after`
pub fn assert_append_only(b: &mut CircuitBuilder, enable: Var, before: &[Var], after: &[Var]) {
    for (old, new) in before.iter().zip(after) {
        let empty = b.is_zero(*old);
        let expected = b.select(empty, *new, *old);
        assert_equal_if(b, enable, expected, *new);
    }
}

/// time order, root consistency and append-only leaves across the steps
pub fn validate_merkle_transition(
    b: &mut CircuitBuilder,
    enable: Var,
    times: &[Var],
    roots: &[Var],
    leaves: &[Vec<Var>],
    time_bits: usize,
) {
    debug_assert_eq!(times.len(), roots.len());
    debug_assert_eq!(roots.len(), leaves.len());

    assert_time_order(b, enable, times, time_bits);
    for (root, set) in roots.iter().zip(leaves) {
        assert_root(b, enable, *root, set);
    }
    for pair in leaves.windows(2) {
        assert_append_only(b, enable, &pair[0], &pair[1]);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MTStateTransitionInput {
    pub transition_time: Vec<Felt>,
    pub transition_status: Vec<Felt>,
    #[serde(default)]
    pub transition_leaves: Vec<Vec<Felt>>,
}

fn define_steps(
    b: &mut CircuitBuilder,
    params: &CircuitParams,
    input: Option<&MTStateTransitionInput>,
    steps: usize,
) -> Result<()> {
    let time = flat(
        "transitionTime",
        input.map(|i| i.transition_time.as_slice()),
        steps,
        Visibility::Public,
    )?;
    let status = flat(
        "transitionStatus",
        input.map(|i| i.transition_status.as_slice()),
        steps,
        Visibility::Public,
    )?;
    let leaves = nested(
        "transitionLeaves",
        input.map(|i| i.transition_leaves.as_slice()),
        steps,
        params.num_leaves(),
        Visibility::Private,
    )?;

    let time = b.public_vec("transitionTime", &time);
    let status = b.public_vec("transitionStatus", &status);
    let leaves: Vec<Vec<Var>> = leaves.iter().map(|set| b.private_vec(set)).collect();

    let one = b.one();
    validate_merkle_transition(b, one, &time, &status, &leaves, params.time_bits);
    Ok(())
}

/// `num_statuses + 1` merkle steps
#[derive(Debug, Clone)]
pub struct MTStateTransition {
    pub params: CircuitParams,
    pub input: Option<MTStateTransitionInput>,
}

impl Circuit for MTStateTransition {
    const KIND: CircuitKind = CircuitKind::MTStateTransition;
    type Input = MTStateTransitionInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        define_steps(b, &self.params, self.input.as_ref(), self.params.num_mt_statuses())
    }
}

/// a single merkle step, before and after
#[derive(Debug, Clone)]
pub struct SingleMTStateTransition {
    pub params: CircuitParams,
    pub input: Option<MTStateTransitionInput>,
}

impl Circuit for SingleMTStateTransition {
    const KIND: CircuitKind = CircuitKind::SingleMTStateTransition;
    type Input = MTStateTransitionInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        define_steps(b, &self.params, self.input.as_ref(), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::compile;
    use pasta_curves::group::ff::Field;

    fn params() -> CircuitParams {
        CircuitParams {
            num_statuses: 2,
            height: 3,
            time_bits: 16,
            ..Default::default()
        }
    }

    fn leaf_sets(sets: &[[u64; 8]]) -> Vec<Vec<Fp>> {
        sets.iter()
            .map(|s| s.iter().map(|v| Fp::from(*v)).collect())
            .collect()
    }

    fn single(times: [u64; 2], sets: &[[u64; 8]]) -> SingleMTStateTransition {
        let sets = leaf_sets(sets);
        SingleMTStateTransition::new(
            params(),
            Some(MTStateTransitionInput {
                transition_time: times.iter().map(|t| Felt::from(*t)).collect(),
                transition_status: sets.iter().map(|s| Felt(native_merkle_root(s))).collect(),
                transition_leaves: sets
                    .iter()
                    .map(|s| s.iter().map(|v| Felt(*v)).collect())
                    .collect(),
            }),
        )
    }

    fn satisfied<C: Circuit>(circuit: &C) -> bool {
        compile(circuit).unwrap().check().is_ok()
    }

    #[test]
    fn test_single_leaf_root_at_any_height() {
        for height in 0..8 {
            let mut leaves = vec![Fp::ZERO; 1 << height];
            leaves[0] = Fp::from(5u64);
            assert_eq!(native_merkle_root(&leaves), Fp::from(5u64));

            let mut b = CircuitBuilder::new();
            let vars = b.private_vec(&leaves.iter().copied().map(Some).collect::<Vec<_>>());
            let root = merkle_root(&mut b, &vars);
            assert_eq!(b.value(root), Some(Fp::from(5u64)));
        }
    }

    #[test]
    fn test_filling_empty_leaves() {
        assert!(satisfied(&single(
            [1, 2],
            &[[5, 0, 0, 0, 0, 0, 0, 0], [5, 7, 0, 0, 0, 0, 0, 9]],
        )));
        // unchanged sets are a valid step
        assert!(satisfied(&single(
            [3, 3],
            &[[5, 0, 0, 0, 0, 0, 0, 0], [5, 0, 0, 0, 0, 0, 0, 0]],
        )));
    }

    #[test]
    fn test_overwriting_leaf_fails() {
        assert!(!satisfied(&single(
            [1, 2],
            &[[5, 0, 0, 0, 0, 0, 0, 0], [6, 0, 0, 0, 0, 0, 0, 0]],
        )));
        // clearing a leaf back to zero is an overwrite too
        assert!(!satisfied(&single(
            [1, 2],
            &[[5, 1, 0, 0, 0, 0, 0, 0], [5, 0, 0, 0, 0, 0, 0, 0]],
        )));
    }

    #[test]
    fn test_root_mismatch_fails() {
        let mut circuit = single([1, 2], &[[5, 0, 0, 0, 0, 0, 0, 0], [5, 7, 0, 0, 0, 0, 0, 0]]);
        if let Some(input) = circuit.input.as_mut() {
            input.transition_status[1] = Felt::from(13u64);
        }
        assert!(!satisfied(&circuit));
    }

    #[test]
    fn test_time_decrease_fails() {
        assert!(!satisfied(&single(
            [4, 2],
            &[[5, 0, 0, 0, 0, 0, 0, 0], [5, 7, 0, 0, 0, 0, 0, 0]],
        )));
    }

    #[test]
    fn test_full_transition_steps() {
        let sets = leaf_sets(&[
            [1, 0, 0, 0, 0, 0, 0, 0],
            [1, 2, 0, 0, 0, 0, 0, 0],
            [1, 2, 0, 0, 3, 0, 0, 0],
        ]);
        let circuit = MTStateTransition::new(
            params(),
            Some(MTStateTransitionInput {
                transition_time: vec![Felt::from(1u64), Felt::from(4u64), Felt::from(4u64)],
                transition_status: sets.iter().map(|s| Felt(native_merkle_root(s))).collect(),
                transition_leaves: sets
                    .iter()
                    .map(|s| s.iter().map(|v| Felt(*v)).collect())
                    .collect(),
            }),
        );
        let compiled = compile(&circuit).unwrap();
        assert_eq!(compiled.cs.num_public(), 6);
        assert!(compiled.check().is_ok());
    }

    #[test]
    fn test_public_only_record() {
        let mut circuit = single([1, 2], &[[5, 0, 0, 0, 0, 0, 0, 0], [5, 7, 0, 0, 0, 0, 0, 0]]);
        if let Some(input) = circuit.input.as_mut() {
            input.transition_leaves.clear();
        }
        let compiled = compile(&circuit).unwrap();
        assert!(!compiled.witness.is_complete());
        let public = compiled.public_inputs().unwrap();
        assert_eq!(&public[..2], &[Fp::from(1u64), Fp::from(2u64)]);
    }
}
