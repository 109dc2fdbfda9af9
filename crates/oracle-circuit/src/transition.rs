//! bitmask state transitions
//!
//! a transition is a public (start, end) pair bracketing private middle
//! states. times must never decrease, and a bit set in any status word
//! must stay set in every later state:
//!
//!   word[i] & word[i+1] == word[i]
//!
//! `StateTransition` carries one field element per status,
//! `BigStateTransition` a vector of `data_size` words.

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::constraint::{CircuitBuilder, Var};
use crate::error::Result;
use crate::field::Felt;
use crate::gadgets::{assert_less_or_equal_if, gated};
use crate::input::{flat, nested, Visibility};
use crate::params::CircuitParams;
use crate::registry::CircuitKind;

/// start, middle.., end
pub(crate) fn chain<T: Clone>(start: &T, middle: &[T], end: &T) -> Vec<T> {
    let mut seq = Vec::with_capacity(middle.len() + 2);
    seq.push(start.clone());
    seq.extend_from_slice(middle);
    seq.push(end.clone());
    seq
}

/// times never decrease along the sequence
pub fn assert_time_order(b: &mut CircuitBuilder, enable: Var, times: &[Var], bits: usize) {
    for pair in times.windows(2) {
        assert_less_or_equal_if(b, enable, pair[0], pair[1], bits);
    }
}

/// every state is a bitwise subset of its successor, word by word
pub fn assert_bit_closure(b: &mut CircuitBuilder, enable: Var, states: &[Vec<Var>], bits: usize) {
    let decomposed: Vec<Vec<Vec<Var>>> = states
        .iter()
        .map(|words| {
            words
                .iter()
                .map(|w| {
                    let w = gated(b, enable, *w);
                    b.to_binary(w, bits)
                })
                .collect()
        })
        .collect();

    for pair in decomposed.windows(2) {
        for (before, after) in pair[0].iter().zip(&pair[1]) {
            for (x, y) in before.iter().zip(after) {
                let both = b.and(*x, *y);
                b.assert_equal(both, *x);
            }
        }
    }
}

/// time order plus bit closure over one transition
pub fn validate_transition(
    b: &mut CircuitBuilder,
    enable: Var,
    times: &[Var],
    states: &[Vec<Var>],
    status_bits: usize,
    time_bits: usize,
) {
    debug_assert_eq!(times.len(), states.len());
    assert_time_order(b, enable, times, time_bits);
    assert_bit_closure(b, enable, states, status_bits);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransitionInput {
    #[serde(default)]
    pub middle_times: Vec<Felt>,
    #[serde(default)]
    pub middle_statuses: Vec<Felt>,
    pub transition_time: Vec<Felt>,
    pub transition_status: Vec<Felt>,
}

/// single-word bitmask transition
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub params: CircuitParams,
    pub input: Option<StateTransitionInput>,
}

impl Circuit for StateTransition {
    const KIND: CircuitKind = CircuitKind::StateTransition;
    type Input = StateTransitionInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        let p = &self.params;
        let m = p.num_middle();
        let input = self.input.as_ref();

        let transition_time = flat(
            "transitionTime",
            input.map(|i| i.transition_time.as_slice()),
            2,
            Visibility::Public,
        )?;
        let transition_status = flat(
            "transitionStatus",
            input.map(|i| i.transition_status.as_slice()),
            2,
            Visibility::Public,
        )?;
        let middle_times = flat(
            "middleTimes",
            input.map(|i| i.middle_times.as_slice()),
            m,
            Visibility::Private,
        )?;
        let middle_statuses = flat(
            "middleStatuses",
            input.map(|i| i.middle_statuses.as_slice()),
            m,
            Visibility::Private,
        )?;

        let time = b.public_vec("transitionTime", &transition_time);
        let status = b.public_vec("transitionStatus", &transition_status);
        let middle_times = b.private_vec(&middle_times);
        let middle_statuses: Vec<Vec<Var>> = b
            .private_vec(&middle_statuses)
            .into_iter()
            .map(|s| vec![s])
            .collect();

        let times = chain(&time[0], &middle_times, &time[1]);
        let states = chain(&vec![status[0]], &middle_statuses, &vec![status[1]]);

        let one = b.one();
        validate_transition(b, one, &times, &states, p.scalar_status_bits, p.time_bits);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigStateTransitionInput {
    #[serde(default)]
    pub middle_times: Vec<Felt>,
    #[serde(default)]
    pub middle_statuses: Vec<Vec<Felt>>,
    pub transition_time: Vec<Felt>,
    pub transition_status: Vec<Vec<Felt>>,
}

/// wide bitmask transition split over `data_size` words
#[derive(Debug, Clone)]
pub struct BigStateTransition {
    pub params: CircuitParams,
    pub input: Option<BigStateTransitionInput>,
}

impl Circuit for BigStateTransition {
    const KIND: CircuitKind = CircuitKind::BigStateTransition;
    type Input = BigStateTransitionInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        let p = &self.params;
        let (m, d) = (p.num_middle(), p.data_size);
        let input = self.input.as_ref();

        let transition_time = flat(
            "transitionTime",
            input.map(|i| i.transition_time.as_slice()),
            2,
            Visibility::Public,
        )?;
        let transition_status = nested(
            "transitionStatus",
            input.map(|i| i.transition_status.as_slice()),
            2,
            d,
            Visibility::Public,
        )?;
        let middle_times = flat(
            "middleTimes",
            input.map(|i| i.middle_times.as_slice()),
            m,
            Visibility::Private,
        )?;
        let middle_statuses = nested(
            "middleStatuses",
            input.map(|i| i.middle_statuses.as_slice()),
            m,
            d,
            Visibility::Private,
        )?;

        let time = b.public_vec("transitionTime", &transition_time);
        let status: Vec<Vec<Var>> = transition_status
            .iter()
            .enumerate()
            .map(|(i, words)| b.public_vec(&format!("transitionStatus[{}]", i), words))
            .collect();
        let middle_times = b.private_vec(&middle_times);
        let middle_statuses: Vec<Vec<Var>> =
            middle_statuses.iter().map(|words| b.private_vec(words)).collect();

        let times = chain(&time[0], &middle_times, &time[1]);
        let states = chain(&status[0], &middle_statuses, &status[1]);

        let one = b.one();
        validate_transition(b, one, &times, &states, p.word_bits, p.time_bits);
        Ok(())
    }
}
