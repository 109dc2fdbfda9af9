//! quorum over merkle transition reports
//!
//! votes compare (time, root) per step. leaf sets are witness detail and
//! are not part of the agreed value.

use serde::{Deserialize, Serialize};

use super::{agreement, assert_quorum, indicator_bits};
use crate::circuit::Circuit;
use crate::constraint::{CircuitBuilder, Var};
use crate::error::Result;
use crate::field::Felt;
use crate::input::{flat, nested, nested3, scalar, Visibility};
use crate::merkle::validate_merkle_transition;
use crate::params::CircuitParams;
use crate::registry::CircuitKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggMTStateReportInput {
    pub final_transition_time: Vec<Felt>,
    pub final_transition_status: Vec<Felt>,
    pub indicator: Felt,
    pub f: Felt,
    #[serde(default)]
    pub final_transition_leaves: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_transition_time: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_transition_status: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_transition_leaves: Vec<Vec<Vec<Felt>>>,
}

#[derive(Debug, Clone)]
pub struct AggMTStateReport {
    pub params: CircuitParams,
    pub input: Option<AggMTStateReportInput>,
}

impl Circuit for AggMTStateReport {
    const KIND: CircuitKind = CircuitKind::AggMTStateReport;
    type Input = AggMTStateReportInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        let p = &self.params;
        let (s, l, o) = (p.num_mt_statuses(), p.num_leaves(), p.num_oracles);
        let input = self.input.as_ref();

        let final_time = flat(
            "finalTransitionTime",
            input.map(|i| i.final_transition_time.as_slice()),
            s,
            Visibility::Public,
        )?;
        let final_status = flat(
            "finalTransitionStatus",
            input.map(|i| i.final_transition_status.as_slice()),
            s,
            Visibility::Public,
        )?;
        let final_leaves = nested(
            "finalTransitionLeaves",
            input.map(|i| i.final_transition_leaves.as_slice()),
            s,
            l,
            Visibility::Private,
        )?;
        let report_time = nested(
            "reportTransitionTime",
            input.map(|i| i.report_transition_time.as_slice()),
            o,
            s,
            Visibility::Private,
        )?;
        let report_status = nested(
            "reportTransitionStatus",
            input.map(|i| i.report_transition_status.as_slice()),
            o,
            s,
            Visibility::Private,
        )?;
        let report_leaves = nested3(
            "reportTransitionLeaves",
            input.map(|i| i.report_transition_leaves.as_slice()),
            o,
            s,
            l,
            Visibility::Private,
        )?;

        let final_time = b.public_vec("finalTransitionTime", &final_time);
        let final_status = b.public_vec("finalTransitionStatus", &final_status);
        let indicator = b.public("indicator", scalar(input.map(|i| &i.indicator)));
        let f = b.public("f", scalar(input.map(|i| &i.f)));

        let final_leaves: Vec<Vec<Var>> = final_leaves.iter().map(|set| b.private_vec(set)).collect();
        let report_time: Vec<Vec<Var>> = report_time.iter().map(|t| b.private_vec(t)).collect();
        let report_status: Vec<Vec<Var>> = report_status.iter().map(|r| b.private_vec(r)).collect();
        let report_leaves: Vec<Vec<Vec<Var>>> = report_leaves
            .iter()
            .map(|steps| steps.iter().map(|set| b.private_vec(set)).collect())
            .collect();

        let one = b.one();
        validate_merkle_transition(b, one, &final_time, &final_status, &final_leaves, p.time_bits);

        let valid = indicator_bits(b, indicator, o);
        for (i, flag) in valid.iter().enumerate() {
            validate_merkle_transition(
                b,
                *flag,
                &report_time[i],
                &report_status[i],
                &report_leaves[i],
                p.time_bits,
            );
        }

        for step in 0..s {
            let votes: Vec<Var> = (0..o)
                .map(|j| {
                    agreement(
                        b,
                        &[
                            (final_time[step], report_time[j][step]),
                            (final_status[step], report_status[j][step]),
                        ],
                    )
                })
                .collect();
            assert_quorum(b, f, &votes, p.time_bits);
        }

        Ok(())
    }
}
