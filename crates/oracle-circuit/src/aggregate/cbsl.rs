//! quorum over change-record reports
//!
//! each report is `num_statuses` (time, index, change) steps on top of a
//! public previous state. a step sets exactly one bit (`change`) in word
//! `index`, strictly after the step before it.

use serde::{Deserialize, Serialize};

use super::{agreement, assert_quorum, indicator_bits};
use crate::circuit::Circuit;
use crate::constraint::{CircuitBuilder, Var};
use crate::error::Result;
use crate::field::Felt;
use crate::gadgets::is_valid_time_and_changes;
use crate::input::{flat, nested, scalar, Visibility};
use crate::params::CircuitParams;
use crate::registry::CircuitKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggCBSLStateReportInput {
    pub previous_time: Felt,
    pub previous_statuses: Vec<Felt>,
    pub final_transition_times: Vec<Felt>,
    pub final_transition_indexes: Vec<Felt>,
    pub final_transition_changes: Vec<Felt>,
    pub indicator: Felt,
    pub f: Felt,
    #[serde(default)]
    pub report_times: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_indexes: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_changes: Vec<Vec<Felt>>,
}

/// change records agreed by a quorum of oracle reports
///
/// `previousStatuses` is bound as a public input so a proof commits to the
/// state the changes apply to; the circuit does not constrain it further.
#[derive(Debug, Clone)]
pub struct AggCBSLStateReport {
    pub params: CircuitParams,
    pub input: Option<AggCBSLStateReportInput>,
}

impl Circuit for AggCBSLStateReport {
    const KIND: CircuitKind = CircuitKind::AggCBSLStateReport;
    type Input = AggCBSLStateReportInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        let p = &self.params;
        let (n, d, o) = (p.num_statuses, p.data_size, p.num_oracles);
        let input = self.input.as_ref();

        let previous_statuses = flat(
            "previousStatuses",
            input.map(|i| i.previous_statuses.as_slice()),
            d,
            Visibility::Public,
        )?;
        let final_times = flat(
            "finalTransitionTimes",
            input.map(|i| i.final_transition_times.as_slice()),
            n,
            Visibility::Public,
        )?;
        let final_indexes = flat(
            "finalTransitionIndexes",
            input.map(|i| i.final_transition_indexes.as_slice()),
            n,
            Visibility::Public,
        )?;
        let final_changes = flat(
            "finalTransitionChanges",
            input.map(|i| i.final_transition_changes.as_slice()),
            n,
            Visibility::Public,
        )?;
        let report_times = nested(
            "reportTimes",
            input.map(|i| i.report_times.as_slice()),
            o,
            n,
            Visibility::Private,
        )?;
        let report_indexes = nested(
            "reportIndexes",
            input.map(|i| i.report_indexes.as_slice()),
            o,
            n,
            Visibility::Private,
        )?;
        let report_changes = nested(
            "reportChanges",
            input.map(|i| i.report_changes.as_slice()),
            o,
            n,
            Visibility::Private,
        )?;

        let previous_time = b.public("previousTime", scalar(input.map(|i| &i.previous_time)));
        b.public_vec("previousStatuses", &previous_statuses);
        let final_times = b.public_vec("finalTransitionTimes", &final_times);
        let final_indexes = b.public_vec("finalTransitionIndexes", &final_indexes);
        let final_changes = b.public_vec("finalTransitionChanges", &final_changes);
        let indicator = b.public("indicator", scalar(input.map(|i| &i.indicator)));
        let f = b.public("f", scalar(input.map(|i| &i.f)));

        let report_times: Vec<Vec<Var>> = report_times.iter().map(|r| b.private_vec(r)).collect();
        let report_indexes: Vec<Vec<Var>> =
            report_indexes.iter().map(|r| b.private_vec(r)).collect();
        let report_changes: Vec<Vec<Var>> =
            report_changes.iter().map(|r| b.private_vec(r)).collect();

        let one = b.one();
        is_valid_time_and_changes(
            b,
            one,
            previous_time,
            &final_times,
            &final_indexes,
            &final_changes,
            p,
        );

        let valid = indicator_bits(b, indicator, o);
        for (i, flag) in valid.iter().enumerate() {
            is_valid_time_and_changes(
                b,
                *flag,
                previous_time,
                &report_times[i],
                &report_indexes[i],
                &report_changes[i],
                p,
            );
        }

        for step in 0..n {
            let votes: Vec<Var> = (0..o)
                .map(|j| {
                    agreement(
                        b,
                        &[
                            (final_times[step], report_times[j][step]),
                            (final_changes[step], report_changes[j][step]),
                            (final_indexes[step], report_indexes[j][step]),
                        ],
                    )
                })
                .collect();
            assert_quorum(b, f, &votes, p.time_bits);
        }

        Ok(())
    }
}
