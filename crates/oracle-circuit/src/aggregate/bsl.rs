//! quorum over wide bitmask (status vector) reports

use serde::{Deserialize, Serialize};

use super::{agreement, assert_quorum, indicator_bits};
use crate::circuit::Circuit;
use crate::constraint::{CircuitBuilder, Var};
use crate::error::Result;
use crate::field::Felt;
use crate::input::{flat, nested, nested3, scalar, Visibility};
use crate::params::CircuitParams;
use crate::registry::CircuitKind;
use crate::transition::{chain, validate_transition};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggBSLStateReportInput {
    pub final_transition_time: Vec<Felt>,
    pub final_transition_status: Vec<Vec<Felt>>,
    pub indicator: Felt,
    pub f: Felt,
    #[serde(default)]
    pub final_middle_times: Vec<Felt>,
    #[serde(default)]
    pub final_middle_statuses: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_times: Vec<Vec<Felt>>,
    #[serde(default)]
    pub report_statuses: Vec<Vec<Vec<Felt>>>,
}

/// final status-vector transition agreed by a quorum of oracle reports
///
/// report i describes the `num_statuses` states after the shared start:
/// `finalTransitionTime[0] -> reportTimes[i][0] -> .. -> reportTimes[i][N-1]`.
/// votes are taken at each of the final transition's middle states.
#[derive(Debug, Clone)]
pub struct AggBSLStateReport {
    pub params: CircuitParams,
    pub input: Option<AggBSLStateReportInput>,
}

impl Circuit for AggBSLStateReport {
    const KIND: CircuitKind = CircuitKind::AggBSLStateReport;
    type Input = AggBSLStateReportInput;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self {
        Self { params, input }
    }

    fn params(&self) -> &CircuitParams {
        &self.params
    }

    fn define(&self, b: &mut CircuitBuilder) -> Result<()> {
        let p = &self.params;
        let (m, n, d, o) = (p.num_middle(), p.num_statuses, p.data_size, p.num_oracles);
        let input = self.input.as_ref();

        let final_time = flat(
            "finalTransitionTime",
            input.map(|i| i.final_transition_time.as_slice()),
            2,
            Visibility::Public,
        )?;
        let final_status = nested(
            "finalTransitionStatus",
            input.map(|i| i.final_transition_status.as_slice()),
            2,
            d,
            Visibility::Public,
        )?;
        let middle_times = flat(
            "finalMiddleTimes",
            input.map(|i| i.final_middle_times.as_slice()),
            m,
            Visibility::Private,
        )?;
        let middle_statuses = nested(
            "finalMiddleStatuses",
            input.map(|i| i.final_middle_statuses.as_slice()),
            m,
            d,
            Visibility::Private,
        )?;
        let report_times = nested(
            "reportTimes",
            input.map(|i| i.report_times.as_slice()),
            o,
            n,
            Visibility::Private,
        )?;
        let report_statuses = nested3(
            "reportStatuses",
            input.map(|i| i.report_statuses.as_slice()),
            o,
            n,
            d,
            Visibility::Private,
        )?;

        let final_time = b.public_vec("finalTransitionTime", &final_time);
        let final_status: Vec<Vec<Var>> = final_status
            .iter()
            .enumerate()
            .map(|(i, words)| b.public_vec(&format!("finalTransitionStatus[{}]", i), words))
            .collect();
        let indicator = b.public("indicator", scalar(input.map(|i| &i.indicator)));
        let f = b.public("f", scalar(input.map(|i| &i.f)));

        let middle_times = b.private_vec(&middle_times);
        let middle_statuses: Vec<Vec<Var>> =
            middle_statuses.iter().map(|words| b.private_vec(words)).collect();
        let report_times: Vec<Vec<Var>> = report_times.iter().map(|t| b.private_vec(t)).collect();
        let report_statuses: Vec<Vec<Vec<Var>>> = report_statuses
            .iter()
            .map(|states| states.iter().map(|words| b.private_vec(words)).collect())
            .collect();

        let one = b.one();
        let times = chain(&final_time[0], &middle_times, &final_time[1]);
        let states = chain(&final_status[0], &middle_statuses, &final_status[1]);
        validate_transition(b, one, &times, &states, p.word_bits, p.time_bits);

        let valid = indicator_bits(b, indicator, o);
        for ((flag, times), statuses) in valid.iter().zip(&report_times).zip(&report_statuses) {
            let times = chain(&final_time[0], &times[..n - 1], &times[n - 1]);
            let states = chain(&final_status[0], &statuses[..n - 1], &statuses[n - 1]);
            validate_transition(b, *flag, &times, &states, p.word_bits, p.time_bits);
        }

        for pos in 0..m {
            let votes: Vec<Var> = report_times
                .iter()
                .zip(&report_statuses)
                .map(|(times, statuses)| {
                    let mut pairs = vec![(middle_times[pos], times[pos])];
                    pairs.extend(
                        middle_statuses[pos]
                            .iter()
                            .copied()
                            .zip(statuses[pos].iter().copied()),
                    );
                    agreement(b, &pairs)
                })
                .collect();
            assert_quorum(b, f, &votes, p.time_bits);
        }

        Ok(())
    }
}
