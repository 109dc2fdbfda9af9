//! name-keyed circuit dispatch

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{AggBSLStateReport, AggCBSLStateReport, AggMTStateReport};
use crate::circuit::{compile, Circuit, CompiledCircuit};
use crate::error::{CircuitError, Result};
use crate::merkle::{MTStateTransition, SingleMTStateTransition};
use crate::params::CircuitParams;
use crate::transition::{BigStateTransition, StateTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitKind {
    StateTransition,
    BigStateTransition,
    MTStateTransition,
    SingleMTStateTransition,
    AggBSLStateReport,
    AggMTStateReport,
    AggCBSLStateReport,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 7] = [
        CircuitKind::StateTransition,
        CircuitKind::BigStateTransition,
        CircuitKind::MTStateTransition,
        CircuitKind::SingleMTStateTransition,
        CircuitKind::AggBSLStateReport,
        CircuitKind::AggMTStateReport,
        CircuitKind::AggCBSLStateReport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CircuitKind::StateTransition => "StateTransition",
            CircuitKind::BigStateTransition => "BigStateTransition",
            CircuitKind::MTStateTransition => "MTStateTransition",
            CircuitKind::SingleMTStateTransition => "SingleMTStateTransition",
            CircuitKind::AggBSLStateReport => "AggBSLStateReport",
            CircuitKind::AggMTStateReport => "AggMTStateReport",
            CircuitKind::AggCBSLStateReport => "AggCBSLStateReport",
        }
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CircuitKind {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self> {
        CircuitKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CircuitError::UnknownCircuit(s.to_string()))
    }
}

/// any registered circuit, with or without a witness record
#[derive(Debug, Clone)]
pub enum AnyCircuit {
    StateTransition(StateTransition),
    BigStateTransition(BigStateTransition),
    MTStateTransition(MTStateTransition),
    SingleMTStateTransition(SingleMTStateTransition),
    AggBSLStateReport(AggBSLStateReport),
    AggMTStateReport(AggMTStateReport),
    AggCBSLStateReport(AggCBSLStateReport),
}

fn read_input<C: Circuit>(reader: impl Read) -> Result<C::Input> {
    Ok(serde_json::from_reader(reader)?)
}

impl AnyCircuit {
    /// shape-only instance, as compiled for setup
    pub fn blank(kind: CircuitKind, params: CircuitParams) -> Self {
        match kind {
            CircuitKind::StateTransition => Self::StateTransition(StateTransition::new(params, None)),
            CircuitKind::BigStateTransition => {
                Self::BigStateTransition(BigStateTransition::new(params, None))
            }
            CircuitKind::MTStateTransition => {
                Self::MTStateTransition(MTStateTransition::new(params, None))
            }
            CircuitKind::SingleMTStateTransition => {
                Self::SingleMTStateTransition(SingleMTStateTransition::new(params, None))
            }
            CircuitKind::AggBSLStateReport => {
                Self::AggBSLStateReport(AggBSLStateReport::new(params, None))
            }
            CircuitKind::AggMTStateReport => {
                Self::AggMTStateReport(AggMTStateReport::new(params, None))
            }
            CircuitKind::AggCBSLStateReport => {
                Self::AggCBSLStateReport(AggCBSLStateReport::new(params, None))
            }
        }
    }

    /// instance carrying a json witness record
    pub fn from_reader(kind: CircuitKind, params: CircuitParams, reader: impl Read) -> Result<Self> {
        debug!(circuit = %kind, "reading witness record");
        let circuit = match kind {
            CircuitKind::StateTransition => Self::StateTransition(StateTransition::new(
                params,
                Some(read_input::<StateTransition>(reader)?),
            )),
            CircuitKind::BigStateTransition => Self::BigStateTransition(BigStateTransition::new(
                params,
                Some(read_input::<BigStateTransition>(reader)?),
            )),
            CircuitKind::MTStateTransition => Self::MTStateTransition(MTStateTransition::new(
                params,
                Some(read_input::<MTStateTransition>(reader)?),
            )),
            CircuitKind::SingleMTStateTransition => {
                Self::SingleMTStateTransition(SingleMTStateTransition::new(
                    params,
                    Some(read_input::<SingleMTStateTransition>(reader)?),
                ))
            }
            CircuitKind::AggBSLStateReport => Self::AggBSLStateReport(AggBSLStateReport::new(
                params,
                Some(read_input::<AggBSLStateReport>(reader)?),
            )),
            CircuitKind::AggMTStateReport => Self::AggMTStateReport(AggMTStateReport::new(
                params,
                Some(read_input::<AggMTStateReport>(reader)?),
            )),
            CircuitKind::AggCBSLStateReport => Self::AggCBSLStateReport(AggCBSLStateReport::new(
                params,
                Some(read_input::<AggCBSLStateReport>(reader)?),
            )),
        };
        Ok(circuit)
    }

    pub fn kind(&self) -> CircuitKind {
        match self {
            Self::StateTransition(_) => CircuitKind::StateTransition,
            Self::BigStateTransition(_) => CircuitKind::BigStateTransition,
            Self::MTStateTransition(_) => CircuitKind::MTStateTransition,
            Self::SingleMTStateTransition(_) => CircuitKind::SingleMTStateTransition,
            Self::AggBSLStateReport(_) => CircuitKind::AggBSLStateReport,
            Self::AggMTStateReport(_) => CircuitKind::AggMTStateReport,
            Self::AggCBSLStateReport(_) => CircuitKind::AggCBSLStateReport,
        }
    }

    pub fn compile(&self) -> Result<CompiledCircuit> {
        match self {
            Self::StateTransition(c) => compile(c),
            Self::BigStateTransition(c) => compile(c),
            Self::MTStateTransition(c) => compile(c),
            Self::SingleMTStateTransition(c) => compile(c),
            Self::AggBSLStateReport(c) => compile(c),
            Self::AggMTStateReport(c) => compile(c),
            Self::AggCBSLStateReport(c) => compile(c),
        }
    }
}
