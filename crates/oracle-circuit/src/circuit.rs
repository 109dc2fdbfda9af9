//! circuit trait and the compile pass

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::constraint::{CircuitBuilder, ConstraintSystem, Witness};
use crate::error::{Result, Unsatisfied};
use crate::field::Fp;
use crate::params::CircuitParams;
use crate::registry::CircuitKind;

/// a circuit declared over the constraint builder
///
/// `define` allocates public inputs first, in declaration order, then the
/// private witness, then emits constraints. it must not branch on witness
/// values: the constraint graph depends on the parameters alone.
pub trait Circuit {
    const KIND: CircuitKind;

    /// json witness record (field names match the declared inputs)
    type Input: Serialize + DeserializeOwned;

    fn new(params: CircuitParams, input: Option<Self::Input>) -> Self
    where
        Self: Sized;

    fn params(&self) -> &CircuitParams;

    fn define(&self, b: &mut CircuitBuilder) -> Result<()>;
}

/// constraint system plus the assignment produced alongside it
#[derive(Debug, Clone)]
pub struct CompiledCircuit {
    pub kind: CircuitKind,
    pub cs: ConstraintSystem,
    pub witness: Witness,
}

impl CompiledCircuit {
    /// local satisfiability check of the carried witness
    pub fn check(&self) -> core::result::Result<(), Unsatisfied> {
        self.cs.check(&self.witness)
    }

    pub fn public_inputs(&self) -> Result<Vec<Fp>> {
        self.witness.public_inputs(&self.cs)
    }
}

/// build the constraint system (and witness, if the circuit carries one)
pub fn compile<C: Circuit>(circuit: &C) -> Result<CompiledCircuit> {
    circuit.params().validate()?;

    let _span = info_span!("compile", circuit = %C::KIND).entered();
    debug!(params = ?circuit.params(), "defining circuit");

    let mut builder = CircuitBuilder::new();
    circuit.define(&mut builder)?;
    let (cs, witness) = builder.build();

    info!(
        gates = cs.num_gates(),
        wires = cs.num_wires,
        public = cs.num_public(),
        "compiled"
    );

    Ok(CompiledCircuit {
        kind: C::KIND,
        cs,
        witness,
    })
}
