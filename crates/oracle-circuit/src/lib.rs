//! oracle-circuit: quorum-checked oracle reports as arithmetic circuits
//!
//! circuits validate the transition history of a bitmask state machine
//! and that a byzantine quorum of independent oracle reports agrees on a
//! claimed transition, tolerating up to `f` faulty reporters.
//!
//! ## layers
//!
//! - [`constraint`]: vanilla plonk gates, builder, local satisfiability
//! - [`gadgets`]: equality, one-hot and bit counting predicates
//! - [`transition`], [`merkle`]: bitmask and merkle state transitions
//! - [`aggregate`]: the three quorum aggregations
//! - [`registry`]: name-keyed dispatch over all seven circuits
//! - [`backend`]: halo2 keygen, proving and verification
//!
//! a violated rule never surfaces as an error while building: it yields a
//! constraint system the witness does not satisfy, caught by
//! [`ConstraintSystem::check`] or by the prover.
//!
//! ## example
//!
//! ```no_run
//! use oracle_circuit::{AnyCircuit, CircuitKind, CircuitParams};
//!
//! let record = r#"{"transitionTime": [1, 9], "transitionStatus": [1, 7],
//!                  "middleTimes": [2, 3, 4, 5, 6, 7, 8, 9, 9],
//!                  "middleStatuses": [1, 1, 3, 3, 3, 7, 7, 7, 7]}"#;
//! let circuit = AnyCircuit::from_reader(
//!     CircuitKind::StateTransition,
//!     CircuitParams::default(),
//!     record.as_bytes(),
//! )?;
//! let compiled = circuit.compile()?;
//! assert!(compiled.check().is_ok());
//! # Ok::<(), oracle_circuit::CircuitError>(())
//! ```

pub mod aggregate;
pub mod backend;
pub mod circuit;
pub mod constraint;
pub mod error;
pub mod field;
pub mod gadgets;
mod input;
pub mod merkle;
pub mod params;
pub mod registry;
pub mod transition;

pub use aggregate::{AggBSLStateReport, AggCBSLStateReport, AggMTStateReport};
pub use backend::{Halo2Backend, ProvingBackend};
pub use circuit::{compile, Circuit, CompiledCircuit};
pub use constraint::{CircuitBuilder, ConstraintSystem, Var, Witness};
pub use error::{BackendError, CircuitError, Unsatisfied};
pub use field::{Felt, Fp};
pub use merkle::{MTStateTransition, SingleMTStateTransition};
pub use params::CircuitParams;
pub use registry::{AnyCircuit, CircuitKind};
pub use transition::{BigStateTransition, StateTransition};
