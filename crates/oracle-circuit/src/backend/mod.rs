//! proving backend contract
//!
//! circuits compile to a backend-neutral [`ConstraintSystem`]; a backend
//! turns that into keys, proofs and an exported verifier.

mod halo2;

pub use self::halo2::{
    circuit_k, mock_check, Halo2Backend, Halo2ProvingKey, Halo2VerifyingKey, Proof,
    VerifierDescriptor, MAX_K,
};

use crate::constraint::{ConstraintSystem, Witness};
use crate::error::BackendError;
use crate::field::Fp;

pub trait ProvingBackend {
    type ProvingKey;
    type VerifyingKey;
    type Proof;

    fn setup(
        &self,
        cs: &ConstraintSystem,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), BackendError>;

    fn prove(
        &self,
        cs: &ConstraintSystem,
        pk: &Self::ProvingKey,
        witness: &Witness,
    ) -> Result<Self::Proof, BackendError>;

    /// `public` in declaration order
    fn verify(
        &self,
        proof: &Self::Proof,
        vk: &Self::VerifyingKey,
        public: &[Fp],
    ) -> Result<(), BackendError>;

    /// text of a standalone verifier for `vk`
    fn export_verifier(&self, vk: &Self::VerifyingKey) -> Result<String, BackendError>;
}
