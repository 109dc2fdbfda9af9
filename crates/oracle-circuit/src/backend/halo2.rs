//! halo2 (ipa over pasta) binding
//!
//! the whole constraint system is laid out as one region of a vanilla
//! plonk circuit:
//!
//! ```text
//!   row            a      b      c     q_l q_r q_o q_m q_c
//!   0..P           pub_i  -      -     0   0   0   0   0    <- instance row i
//!   P+g            w(a)   w(b)   w(c)  gate g coefficients
//! ```
//!
//! the first cell holding a wire is its canonical cell; every later cell
//! holding the same wire is copy-constrained to it. no selectors: empty
//! rows have all-zero coefficients and satisfy the gate trivially.
//!
//! keys are a deterministic function of (params, constraint system), so
//! only the params and the constraint system need persisting.

use std::io;
use std::sync::Arc;

use blake2::{Blake2s256, Digest};
use halo2_proofs::{
    circuit::{Cell, Layouter, Region, SimpleFloorPlanner, Value},
    dev::MockProver,
    plonk::{
        self, create_proof, keygen_pk, keygen_vk, verify_proof, Advice, Column, Error, Fixed,
        Instance, ProvingKey, SingleVerifier, VerifyingKey,
    },
    poly::{commitment::Params, Rotation},
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use pasta_curves::group::ff::Field;
use pasta_curves::vesta;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ProvingBackend;
use crate::constraint::{ConstraintSystem, Var, Witness};
use crate::error::BackendError;
use crate::field::Fp;

/// largest supported domain (2^26 rows)
pub const MAX_K: u32 = 26;

/// rows kept free for blinding
const BLINDING_ROWS: usize = 16;

const MIN_K: u32 = 4;

/// smallest k whose domain holds the public rows, the gates and blinding
pub fn circuit_k(cs: &ConstraintSystem) -> Result<u32, BackendError> {
    let rows = cs.num_public() + cs.num_gates() + BLINDING_ROWS;
    let k = rows.next_power_of_two().trailing_zeros().max(MIN_K);
    if k > MAX_K {
        return Err(BackendError::TooLarge(k));
    }
    Ok(k)
}

#[derive(Clone, Debug)]
pub struct PlonkConfig {
    a: Column<Advice>,
    b: Column<Advice>,
    c: Column<Advice>,
    q_l: Column<Fixed>,
    q_r: Column<Fixed>,
    q_o: Column<Fixed>,
    q_m: Column<Fixed>,
    q_c: Column<Fixed>,
    instance: Column<Instance>,
}

/// a constraint system plus, when proving, its assignment
struct PlonkCircuit<'a> {
    cs: &'a ConstraintSystem,
    values: Option<&'a [Option<Fp>]>,
}

impl PlonkCircuit<'_> {
    fn value(&self, var: Var) -> Value<Fp> {
        match self.values.and_then(|v| v[var.index()]) {
            Some(x) => Value::known(x),
            None => Value::unknown(),
        }
    }

    fn assign_wire(
        &self,
        region: &mut Region<'_, Fp>,
        column: Column<Advice>,
        row: usize,
        var: Var,
        canonical: &mut [Option<Cell>],
    ) -> Result<Cell, Error> {
        let value = self.value(var);
        let cell = region.assign_advice(|| "wire", column, row, || value)?.cell();
        match canonical[var.index()] {
            Some(first) => region.constrain_equal(first, cell)?,
            None => canonical[var.index()] = Some(cell),
        }
        Ok(cell)
    }
}

impl plonk::Circuit<Fp> for PlonkCircuit<'_> {
    type Config = PlonkConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self {
            cs: self.cs,
            values: None,
        }
    }

    fn configure(meta: &mut plonk::ConstraintSystem<Fp>) -> Self::Config {
        let config = PlonkConfig {
            a: meta.advice_column(),
            b: meta.advice_column(),
            c: meta.advice_column(),
            q_l: meta.fixed_column(),
            q_r: meta.fixed_column(),
            q_o: meta.fixed_column(),
            q_m: meta.fixed_column(),
            q_c: meta.fixed_column(),
            instance: meta.instance_column(),
        };
        for column in [config.a, config.b, config.c] {
            meta.enable_equality(column);
        }
        meta.enable_equality(config.instance);

        meta.create_gate("plonk", |meta| {
            let a = meta.query_advice(config.a, Rotation::cur());
            let b = meta.query_advice(config.b, Rotation::cur());
            let c = meta.query_advice(config.c, Rotation::cur());
            let q_l = meta.query_fixed(config.q_l);
            let q_r = meta.query_fixed(config.q_r);
            let q_o = meta.query_fixed(config.q_o);
            let q_m = meta.query_fixed(config.q_m);
            let q_c = meta.query_fixed(config.q_c);
            // coefficients on the left so zero rows cancel unassigned cells
            vec![q_l * a.clone() + q_r * b.clone() + q_o * c + q_m * a * b + q_c]
        });

        config
    }

    fn synthesize(&self, config: Self::Config, mut layouter: impl Layouter<Fp>) -> Result<(), Error> {
        let public = layouter.assign_region(
            || "constraint system",
            |mut region| {
                let mut canonical = vec![None; self.cs.num_wires];

                let mut public = Vec::with_capacity(self.cs.num_public());
                for (row, var) in self.cs.public.iter().enumerate() {
                    public.push(self.assign_wire(&mut region, config.a, row, *var, &mut canonical)?);
                }

                let offset = self.cs.num_public();
                for (i, gate) in self.cs.gates.iter().enumerate() {
                    let row = offset + i;
                    self.assign_wire(&mut region, config.a, row, gate.a, &mut canonical)?;
                    self.assign_wire(&mut region, config.b, row, gate.b, &mut canonical)?;
                    self.assign_wire(&mut region, config.c, row, gate.c, &mut canonical)?;
                    for (column, q) in [
                        (config.q_l, gate.q_l),
                        (config.q_r, gate.q_r),
                        (config.q_o, gate.q_o),
                        (config.q_m, gate.q_m),
                        (config.q_c, gate.q_c),
                    ] {
                        if !q.is_zero_vartime() {
                            region.assign_fixed(|| "coefficient", column, row, || Value::known(q))?;
                        }
                    }
                }

                Ok(public)
            },
        )?;

        for (row, cell) in public.into_iter().enumerate() {
            layouter.constrain_instance(cell, config.instance, row)?;
        }
        Ok(())
    }
}

/// run halo2's mock prover over a complete assignment
pub fn mock_check(cs: &ConstraintSystem, witness: &Witness) -> Result<(), BackendError> {
    let k = circuit_k(cs)?;
    let public = witness.public_inputs(cs)?;
    let circuit = PlonkCircuit {
        cs,
        values: Some(&witness.values),
    };
    let prover = MockProver::run(k, &circuit, vec![public])?;
    prover.verify().map_err(|failures| {
        debug!(?failures, "mock prover rejected the assignment");
        BackendError::MockFailure(failures.len())
    })
}

fn fingerprint(vk: &VerifyingKey<vesta::Affine>) -> [u8; 32] {
    let mut hasher = Blake2s256::new();
    hasher.update(format!("{:?}", vk.pinned()).as_bytes());
    hasher.finalize().into()
}

pub struct Halo2ProvingKey {
    params: Arc<Params<vesta::Affine>>,
    pk: ProvingKey<vesta::Affine>,
    cs_digest: [u8; 32],
}

impl Halo2ProvingKey {
    pub fn verifying_key(&self) -> &VerifyingKey<vesta::Affine> {
        self.pk.get_vk()
    }

    pub fn cs_digest(&self) -> [u8; 32] {
        self.cs_digest
    }

    pub fn k(&self) -> u32 {
        self.params.k()
    }
}

pub struct Halo2VerifyingKey {
    params: Arc<Params<vesta::Affine>>,
    vk: VerifyingKey<vesta::Affine>,
    cs_digest: [u8; 32],
    public_names: Vec<String>,
}

impl Halo2VerifyingKey {
    pub fn k(&self) -> u32 {
        self.params.k()
    }

    pub fn cs_digest(&self) -> [u8; 32] {
        self.cs_digest
    }

    pub fn public_names(&self) -> &[String] {
        &self.public_names
    }

    /// blake2s of the pinned key
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint(&self.vk)
    }

    pub fn params(&self) -> &Params<vesta::Affine> {
        &self.params
    }
}

/// serialized ipa proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof(pub Vec<u8>);

impl Proof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// exported verifier: everything a third party needs to rebuild and pin the key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierDescriptor {
    pub backend: String,
    pub k: u32,
    pub circuit_digest: String,
    pub vk_fingerprint: String,
    pub public_inputs: Vec<String>,
    pub pinned_verifying_key: String,
}

/// ipa over the vesta curve, no trusted setup
#[derive(Clone, Default)]
pub struct Halo2Backend {
    params: Option<Arc<Params<vesta::Affine>>>,
}

impl Halo2Backend {
    /// fresh params sized to each circuit
    pub fn new() -> Self {
        Self::default()
    }

    /// reuse persisted params; keys derived from them match the originals
    pub fn with_params(params: Params<vesta::Affine>) -> Self {
        Self {
            params: Some(Arc::new(params)),
        }
    }

    pub fn read_params(reader: &mut impl io::Read) -> Result<Self, BackendError> {
        Ok(Self::with_params(Params::read(reader)?))
    }

    fn params_for(&self, k: u32) -> Result<Arc<Params<vesta::Affine>>, BackendError> {
        match &self.params {
            Some(params) if params.k() < k => Err(BackendError::ParamsTooSmall {
                have: params.k(),
                need: k,
            }),
            Some(params) => Ok(params.clone()),
            None => {
                info!(k, "generating ipa params");
                Ok(Arc::new(Params::new(k)))
            }
        }
    }
}

impl ProvingBackend for Halo2Backend {
    type ProvingKey = Halo2ProvingKey;
    type VerifyingKey = Halo2VerifyingKey;
    type Proof = Proof;

    fn setup(
        &self,
        cs: &ConstraintSystem,
    ) -> Result<(Halo2ProvingKey, Halo2VerifyingKey), BackendError> {
        let k = circuit_k(cs)?;
        let params = self.params_for(k)?;
        info!(k = params.k(), gates = cs.num_gates(), "halo2 keygen");

        let circuit = PlonkCircuit { cs, values: None };
        let vk = keygen_vk(&params, &circuit)?;
        let pk = keygen_pk(&params, vk.clone(), &circuit)?;

        let cs_digest = cs.digest();
        let verifying = Halo2VerifyingKey {
            params: params.clone(),
            vk,
            cs_digest,
            public_names: cs.public_names.clone(),
        };
        debug!(fingerprint = %hex::encode(verifying.fingerprint()), "verifying key ready");

        Ok((
            Halo2ProvingKey {
                params,
                pk,
                cs_digest,
            },
            verifying,
        ))
    }

    fn prove(
        &self,
        cs: &ConstraintSystem,
        pk: &Halo2ProvingKey,
        witness: &Witness,
    ) -> Result<Proof, BackendError> {
        if pk.cs_digest != cs.digest() {
            return Err(BackendError::KeyMismatch(
                "proving key was generated for a different constraint system".into(),
            ));
        }
        cs.check(witness)?;
        let public = witness.public_inputs(cs)?;

        let circuit = PlonkCircuit {
            cs,
            values: Some(&witness.values),
        };
        let mut transcript = Blake2bWrite::<_, vesta::Affine, Challenge255<_>>::init(vec![]);
        create_proof(
            &pk.params,
            &pk.pk,
            &[circuit],
            &[&[&public]],
            OsRng,
            &mut transcript,
        )?;
        let proof = transcript.finalize();
        info!(bytes = proof.len(), "proof created");
        Ok(Proof(proof))
    }

    fn verify(
        &self,
        proof: &Proof,
        vk: &Halo2VerifyingKey,
        public: &[Fp],
    ) -> Result<(), BackendError> {
        if public.len() != vk.public_names.len() {
            return Err(BackendError::PublicInputs {
                got: public.len(),
                expected: vk.public_names.len(),
            });
        }
        let strategy = SingleVerifier::new(&vk.params);
        let mut transcript =
            Blake2bRead::<_, vesta::Affine, Challenge255<_>>::init(proof.as_bytes());
        verify_proof(&vk.params, &vk.vk, strategy, &[&[public]], &mut transcript).map_err(|e| {
            debug!(error = ?e, "verification failed");
            BackendError::Rejected
        })
    }

    fn export_verifier(&self, vk: &Halo2VerifyingKey) -> Result<String, BackendError> {
        let descriptor = VerifierDescriptor {
            backend: "halo2-ipa-vesta".into(),
            k: vk.k(),
            circuit_digest: hex::encode(vk.cs_digest),
            vk_fingerprint: hex::encode(vk.fingerprint()),
            public_inputs: vk.public_names.clone(),
            pinned_verifying_key: format!("{:?}", vk.vk.pinned()),
        };
        Ok(serde_json::to_string_pretty(&descriptor).map_err(io::Error::from)?)
    }
}
