//! oracle-prover: setup, prove and verify the oracle quorum circuits
//!
//! ```bash
//! oracle-prover setup AggBSLStateReport
//! oracle-prover prove AggBSLStateReport report.json report.proof
//! oracle-prover verify AggBSLStateReport public.json report.proof
//! oracle-prover generate-verifier AggBSLStateReport contracts/
//! ```

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oracle_circuit::backend::Proof;
use oracle_circuit::{AnyCircuit, CircuitKind, CircuitParams, CompiledCircuit, Halo2Backend, ProvingBackend};
use tracing::info;

mod store;

use crate::store::{ensure_parent, ArtifactStore};

#[derive(Parser, Debug)]
#[command(name = "oracle-prover")]
#[command(about = "quorum-checked oracle report circuits over halo2", long_about = None)]
struct Args {
    /// Directory holding per-circuit setup artifacts
    #[arg(long, env = "ORACLE_BUILD_DIR", default_value = "build")]
    build_dir: PathBuf,

    /// JSON file overriding circuit parameters
    #[arg(long, env = "ORACLE_CIRCUIT_PARAMS")]
    params: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the circuit and write its constraint system, params and key record
    Setup {
        /// Circuit name, e.g. AggBSLStateReport
        circuit: CircuitKind,
    },

    /// Prove a full witness record
    Prove {
        circuit: CircuitKind,
        /// JSON witness record
        input: PathBuf,
        /// Where to write the proof
        proof: PathBuf,
    },

    /// Verify a proof against a public-only record
    Verify {
        circuit: CircuitKind,
        /// JSON record carrying at least the public fields
        input: PathBuf,
        proof: PathBuf,
    },

    /// Export the verifier descriptor to <out-dir>/<circuit>Verifier.json
    GenerateVerifier { circuit: CircuitKind, out_dir: PathBuf },

    /// Check a witness record locally without proving
    Check { circuit: CircuitKind, input: PathBuf },
}

struct Workspace {
    store: ArtifactStore,
    params: CircuitParams,
}

impl Workspace {
    fn new(build_dir: PathBuf, params: Option<&Path>) -> Result<Self> {
        let params = match params {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading params {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing params {}", path.display()))?
            }
            None => CircuitParams::default(),
        };
        Ok(Self {
            store: ArtifactStore::new(build_dir),
            params,
        })
    }

    fn compile_record(&self, kind: CircuitKind, input: &Path) -> Result<CompiledCircuit> {
        let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
        let circuit = AnyCircuit::from_reader(kind, self.params.clone(), BufReader::new(file))
            .with_context(|| format!("loading witness {}", input.display()))?;
        Ok(circuit.compile()?)
    }
}

fn setup(ctx: &Workspace, kind: CircuitKind) -> Result<()> {
    let compiled = AnyCircuit::blank(kind, ctx.params.clone()).compile()?;
    let (_, vk) = Halo2Backend::new()
        .setup(&compiled.cs)
        .with_context(|| format!("setup of {}", kind))?;
    ctx.store.save(kind, &compiled.cs, &vk)?;
    info!(circuit = %kind, k = vk.k(), fingerprint = %hex::encode(vk.fingerprint()), "setup done");
    Ok(())
}

fn prove(ctx: &Workspace, kind: CircuitKind, input: &Path, out: &Path) -> Result<()> {
    let compiled = ctx.compile_record(kind, input)?;
    let artifacts = ctx.store.load(kind)?;
    artifacts.ensure_matches(&compiled.cs)?;
    compiled
        .check()
        .with_context(|| format!("witness {} does not satisfy {}", input.display(), kind))?;

    let (pk, _) = artifacts.keys()?;
    let proof = artifacts.backend.prove(&artifacts.cs, &pk, &compiled.witness)?;

    ensure_parent(out)?;
    fs::write(out, proof.as_bytes()).with_context(|| format!("writing {}", out.display()))?;
    info!(circuit = %kind, bytes = proof.as_bytes().len(), path = %out.display(), "proof written");
    Ok(())
}

fn verify(ctx: &Workspace, kind: CircuitKind, input: &Path, proof: &Path) -> Result<()> {
    let compiled = ctx.compile_record(kind, input)?;
    let public = compiled.public_inputs()?;
    let artifacts = ctx.store.load(kind)?;
    artifacts.ensure_matches(&compiled.cs)?;

    let (_, vk) = artifacts.keys()?;
    let bytes = fs::read(proof).with_context(|| format!("reading {}", proof.display()))?;
    artifacts
        .backend
        .verify(&Proof(bytes), &vk, &public)
        .with_context(|| format!("proof {} for {}", proof.display(), kind))?;
    info!(circuit = %kind, "proof verified");
    Ok(())
}

fn generate_verifier(ctx: &Workspace, kind: CircuitKind, out_dir: &Path) -> Result<PathBuf> {
    let artifacts = ctx.store.load(kind)?;
    let (_, vk) = artifacts.keys()?;
    let text = artifacts.backend.export_verifier(&vk)?;

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join(format!("{}Verifier.json", kind));
    fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    info!(circuit = %kind, path = %path.display(), "verifier exported");
    Ok(path)
}

fn check(ctx: &Workspace, kind: CircuitKind, input: &Path) -> Result<()> {
    let compiled = ctx.compile_record(kind, input)?;
    compiled
        .check()
        .with_context(|| format!("witness {} does not satisfy {}", input.display(), kind))?;
    info!(circuit = %kind, gates = compiled.cs.num_gates(), "witness satisfies every gate");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oracle_prover=info,oracle_circuit=info".into()),
        )
        .init();

    let args = Args::parse();
    let start = Instant::now();
    let ctx = Workspace::new(args.build_dir, args.params.as_deref())?;

    match args.command {
        Command::Setup { circuit } => setup(&ctx, circuit)?,
        Command::Prove {
            circuit,
            input,
            proof,
        } => prove(&ctx, circuit, &input, &proof)?,
        Command::Verify {
            circuit,
            input,
            proof,
        } => verify(&ctx, circuit, &input, &proof)?,
        Command::GenerateVerifier { circuit, out_dir } => {
            generate_verifier(&ctx, circuit, &out_dir)?;
        }
        Command::Check { circuit, input } => check(&ctx, circuit, &input)?,
    }

    info!(elapsed = ?start.elapsed(), "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_argument_order() {
        let args = Args::try_parse_from([
            "oracle-prover",
            "--build-dir",
            "out",
            "prove",
            "AggMTStateReport",
            "in.json",
            "p.bin",
        ])
        .unwrap();
        assert_eq!(args.build_dir, PathBuf::from("out"));
        match args.command {
            Command::Prove {
                circuit,
                input,
                proof,
            } => {
                assert_eq!(circuit, CircuitKind::AggMTStateReport);
                assert_eq!(input, PathBuf::from("in.json"));
                assert_eq!(proof, PathBuf::from("p.bin"));
            }
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn test_unknown_circuit_rejected() {
        let err = Args::try_parse_from(["oracle-prover", "setup", "Nope"]).unwrap_err();
        assert!(err.to_string().contains("circuit not found: Nope"));
    }

    fn write_json(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn workspace(dir: &Path) -> Workspace {
        let params = write_json(
            dir,
            "params.json",
            json!({ "numStatuses": 3, "scalarStatusBits": 8, "timeBits": 8 }),
        );
        Workspace::new(dir.join("build"), Some(&params)).unwrap()
    }

    #[test]
    fn test_setup_prove_verify() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = workspace(dir.path());
        let kind = CircuitKind::StateTransition;

        setup(&ctx, kind).unwrap();
        assert!(ctx.store.cs_path(kind).exists());

        let full = write_json(
            dir.path(),
            "full.json",
            json!({
                "transitionTime": [10, 40],
                "transitionStatus": [1, 7],
                "middleTimes": [10, 25],
                "middleStatuses": [3, 7],
            }),
        );
        check(&ctx, kind, &full).unwrap();

        let proof = dir.path().join("proofs/st.proof");
        prove(&ctx, kind, &full, &proof).unwrap();

        let public = write_json(
            dir.path(),
            "public.json",
            json!({ "transitionTime": [10, 40], "transitionStatus": [1, 7] }),
        );
        verify(&ctx, kind, &public, &proof).unwrap();

        let forged = write_json(
            dir.path(),
            "forged.json",
            json!({ "transitionTime": [10, 41], "transitionStatus": [1, 7] }),
        );
        assert!(verify(&ctx, kind, &forged, &proof).is_err());

        let exported = generate_verifier(&ctx, kind, &dir.path().join("contracts")).unwrap();
        assert!(exported.ends_with("StateTransitionVerifier.json"));
        let descriptor: serde_json::Value =
            serde_json::from_slice(&fs::read(exported).unwrap()).unwrap();
        assert_eq!(descriptor["publicInputs"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_prove_rejects_unsatisfied_witness() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = workspace(dir.path());
        let kind = CircuitKind::StateTransition;
        setup(&ctx, kind).unwrap();

        let cleared = write_json(
            dir.path(),
            "cleared.json",
            json!({
                "transitionTime": [10, 40],
                "transitionStatus": [1, 7],
                "middleTimes": [10, 25],
                "middleStatuses": [3, 5],
            }),
        );
        assert!(check(&ctx, kind, &cleared).is_err());
        let proof = dir.path().join("bad.proof");
        assert!(prove(&ctx, kind, &cleared, &proof).is_err());
        assert!(!proof.exists());
    }

    #[test]
    fn test_prove_without_setup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = workspace(dir.path());
        let input = write_json(
            dir.path(),
            "in.json",
            json!({
                "transitionTime": [10, 40],
                "transitionStatus": [1, 7],
                "middleTimes": [10, 25],
                "middleStatuses": [3, 7],
            }),
        );
        let proof = dir.path().join("p");
        let err = prove(&ctx, CircuitKind::StateTransition, &input, &proof).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Missing { .. })
        ));
        assert!(!proof.exists());
    }

    #[test]
    fn test_malformed_record_rejected_before_loading_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = workspace(dir.path());
        let input = write_json(dir.path(), "in.json", json!({}));
        let err = check(&ctx, CircuitKind::StateTransition, &input).unwrap_err();
        assert!(format!("{:#}", err).contains("transitionTime"));
    }
}
