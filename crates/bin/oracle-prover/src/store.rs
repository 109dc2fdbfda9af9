//! on-disk artifacts, one directory per circuit
//!
//! ```text
//!   <build>/<name>/<name>.ccs      bincode constraint system
//!   <build>/<name>/<name>.params   ipa params
//!   <build>/<name>/<name>.vk       json key record
//! ```
//!
//! keys are never written: they are re-derived from the params and the
//! constraint system, then pinned against the recorded fingerprint.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use oracle_circuit::backend::{Halo2ProvingKey, Halo2VerifyingKey};
use oracle_circuit::{BackendError, CircuitKind, ConstraintSystem, Halo2Backend, ProvingBackend};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no artifacts for {kind} under {path} (run setup first)")]
    Missing { kind: CircuitKind, path: PathBuf },

    #[error("artifacts for {0} were built for a different constraint system; rerun setup")]
    Stale(CircuitKind),

    #[error("verifying key fingerprint mismatch for {0}")]
    Fingerprint(CircuitKind),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("constraint system decode error: {0}")]
    Decode(#[from] bincode::Error),

    #[error("key record error: {0}")]
    Record(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// contents of the `.vk` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub k: u32,
    pub cs_digest: String,
    pub vk_fingerprint: String,
    pub public_inputs: Vec<String>,
}

impl KeyRecord {
    fn of(vk: &Halo2VerifyingKey) -> Self {
        Self {
            k: vk.k(),
            cs_digest: hex::encode(vk.cs_digest()),
            vk_fingerprint: hex::encode(vk.fingerprint()),
            public_inputs: vk.public_names().to_vec(),
        }
    }
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, kind: CircuitKind) -> PathBuf {
        self.root.join(kind.name())
    }

    fn path(&self, kind: CircuitKind, ext: &str) -> PathBuf {
        self.dir(kind).join(format!("{}.{}", kind.name(), ext))
    }

    pub fn cs_path(&self, kind: CircuitKind) -> PathBuf {
        self.path(kind, "ccs")
    }

    pub fn params_path(&self, kind: CircuitKind) -> PathBuf {
        self.path(kind, "params")
    }

    pub fn vk_path(&self, kind: CircuitKind) -> PathBuf {
        self.path(kind, "vk")
    }

    pub fn save(&self, kind: CircuitKind, cs: &ConstraintSystem, vk: &Halo2VerifyingKey) -> Result<()> {
        fs::create_dir_all(self.dir(kind))?;

        fs::write(self.cs_path(kind), cs.to_bytes())?;

        let mut params = BufWriter::new(File::create(self.params_path(kind))?);
        vk.params().write(&mut params)?;
        params.flush()?;

        let record = serde_json::to_string_pretty(&KeyRecord::of(vk))?;
        fs::write(self.vk_path(kind), record)?;

        info!(circuit = %kind, dir = %self.dir(kind).display(), "artifacts written");
        Ok(())
    }

    pub fn load(&self, kind: CircuitKind) -> Result<Artifacts> {
        for path in [self.cs_path(kind), self.params_path(kind), self.vk_path(kind)] {
            if !path.exists() {
                return Err(StoreError::Missing { kind, path });
            }
        }

        let cs = ConstraintSystem::from_bytes(&fs::read(self.cs_path(kind))?)?;
        let mut params = BufReader::new(File::open(self.params_path(kind))?);
        let backend = Halo2Backend::read_params(&mut params)?;
        let record: KeyRecord = serde_json::from_slice(&fs::read(self.vk_path(kind))?)?;

        if record.cs_digest != hex::encode(cs.digest()) {
            return Err(StoreError::Stale(kind));
        }
        debug!(circuit = %kind, k = record.k, gates = cs.num_gates(), "artifacts loaded");
        Ok(Artifacts {
            kind,
            cs,
            backend,
            record,
        })
    }
}

/// a circuit's persisted setup, ready to re-derive keys
pub struct Artifacts {
    pub kind: CircuitKind,
    pub cs: ConstraintSystem,
    pub backend: Halo2Backend,
    pub record: KeyRecord,
}

impl Artifacts {
    /// the constraint system a fresh compile produced must be the one set up
    pub fn ensure_matches(&self, cs: &ConstraintSystem) -> Result<()> {
        if cs.digest() != self.cs.digest() {
            return Err(StoreError::Stale(self.kind));
        }
        Ok(())
    }

    pub fn keys(&self) -> Result<(Halo2ProvingKey, Halo2VerifyingKey)> {
        let (pk, vk) = self.backend.setup(&self.cs)?;
        if hex::encode(vk.fingerprint()) != self.record.vk_fingerprint {
            return Err(StoreError::Fingerprint(self.kind));
        }
        Ok((pk, vk))
    }
}

pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
