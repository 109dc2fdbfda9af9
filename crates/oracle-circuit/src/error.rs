use thiserror::Error;

/// Structural failures: raised while building a circuit, never because a
/// witness violates a rule.
#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("circuit not found: {0}")]
    UnknownCircuit(String),

    #[error("invalid circuit parameters: {0}")]
    InvalidParams(String),

    #[error("input field `{field}` has length {got}, expected {expected}")]
    Shape {
        field: String,
        got: usize,
        expected: usize,
    },

    #[error("missing value for public input `{0}`")]
    MissingValue(String),

    #[error("malformed field element: {0}")]
    FieldElement(String),

    #[error("input decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CircuitError>;

/// A witness that does not satisfy the constraint system.
///
/// Kept apart from [`CircuitError`]: construction succeeded, the
/// assignment is simply not a solution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unsatisfied {
    #[error("gate {gate} is not satisfied")]
    Gate { gate: usize },

    #[error("wire {wire} has no assigned value")]
    Unassigned { wire: usize },

    #[error("witness has {got} wires, constraint system expects {expected}")]
    WireCount { got: usize, expected: usize },
}

/// Failures of the proving backend collaborator.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("halo2 error: {0}")]
    Halo2(String),

    #[error("circuit needs 2^{0} rows, more than the backend supports")]
    TooLarge(u32),

    #[error("verifying key mismatch: {0}")]
    KeyMismatch(String),

    #[error("params hold 2^{have} rows, circuit needs 2^{need}")]
    ParamsTooSmall { have: u32, need: u32 },

    #[error("expected {expected} public inputs, got {got}")]
    PublicInputs { got: usize, expected: usize },

    #[error("mock prover found {0} failing constraints")]
    MockFailure(usize),

    #[error("witness rejected: {0}")]
    Unsatisfied(#[from] Unsatisfied),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("proof verification failed")]
    Rejected,
}

impl From<halo2_proofs::plonk::Error> for BackendError {
    fn from(err: halo2_proofs::plonk::Error) -> Self {
        BackendError::Halo2(format!("{:?}", err))
    }
}
