use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("Element description has no velocity ('V') entries")]
    MissingVelocity,

    #[error("Element description must have exactly one pressure ('Q') entry, got {0}")]
    PressureCount(usize),

    #[error("Unsupported element: {family} of degree {degree}")]
    Unsupported { family: String, degree: u32 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Invalid mesh size: {0}")]
    InvalidMeshSize(String),

    #[error("Invalid cell {cell}: {reason}")]
    InvalidCell { cell: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Linear solve failed: {0}")]
    LinearSolve(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
