use thiserror::Error;

/// Unified error type for all cellcast operations.
///
/// Data-contract violations are raised before any model fitting is
/// attempted; failures inside an external fitting backend are carried
/// through unmodified in the `Backend` variant.
#[derive(Debug, Error)]
pub enum CellcastError {
    /// A required observation column is missing from the annotated matrix
    #[error("missing observation column: '{0}'")]
    MissingObs(String),

    /// An observation column exists but holds the wrong type
    #[error("observation column '{column}' has the wrong type: expected {expected}")]
    ObsType {
        column: String,
        expected: &'static str,
    },

    /// A vector or matrix dimension does not match the annotated matrix
    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    /// Invalid input (bad arguments, degenerate subsets, sentinel collisions)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure surfaced by an external model-fitting backend
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CellcastError>;
