//! Structured error types for Flexure.

use thiserror::Error;

/// Unified error type for all Flexure operations.
#[derive(Debug, Error)]
pub enum FlexureError {
    /// Two structures (or coordinate sets) disagree in residue count or order.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The pseudo-inverse could not be formed because no non-zero modes remain.
    #[error("singular Hessian: {0}")]
    SingularHessian(String),

    /// A chain or atom selection matched nothing.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rendering annotations to an output format failed.
    #[error("write error: {0}")]
    Write(String),

    /// A numerical routine failed to converge.
    #[error("convergence failure: {0}")]
    Convergence(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout Flexure.
pub type Result<T> = std::result::Result<T, FlexureError>;
