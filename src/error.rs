//! Error types for threshold derivation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the TVRF engine and the derivation orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Share conversion failed: {0}")]
    ShareConversion(String),

    #[error("Not enough partial evaluations: need at least {required}, got {got}")]
    InsufficientShares { required: usize, got: usize },

    #[error("Not enough valid partial evaluations: need at least {required}, got {got}")]
    InsufficientValidShares { required: usize, got: usize },

    #[error("DLEQ proof of party {index} does not verify")]
    ProofVerification { index: u32 },

    #[error("Combining evaluations failed: {0}")]
    Combine(#[from] CombineError),

    #[error("Verification of combined evaluation failed")]
    Verification,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Hash to curve found no point for the message")]
    HashToCurve,

    #[error("Non-hardened derivation requires a resharing protocol, none is configured")]
    ResharingUnavailable,
}

/// Failures inside the interpolation step of `Combine`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombineError {
    #[error("Duplicate party index {0} among partial evaluations")]
    DuplicateIndex(u32),

    #[error("Partial evaluations were computed over different messages")]
    MixedMessages,

    #[error("Lagrange denominator is zero for index {0}")]
    ZeroDenominator(u32),

    #[error("Combined evaluation is the point at infinity")]
    PointAtInfinity,

    #[error("No partial evaluations to combine")]
    Empty,
}
