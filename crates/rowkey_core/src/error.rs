// error.rs: error type shared by the parser, generator and pipeline
use thiserror::Error;

/// Errors raised by the core library.
///
/// Random-source variants are recoverable: the identifier generator turns them
/// into diagnostics and falls back to the system CSPRNG.
#[derive(Debug, Error)]
pub enum RowKeyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("unsupported security strength: {requested} bits (max {max})")]
    UnsupportedStrength { requested: u32, max: u32 },
    #[error("personalization input too long: {0} bytes")]
    PersonalizationTooLong(usize),
    #[error("entropy source failure: {0}")]
    Entropy(String),
    #[error("request of {0} bytes exceeds the per-request limit")]
    RequestTooLarge(usize),
    #[error("reseed required but reseeding is disabled")]
    ReseedRequired,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RowKeyError>;
