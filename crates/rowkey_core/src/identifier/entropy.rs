// identifier/entropy.rs: entropy inputs for the DRBG
use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::{Result, RowKeyError};

/// Supplier of fresh entropy for instantiation and reseeding.
pub trait EntropySource {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// Operating system entropy (`getrandom` and friends).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest).map_err(|e| RowKeyError::Entropy(e.to_string()))
    }
}
