pub mod drbg;
pub mod entropy;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{GeneratorConfig, Mechanism};
use crate::error::Result;
use drbg::HashDrbg;
use entropy::{EntropySource, OsEntropy};

pub const ID_LENGTH: usize = 24;
pub const ALPHABET: &[u8; 62] = b"AaBbCcDdEeFfGgHhIiJjKkLlMmNnOoPpQqRrSsTtUuVvWwXxYyZz0123456789";

// largest multiple of 62 that fits in a byte; bytes at or above it are redrawn
const REJECTION_LIMIT: u8 = 248;
const POOL_LEN: usize = 64;

/// Non-fatal event recorded while drawing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based data line, when the draw belongs to a pipeline run.
    pub line: Option<usize>,
    pub message: String,
}

/// UTF-16, big-endian with a byte-order mark. The empty string encodes to no bytes.
pub fn personalization_bytes(source: &str) -> Vec<u8> {
    if source.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(2 + source.len() * 2);
    out.extend_from_slice(&[0xFE, 0xFF]);
    for unit in source.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

pub fn is_valid_identifier(id: &str) -> bool {
    id.len() == ID_LENGTH && id.bytes().all(|b| ALPHABET.contains(&b))
}

/// Draws one 24-character identifier per call.
///
/// Every call instantiates a fresh Hash_DRBG personalized with the caller's
/// string, so no random state carries over between records. If the DRBG
/// cannot be set up the draw falls back to the thread-local system CSPRNG and
/// a [`Diagnostic`] is kept for the caller.
pub struct IdentifierGenerator<E: EntropySource + Clone = OsEntropy> {
    config: GeneratorConfig,
    entropy: E,
    diagnostics: Vec<Diagnostic>,
    draws: u64,
}

impl IdentifierGenerator<OsEntropy> {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_entropy(config, OsEntropy)
    }
}

impl Default for IdentifierGenerator<OsEntropy> {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl<E: EntropySource + Clone> IdentifierGenerator<E> {
    pub fn with_entropy(config: GeneratorConfig, entropy: E) -> Self {
        Self { config, entropy, diagnostics: Vec::new(), draws: 0 }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn generate(&mut self, personalization_source: &str) -> String {
        self.draws += 1;
        match self.config.mechanism {
            Mechanism::System => draw_system(),
            Mechanism::HashDrbg => match self.draw_personalized(personalization_source) {
                Ok(id) => id,
                Err(err) => {
                    warn!(draw = self.draws, error = %err, "hash_drbg unavailable, using system CSPRNG");
                    self.diagnostics.push(Diagnostic {
                        line: None,
                        message: format!("secure random fallback: {}", err),
                    });
                    draw_system()
                }
            },
        }
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn draw_personalized(&self, source: &str) -> Result<String> {
        let personalization = personalization_bytes(source);
        let mut drbg =
            HashDrbg::instantiate(self.config.drbg_params(), &personalization, self.entropy.clone())?;
        let mut id = String::with_capacity(ID_LENGTH);
        let mut pool = [0u8; POOL_LEN];
        while id.len() < ID_LENGTH {
            drbg.generate(&mut pool, &[])?;
            for &b in pool.iter().filter(|&&b| b < REJECTION_LIMIT) {
                id.push(ALPHABET[(b % 62) as usize] as char);
                if id.len() == ID_LENGTH {
                    break;
                }
            }
        }
        debug!(draw = self.draws, "identifier drawn from hash_drbg");
        Ok(id)
    }
}

fn draw_system() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect()
}
