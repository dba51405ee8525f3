// identifier/drbg.rs: Hash_DRBG over SHA-256 (NIST SP 800-90A, section 10.1.1)
use sha2::{Digest, Sha256};

use super::entropy::EntropySource;
use crate::error::{Result, RowKeyError};

/// seedlen for SHA-256, in bytes (440 bits).
pub const SEED_LEN: usize = 55;
pub const MAX_STRENGTH_BITS: u32 = 256;
pub const MAX_BYTES_PER_REQUEST: usize = 1 << 16;
pub const RESEED_INTERVAL: u64 = 1 << 20;
/// 2^35 bits.
pub const MAX_PERSONALIZATION_BYTES: u64 = 1 << 32;

const MAX_ENTROPY_LEN: usize = MAX_STRENGTH_BITS as usize / 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrbgParams {
    pub strength_bits: u32,
    pub prediction_resistance: bool,
    pub reseed: bool,
}

impl Default for DrbgParams {
    fn default() -> Self {
        Self { strength_bits: MAX_STRENGTH_BITS, prediction_resistance: true, reseed: true }
    }
}

impl DrbgParams {
    pub fn validate(&self) -> Result<()> {
        if self.strength_bits == 0 || self.strength_bits > MAX_STRENGTH_BITS {
            return Err(RowKeyError::UnsupportedStrength {
                requested: self.strength_bits,
                max: MAX_STRENGTH_BITS,
            });
        }
        if self.prediction_resistance && !self.reseed {
            return Err(RowKeyError::InvalidConfig(
                "prediction resistance requires reseed capability".to_string(),
            ));
        }
        Ok(())
    }

    /// Entropy input length: one byte per eight bits of strength.
    fn entropy_len(&self) -> usize {
        (self.strength_bits as usize).div_ceil(8)
    }

    /// Nonce length: half the strength.
    fn nonce_len(&self) -> usize {
        (self.strength_bits as usize).div_ceil(16)
    }
}

/// Working state.
pub struct HashDrbg<E: EntropySource> {
    v: [u8; SEED_LEN],
    c: [u8; SEED_LEN],
    reseed_counter: u64,
    params: DrbgParams,
    entropy: E,
}

impl<E: EntropySource> HashDrbg<E> {
    pub fn instantiate(params: DrbgParams, personalization: &[u8], mut entropy: E) -> Result<Self> {
        params.validate()?;
        if personalization.len() as u64 > MAX_PERSONALIZATION_BYTES {
            return Err(RowKeyError::PersonalizationTooLong(personalization.len()));
        }
        let mut entropy_input = [0u8; MAX_ENTROPY_LEN];
        let mut nonce = [0u8; MAX_ENTROPY_LEN / 2];
        let entropy_input = &mut entropy_input[..params.entropy_len()];
        let nonce = &mut nonce[..params.nonce_len()];
        entropy.fill(entropy_input)?;
        entropy.fill(nonce)?;

        let v = hash_df(&[&*entropy_input, &*nonce, personalization]);
        let c = hash_df(&[&[0x00], &v]);
        Ok(Self { v, c, reseed_counter: 1, params, entropy })
    }

    pub fn reseed(&mut self, additional_input: &[u8]) -> Result<()> {
        if !self.params.reseed {
            return Err(RowKeyError::ReseedRequired);
        }
        let mut entropy_input = [0u8; MAX_ENTROPY_LEN];
        let entropy_input = &mut entropy_input[..self.params.entropy_len()];
        self.entropy.fill(entropy_input)?;
        self.v = hash_df(&[&[0x01], &self.v, &*entropy_input, additional_input]);
        self.c = hash_df(&[&[0x00], &self.v]);
        self.reseed_counter = 1;
        Ok(())
    }

    /// Fill `out` with random bytes. With prediction resistance every call
    /// reseeds from fresh entropy first.
    pub fn generate(&mut self, out: &mut [u8], additional_input: &[u8]) -> Result<()> {
        if out.len() > MAX_BYTES_PER_REQUEST {
            return Err(RowKeyError::RequestTooLarge(out.len()));
        }
        let mut additional_input = additional_input;
        if self.params.prediction_resistance || self.reseed_counter > RESEED_INTERVAL {
            self.reseed(additional_input)?;
            additional_input = &[];
        }
        if !additional_input.is_empty() {
            let w = Sha256::new()
                .chain_update([0x02u8])
                .chain_update(self.v)
                .chain_update(additional_input)
                .finalize();
            add_be(&mut self.v, &w);
        }

        let mut data = self.v;
        for chunk in out.chunks_mut(32) {
            let w = Sha256::digest(data);
            chunk.copy_from_slice(&w[..chunk.len()]);
            add_be(&mut data, &[0x01]);
        }

        let h = Sha256::new().chain_update([0x03u8]).chain_update(self.v).finalize();
        let c = self.c;
        add_be(&mut self.v, &h);
        add_be(&mut self.v, &c);
        add_be(&mut self.v, &self.reseed_counter.to_be_bytes());
        self.reseed_counter += 1;
        Ok(())
    }
}

/// Hash_df producing exactly seedlen bytes.
fn hash_df(inputs: &[&[u8]]) -> [u8; SEED_LEN] {
    let bits = (SEED_LEN as u32 * 8).to_be_bytes();
    let mut out = [0u8; SEED_LEN];
    let mut counter: u8 = 1;
    for chunk in out.chunks_mut(32) {
        let mut hasher = Sha256::new();
        hasher.update([counter]);
        hasher.update(bits);
        for input in inputs {
            hasher.update(input);
        }
        let digest = hasher.finalize();
        chunk.copy_from_slice(&digest[..chunk.len()]);
        counter += 1;
    }
    out
}

/// `v = (v + x) mod 2^seedlen`, both big-endian, `x` right-aligned.
fn add_be(v: &mut [u8; SEED_LEN], x: &[u8]) {
    let mut carry = 0u16;
    let mut addend = x.iter().rev();
    for byte in v.iter_mut().rev() {
        let sum = *byte as u16 + *addend.next().unwrap_or(&0) as u16 + carry;
        *byte = sum as u8;
        carry = sum >> 8;
    }
}
