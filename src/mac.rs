//! HMAC-SHA256 authentication tag computation and constant-time
//! verification, used for the container's encrypt-then-MAC construction.

use anyhow::{Result, anyhow, ensure};
use hmac::{Hmac, Mac as _};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::TAG_SIZE;

/// Computes and verifies HMAC-SHA256 tags over one or more byte slices.
pub struct Hasher {
    key: Vec<u8>,
}

impl Hasher {
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    /// Computes the tag over the concatenation of `parts`.
    pub fn compute(&self, parts: &[&[u8]]) -> Result<[u8; TAG_SIZE]> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).map_err(|e| anyhow!("hmac creation failed: {e}"))?;
        parts.iter().for_each(|part| mac.update(part));
        Ok(mac.finalize().into_bytes().into())
    }

    /// Verifies `expected` against the tag computed over `parts` in
    /// constant time. Never leaks position information on mismatch.
    pub fn verify(&self, expected: &[u8], parts: &[&[u8]]) -> Result<()> {
        ensure!(expected.len() == TAG_SIZE, "invalid tag length: expected {TAG_SIZE}, got {}", expected.len());
        let computed = self.compute(parts)?;
        ensure!(bool::from(expected.ct_eq(&computed)), "authentication tag mismatch");
        Ok(())
    }
}

/// Streams ciphertext from a reader through HMAC in fixed-size chunks,
/// avoiding loading multi-gigabyte files entirely into memory.
pub fn compute_streaming<R: std::io::Read>(key: &[u8], header_and_salt: &[u8], mut ciphertext: R, chunk_size: usize) -> Result<[u8; TAG_SIZE]> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| anyhow!("hmac creation failed: {e}"))?;
    mac.update(header_and_salt);

    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = ciphertext.read(&mut buf)?;
        if n == 0 {
            break;
        }
        mac.update(&buf[..n]);
    }
    Ok(mac.finalize().into_bytes().into())
}
