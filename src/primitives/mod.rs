//! Cryptographic primitives: the ChaCha20 block function, the AES block
//! cipher, and a cryptographically strong random byte source. Everything
//! here operates on single blocks or fixed-size buffers; chaining into
//! cipher modes lives in [`crate::modes`].

pub mod aes;
pub mod chacha;

use rand::Rng;

/// Fills an array of `N` bytes from the system CSPRNG.
#[must_use]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes);
    bytes
}
