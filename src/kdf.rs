//! PBKDF2-HMAC-SHA256 key derivation.
//!
//! No dedicated PBKDF2 crate is pulled in; this builds directly on the
//! `hmac`/`sha2` primitives already used for the container's
//! authentication tag (see [`crate::mac`]), following RFC 8018.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::PBKDF2_ITERATIONS;

type HmacSha256 = Hmac<Sha256>;

const HASH_LEN: usize = 32;

/// Derives `key_len` bytes from `password` and `salt` using
/// PBKDF2-HMAC-SHA256 with the fixed container iteration count.
#[must_use]
pub fn derive(password: &[u8], salt: &[u8], key_len: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(key_len);
    let mut block_index: u32 = 1;

    while output.len() < key_len {
        let block = f(password, salt, PBKDF2_ITERATIONS, block_index);
        let take = (key_len - output.len()).min(HASH_LEN);
        output.extend_from_slice(&block[..take]);
        block_index += 1;
    }

    output
}

fn f(password: &[u8], salt: &[u8], iterations: u32, block_index: u32) -> [u8; HASH_LEN] {
    let mut mac = HmacSha256::new_from_slice(password).expect("HMAC accepts keys of any length");
    mac.update(salt);
    mac.update(&block_index.to_be_bytes());
    let mut u: [u8; HASH_LEN] = mac.finalize().into_bytes().into();
    let mut result = u;

    for _ in 1..iterations {
        let mut mac = HmacSha256::new_from_slice(password).expect("HMAC accepts keys of any length");
        mac.update(&u);
        u = mac.finalize().into_bytes().into();
        result.iter_mut().zip(&u).for_each(|(r, b)| *r ^= b);
    }

    result
}
