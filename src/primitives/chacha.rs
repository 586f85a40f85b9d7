//! ChaCha20 block function (RFC 7539/8439), with an explicit block counter.
//!
//! This is a from-scratch, dependency-free core: no AEAD, no nonce
//! management beyond what the caller supplies. The counter is exposed
//! explicitly on every call so a caller can resume the keystream at any
//! block boundary — the property the random-access reader depends on.

use crate::config::CHACHA_BLOCK_SIZE;

const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

#[inline(always)]
fn quarter_round(state: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(7);
}

fn rounds(state: &mut [u32; 16]) {
    for _ in 0..10 {
        quarter_round(state, 0, 4, 8, 12);
        quarter_round(state, 1, 5, 9, 13);
        quarter_round(state, 2, 6, 10, 14);
        quarter_round(state, 3, 7, 11, 15);

        quarter_round(state, 0, 5, 10, 15);
        quarter_round(state, 1, 6, 11, 12);
        quarter_round(state, 2, 7, 8, 13);
        quarter_round(state, 3, 4, 9, 14);
    }
}

/// Generates a single 64-byte ChaCha20 keystream block for `(key, nonce,
/// counter)`.
#[must_use]
pub fn block(key: &[u8; 32], nonce: &[u8; 12], counter: u32) -> [u8; CHACHA_BLOCK_SIZE] {
    let mut state = [0u32; 16];
    state[0..4].copy_from_slice(&CONSTANTS);
    state[4..12].iter_mut().zip(key.chunks_exact(4)).for_each(|(s, k)| *s = u32::from_le_bytes(k.try_into().unwrap()));
    state[12] = counter;
    state[13..16].iter_mut().zip(nonce.chunks_exact(4)).for_each(|(s, n)| *s = u32::from_le_bytes(n.try_into().unwrap()));

    let original = state;
    rounds(&mut state);
    state.iter_mut().zip(&original).for_each(|(s, o)| *s = s.wrapping_add(*o));

    let mut out = [0u8; CHACHA_BLOCK_SIZE];
    out.chunks_exact_mut(4).zip(&state).for_each(|(chunk, word)| chunk.copy_from_slice(&word.to_le_bytes()));
    out
}

/// XORs `data` in place with the ChaCha20 keystream starting at
/// `initial_counter`. Encryption and decryption are the same operation.
pub fn apply_keystream(key: &[u8; 32], nonce: &[u8; 12], initial_counter: u32, data: &mut [u8]) {
    for (i, chunk) in data.chunks_mut(CHACHA_BLOCK_SIZE).enumerate() {
        let counter = initial_counter.wrapping_add(i as u32);
        let keystream = block(key, nonce, counter);
        chunk.iter_mut().zip(&keystream).for_each(|(b, k)| *b ^= k);
    }
}
