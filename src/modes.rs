//! Cipher modes built on top of the raw block/stream primitives:
//! `ChachaStream` (CTR-like, explicit block counter), `AesEcb`, and
//! `AesCbc` (caller-supplied or randomly-generated IV, either prepended
//! to the ciphertext or kept separate).

use anyhow::{Result, ensure};
use rayon::prelude::*;

use crate::config::{AES_BLOCK_SIZE, CHACHA_BLOCK_SIZE, CHACHA_PARALLEL_CHUNK};
use crate::padding::Padding;
use crate::primitives::aes::AesKey;
use crate::primitives::{chacha, random_bytes};

/// ChaCha20 in the explicit-counter mode the container format relies on
/// for random access: the caller always supplies the starting block
/// counter, never an implicit running state.
pub struct ChachaStream {
    key: [u8; 32],
    nonce: [u8; 12],
}

impl ChachaStream {
    #[must_use]
    pub fn new(key: [u8; 32], nonce: [u8; 12]) -> Self {
        Self { key, nonce }
    }

    /// XORs `data` in place with the keystream starting at `initial_counter`.
    /// Encryption and decryption are the same operation.
    ///
    /// Buffers larger than [`CHACHA_PARALLEL_CHUNK`] are split into
    /// chunk-sized slices and keystreamed on a rayon thread pool, each
    /// chunk computing its own starting block counter from its offset so
    /// the result is identical to a single sequential pass.
    pub fn apply(&self, data: &mut [u8], initial_counter: u32) {
        if data.len() <= CHACHA_PARALLEL_CHUNK {
            chacha::apply_keystream(&self.key, &self.nonce, initial_counter, data);
            return;
        }

        let blocks_per_chunk = (CHACHA_PARALLEL_CHUNK / CHACHA_BLOCK_SIZE) as u32;
        data.par_chunks_mut(CHACHA_PARALLEL_CHUNK).enumerate().for_each(|(i, chunk)| {
            let counter = initial_counter.wrapping_add(blocks_per_chunk.wrapping_mul(i as u32));
            chacha::apply_keystream(&self.key, &self.nonce, counter, chunk);
        });
    }
}

/// AES-ECB: each block independently transformed, PKCS7 padding applied
/// when `do_pad` is set.
pub struct AesEcb {
    key: AesKey,
}

impl AesEcb {
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        Self { key: AesKey::new(key) }
    }

    pub fn encrypt(&self, data: &[u8], do_pad: bool) -> Result<Vec<u8>> {
        let padding = Padding::new(AES_BLOCK_SIZE)?;
        let padded = if do_pad {
            padding.pad(data)
        } else {
            ensure!(data.len() % AES_BLOCK_SIZE == 0, "data length must be a multiple of the block size when do_pad is false");
            data.to_vec()
        };
        let mut out = padded;
        for block in out.chunks_mut(AES_BLOCK_SIZE) {
            let mut b: [u8; AES_BLOCK_SIZE] = block.try_into().expect("chunk is block-sized");
            self.key.encrypt_block(&mut b);
            block.copy_from_slice(&b);
        }
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8], do_pad: bool) -> Result<Vec<u8>> {
        ensure!(!data.is_empty(), "ciphertext cannot be empty");
        ensure!(data.len() % AES_BLOCK_SIZE == 0, "ciphertext length must be a multiple of the block size");
        let mut out = data.to_vec();
        for block in out.chunks_mut(AES_BLOCK_SIZE) {
            let mut b: [u8; AES_BLOCK_SIZE] = block.try_into().expect("chunk is block-sized");
            self.key.decrypt_block(&mut b);
            block.copy_from_slice(&b);
        }
        if do_pad {
            let padding = Padding::new(AES_BLOCK_SIZE)?;
            padding.unpad(&out)
        } else {
            Ok(out)
        }
    }
}

/// AES-CBC. `encrypt` with `implicit = true` generates a random IV and
/// prepends it to the returned ciphertext; with `implicit = false` it
/// uses the caller-supplied IV and does not prepend it. The container
/// format uses the latter, deriving the IV from the salt already stored
/// in the prefix rather than storing a second one.
pub struct AesCbc {
    key: AesKey,
}

impl AesCbc {
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        Self { key: AesKey::new(key) }
    }

    pub fn encrypt(&self, data: &[u8], implicit: bool, iv: Option<[u8; AES_BLOCK_SIZE]>, do_pad: bool) -> Result<Vec<u8>> {
        let iv = match iv {
            Some(iv) => iv,
            None => {
                ensure!(implicit, "explicit IV required when implicit is false");
                random_bytes::<AES_BLOCK_SIZE>()
            }
        };

        let padding = Padding::new(AES_BLOCK_SIZE)?;
        let padded = if do_pad {
            padding.pad(data)
        } else {
            ensure!(data.len() % AES_BLOCK_SIZE == 0, "data length must be a multiple of the block size when do_pad is false");
            data.to_vec()
        };

        let mut out = Vec::with_capacity(if implicit { AES_BLOCK_SIZE + padded.len() } else { padded.len() });
        if implicit {
            out.extend_from_slice(&iv);
        }

        let mut prev = iv;
        for block in padded.chunks(AES_BLOCK_SIZE) {
            let mut b: [u8; AES_BLOCK_SIZE] = block.try_into().expect("chunk is block-sized");
            b.iter_mut().zip(&prev).for_each(|(x, p)| *x ^= p);
            self.key.encrypt_block(&mut b);
            out.extend_from_slice(&b);
            prev = b;
        }
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8], iv: Option<[u8; AES_BLOCK_SIZE]>, do_pad: bool) -> Result<Vec<u8>> {
        let (iv, ciphertext) = match iv {
            Some(iv) => (iv, data),
            None => {
                ensure!(data.len() >= AES_BLOCK_SIZE, "ciphertext too short to contain an IV");
                let (iv_bytes, rest) = data.split_at(AES_BLOCK_SIZE);
                (iv_bytes.try_into().expect("exactly 16 bytes"), rest)
            }
        };
        ensure!(!ciphertext.is_empty(), "ciphertext cannot be empty");
        ensure!(ciphertext.len() % AES_BLOCK_SIZE == 0, "ciphertext length must be a multiple of the block size");

        let mut out = Vec::with_capacity(ciphertext.len());
        let mut prev = iv;
        for block in ciphertext.chunks(AES_BLOCK_SIZE) {
            let cipher_block: [u8; AES_BLOCK_SIZE] = block.try_into().expect("chunk is block-sized");
            let mut plain = cipher_block;
            self.key.decrypt_block(&mut plain);
            plain.iter_mut().zip(&prev).for_each(|(p, iv_b)| *p ^= iv_b);
            out.extend_from_slice(&plain);
            prev = cipher_block;
        }

        if do_pad {
            let padding = Padding::new(AES_BLOCK_SIZE)?;
            padding.unpad(&out)
        } else {
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nist_sp800_38a_cbc_aes128() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv: [u8; 16] = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap().try_into().unwrap();
        let plaintext = hex::decode(
            "6bc1bee22e409f96e93d7e117393172a\
             ae2d8a571e03ac9c9eb76fac45af8e51\
             30c81c46a35ce411e5fbc1191a0a52ef\
             f69f2445df4f9b17ad2b417be66c3710",
        )
        .unwrap();
        let expected = hex::decode(
            "7649abac8119b246cee98e9b12e9197d\
             5086cb9b507219ee95db113a917678b2\
             73bed6b8e3c1743b7116e69e22229516\
             3ff1caa1681fac09120eca307586e1a7",
        )
        .unwrap();

        let cbc = AesCbc::new(&key);
        let ciphertext = cbc.encrypt(&plaintext, false, Some(iv), false).unwrap();
        assert_eq!(ciphertext, expected);

        let decrypted = cbc.decrypt(&ciphertext, Some(iv), false).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ecb_round_trips_with_padding() {
        let key = [0x42u8; 32];
        let ecb = AesEcb::new(&key);
        for len in [0, 1, 15, 16, 17, 33] {
            let data = vec![0xABu8; len];
            let ciphertext = ecb.encrypt(&data, true).unwrap();
            assert_eq!(ciphertext.len() % 16, 0);
            let decrypted = ecb.decrypt(&ciphertext, true).unwrap();
            assert_eq!(decrypted, data);
        }
    }

    #[test]
    fn cbc_implicit_iv_round_trips_and_varies() {
        let key = [0x11u8; 16];
        let cbc = AesCbc::new(&key);
        let data = b"a plaintext that is not block aligned";
        let c1 = cbc.encrypt(data, true, None, true).unwrap();
        let c2 = cbc.encrypt(data, true, None, true).unwrap();
        assert_ne!(c1, c2, "random IV should vary across calls");
        assert_eq!(cbc.decrypt(&c1, None, true).unwrap(), data);
        assert_eq!(cbc.decrypt(&c2, None, true).unwrap(), data);
    }

    #[test]
    fn chacha_stream_parallel_chunking_matches_sequential_output() {
        let stream = ChachaStream::new([5u8; 32], [6u8; 12]);
        let len = crate::config::CHACHA_PARALLEL_CHUNK * 3 + 777;

        let mut sequential = vec![0u8; len];
        chacha::apply_keystream(&[5u8; 32], &[6u8; 12], 1, &mut sequential);

        let mut parallel = vec![0u8; len];
        stream.apply(&mut parallel, 1);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn chacha_stream_ciphertext_len_equals_plaintext_len() {
        let stream = ChachaStream::new([3u8; 32], [4u8; 12]);
        let mut data = b"Hello, world!\n".to_vec();
        let original_len = data.len();
        stream.apply(&mut data, 1);
        assert_eq!(data.len(), original_len);
        stream.apply(&mut data, 1);
        assert_eq!(data, b"Hello, world!\n");
    }
}
