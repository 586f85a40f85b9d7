//! PKCS7-style padding for block cipher alignment.
//!
//! Padding always appends at least one byte, even when the input is
//! already a multiple of the block size — in that case a full block of
//! padding is appended. Unpadding trusts the final byte: it reads the
//! padding length `n` from the last byte and removes the last `n` bytes
//! without re-validating the padding byte values. This matches the
//! original container format's padding behavior rather than the stricter
//! RFC 5652 validation some PKCS7 implementations perform.

use anyhow::{Result, anyhow, ensure};

/// Applies and removes padding at a fixed block size.
pub struct Padding {
    block_size: usize,
}

impl Padding {
    /// Creates a `Padding` for the given block size (1..=255).
    pub fn new(block_size: usize) -> Result<Self> {
        ensure!(block_size > 0, "block size must be greater than 0");
        ensure!(block_size <= 255, "block size must be <= 255 for PKCS7");
        Ok(Self { block_size })
    }

    /// Pads `data` to a multiple of the block size.
    ///
    /// If `data.len()` is already a multiple of the block size, a full
    /// block of padding is appended.
    pub fn pad(&self, data: &[u8]) -> Vec<u8> {
        let padding_len = self.block_size - (data.len() % self.block_size);
        data.iter().copied().chain(std::iter::repeat_n(padding_len as u8, padding_len)).collect()
    }

    /// Removes padding from `data`.
    ///
    /// Reads the last byte as the padding length and removes that many
    /// bytes from the end. Does not verify that the removed bytes all
    /// equal the padding length — a corrupted or tampered container is
    /// caught earlier by the HMAC tag, not by padding validation.
    pub fn unpad(&self, data: &[u8]) -> Result<Vec<u8>> {
        let padding_len = data.last().copied().ok_or_else(|| anyhow!("cannot unpad empty data"))?;
        let padding_len = padding_len as usize;
        ensure!(padding_len >= 1 && padding_len <= data.len(), "invalid padding length: {padding_len}");
        Ok(data[..data.len() - padding_len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_input_to_block_size() {
        let padding = Padding::new(16).unwrap();
        let padded = padding.pad(b"HELLO");
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[5..], &[11u8; 11]);
    }

    #[test]
    fn pads_full_block_with_a_whole_extra_block() {
        let padding = Padding::new(16).unwrap();
        let data = [0u8; 16];
        let padded = padding.pad(&data);
        assert_eq!(padded.len(), 32);
        assert_eq!(&padded[16..], &[16u8; 16]);
    }

    #[test]
    fn round_trips() {
        let padding = Padding::new(16).unwrap();
        for len in 0..40 {
            let data = vec![0xABu8; len];
            let padded = padding.pad(&data);
            assert_eq!(padded.len() % 16, 0);
            let unpadded = padding.unpad(&padded).unwrap();
            assert_eq!(unpadded, data);
        }
    }

    #[test]
    fn unpad_does_not_validate_padding_byte_values() {
        let padding = Padding::new(16).unwrap();
        let mut padded = padding.pad(b"HELLO");
        let last = padded.len() - 1;
        padded[last - 1] = 0xFF;
        let unpadded = padding.unpad(&padded).unwrap();
        assert_eq!(unpadded, b"HELLO");
    }

    #[test]
    fn unpad_rejects_empty_input() {
        let padding = Padding::new(16).unwrap();
        assert!(padding.unpad(&[]).is_err());
    }

    #[test]
    fn unpad_rejects_padding_length_exceeding_data_length() {
        let padding = Padding::new(16).unwrap();
        assert!(padding.unpad(&[5]).is_err());
    }
}
