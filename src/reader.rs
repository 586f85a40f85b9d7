//! The random-access reader: a seekable view onto a `chacha-stm-sha`
//! container's plaintext, addressable at arbitrary byte offsets without
//! decrypting the whole file up front. This is what lets a ZIP reader
//! locate the central directory and open members individually.
//!
//! State machine: `{opened, consuming, closed}`. Construction transitions
//! straight from nothing to `opened` (after tag verification) or fails
//! outright; `read`/`seek` operate in `consuming` (folded into the same
//! active state here, since nothing distinguishes them operationally);
//! `close` moves to `closed`, after which every operation errors.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use subtle::ConstantTimeEq;

use crate::config::{self, CHACHA_BLOCK_SIZE, HMAC_CHUNK_SIZE, PACKER_INITIAL_COUNTER, PREFIX_SIZE, Triple};
use crate::error::{NescientError, Result};
use crate::header;
use crate::kdf;
use crate::mac;
use crate::modes::ChachaStream;

#[derive(Debug, PartialEq, Eq)]
enum State {
    Active,
    Closed,
}

/// An authenticated, seekable byte source over a container's plaintext.
pub struct RandomAccessReader {
    file: File,
    key: [u8; 32],
    nonce: [u8; config::CHACHA_NONCE_SIZE],
    needle: u64,
    plaintext_size: u64,
    state: State,
}

impl RandomAccessReader {
    /// Opens `path`, verifies it against `password`, and returns a
    /// reader positioned at the start of the plaintext.
    ///
    /// Only `chacha-stm-sha` containers support random access; any
    /// other triple is rejected with [`NescientError::Param`], matching
    /// the block-counter addressing this reader depends on.
    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < PREFIX_SIZE as u64 {
            return Err(NescientError::format(format!("container shorter than the {PREFIX_SIZE}-byte fixed prefix")));
        }

        let mut prefix_buf = vec![0u8; PREFIX_SIZE];
        file.read_exact(&mut prefix_buf)?;
        let prefix = header::parse(&prefix_buf)?;

        if prefix.triple != Triple::DEFAULT {
            return Err(NescientError::param("random-access reading is only supported for chacha-stm-sha containers"));
        }

        let key_bytes = kdf::derive(password, &prefix.salt, prefix.triple.alg.key_len());
        let key: [u8; 32] = key_bytes.try_into().expect("chacha key is always 32 bytes");
        let nonce: [u8; config::CHACHA_NONCE_SIZE] = prefix.salt[..config::CHACHA_NONCE_SIZE].try_into().expect("salt is at least 12 bytes");

        let plaintext_size = file_len - PREFIX_SIZE as u64;
        let chunk_size = HMAC_CHUNK_SIZE.min(usize::try_from(plaintext_size.max(1)).unwrap_or(HMAC_CHUNK_SIZE));

        let header_and_salt = &prefix_buf[..config::HEADER_SIZE + config::SALT_SIZE];
        file.seek(SeekFrom::Start(PREFIX_SIZE as u64))?;
        let computed = mac::compute_streaming(&key, header_and_salt, &mut file, chunk_size).map_err(|e| NescientError::format(e.to_string()))?;
        if !bool::from(computed.ct_eq(&prefix.tag)) {
            tracing::debug!("authentication tag mismatch while opening random-access reader");
            return Err(NescientError::Auth);
        }

        Ok(Self { file, key, nonce, needle: 0, plaintext_size, state: State::Active })
    }

    /// The current logical offset into the plaintext.
    #[must_use]
    pub fn tell(&self) -> u64 {
        self.needle
    }

    /// The total plaintext size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.plaintext_size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plaintext_size == 0
    }

    /// Transitions the reader to `closed`; every subsequent `read`/`seek`
    /// call returns an error.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    fn ensure_active(&self) -> io::Result<()> {
        match self.state {
            State::Active => Ok(()),
            State::Closed => Err(io::Error::new(io::ErrorKind::Other, "reader is closed")),
        }
    }
}

impl Read for RandomAccessReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_active()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let remaining = self.plaintext_size.saturating_sub(self.needle);
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }

        let block = self.needle / CHACHA_BLOCK_SIZE as u64;
        let offset = (self.needle % CHACHA_BLOCK_SIZE as u64) as usize;

        self.file.seek(SeekFrom::Start(PREFIX_SIZE as u64 + block * CHACHA_BLOCK_SIZE as u64))?;

        let mut ciphertext = vec![0u8; want + offset];
        let mut filled = 0;
        while filled < ciphertext.len() {
            let n = self.file.read(&mut ciphertext[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        ciphertext.truncate(filled);

        let counter = (block as u32).wrapping_add(PACKER_INITIAL_COUNTER);
        let stream = ChachaStream::new(self.key, self.nonce);
        stream.apply(&mut ciphertext, counter);

        let plaintext_start = offset.min(ciphertext.len());
        let produced = &ciphertext[plaintext_start..];
        let take = produced.len().min(buf.len());
        buf[..take].copy_from_slice(&produced[..take]);
        self.needle += take as u64;
        Ok(take)
    }
}

impl Seek for RandomAccessReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.ensure_active()?;
        let new_needle = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(n) => self.plaintext_size as i128 + n as i128,
            SeekFrom::Current(n) => self.needle as i128 + n as i128,
        };
        if new_needle < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative position"));
        }
        self.needle = new_needle as u64;
        Ok(self.needle)
    }
}
