//! Container format and cryptographic constants.
//!
//! This module defines the fixed values that make up the on-disk Nescient
//! container format, along with the cryptographic parameters used to
//! derive keys and authenticate containers. These constants are the
//! single source of truth for the file format specification; changing any
//! of them breaks compatibility with previously packed containers.

/// Magic bytes identifying a Nescient container.
pub const MAGIC_BYTES: &[u8; 4] = b"NESC";

/// On-disk format version, stored as the literal text `MM.mm.pp`.
pub const CURRENT_VERSION: &str = "01.00.00";

/// Size of the magic field in bytes.
pub const MAGIC_SIZE: usize = 4;

/// Size of the version field in bytes.
pub const VERSION_SIZE: usize = 8;

/// Size of the algorithm field in bytes.
pub const ALG_SIZE: usize = 6;

/// Size of the cipher mode field in bytes.
pub const MODE_SIZE: usize = 3;

/// Size of the authentication selector field in bytes.
pub const AUTH_SIZE: usize = 3;

/// Total size of the header (magic ‖ version ‖ alg ‖ mode ‖ auth), in bytes.
pub const HEADER_SIZE: usize = MAGIC_SIZE + VERSION_SIZE + ALG_SIZE + MODE_SIZE + AUTH_SIZE;

/// Size of the per-container salt, in bytes.
///
/// For ChaCha containers the first 12 bytes of the salt double as the
/// stream cipher nonce.
pub const SALT_SIZE: usize = 16;

/// Size of the HMAC-SHA256 authentication tag, in bytes.
pub const TAG_SIZE: usize = 32;

/// Total size of the fixed container prefix: header ‖ salt ‖ tag.
pub const PREFIX_SIZE: usize = HEADER_SIZE + SALT_SIZE + TAG_SIZE;

/// PBKDF2-HMAC-SHA256 iteration count.
///
/// Fixed per container format; not configurable per-container so that
/// every Nescient container derives its key the same way regardless of
/// who wrote it.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Size of the ChaCha20 nonce, in bytes (the first 12 bytes of the salt).
pub const CHACHA_NONCE_SIZE: usize = 12;

/// Block counter the packer starts encryption at.
///
/// Block 0 is reserved by convention; the random-access reader must
/// derive its own counters from this constant, not from a literal `1`,
/// so the two paths can never drift apart.
pub const PACKER_INITIAL_COUNTER: u32 = 1;

/// Size of a ChaCha20 keystream block, in bytes.
pub const CHACHA_BLOCK_SIZE: usize = 64;

/// AES/ChaCha block size used for padding alignment, in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Minimum accepted password length.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Chunk size used when streaming the HMAC over a ciphertext file, in bytes.
pub const HMAC_CHUNK_SIZE: usize = 512 * 1024 * 1024;

/// Chunk size used when generating ChaCha keystream in parallel, in bytes.
///
/// Must be a multiple of [`CHACHA_BLOCK_SIZE`] so each worker can compute
/// its own starting block counter independently.
pub const CHACHA_PARALLEL_CHUNK: usize = 1024 * 1024;

/// Default file extension for packed containers.
pub const FILE_EXTENSION: &str = ".nesc";

/// One supported (algorithm, mode, auth) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Aes128,
    Aes192,
    Aes256,
    ChaCha,
}

impl Algorithm {
    /// The 6-byte wire tag for this algorithm.
    #[must_use]
    pub const fn tag(self) -> &'static [u8; ALG_SIZE] {
        match self {
            Self::Aes128 => b"aes128",
            Self::Aes192 => b"aes192",
            Self::Aes256 => b"aes256",
            Self::ChaCha => b"chacha",
        }
    }

    /// The derived key length in bytes for this algorithm.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
            Self::ChaCha => 32,
        }
    }

    /// Parses a 6-byte wire tag into an `Algorithm`.
    #[must_use]
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"aes128" => Some(Self::Aes128),
            b"aes192" => Some(Self::Aes192),
            b"aes256" => Some(Self::Aes256),
            b"chacha" => Some(Self::ChaCha),
            _ => None,
        }
    }
}

/// The cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Cbc,
    Ecb,
    Stream,
}

impl CipherMode {
    /// The 3-byte wire tag for this mode.
    #[must_use]
    pub const fn tag(self) -> &'static [u8; MODE_SIZE] {
        match self {
            Self::Cbc => b"cbc",
            Self::Ecb => b"ecb",
            Self::Stream => b"stm",
        }
    }

    /// Parses a 3-byte wire tag into a `CipherMode`.
    #[must_use]
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"cbc" => Some(Self::Cbc),
            b"ecb" => Some(Self::Ecb),
            b"stm" => Some(Self::Stream),
            _ => None,
        }
    }
}

/// The authentication selector. Only HMAC-SHA256 is currently defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Sha,
}

impl AuthMode {
    /// The 3-byte wire tag for this auth mode.
    #[must_use]
    pub const fn tag(self) -> &'static [u8; AUTH_SIZE] {
        match self {
            Self::Sha => b"sha",
        }
    }

    /// Parses a 3-byte wire tag into an `AuthMode`.
    #[must_use]
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"sha" => Some(Self::Sha),
            _ => None,
        }
    }
}

/// A validated (algorithm, mode, auth) triple, e.g. `chacha-stm-sha`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub alg: Algorithm,
    pub mode: CipherMode,
    pub auth: AuthMode,
}

impl Triple {
    /// The default packing triple, `chacha-stm-sha`.
    pub const DEFAULT: Self = Self { alg: Algorithm::ChaCha, mode: CipherMode::Stream, auth: AuthMode::Sha };

    /// Validates that `(alg, mode, auth)` is one of the recognised
    /// combinations from spec §6: `chacha` requires `stm`, and the
    /// `aesNNN` algorithms support `ecb` and `cbc`.
    #[must_use]
    pub const fn new(alg: Algorithm, mode: CipherMode, auth: AuthMode) -> Option<Self> {
        let mode_ok = match alg {
            Algorithm::ChaCha => matches!(mode, CipherMode::Stream),
            Algorithm::Aes128 | Algorithm::Aes192 | Algorithm::Aes256 => matches!(mode, CipherMode::Cbc | CipherMode::Ecb),
        };
        if !mode_ok {
            return None;
        }
        match auth {
            AuthMode::Sha => Some(Self { alg, mode, auth }),
        }
    }

    /// Parses a hyphenated triple string such as `"aes256-cbc-sha"`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('-');
        let alg = Algorithm::from_tag(parts.next()?.as_bytes())?;
        let mode = CipherMode::from_tag(parts.next()?.as_bytes())?;
        let auth = AuthMode::from_tag(parts.next()?.as_bytes())?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(alg, mode, auth)
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", std::str::from_utf8(self.alg.tag()).unwrap(), std::str::from_utf8(self.mode.tag()).unwrap(), std::str::from_utf8(self.auth.tag()).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_triple_is_chacha_stream_sha() {
        assert_eq!(Triple::DEFAULT.to_string(), "chacha-stm-sha");
    }

    #[test]
    fn chacha_rejects_non_stream_modes() {
        assert!(Triple::new(Algorithm::ChaCha, CipherMode::Cbc, AuthMode::Sha).is_none());
        assert!(Triple::new(Algorithm::ChaCha, CipherMode::Ecb, AuthMode::Sha).is_none());
    }

    #[test]
    fn aes_rejects_stream_mode() {
        assert!(Triple::new(Algorithm::Aes256, CipherMode::Stream, AuthMode::Sha).is_none());
    }

    #[test]
    fn parse_round_trips_all_supported_triples() {
        for s in ["aes128-ecb-sha", "aes128-cbc-sha", "aes192-ecb-sha", "aes192-cbc-sha", "aes256-ecb-sha", "aes256-cbc-sha", "chacha-stm-sha"] {
            let triple = Triple::parse(s).unwrap_or_else(|| panic!("{s} should parse"));
            assert_eq!(triple.to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_unknown_tags() {
        assert!(Triple::parse("foo000-stm-sha").is_none());
        assert!(Triple::parse("chacha-cbc-sha").is_none());
        assert!(Triple::parse("chacha-stm-md5").is_none());
        assert!(Triple::parse("chacha-stm").is_none());
    }
}
