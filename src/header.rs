//! The 24-byte container header: magic, version, and the (alg, mode,
//! auth) triple. Parsing also covers the salt and auth tag that
//! immediately follow it, since together they make up the container's
//! fixed 72-byte prefix.

use crate::config::{self, AuthMode, Algorithm, CipherMode, PREFIX_SIZE, SALT_SIZE, TAG_SIZE, Triple};
use crate::error::{NescientError, Result};

/// The parsed fixed prefix of a container: header, salt, and auth tag.
pub struct Prefix {
    pub triple: Triple,
    pub version: String,
    pub header_bytes: [u8; config::HEADER_SIZE],
    pub salt: [u8; SALT_SIZE],
    pub tag: [u8; TAG_SIZE],
}

/// Serializes the 24-byte header text for `triple` at [`config::CURRENT_VERSION`].
#[must_use]
pub fn serialize(triple: Triple) -> [u8; config::HEADER_SIZE] {
    let mut out = [0u8; config::HEADER_SIZE];
    out[..config::MAGIC_SIZE].copy_from_slice(config::MAGIC_BYTES);
    out[config::MAGIC_SIZE..config::MAGIC_SIZE + config::VERSION_SIZE].copy_from_slice(config::CURRENT_VERSION.as_bytes());
    let mut offset = config::MAGIC_SIZE + config::VERSION_SIZE;
    out[offset..offset + config::ALG_SIZE].copy_from_slice(triple.alg.tag());
    offset += config::ALG_SIZE;
    out[offset..offset + config::MODE_SIZE].copy_from_slice(triple.mode.tag());
    offset += config::MODE_SIZE;
    out[offset..offset + config::AUTH_SIZE].copy_from_slice(triple.auth.tag());
    out
}

/// Parses the fixed 72-byte prefix (header ‖ salt ‖ tag) from the start
/// of `data`. `data` may be longer (the ciphertext follows) but not
/// shorter.
pub fn parse(data: &[u8]) -> Result<Prefix> {
    if data.len() < PREFIX_SIZE {
        return Err(NescientError::format(format!("container shorter than the {PREFIX_SIZE}-byte fixed prefix: got {} bytes", data.len())));
    }

    let magic = &data[0..config::MAGIC_SIZE];
    if magic != config::MAGIC_BYTES {
        return Err(NescientError::format("bad magic bytes"));
    }

    let mut offset = config::MAGIC_SIZE;
    let version = std::str::from_utf8(&data[offset..offset + config::VERSION_SIZE])
        .map_err(|_| NescientError::format("version field is not valid UTF-8"))?
        .to_owned();
    offset += config::VERSION_SIZE;

    if version.as_str() > config::CURRENT_VERSION {
        tracing::warn!(container_version = %version, running_version = config::CURRENT_VERSION, "container was written by a newer format version");
    }

    let alg = Algorithm::from_tag(&data[offset..offset + config::ALG_SIZE]).ok_or_else(|| NescientError::param("unsupported algorithm tag"))?;
    offset += config::ALG_SIZE;
    let mode = CipherMode::from_tag(&data[offset..offset + config::MODE_SIZE]).ok_or_else(|| NescientError::param("unsupported cipher mode tag"))?;
    offset += config::MODE_SIZE;
    let auth = AuthMode::from_tag(&data[offset..offset + config::AUTH_SIZE]).ok_or_else(|| NescientError::param("unsupported auth tag"))?;
    offset += config::AUTH_SIZE;

    let triple = Triple::new(alg, mode, auth).ok_or_else(|| NescientError::param(format!("unsupported (alg, mode, auth) combination: {alg:?}/{mode:?}/{auth:?}")))?;

    let header_bytes: [u8; config::HEADER_SIZE] = data[..config::HEADER_SIZE].try_into().expect("checked length above");

    let salt: [u8; SALT_SIZE] = data[offset..offset + SALT_SIZE].try_into().expect("checked length above");
    offset += SALT_SIZE;
    let tag: [u8; TAG_SIZE] = data[offset..offset + TAG_SIZE].try_into().expect("checked length above");

    Ok(Prefix { triple, version, header_bytes, salt, tag })
}
