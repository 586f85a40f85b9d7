//! The container codec: whole-buffer pack/unpack, file-level wrappers,
//! and the output-path derivation the CLI and file API share.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::{self, Algorithm, CipherMode, FILE_EXTENSION, PACKER_INITIAL_COUNTER, Triple};
use crate::error::{NescientError, Result};
use crate::header;
use crate::kdf;
use crate::mac::Hasher;
use crate::modes::{AesCbc, AesEcb, ChachaStream};
use crate::primitives::random_bytes;
use crate::reader::RandomAccessReader;

/// Encrypts `plaintext` under `password` using `triple`, returning a
/// complete container: header ‖ salt ‖ tag ‖ ciphertext.
pub fn pack(plaintext: &[u8], password: &[u8], triple: Triple) -> Result<Vec<u8>> {
    pack_with_salt(plaintext, password, triple, random_bytes::<{ config::SALT_SIZE }>())
}

/// Like [`pack`] but with a caller-supplied salt instead of a random one.
///
/// Exists for reproducible tests and the CLI's hidden `-nr` flag; regular
/// callers should use [`pack`] so every container gets a fresh salt.
pub fn pack_with_salt(plaintext: &[u8], password: &[u8], triple: Triple, salt: [u8; config::SALT_SIZE]) -> Result<Vec<u8>> {
    let header_bytes = header::serialize(triple);
    let key = kdf::derive(password, &salt, triple.alg.key_len());

    let ciphertext = encrypt(plaintext, &key, &salt, triple).map_err(|e| NescientError::format(e.to_string()))?;

    let hasher = Hasher::new(&key);
    let tag = hasher.compute(&[&header_bytes, &salt, &ciphertext]).map_err(|e| NescientError::format(e.to_string()))?;

    let mut out = Vec::with_capacity(config::PREFIX_SIZE + ciphertext.len());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&tag);
    out.extend_from_slice(&ciphertext);
    tracing::debug!(alg = %triple, plaintext_len = plaintext.len(), "packed container");
    Ok(out)
}

/// Verifies the tag and decrypts a complete container produced by [`pack`].
///
/// Verification always happens before decryption; on tag mismatch no
/// plaintext is produced.
pub fn unpack(container: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let prefix = header::parse(container)?;
    let ciphertext = &container[config::PREFIX_SIZE..];

    let key = kdf::derive(password, &prefix.salt, prefix.triple.alg.key_len());

    let hasher = Hasher::new(&key);
    hasher.verify(&prefix.tag, &[&prefix.header_bytes, &prefix.salt, ciphertext]).map_err(|_| {
        tracing::debug!("authentication tag mismatch during unpack");
        NescientError::Auth
    })?;

    decrypt(ciphertext, &key, &prefix.salt, prefix.triple).map_err(|e| NescientError::format(e.to_string()))
}

fn encrypt(plaintext: &[u8], key: &[u8], salt: &[u8; config::SALT_SIZE], triple: Triple) -> anyhow::Result<Vec<u8>> {
    match (triple.alg, triple.mode) {
        (Algorithm::ChaCha, CipherMode::Stream) => {
            let nonce: [u8; config::CHACHA_NONCE_SIZE] = salt[..config::CHACHA_NONCE_SIZE].try_into().expect("salt is at least 12 bytes");
            let key: [u8; 32] = key.try_into().map_err(|_| anyhow::anyhow!("chacha key must be 32 bytes, got {}", key.len()))?;
            let stream = ChachaStream::new(key, nonce);
            let mut buf = plaintext.to_vec();
            stream.apply(&mut buf, PACKER_INITIAL_COUNTER);
            Ok(buf)
        }
        (_, CipherMode::Ecb) => AesEcb::new(key).encrypt(plaintext, true),
        (_, CipherMode::Cbc) => AesCbc::new(key).encrypt(plaintext, false, Some(*salt), true),
        (Algorithm::ChaCha, _) | (_, CipherMode::Stream) => anyhow::bail!("chacha requires stream mode and aesNNN cannot use it"),
    }
}

fn decrypt(ciphertext: &[u8], key: &[u8], salt: &[u8; config::SALT_SIZE], triple: Triple) -> anyhow::Result<Vec<u8>> {
    match (triple.alg, triple.mode) {
        (Algorithm::ChaCha, CipherMode::Stream) => {
            let nonce: [u8; config::CHACHA_NONCE_SIZE] = salt[..config::CHACHA_NONCE_SIZE].try_into().expect("salt is at least 12 bytes");
            let key: [u8; 32] = key.try_into().map_err(|_| anyhow::anyhow!("chacha key must be 32 bytes, got {}", key.len()))?;
            let stream = ChachaStream::new(key, nonce);
            let mut buf = ciphertext.to_vec();
            stream.apply(&mut buf, PACKER_INITIAL_COUNTER);
            Ok(buf)
        }
        (_, CipherMode::Ecb) => AesEcb::new(key).decrypt(ciphertext, true),
        (_, CipherMode::Cbc) => AesCbc::new(key).decrypt(ciphertext, Some(*salt), true),
        (Algorithm::ChaCha, _) | (_, CipherMode::Stream) => anyhow::bail!("chacha requires stream mode and aesNNN cannot use it"),
    }
}

/// Computes the default output path for a pack or unpack operation when
/// the caller did not supply one explicitly.
///
/// Packing appends [`FILE_EXTENSION`]; unpacking strips it if present.
/// When `outdir` is given, the basename is joined into it instead of
/// sitting alongside the input.
#[must_use]
pub fn derive_output_path(in_path: &Path, outdir: Option<&Path>, packing: bool) -> PathBuf {
    let file_name = in_path.file_name().map_or_else(|| in_path.to_owned(), PathBuf::from);

    let default_name = if packing {
        let mut name = file_name.into_os_string();
        name.push(FILE_EXTENSION);
        PathBuf::from(name)
    } else {
        let name = file_name.to_string_lossy();
        PathBuf::from(name.strip_suffix(FILE_EXTENSION).unwrap_or(&name))
    };

    match outdir {
        Some(dir) => dir.join(default_name.file_name().unwrap_or(default_name.as_os_str())),
        None => in_path.with_file_name(default_name),
    }
}

/// Writes `data` to `destination` atomically: the bytes land in a temp
/// file created alongside `destination` and are only made visible at
/// that path by a final rename, so a process crash mid-write can never
/// leave a truncated or partially-written file there.
pub(crate) fn write_atomically(destination: &Path, data: &[u8]) -> Result<()> {
    let dir = destination.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(destination).map_err(|e| NescientError::Io(e.error))?;
    Ok(())
}

/// Reads `in_path` fully into memory, packs it, and writes the result to
/// the derived or explicit output path.
pub fn pack_file(in_path: &Path, out_path: Option<&Path>, password: &[u8], triple: Triple, overwrite: bool) -> Result<PathBuf> {
    let plaintext = fs::read(in_path)?;
    let container = pack(&plaintext, password, triple)?;
    let destination = out_path.map_or_else(|| derive_output_path(in_path, None, true), Path::to_owned);
    write_atomically(&destination, &container)?;
    if overwrite && destination != in_path {
        fs::remove_file(in_path)?;
    }
    Ok(destination)
}

/// Unpacks `in_path` and writes the recovered plaintext to the derived
/// or explicit output path, writing it atomically.
///
/// `chacha-stm-sha` containers never load the whole ciphertext into
/// memory: the authentication tag is verified over chunked reads and the
/// plaintext is produced block by block through [`RandomAccessReader`],
/// so a multi-gigabyte file never requires a matching in-memory buffer.
/// AES-ECB/CBC containers decrypt whole-buffer, since CBC's block
/// chaining and ECB's simplicity give no streaming benefit worth the
/// extra code path.
pub fn unpack_file(in_path: &Path, out_path: Option<&Path>, password: &[u8], overwrite: bool) -> Result<PathBuf> {
    let destination = out_path.map_or_else(|| derive_output_path(in_path, None, false), Path::to_owned);
    let dir = destination.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));

    let mut prefix_buf = vec![0u8; config::PREFIX_SIZE];
    {
        use std::io::Read;
        let mut probe = fs::File::open(in_path)?;
        probe.read_exact(&mut prefix_buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                NescientError::format(format!("container shorter than the {}-byte fixed prefix", config::PREFIX_SIZE))
            } else {
                NescientError::Io(e)
            }
        })?;
    }
    let prefix = header::parse(&prefix_buf)?;

    if prefix.triple == Triple::DEFAULT {
        let mut reader = RandomAccessReader::open(in_path, password)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        io::copy(&mut reader, &mut tmp)?;
        tmp.persist(&destination).map_err(|e| NescientError::Io(e.error))?;
    } else {
        let container = fs::read(in_path)?;
        let plaintext = unpack(&container, password)?;
        write_atomically(&destination, &plaintext)?;
    }

    if overwrite && destination != in_path {
        fs::remove_file(in_path)?;
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plaintext_round_trips_to_72_byte_container() {
        let container = pack(b"", b"hunter2", Triple::DEFAULT).unwrap();
        assert_eq!(container.len(), config::PREFIX_SIZE);
        assert_eq!(unpack(&container, b"hunter2").unwrap(), b"");
    }

    #[test]
    fn literal_scenario_chacha_hunter2_hello_world() {
        let header_bytes = header::serialize(Triple::DEFAULT);
        let salt: [u8; 16] = hex::decode("01020304050607080910111213141516").unwrap().try_into().unwrap();
        let key = kdf::derive(b"hunter2", &salt, Algorithm::ChaCha.key_len());
        let plaintext = b"Hello, world!\n";

        let ciphertext = encrypt(plaintext, &key, &salt, Triple::DEFAULT).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());

        let hasher = Hasher::new(&key);
        let tag = hasher.compute(&[&header_bytes, &salt, &ciphertext]).unwrap();

        let mut container = Vec::new();
        container.extend_from_slice(&header_bytes);
        container.extend_from_slice(&salt);
        container.extend_from_slice(&tag);
        container.extend_from_slice(&ciphertext);
        assert_eq!(container.len(), 86);

        assert_eq!(unpack(&container, b"hunter2").unwrap(), plaintext);
    }

    #[test]
    fn literal_scenario_aes256_cbc_same_inputs() {
        let triple = Triple::new(Algorithm::Aes256, CipherMode::Cbc, crate::config::AuthMode::Sha).unwrap();
        let container = pack(b"Hello, world!\n", b"hunter2", triple).unwrap();
        assert_eq!(container.len(), config::PREFIX_SIZE + 16);
        assert_eq!(unpack(&container, b"hunter2").unwrap(), b"Hello, world!\n");

        for bit in 0..container.len() * 8 {
            let mut tampered = container.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            assert!(unpack(&tampered, b"hunter2").is_err());
        }
    }

    #[test]
    fn flipping_any_bit_in_prefix_or_ciphertext_breaks_authentication() {
        let container = pack(b"some plaintext of moderate length here", b"pw", Triple::DEFAULT).unwrap();
        let mut tampered = container.clone();
        tampered[10] ^= 0x01;
        assert!(matches!(unpack(&tampered, b"pw"), Err(NescientError::Auth)));
    }

    #[test]
    fn unpack_rejects_short_buffer_with_format_error() {
        assert!(matches!(unpack(&[0u8; 10], b"pw"), Err(NescientError::Format(_))));
    }

    #[test]
    fn unpack_rejects_unknown_algorithm_tag_before_any_derivation() {
        let mut container = pack(b"data", b"pw", Triple::DEFAULT).unwrap();
        container[12..18].copy_from_slice(b"foo000");
        assert!(matches!(unpack(&container, b"pw"), Err(NescientError::Param(_))));
    }

    #[test]
    fn two_packs_of_same_plaintext_differ_but_both_unpack_correctly() {
        let a = pack(b"same plaintext", b"pw", Triple::DEFAULT).unwrap();
        let b = pack(b"same plaintext", b"pw", Triple::DEFAULT).unwrap();
        assert_ne!(a, b);
        assert_eq!(unpack(&a, b"pw").unwrap(), b"same plaintext");
        assert_eq!(unpack(&b, b"pw").unwrap(), b"same plaintext");
    }

    #[test]
    fn derive_output_path_appends_and_strips_extension() {
        let input = Path::new("/tmp/report.pdf");
        assert_eq!(derive_output_path(input, None, true), Path::new("/tmp/report.pdf.nesc"));

        let packed = Path::new("/tmp/report.pdf.nesc");
        assert_eq!(derive_output_path(packed, None, false), Path::new("/tmp/report.pdf"));
    }

    #[test]
    fn derive_output_path_honors_outdir() {
        let input = Path::new("/tmp/report.pdf");
        let outdir = Path::new("/out");
        assert_eq!(derive_output_path(input, Some(outdir), true), Path::new("/out/report.pdf.nesc"));
    }

    #[test]
    fn pack_file_and_unpack_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("secret.txt");
        std::fs::write(&input, b"top secret contents").unwrap();

        let packed_path = pack_file(&input, None, b"pw", Triple::DEFAULT, false).unwrap();
        assert!(packed_path.exists());

        let unpacked_path = unpack_file(&packed_path, None, b"pw", false).unwrap();
        assert_eq!(std::fs::read(&unpacked_path).unwrap(), b"top secret contents");
    }
}
