//! The structured error type returned by the public container API.
//!
//! Internal helpers use `anyhow::Result` with `.context(...)` the way the
//! rest of this crate does; at the module boundary (header parsing, key
//! derivation, container pack/unpack) those errors are folded into one of
//! these variants. `Auth` is intentionally a single opaque kind: the
//! caller must never be able to distinguish a wrong password from a
//! tampered or corrupted container.

use thiserror::Error;

/// Errors returned by the Nescient container API.
#[derive(Error, Debug)]
pub enum NescientError {
    /// Unsupported algorithm/mode/auth selector, bad key length, or a
    /// password that cannot be encoded.
    #[error("invalid parameter: {0}")]
    Param(String),

    /// Missing magic, a buffer shorter than the fixed prefix, or any
    /// other structurally invalid container.
    #[error("invalid container format: {0}")]
    Format(String),

    /// HMAC tag mismatch. Deliberately carries no detail beyond this
    /// message — wrong password, tampering, and corruption are all
    /// reported identically.
    #[error("authentication failed")]
    Auth,

    /// An underlying filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NescientError>;

impl NescientError {
    pub(crate) fn param(msg: impl Into<String>) -> Self {
        Self::Param(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}
