//! Typed failures of the safe core.
//!
//! Everything under `core` returns these; the CLI wraps them in `anyhow`
//! and decides whether to report and exit.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafeError {
    /// The safe file does not exist.
    #[error("no safe found at {}", path.display())]
    NoSafe { path: PathBuf },

    /// Create was requested but a safe file is already present.
    #[error("safe already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// The envelope is not well-formed armor or has an invalid header.
    #[error("malformed safe envelope: {0}")]
    Format(String),

    /// Wrong password, or the ciphertext was corrupted or tampered with.
    /// The two cases are not distinguished.
    #[error("unable to unlock safe with provided password")]
    Authentication,

    /// The decrypted plaintext is not a valid safe document.
    #[error("malformed safe contents: {0}")]
    Decode(String),

    #[error("credential with alias '{0}' already exists")]
    DuplicateAlias(String),

    #[error("credential with alias '{0}' does not exist")]
    NotFound(String),

    #[error("invalid alias: {0}")]
    InvalidAlias(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("read safe {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write safe {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The password source itself failed (prompt aborted, stdin closed).
    #[error("password unavailable: {0}")]
    PasswordSource(String),
}

pub type Result<T> = std::result::Result<T, SafeError>;
