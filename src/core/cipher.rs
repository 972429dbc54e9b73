//! Password-based authenticated encryption of the safe payload.
//!
//! Argon2id derives a 256-bit key from the master password; XChaCha20-Poly1305
//! seals the payload with the binary header as associated data. The result is
//! base64 armored so the safe file stays plain text.
//!
//! Envelope layout before armoring:
//!
//! ```text
//! "PICK" | version u8 | m_kib u32le | t u32le | p u32le | salt[16] | nonce[24] | ciphertext+tag
//! ```

use crate::constants;
use crate::core::password::{OneShot, PasswordSource};
use crate::error::{Result, SafeError};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as Base64, Engine};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 4 + 1 + 3 * 4 + SALT_LEN + NONCE_LEN;

/// Argon2id cost parameters. Also the `[kdf]` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: constants::DEFAULT_KDF_MEMORY_KIB,
            iterations: constants::DEFAULT_KDF_ITERATIONS,
            parallelism: constants::DEFAULT_KDF_PARALLELISM,
        }
    }
}

impl KdfParams {
    /// Check the parameters against the accepted bounds.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=constants::KDF_PARALLELISM_MAX).contains(&self.parallelism) {
            return Err(format!(
                "kdf parallelism {} out of range 1..={}",
                self.parallelism,
                constants::KDF_PARALLELISM_MAX
            ));
        }
        if !(1..=constants::KDF_ITERATIONS_MAX).contains(&self.iterations) {
            return Err(format!(
                "kdf iterations {} out of range 1..={}",
                self.iterations,
                constants::KDF_ITERATIONS_MAX
            ));
        }
        // Argon2 needs at least 8 KiB per lane.
        let min_memory = constants::KDF_MEMORY_MIN_KIB.max(8 * self.parallelism);
        if !(min_memory..=constants::KDF_MEMORY_MAX_KIB).contains(&self.memory_kib) {
            return Err(format!(
                "kdf memory {} KiB out of range {}..={}",
                self.memory_kib,
                min_memory,
                constants::KDF_MEMORY_MAX_KIB
            ));
        }
        Ok(())
    }
}

struct Header {
    params: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
}

impl Header {
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(constants::ENVELOPE_MAGIC);
        out.push(constants::ENVELOPE_VERSION);
        out.extend_from_slice(&self.params.memory_kib.to_le_bytes());
        out.extend_from_slice(&self.params.iterations.to_le_bytes());
        out.extend_from_slice(&self.params.parallelism.to_le_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out
    }

    /// Split a decoded envelope into its header and sealed payload.
    fn parse(blob: &[u8]) -> Result<(Self, &[u8])> {
        if blob.len() < HEADER_LEN + TAG_LEN {
            return Err(SafeError::Format("envelope truncated".into()));
        }
        if &blob[..4] != constants::ENVELOPE_MAGIC {
            return Err(SafeError::Format("not a pick safe envelope".into()));
        }
        let version = blob[4];
        if version != constants::ENVELOPE_VERSION {
            return Err(SafeError::Format(format!(
                "unsupported envelope version {}",
                version
            )));
        }
        let read_u32 =
            |at: usize| u32::from_le_bytes([blob[at], blob[at + 1], blob[at + 2], blob[at + 3]]);
        let params = KdfParams {
            memory_kib: read_u32(5),
            iterations: read_u32(9),
            parallelism: read_u32(13),
        };
        params.validate().map_err(SafeError::Format)?;

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&blob[17..17 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&blob[17 + SALT_LEN..HEADER_LEN]);

        Ok((
            Self {
                params,
                salt,
                nonce,
            },
            &blob[HEADER_LEN..],
        ))
    }
}

/// Encrypt `plaintext` under `password` and return the armored envelope.
pub fn encrypt(plaintext: &[u8], password: &[u8], params: &KdfParams) -> Result<String> {
    params.validate().map_err(SafeError::Encryption)?;

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);
    let header = Header {
        params: *params,
        salt,
        nonce,
    };
    let header_bytes = header.to_bytes();

    let key = derive_key(password, &header.salt, &header.params).map_err(SafeError::Encryption)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| SafeError::Encryption(e.to_string()))?;
    let sealed = cipher
        .encrypt(
            XNonce::from_slice(&header.nonce),
            Payload {
                msg: plaintext,
                aad: &header_bytes,
            },
        )
        .map_err(|_| SafeError::Encryption("seal payload".into()))?;

    let mut blob = header_bytes;
    blob.extend_from_slice(&sealed);
    Ok(armor(&blob))
}

/// Decrypt an armored envelope.
///
/// The armor and header are validated before `source` is consulted, and
/// `source` is asked exactly once. A password that does not authenticate the
/// payload is an immediate [`SafeError::Authentication`].
pub fn decrypt(envelope: &str, source: &mut dyn PasswordSource) -> Result<Zeroizing<Vec<u8>>> {
    let blob = dearmor(envelope)?;
    let (header, sealed) = Header::parse(&blob)?;

    let mut guard = OneShot::new(source);
    let password = guard.take()?;

    let key = derive_key(password.as_bytes(), &header.salt, &header.params)
        .map_err(SafeError::Format)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| SafeError::Format(e.to_string()))?;
    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(&header.nonce),
            Payload {
                msg: sealed,
                aad: &blob[..HEADER_LEN],
            },
        )
        .map_err(|_| SafeError::Authentication)?;
    Ok(Zeroizing::new(plaintext))
}

fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> std::result::Result<Zeroizing<[u8; KEY_LEN]>, String> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| format!("argon2 parameters: {}", e))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| format!("argon2 derivation: {}", e))?;
    Ok(key)
}

fn armor(blob: &[u8]) -> String {
    let encoded = Base64.encode(blob);
    let mut out = String::with_capacity(
        encoded.len() + encoded.len() / constants::ARMOR_LINE_WIDTH + 64,
    );
    out.push_str(constants::ARMOR_BEGIN);
    out.push_str("\n\n");
    let mut start = 0;
    while start < encoded.len() {
        let end = (start + constants::ARMOR_LINE_WIDTH).min(encoded.len());
        out.push_str(&encoded[start..end]);
        out.push('\n');
        start = end;
    }
    out.push_str(constants::ARMOR_END);
    out.push('\n');
    out
}

fn dearmor(envelope: &str) -> Result<Vec<u8>> {
    let body = envelope
        .trim()
        .strip_prefix(constants::ARMOR_BEGIN)
        .and_then(|rest| rest.strip_suffix(constants::ARMOR_END))
        .ok_or_else(|| SafeError::Format("missing armor boundaries".into()))?;
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SafeError::Format("empty armor body".into()));
    }
    Base64
        .decode(compact.as_bytes())
        .map_err(|e| SafeError::Format(format!("invalid base64: {}", e)))
}

/// Cheap parameters so tests do not spend seconds in Argon2.
#[cfg(test)]
pub(crate) fn fast_params() -> KdfParams {
    KdfParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}
