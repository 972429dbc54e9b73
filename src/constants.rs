//! Centralized constants for paths, permissions, and limits.

/// Default safe file name, relative to the home directory.
pub const DEFAULT_SAFE_FILE: &str = ".pick.safe";

/// Default config file name, relative to the home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".pick.toml";

/// Permission mode for the safe file.
pub const SAFE_FILE_MODE: u32 = 0o600;

/// Permission mode for the audit log.
pub const AUDIT_LOG_MODE: u32 = 0o600;

/// Hash layout written to new audit entries.
pub const AUDIT_HASH_VERSION: u8 = 1;

/// Largest safe file we are willing to read (16 MiB).
pub const MAX_SAFE_SIZE: u64 = 16 * 1024 * 1024;

/// Armor boundaries for the encrypted envelope.
pub const ARMOR_BEGIN: &str = "-----BEGIN PICK SAFE-----";
pub const ARMOR_END: &str = "-----END PICK SAFE-----";

/// Base64 line width inside the armor.
pub const ARMOR_LINE_WIDTH: usize = 64;

/// Envelope magic and format version.
pub const ENVELOPE_MAGIC: &[u8; 4] = b"PICK";
pub const ENVELOPE_VERSION: u8 = 1;

/// Argon2id defaults for new envelopes.
pub const DEFAULT_KDF_MEMORY_KIB: u32 = 64 * 1024;
pub const DEFAULT_KDF_ITERATIONS: u32 = 3;
pub const DEFAULT_KDF_PARALLELISM: u32 = 1;

/// Accepted Argon2id parameter bounds (config and envelope headers).
pub const KDF_MEMORY_MIN_KIB: u32 = 8;
pub const KDF_MEMORY_MAX_KIB: u32 = 1024 * 1024;
pub const KDF_ITERATIONS_MAX: u32 = 16;
pub const KDF_PARALLELISM_MAX: u32 = 16;

/// Default length for generated passwords.
pub const DEFAULT_GENERATED_LENGTH: usize = 50;

/// Upper bound for generated passwords.
pub const MAX_GENERATED_LENGTH: usize = 4096;
