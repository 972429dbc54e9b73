//! pick: a minimal password manager.
//!
//! Credentials live in a single safe file: a JSON document encrypted with a
//! master password (Argon2id + XChaCha20-Poly1305) and base64 armored.
//!
//! ## Modules
//! - `cli`: Command-line handlers
//! - `core`: Cipher, serializer, credential store, safe persistence, audit
//! - `models`: Data structures
//! - `util`: Filesystem and clipboard helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;
