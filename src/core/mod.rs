//! Core safe logic: encryption, encoding, credential CRUD, persistence.

pub mod audit_log;
pub mod cipher;
pub mod config;
pub mod file_lock;
pub mod generator;
pub mod identity;
pub mod password;
pub mod paths;
pub mod safe_file;
pub mod serializer;
pub mod store;
