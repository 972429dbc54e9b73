//! Data structures.

pub mod config;
pub mod credential;
pub mod safe;
