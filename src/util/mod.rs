//! Filesystem and desktop helpers.

pub mod clipboard;
pub mod fs;
