//! Optional `~/.pick.toml` configuration model.

use crate::constants;
use crate::core::cipher::KdfParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickConfig {
    #[serde(default)]
    pub safe: SafeSection,
    #[serde(default)]
    pub kdf: KdfParams,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafeSection {
    /// Safe file location (overridden by `--safe` and `PICK_SAFE`).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSection {
    /// Length of generated passwords.
    #[serde(default = "default_generated_length")]
    pub length: usize,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            length: default_generated_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    /// Append an entry to the audit log after each command.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_generated_length() -> usize {
    constants::DEFAULT_GENERATED_LENGTH
}

fn default_true() -> bool {
    true
}
