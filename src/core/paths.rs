//! Safe, lock, audit, and config path resolution.

use crate::constants;
use crate::models::config::PickConfig;
use anyhow::{bail, Context, Result};
use nix::unistd::{getuid, User};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PickPaths {
    pub safe: PathBuf,
    pub safe_lock: PathBuf,
    pub audit_log: PathBuf,
    pub audit_lock: PathBuf,
}

impl PickPaths {
    /// Resolve the safe from CLI arg, env var, config, or the home default.
    pub fn resolve(safe_arg: Option<PathBuf>, config: &PickConfig) -> Result<Self> {
        if let Some(safe) = safe_arg {
            return Ok(Self::from_safe(safe));
        }
        if let Some(safe) = env::var_os("PICK_SAFE").filter(|v| !v.is_empty()) {
            return Ok(Self::from_safe(PathBuf::from(safe)));
        }
        if let Some(safe) = &config.safe.path {
            return Ok(Self::from_safe(expand_home(safe)?));
        }
        Ok(Self::from_safe(home_dir()?.join(constants::DEFAULT_SAFE_FILE)))
    }

    /// Derive the companion paths from the safe file location.
    pub fn from_safe(safe: PathBuf) -> Self {
        let safe_lock = sibling(&safe, ".lock");
        let audit_log = sibling(&safe, ".audit.log");
        let audit_lock = sibling(&safe, ".audit.lock");
        Self {
            safe,
            safe_lock,
            audit_log,
            audit_lock,
        }
    }
}

/// Config file from CLI arg, `PICK_CONFIG`, or `~/.pick.toml`.
pub fn config_path(config_arg: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = config_arg {
        return Ok(path);
    }
    if let Some(path) = env::var_os("PICK_CONFIG").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(home_dir()?.join(constants::DEFAULT_CONFIG_FILE))
}

/// `$HOME`, falling back to the passwd entry of the current uid.
pub fn home_dir() -> Result<PathBuf> {
    if let Some(home) = env::var_os("HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    match User::from_uid(getuid()).context("look up current user")? {
        Some(user) => Ok(user.dir),
        None => bail!("cannot determine home directory"),
    }
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

impl std::fmt::Display for PickPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "safe@{}", self.safe.display())
    }
}
