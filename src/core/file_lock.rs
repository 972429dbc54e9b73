//! Advisory flock(2) locks guarding the safe and the audit log.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// An exclusive lock held for as long as the value lives.
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Block until the lock at `path` is ours.
    pub fn exclusive(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .with_context(|| format!("acquire lock {}", path.display()))?;
        Ok(Self { _file: file })
    }

    /// Take the lock if it is free; `Ok(None)` when another process holds it.
    pub fn try_exclusive(path: &Path) -> Result<Option<Self>> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file })),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(ref e) if e.raw_os_error() == Some(11) => Ok(None), // EAGAIN
            Err(e) => Err(e).with_context(|| format!("try lock {}", path.display())),
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("open lock file {}", path.display()))
}
