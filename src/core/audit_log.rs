//! Append-only, hash-chained audit trail of safe operations.
//!
//! Entries carry metadata only (action, actor, alias); secrets and master
//! passwords never reach this file.

use crate::constants;
use crate::core::file_lock::FileLock;
use crate::core::paths::PickPaths;
use crate::util::fs as pick_fs;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
    /// Layout of the hashed fields; `None` for entries that predate hashing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_version: Option<u8>,
}

fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// Log an action with the actor taken from the environment.
pub fn log(paths: &PickPaths, action: &str, alias: &str) -> Result<()> {
    log_action(paths, action, alias, &detect_actor())
}

pub fn log_action(paths: &PickPaths, action: &str, alias: &str, actor: &str) -> Result<()> {
    let _lock = FileLock::exclusive(&paths.audit_lock)?;
    let prev_hash = last_entry_hash(&paths.audit_log)?;

    let mut entry = AuditEntry {
        timestamp: Utc::now(),
        action: action.to_string(),
        actor: actor.to_string(),
        alias: alias.to_string(),
        prev_hash,
        entry_hash: None,
        hash_version: Some(constants::AUDIT_HASH_VERSION),
    };
    entry.entry_hash = Some(compute_entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize audit entry")?;
    append_line(&paths.audit_log, &line)
}

/// SHA-256 over the entry's JSON with `entry_hash` left out.
fn compute_entry_hash(entry: &AuditEntry) -> Result<String> {
    let mut unhashed = entry.clone();
    unhashed.entry_hash = None;
    let json = serde_json::to_string(&unhashed).context("serialize for hash")?;
    Ok(format!("{:064x}", Sha256::digest(json.as_bytes())))
}

fn append_line(audit_path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(audit_path)
        .with_context(|| format!("open audit log {}", audit_path.display()))?;
    writeln!(file, "{}", line).context("write audit entry")?;
    pick_fs::set_permissions(audit_path, constants::AUDIT_LOG_MODE)
}

fn last_entry_hash(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut last = None;
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        last = Some(line);
    }
    Ok(last.map(|line| match serde_json::from_str::<AuditEntry>(&line) {
        Ok(AuditEntry {
            entry_hash: Some(hash),
            ..
        }) => hash,
        // chain onto whatever is there, even a damaged line
        _ => format!("{:064x}", Sha256::digest(line.as_bytes())),
    }))
}

/// Read audit entries, keeping only the newest `limit` when given.
pub fn read_log(paths: &PickPaths, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
    if !paths.audit_log.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(&paths.audit_log)
        .with_context(|| format!("open audit log {}", paths.audit_log.display()))?;
    let mut entries = Vec::new();
    let mut malformed = 0usize;

    for line in BufReader::new(file).lines() {
        let line = line.context("read audit log line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }

    if malformed > 0 {
        tracing::warn!(malformed, "skipped malformed audit entries");
    }

    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }

    Ok(entries)
}

/// Verify the audit chain. Returns (total, errors).
pub fn verify_chain(paths: &PickPaths) -> Result<(usize, Vec<String>)> {
    let entries = read_log(paths, None)?;
    let mut errors = Vec::new();
    let mut prev_entry_hash: Option<String> = None;

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && entry.prev_hash != prev_entry_hash {
            errors.push(format!(
                "entry {}: prev_hash mismatch (expected {:?}, got {:?})",
                i + 1,
                prev_entry_hash,
                entry.prev_hash
            ));
        }

        match (entry.hash_version, &entry.entry_hash) {
            (Some(constants::AUDIT_HASH_VERSION), Some(stored)) => {
                if &compute_entry_hash(entry)? != stored {
                    errors.push(format!("entry {}: entry_hash mismatch (tampered?)", i + 1));
                }
            }
            (Some(constants::AUDIT_HASH_VERSION), None) => {
                errors.push(format!("entry {}: missing entry_hash", i + 1))
            }
            (Some(other), _) => {
                errors.push(format!("entry {}: unsupported hash_version {}", i + 1, other))
            }
            (None, _) => errors.push(format!("entry {}: missing hash_version", i + 1)),
        }

        prev_entry_hash = entry.entry_hash.clone();
    }

    Ok((entries.len(), errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths() -> (TempDir, PickPaths) {
        let dir = TempDir::new().unwrap();
        let paths = PickPaths::from_safe(dir.path().join("test.safe"));
        (dir, paths)
    }

    #[test]
    fn test_log_and_read_roundtrip() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "add", "github", "tester").unwrap();
        let entries = read_log(&paths, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "add");
        assert_eq!(entries[0].alias, "github");
        assert!(entries[0].prev_hash.is_none());
        assert!(entries[0].entry_hash.is_some());
        assert_eq!(entries[0].hash_version, Some(constants::AUDIT_HASH_VERSION));
    }

    #[test]
    fn test_entries_are_chained() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "add", "github", "tester").unwrap();
        log_action(&paths, "cat", "github", "tester").unwrap();
        let entries = read_log(&paths, None).unwrap();
        assert_eq!(entries[1].prev_hash, entries[0].entry_hash);
    }

    #[test]
    fn test_read_log_with_limit() {
        let (_dir, paths) = test_paths();
        for i in 0..5 {
            log_action(&paths, "add", &format!("alias_{}", i), "tester").unwrap();
        }
        let entries = read_log(&paths, Some(2)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].alias, "alias_4");
    }

    #[test]
    fn test_read_log_nonexistent() {
        let (_dir, paths) = test_paths();
        assert!(read_log(&paths, None).unwrap().is_empty());
    }

    #[test]
    fn test_verify_chain_ok() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "init", "", "tester").unwrap();
        log_action(&paths, "add", "github", "tester").unwrap();
        log_action(&paths, "rm", "github", "tester").unwrap();
        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 3);
        assert!(errors.is_empty(), "errors: {:?}", errors);
    }

    #[test]
    fn test_verify_chain_detects_tamper() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "add", "github", "tester").unwrap();
        log_action(&paths, "rm", "github", "tester").unwrap();

        let content = fs::read_to_string(&paths.audit_log).unwrap();
        fs::write(&paths.audit_log, content.replace("\"rm\"", "\"cat\"")).unwrap();

        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 2);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_verify_chain_detects_removed_entry() {
        let (_dir, paths) = test_paths();
        for action in ["add", "cat", "rm"] {
            log_action(&paths, action, "github", "tester").unwrap();
        }
        let content = fs::read_to_string(&paths.audit_log).unwrap();
        let kept: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, l)| l)
            .collect();
        fs::write(&paths.audit_log, kept.join("\n") + "\n").unwrap();

        let (_, errors) = verify_chain(&paths).unwrap();
        assert!(errors.iter().any(|e| e.contains("prev_hash mismatch")));
    }

    #[cfg(unix)]
    #[test]
    fn test_audit_log_is_private() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "add", "github", "tester").unwrap();
        assert_eq!(pick_fs::mode_of(&paths.audit_log).unwrap(), constants::AUDIT_LOG_MODE);
    }

    #[test]
    fn test_verify_chain_rejects_hash_version() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "add", "github", "tester").unwrap();

        let content = fs::read_to_string(&paths.audit_log).unwrap();
        let bumped = content.replace("\"hash_version\":1", "\"hash_version\":9");
        assert_ne!(bumped, content);
        fs::write(&paths.audit_log, &bumped).unwrap();
        let (_, errors) = verify_chain(&paths).unwrap();
        assert!(errors.iter().any(|e| e.contains("unsupported hash_version 9")));

        let stripped = content.replace(",\"hash_version\":1", "");
        assert_ne!(stripped, content);
        fs::write(&paths.audit_log, &stripped).unwrap();
        let (_, errors) = verify_chain(&paths).unwrap();
        assert!(errors.iter().any(|e| e.contains("missing hash_version")));
    }
}
