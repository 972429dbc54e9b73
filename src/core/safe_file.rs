//! Load, save, and create the safe file.
//!
//! Load is read → decrypt → decode; save is encode → encrypt → atomic write.
//! Saves go through a temp file in the target directory that is renamed over
//! the safe, so a failed save leaves the previous safe untouched.

use crate::constants;
use crate::core::cipher::{self, KdfParams};
use crate::core::identity::IdentitySource;
use crate::core::password::PasswordSource;
use crate::core::serializer;
use crate::error::{Result, SafeError};
use crate::models::safe::Safe;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
pub struct SafeFile {
    path: PathBuf,
    kdf: KdfParams,
}

impl SafeFile {
    /// `kdf` applies to envelopes written by [`SafeFile::save`]; reading
    /// always uses the parameters recorded in the file.
    pub fn new(path: impl Into<PathBuf>, kdf: KdfParams) -> Self {
        Self {
            path: path.into(),
            kdf,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// A new, empty, unsaved safe. Refuses if a safe file is already present.
    pub fn create(&self, identity: &dyn IdentitySource) -> Result<Safe> {
        if self.exists() {
            return Err(SafeError::AlreadyExists {
                path: self.path.clone(),
            });
        }
        let safe = Safe::new(identity.display_name());
        debug!(
            path = %self.path.display(),
            created_by = %safe.created_by,
            "created safe in memory"
        );
        Ok(safe)
    }

    pub fn load(&self, password: &mut dyn PasswordSource) -> Result<Safe> {
        if !self.exists() {
            return Err(SafeError::NoSafe {
                path: self.path.clone(),
            });
        }
        let envelope = self.read_envelope()?;
        let plaintext = cipher::decrypt(&envelope, password)?;
        let safe = serializer::decode(&plaintext)?;
        debug!(path = %self.path.display(), credentials = safe.len(), "loaded safe");
        Ok(safe)
    }

    pub fn save(&self, safe: &Safe, password: &mut dyn PasswordSource) -> Result<()> {
        let plaintext = serializer::encode(safe)?;
        let password = password.supply()?;
        let envelope = cipher::encrypt(&plaintext, password.as_bytes(), &self.kdf)?;
        self.write_atomic(envelope.as_bytes())?;
        debug!(path = %self.path.display(), credentials = safe.len(), "saved safe");
        Ok(())
    }

    fn read_envelope(&self) -> Result<String> {
        let read_err = |source: io::Error| SafeError::Read {
            path: self.path.clone(),
            source,
        };
        let len = fs::metadata(&self.path).map_err(read_err)?.len();
        if len > constants::MAX_SAFE_SIZE {
            return Err(SafeError::Format(format!(
                "safe file is {} bytes, larger than the {} byte limit",
                len,
                constants::MAX_SAFE_SIZE
            )));
        }
        let bytes = fs::read(&self.path).map_err(read_err)?;
        String::from_utf8(bytes).map_err(|_| SafeError::Format("safe file is not text".into()))
    }

    /// The file a save replaces. Symlinks, dangling ones included, are
    /// followed so the link survives and its target gets the new contents.
    fn write_target(&self) -> io::Result<PathBuf> {
        let mut path = self.path.clone();
        for _ in 0..MAX_SYMLINK_HOPS {
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    let link = fs::read_link(&path)?;
                    path = match path.parent() {
                        Some(parent) => parent.join(link),
                        None => link,
                    };
                }
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(path),
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::other("too many levels of symbolic links"))
    }

    fn write_atomic(&self, contents: &[u8]) -> Result<()> {
        let write_err = |source: io::Error| SafeError::Write {
            path: self.path.clone(),
            source,
        };
        let target = self.write_target().map_err(write_err)?;
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".pick-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(write_err)?;
        tmp.write_all(contents).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        #[cfg(unix)]
        {
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(constants::SAFE_FILE_MODE))
                .map_err(write_err)?;
        }

        // On failure the temp file is dropped (and deleted) with the error.
        tmp.persist(&target).map_err(|e| write_err(e.error))?;

        #[cfg(unix)]
        {
            if let Ok(dir) = fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cipher::fast_params;
    use crate::core::identity::NamedIdentity;
    use crate::core::password::CachedPassword;
    use crate::core::serializer::arb_safe;
    use crate::models::credential::Credential;
    use proptest::prelude::*;
    use tempfile::TempDir;
    use zeroize::Zeroizing;

    fn fixed(password: &'static str) -> impl FnMut() -> Result<Zeroizing<String>> {
        move || Ok(Zeroizing::new(password.to_string()))
    }

    fn safe_file(dir: &TempDir) -> SafeFile {
        SafeFile::new(dir.path().join("test.safe"), fast_params())
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".pick-"))
            .count()
    }

    #[test]
    fn test_load_missing_is_no_safe() {
        let dir = TempDir::new().unwrap();
        let mut calls = 0;
        let mut source = || -> Result<Zeroizing<String>> {
            calls += 1;
            Ok(Zeroizing::new("pw".into()))
        };
        let result = safe_file(&dir).load(&mut source);
        assert!(matches!(result, Err(SafeError::NoSafe { .. })));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_create_is_empty_and_unsaved() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let before = chrono::Utc::now().timestamp();
        let safe = file.create(&NamedIdentity("alice".into())).unwrap();
        assert_eq!(safe.created_by, "alice");
        assert!(safe.is_empty());
        assert!(safe.created_on >= before && safe.created_on <= before + 5);
        assert!(!file.exists());
    }

    #[test]
    fn test_create_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let safe = file.create(&NamedIdentity("alice".into())).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();
        let result = file.create(&NamedIdentity("alice".into()));
        assert!(matches!(result, Err(SafeError::AlreadyExists { .. })));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let mut safe = file.create(&NamedIdentity("alice".into())).unwrap();
        safe.add(Credential::new("github", "alice", "p@ssw3rd")).unwrap();
        safe.add(Credential::new("mail", "", "hunter2")).unwrap();
        file.save(&safe, &mut fixed("secr3t")).unwrap();

        let loaded = file.load(&mut fixed("secr3t")).unwrap();
        assert_eq!(loaded, safe);
    }

    #[test]
    fn test_empty_safe_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let safe = file.create(&NamedIdentity("alice".into())).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();
        let loaded = file.load(&mut fixed("pw")).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded, safe);
    }

    #[test]
    fn test_wrong_password_fails_closed() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let safe = file.create(&NamedIdentity("alice".into())).unwrap();
        file.save(&safe, &mut fixed("secr3t")).unwrap();

        let mut calls = 0;
        let mut source = || -> Result<Zeroizing<String>> {
            calls += 1;
            Ok(Zeroizing::new("wrong".into()))
        };
        let result = file.load(&mut source);
        assert!(matches!(result, Err(SafeError::Authentication)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_safe_file_is_armored_text() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let mut safe = file.create(&NamedIdentity("alice".into())).unwrap();
        safe.add(Credential::new("github", "alice", "p@ssw3rd")).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with(constants::ARMOR_BEGIN));
        assert!(!content.contains("p@ssw3rd"));
        assert!(!content.contains("github"));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let safe = file.create(&NamedIdentity("alice".into())).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();
        let mode = crate::util::fs::mode_of(file.path()).unwrap();
        assert_eq!(mode, constants::SAFE_FILE_MODE);
    }

    #[test]
    fn test_failed_password_keeps_previous_safe() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let mut safe = file.create(&NamedIdentity("alice".into())).unwrap();
        safe.add(Credential::new("github", "alice", "p@ssw3rd")).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();
        let before = fs::read(file.path()).unwrap();

        safe.remove("github").unwrap();
        let mut failing = || -> Result<Zeroizing<String>> {
            Err(SafeError::PasswordSource("prompt aborted".into()))
        };
        assert!(file.save(&safe, &mut failing).is_err());

        assert_eq!(fs::read(file.path()).unwrap(), before);
        assert!(file.load(&mut fixed("pw")).unwrap().contains("github"));
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A directory where the safe should be makes the final rename fail.
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();
        let file = SafeFile::new(&target, fast_params());

        let safe = Safe::new("alice");
        let result = file.save(&safe, &mut fixed("pw"));
        assert!(matches!(result, Err(SafeError::Write { .. })));
        assert!(target.join("keep").exists());
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[test]
    fn test_successful_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let safe = Safe::new("alice");
        file.save(&safe, &mut fixed("pw")).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let file = SafeFile::new(dir.path().join("a").join("b").join("x.safe"), fast_params());
        file.save(&Safe::new("alice"), &mut fixed("pw")).unwrap();
        assert!(file.exists());
    }

    #[test]
    fn test_garbage_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        fs::write(file.path(), b"this is not a safe").unwrap();
        let result = file.load(&mut fixed("pw"));
        assert!(matches!(result, Err(SafeError::Format(_))));
    }

    #[test]
    fn test_binary_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        fs::write(file.path(), [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(file.load(&mut fixed("pw")), Err(SafeError::Format(_))));
    }

    #[test]
    fn test_undecodable_plaintext_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let envelope = cipher::encrypt(br#"{"createdOn":1}"#, b"pw", &fast_params()).unwrap();
        fs::write(file.path(), envelope).unwrap();
        assert!(matches!(file.load(&mut fixed("pw")), Err(SafeError::Decode(_))));
    }

    #[test]
    fn test_cached_password_spans_load_and_save() {
        let dir = TempDir::new().unwrap();
        let file = safe_file(&dir);
        let mut safe = file.create(&NamedIdentity("alice".into())).unwrap();
        safe.add(Credential::new("github", "alice", "p@ssw3rd")).unwrap();
        file.save(&safe, &mut fixed("pw")).unwrap();

        let mut calls = 0;
        {
            let source = || -> Result<Zeroizing<String>> {
                calls += 1;
                Ok(Zeroizing::new("pw".into()))
            };
            let mut password = CachedPassword::new(source);
            let mut loaded = file.load(&mut password).unwrap();
            loaded.remove("github").unwrap();
            file.save(&loaded, &mut password).unwrap();
        }
        assert_eq!(calls, 1);
        assert!(file.load(&mut fixed("pw")).unwrap().is_empty());
    }

    #[test]
    fn test_envelope_records_kdf_params() {
        let dir = TempDir::new().unwrap();
        let writer = SafeFile::new(dir.path().join("x.safe"), fast_params());
        writer.save(&Safe::new("alice"), &mut fixed("pw")).unwrap();
        // a reader configured with different costs still opens it
        let reader = SafeFile::new(dir.path().join("x.safe"), KdfParams::default());
        assert!(reader.load(&mut fixed("pw")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_through_symlink_updates_target() {
        let dir = TempDir::new().unwrap();
        let synced = dir.path().join("sync");
        fs::create_dir(&synced).unwrap();
        let real = synced.join("real.safe");
        let link = dir.path().join("link.safe");

        let target = SafeFile::new(&real, fast_params());
        target.save(&Safe::new("alice"), &mut fixed("pw")).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let through_link = SafeFile::new(&link, fast_params());
        let mut safe = through_link.load(&mut fixed("pw")).unwrap();
        safe.add(Credential::new("github", "alice", "p@ssw3rd")).unwrap();
        through_link.save(&safe, &mut fixed("pw")).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(target.load(&mut fixed("pw")).unwrap().contains("github"));
        assert_eq!(leftover_temp_files(&synced), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_through_dangling_symlink_creates_target() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.safe");
        let link = dir.path().join("link.safe");
        // relative link, resolved against the link's directory
        std::os::unix::fs::symlink("real.safe", &link).unwrap();

        let through_link = SafeFile::new(&link, fast_params());
        let safe = through_link.create(&NamedIdentity("alice".into())).unwrap();
        through_link.save(&safe, &mut fixed("pw")).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(real.is_file());
        assert!(through_link.exists());
        assert!(matches!(
            through_link.create(&NamedIdentity("alice".into())),
            Err(SafeError::AlreadyExists { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_write_error() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.safe");
        let b = dir.path().join("b.safe");
        std::os::unix::fs::symlink(&b, &a).unwrap();
        std::os::unix::fs::symlink(&a, &b).unwrap();

        let file = SafeFile::new(&a, fast_params());
        let result = file.save(&Safe::new("alice"), &mut fixed("pw"));
        assert!(matches!(result, Err(SafeError::Write { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_save_load_roundtrip(safe in arb_safe(), password in "[ -~]{1,32}") {
            let dir = TempDir::new().unwrap();
            let file = safe_file(&dir);
            let supply = |pw: String| move || -> Result<Zeroizing<String>> {
                Ok(Zeroizing::new(pw.clone()))
            };

            file.save(&safe, &mut supply(password.clone())).unwrap();
            let loaded = file.load(&mut supply(password.clone())).unwrap();
            prop_assert_eq!(loaded, safe);

            let wrong = format!("{}x", password);
            prop_assert!(matches!(
                file.load(&mut supply(wrong)),
                Err(SafeError::Authentication)
            ));
        }
    }
}
