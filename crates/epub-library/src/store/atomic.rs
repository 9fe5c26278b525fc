//! Atomic text file operations for the persisted library file.
//!
//! Writes go to a temp file with a PID+TID suffix, are synced to disk, and
//! then renamed over the target.

use crate::config::StoreConfig;
use crate::{LibraryError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Read a text file.
///
/// Returns `None` if the file doesn't exist.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LibraryError::Persistence {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }),
    }
}

/// Write a text file atomically.
///
/// If `keep_backup` is set and the target exists, its previous contents are
/// copied next to it with a `.bak` extension first.
pub fn atomic_write_text(path: &Path, contents: &str, keep_backup: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| LibraryError::Persistence {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let temp_path = path.with_extension(format!(
        "{}.{}.{}",
        process::id(),
        thread_id(),
        StoreConfig::TEMP_SUFFIX
    ));

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| LibraryError::Persistence {
                message: format!("Failed to create temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            })?;

        let written = file
            .write_all(contents.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(LibraryError::Persistence {
                message: format!("Failed to write temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            });
        }
    }

    if keep_backup && path.exists() {
        let backup_path = path.with_extension(StoreConfig::BACKUP_EXTENSION);
        if let Err(e) = fs::copy(path, &backup_path) {
            warn!("Failed to create backup {}: {}", backup_path.display(), e);
        } else {
            debug!("Created backup: {}", backup_path.display());
        }
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LibraryError::Persistence {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.csv");

        atomic_write_text(&path, "/books/a.epub,pub-a\n", false).unwrap();
        assert_eq!(
            read_text(&path).unwrap().as_deref(),
            Some("/books/a.epub,pub-a\n")
        );
    }

    #[test]
    fn test_atomic_write_creates_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.csv");

        atomic_write_text(&path, "first\n", true).unwrap();
        atomic_write_text(&path, "second\n", true).unwrap();

        let backup_path = path.with_extension("bak");
        assert_eq!(read_text(&backup_path).unwrap().as_deref(), Some("first\n"));
        assert_eq!(read_text(&path).unwrap().as_deref(), Some("second\n"));
    }

    #[test]
    fn test_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_text(&temp_dir.path().join("missing.csv"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_atomic_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("library.csv");

        atomic_write_text(&path, "x,y\n", false).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.csv");

        atomic_write_text(&path, "x,y\n", false).unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let result = atomic_write_text(&blocker.join("library.csv"), "x,y\n", false);
        assert!(matches!(result, Err(LibraryError::Persistence { .. })));
    }
}
