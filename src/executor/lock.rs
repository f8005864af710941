//! Advisory run lock
//!
//! One run per workspace may hold the lock, and with it the right to create a
//! snapshot. The lock is released when the guard drops.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::{MendError, Result};

pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                return Err(MendError::RunLocked {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        // Holder pid for humans inspecting a stuck lock
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        debug!("Acquired run lock {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".lintmend/run.lock");

        let first = RunLock::acquire(&path).unwrap();
        let err = RunLock::acquire(&path).err().unwrap();
        assert!(matches!(err, MendError::RunLocked { .. }));

        drop(first);
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_lock_records_pid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.lock");
        let _lock = RunLock::acquire(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }
}
