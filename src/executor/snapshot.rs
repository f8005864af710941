//! Workspace snapshots
//!
//! A snapshot captures a set of workspace files under a unique id. File
//! contents are stored as sha256-addressed blobs next to a JSON manifest.
//! Open snapshots form a stack: a run keeps its pre-run snapshot at the
//! bottom and opens one checkpoint per batch above it. Only the newest open
//! snapshot may be discarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::types::{MendError, Result, SnapshotId, normalize_path};

const MANIFEST_FILE: &str = "manifest.json";
const BLOB_DIR: &str = "blobs";

/// Create, restore and discard workspace checkpoints
pub trait SnapshotStore: Send {
    /// Capture `files` (workspace-relative) on top of any open snapshots
    fn begin(&mut self, files: &[String]) -> Result<SnapshotId>;

    /// Put every captured file back. Failures surface as `RollbackFailed`.
    fn restore(&self, id: &SnapshotId) -> Result<()>;

    /// Drop the snapshot without touching the workspace. Fails with
    /// `SnapshotActive` while a newer snapshot is still open above it.
    fn discard(&mut self, id: &SnapshotId) -> Result<()>;

    /// Newest open snapshot
    fn active(&self) -> Option<&SnapshotId>;

    /// Number of open snapshots
    fn depth(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    id: SnapshotId,
    created_at: DateTime<Utc>,
    /// Relative path to blob hash; `None` when the file did not exist
    entries: BTreeMap<String, Option<String>>,
}

/// Snapshot store under `.lintmend/snapshots/`
pub struct FsSnapshotStore {
    root: PathBuf,
    dir: PathBuf,
    open: Vec<SnapshotId>,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir: dir.into(),
            open: Vec::new(),
        }
    }

    fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    fn read_manifest(&self, id: &SnapshotId) -> Result<Manifest> {
        let path = self.snapshot_dir(id).join(MANIFEST_FILE);
        let text = fs::read_to_string(&path)
            .map_err(|e| MendError::Snapshot(format!("cannot read manifest for {}: {}", id, e)))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Snapshots left on disk, e.g. by a crashed run
    pub fn list(&self) -> Result<Vec<SnapshotId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids: Vec<SnapshotId> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join(MANIFEST_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(SnapshotId::from))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    fn restore_entries(&self, id: &SnapshotId, manifest: &Manifest) -> Result<usize> {
        let blobs = self.snapshot_dir(id).join(BLOB_DIR);
        let mut restored = 0;
        for (rel, hash) in &manifest.entries {
            let target = self.root.join(rel);
            match hash {
                Some(hash) => {
                    let content = fs::read(blobs.join(hash))?;
                    if digest(&content) != *hash {
                        return Err(MendError::Snapshot(format!("blob for {} is corrupt", rel)));
                    }
                    // Skip unchanged files so mtimes stay put
                    if fs::read(&target).ok().as_deref() == Some(content.as_slice()) {
                        continue;
                    }
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    write_atomic(&target, &content)?;
                }
                None => match fs::remove_file(&target) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                },
            }
            restored += 1;
        }
        Ok(restored)
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn begin(&mut self, files: &[String]) -> Result<SnapshotId> {
        let id = SnapshotId::generate();
        let blobs = self.snapshot_dir(&id).join(BLOB_DIR);
        fs::create_dir_all(&blobs)?;

        let mut entries = BTreeMap::new();
        for file in files {
            let rel = normalize_path(file);
            let hash = match fs::read(self.root.join(&rel)) {
                Ok(content) => {
                    let hash = digest(&content);
                    let blob = blobs.join(&hash);
                    if !blob.exists() {
                        fs::write(&blob, &content)?;
                    }
                    Some(hash)
                }
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            entries.insert(rel, hash);
        }

        let manifest = Manifest {
            id: id.clone(),
            created_at: Utc::now(),
            entries,
        };
        let manifest_path = self.snapshot_dir(&id).join(MANIFEST_FILE);
        write_atomic(&manifest_path, serde_json::to_string_pretty(&manifest)?.as_bytes())?;

        debug!(snapshot = %id, files = files.len(), depth = self.open.len() + 1, "Snapshot created");
        self.open.push(id.clone());
        Ok(id)
    }

    fn restore(&self, id: &SnapshotId) -> Result<()> {
        let rollback_failed = |message: String| MendError::RollbackFailed {
            snapshot: id.to_string(),
            message,
        };
        let manifest = self.read_manifest(id).map_err(|e| rollback_failed(e.to_string()))?;
        let restored = self
            .restore_entries(id, &manifest)
            .map_err(|e| rollback_failed(e.to_string()))?;
        info!(snapshot = %id, restored, "Workspace restored from snapshot");
        Ok(())
    }

    fn discard(&mut self, id: &SnapshotId) -> Result<()> {
        if let Some(pos) = self.open.iter().position(|open| open == id)
            && let Some(newer) = self.open.get(pos + 1)
        {
            return Err(MendError::SnapshotActive {
                active: newer.to_string(),
            });
        }
        match fs::remove_dir_all(self.snapshot_dir(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.open.retain(|open| open != id);
        debug!(snapshot = %id, "Snapshot discarded");
        Ok(())
    }

    fn active(&self) -> Option<&SnapshotId> {
        self.open.last()
    }

    fn depth(&self) -> usize {
        self.open.len()
    }
}

fn digest(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Write via a temp file and rename so readers never see a partial file
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".lintmend-tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsSnapshotStore) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/a.ts"), "const a = 1;\n").unwrap();
        fs::write(temp.path().join("src/b.ts"), "const b = 2;\n").unwrap();
        let store = FsSnapshotStore::new(temp.path(), temp.path().join(".lintmend/snapshots"));
        (temp, store)
    }

    #[test]
    fn test_restore_reverts_changes() {
        let (temp, mut store) = setup();
        let files = vec!["src/a.ts".to_string(), "src/b.ts".to_string(), "src/new.ts".to_string()];
        let id = store.begin(&files).unwrap();

        fs::write(temp.path().join("src/a.ts"), "let a = 1;\n").unwrap();
        fs::remove_file(temp.path().join("src/b.ts")).unwrap();
        fs::write(temp.path().join("src/new.ts"), "created").unwrap();

        store.restore(&id).unwrap();
        assert_eq!(fs::read_to_string(temp.path().join("src/a.ts")).unwrap(), "const a = 1;\n");
        assert_eq!(fs::read_to_string(temp.path().join("src/b.ts")).unwrap(), "const b = 2;\n");
        assert!(!temp.path().join("src/new.ts").exists());
    }

    #[test]
    fn test_discard_is_lifo() {
        let (_temp, mut store) = setup();
        let base = store.begin(&["src/a.ts".to_string()]).unwrap();
        let checkpoint = store.begin(&["src/b.ts".to_string()]).unwrap();
        assert_ne!(base, checkpoint);
        assert_eq!(store.depth(), 2);
        assert_eq!(store.active(), Some(&checkpoint));

        let err = store.discard(&base).unwrap_err();
        assert!(matches!(err, MendError::SnapshotActive { active } if active == checkpoint.to_string()));

        store.discard(&checkpoint).unwrap();
        assert_eq!(store.active(), Some(&base));
        store.discard(&base).unwrap();
        assert_eq!(store.depth(), 0);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_base_survives_checkpoints() {
        let (temp, mut store) = setup();
        let base = store.begin(&["src/a.ts".to_string()]).unwrap();

        // First batch commits
        let first = store.begin(&["src/a.ts".to_string()]).unwrap();
        fs::write(temp.path().join("src/a.ts"), "validated\n").unwrap();
        store.discard(&first).unwrap();

        // Second batch breaks the file and rolls back to the committed state
        let second = store.begin(&["src/a.ts".to_string()]).unwrap();
        fs::write(temp.path().join("src/a.ts"), "broken\n").unwrap();
        store.restore(&second).unwrap();
        store.discard(&second).unwrap();
        assert_eq!(fs::read_to_string(temp.path().join("src/a.ts")).unwrap(), "validated\n");

        // Aborting the run lands on the pre-run content
        store.restore(&base).unwrap();
        assert_eq!(fs::read_to_string(temp.path().join("src/a.ts")).unwrap(), "const a = 1;\n");
        assert_eq!(store.list().unwrap(), vec![base]);
    }

    #[test]
    fn test_missing_manifest_is_rollback_failure() {
        let (_temp, store) = setup();
        let err = store.restore(&SnapshotId::from("snap-missing")).unwrap_err();
        assert!(matches!(err, MendError::RollbackFailed { .. }));
        assert!(err.requires_manual_intervention());
    }

    #[test]
    fn test_corrupt_blob_detected() {
        let (temp, mut store) = setup();
        let id = store.begin(&["src/a.ts".to_string()]).unwrap();
        let blob_dir = temp.path().join(".lintmend/snapshots").join(id.as_str()).join(BLOB_DIR);
        for entry in fs::read_dir(&blob_dir).unwrap() {
            fs::write(entry.unwrap().path(), "tampered").unwrap();
        }
        fs::write(temp.path().join("src/a.ts"), "changed").unwrap();
        assert!(matches!(store.restore(&id), Err(MendError::RollbackFailed { .. })));
    }
}
