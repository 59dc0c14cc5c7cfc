//! JSON progress document store
//!
//! The whole document is rewritten on every checkpoint: serialized to a
//! sibling temp file, synced, then renamed over the previous version. A crash
//! at any point leaves either the old or the new document on disk.

use crate::state::{Checkpoint, ProgressState};
use crate::storage::traits::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Durable per-unit pagination state
///
/// The only way to change the document is `checkpoint`, which merges and
/// persists under a single lock.
pub struct ProgressStore {
    path: PathBuf,
    state: Mutex<ProgressState>,
}

impl ProgressStore {
    /// Opens the store, loading whatever progress is on disk
    pub fn open(path: &Path) -> Self {
        Self::with_state(path, Self::load(path))
    }

    /// Opens the store with a given starting state, ignoring the file
    pub fn with_state(path: &Path, state: ProgressState) -> Self {
        Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        }
    }

    /// Reads the progress document
    ///
    /// A missing file gives fresh progress. An unreadable or corrupt one is
    /// moved aside to `<path>.corrupt` and also gives fresh progress; losing
    /// progress only costs refetching, it never aborts the run.
    pub fn load(path: &Path) -> ProgressState {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No progress at {}, starting fresh", path.display());
                return ProgressState::new();
            }
            Err(e) => {
                tracing::warn!("Failed to read progress {}: {}", path.display(), e);
                return ProgressState::new();
            }
        };

        match serde_json::from_str::<ProgressState>(&content) {
            Ok(state) => {
                tracing::info!(
                    "Loaded progress for {} units ({} completed) from {}",
                    state.units.len(),
                    state.completed_count(),
                    path.display()
                );
                state
            }
            Err(e) => {
                let aside = sidecar(path, "corrupt");
                tracing::warn!(
                    "Progress {} is corrupt ({}), moving it to {} and starting fresh",
                    path.display(),
                    e,
                    aside.display()
                );
                if let Err(e) = fs::rename(path, &aside) {
                    tracing::warn!("Failed to move corrupt progress aside: {}", e);
                }
                ProgressState::new()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> StorageResult<ProgressState> {
        Ok(self.lock()?.clone())
    }

    /// Records which domain description this progress belongs to
    ///
    /// Held in memory and written with the next checkpoint or flush.
    pub fn set_domain_hash(&self, hash: &str) -> StorageResult<()> {
        let mut state = self.lock()?;
        if let Some(previous) = &state.domain_hash {
            if previous != hash {
                tracing::warn!(
                    "Domain description changed since this progress was written; \
                     completed units are still skipped"
                );
            }
        }
        state.domain_hash = Some(hash.to_string());
        Ok(())
    }

    /// Merges one page of progress and persists the whole document
    ///
    /// Returns only after the document is durable on disk.
    pub fn checkpoint(&self, checkpoint: &Checkpoint) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.apply(checkpoint);
        write_document(&self.path, &state)
    }

    /// Persists the current state without changing it
    pub fn flush(&self) -> StorageResult<()> {
        let state = self.lock()?;
        write_document(&self.path, &state)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, ProgressState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::LockPoisoned("progress document"))
    }
}

/// Writes the document through a synced temp file and an atomic rename
fn write_document(path: &Path, state: &ProgressState) -> StorageResult<()> {
    let json = serde_json::to_string_pretty(state)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let tmp_path = sidecar(path, "tmp");
    let mut file = File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| StorageError::io(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| StorageError::io(path, e))?;
    tracing::trace!("Wrote progress to {}", path.display());
    Ok(())
}

/// `progress.json` -> `progress.json.<suffix>`
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
