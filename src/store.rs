use crate::errors::{AppError, AppResult};
use crate::models::QuizMode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Access point for the JSON documents on disk. Owns the single global
/// write lock shared by every repository: a mutation is a read-file,
/// mutate-in-memory, write-file cycle and is only correct when no other
/// writer runs in between. Plain reads skip the lock and tolerate in-flight
/// writes by degrading to the caller-supplied default on decode failure.
#[derive(Debug, Default)]
pub struct JsonStore {
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes read-modify-write cycles across all repositories. A
    /// poisoned lock is recovered: the guarded state lives on disk, not in
    /// the mutex, so a panicked writer cannot have left it torn.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seeds `path` with `default` when no document exists there yet.
    pub fn ensure<T: Serialize>(&self, path: &Path, default: &T) -> AppResult<()> {
        if path.exists() {
            return Ok(());
        }
        self.write(path, default)
    }

    /// Ensures, then loads and parses the document. A document that fails to
    /// decode reads as `default`; the on-disk bytes are left untouched so a
    /// corrupt file can still be inspected and recovered by hand.
    pub fn read<T>(&self, path: &Path, default: T) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.ensure(path, &default)?;
        let bytes =
            fs::read(path).map_err(|error| AppError::StoreUnavailable(error.to_string()))?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "malformed document, reading as default"
                );
                Ok(default)
            }
        }
    }

    /// Replaces the document with `value` via a temp file and rename, so a
    /// reader never observes a partially written document.
    pub fn write<T: Serialize>(&self, path: &Path, value: &T) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| AppError::StoreUnavailable(error.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, &bytes).map_err(|error| AppError::StoreUnavailable(error.to_string()))?;
        fs::rename(&temp, path).map_err(|error| AppError::StoreUnavailable(error.to_string()))
    }
}

/// Resolved locations of every document under one data root. The layout
/// mirrors what the journal app shipped with: reflections under `backend/`,
/// everything else under `data/`.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub reflections: PathBuf,
    pub users: PathBuf,
    pub leaderboard: PathBuf,
    data_dir: PathBuf,
}

impl DataPaths {
    pub fn new(root: &Path) -> AppResult<Self> {
        let backend_dir = root.join("backend");
        let data_dir = root.join("data");
        fs::create_dir_all(&backend_dir)
            .map_err(|error| AppError::StoreUnavailable(error.to_string()))?;
        fs::create_dir_all(&data_dir)
            .map_err(|error| AppError::StoreUnavailable(error.to_string()))?;
        Ok(Self {
            reflections: backend_dir.join("reflections.json"),
            users: data_dir.join("users.json"),
            leaderboard: data_dir.join("leaderboard.json"),
            data_dir,
        })
    }

    pub fn quiz(&self, mode: QuizMode) -> PathBuf {
        self.data_dir.join(mode.file_name())
    }
}
