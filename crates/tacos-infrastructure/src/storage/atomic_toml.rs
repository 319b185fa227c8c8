//! Atomic TOML file operations with ACID guarantees.
//!
//! Provides a thin layer for safe concurrent access to per-record TOML files.
//! Several processes may share one data directory, so read-modify-write
//! cycles are serialized with an exclusive `fs2` lock on a sibling file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tacos_core::TacosError;
use thiserror::Error;

/// Errors that can occur during atomic TOML operations.
#[derive(Debug, Error)]
pub enum AtomicTomlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<AtomicTomlError> for TacosError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Io(e) => e.into(),
            AtomicTomlError::Parse { path, source } => TacosError::Serialization {
                format: "TOML".to_string(),
                message: format!("{}: {}", path, source),
            },
            AtomicTomlError::Serialize(e) => e.into(),
            AtomicTomlError::Lock(message) => TacosError::data_access(message),
        }
    }
}

/// A handle to an atomic TOML file.
///
/// Provides:
/// - **Atomicity**: Writes go to a tmp file that is renamed over the target
/// - **Isolation**: `update*` and `remove*` hold an exclusive file lock
/// - **Durability**: Explicit fsync before rename
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| AtomicTomlError::Parse {
                path: self.path.display().to_string(),
                source,
            })
    }

    /// Writes `data` under the file lock, replacing any previous content.
    pub fn store(&self, data: &T) -> Result<(), AtomicTomlError> {
        let _lock = self.acquire_lock()?;
        self.write(data)
    }

    /// Read-modify-write under the file lock, starting from `default_value`
    /// when the file does not exist yet.
    pub fn update<R, E, F>(&self, default_value: T, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<AtomicTomlError>,
    {
        let _lock = self.acquire_lock()?;

        let mut data = self.load()?.unwrap_or(default_value);
        let result = f(&mut data)?;
        self.write(&data)?;

        Ok(result)
    }

    /// Read-modify-write of an existing record under the file lock.
    ///
    /// Returns `Ok(None)` without writing when the file does not exist.
    pub fn update_existing<R, E, F>(&self, f: F) -> Result<Option<R>, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<AtomicTomlError>,
    {
        let _lock = self.acquire_lock()?;

        let Some(mut data) = self.load()? else {
            return Ok(None);
        };
        let result = f(&mut data)?;
        self.write(&data)?;

        Ok(Some(result))
    }

    /// Deletes the file if `predicate` holds for its current content.
    ///
    /// The content is read under the lock, so a concurrent update either
    /// completes before the check or waits for the deletion.
    pub fn remove_if<F>(&self, predicate: F) -> Result<bool, AtomicTomlError>
    where
        F: FnOnce(&T) -> bool,
    {
        let lock = self.acquire_lock()?;

        let Some(data) = self.load()? else {
            return Ok(false);
        };
        if !predicate(&data) {
            return Ok(false);
        }
        self.remove_file()?;
        lock.discard();

        Ok(true)
    }

    /// Deletes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), AtomicTomlError> {
        let lock = self.acquire_lock()?;
        self.remove_file()?;
        lock.discard();
        Ok(())
    }

    fn remove_file(&self) -> Result<(), AtomicTomlError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &T) -> Result<(), AtomicTomlError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            )
        })?;
        let file_name = self.path.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path has no file name")
        })?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    fn acquire_lock(&self) -> Result<FileLock, AtomicTomlError> {
        FileLock::acquire(&self.path)
    }
}

/// Exclusive lock guard; the OS lock is released when the handle is dropped.
///
/// The lock file itself is kept between operations: unlinking it while
/// another process waits on the same inode would let a third process lock a
/// fresh file concurrently. It is only removed together with its record.
struct FileLock {
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        use fs2::FileExt;
        file.lock_exclusive()
            .map_err(|e| AtomicTomlError::Lock(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file, lock_path })
    }

    /// Removes the lock file after its record has been deleted.
    fn discard(self) {
        let _ = fs::remove_file(&self.lock_path);
        drop(self.file);
    }
}
