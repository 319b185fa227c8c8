//! Storage layer for atomic file operations.

mod atomic_toml;
mod file_name;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile};
pub use file_name::{decode_file_stem, encode_file_stem};

use tacos_core::{Result, TacosError};

/// Runs blocking file work off the async executor.
pub(crate) async fn run_blocking<R, F>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TacosError::internal(format!("Storage task failed: {}", e)))?
}
