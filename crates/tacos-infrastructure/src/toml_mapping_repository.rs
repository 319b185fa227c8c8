//! TOML-based IndexMappingRepository implementation

use crate::dto::MappingFileV1;
use crate::paths::TacosPaths;
use crate::storage::{AtomicTomlFile, encode_file_stem, run_blocking};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tacos_core::mapping::{IndexMapping, IndexMappingRepository};
use tacos_core::{Result, TacosError};

/// Stores all index mappings of a session in one TOML file, so a full
/// rebuild after a cart mutation is a single atomic rename.
///
/// ```text
/// base_dir/
/// └── mappings/
///     └── <session-id>.toml
/// ```
#[derive(Debug, Clone)]
pub struct TomlIndexMappingRepository {
    mappings_dir: PathBuf,
}

impl TomlIndexMappingRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let mappings_dir = base_dir.as_ref().join("mappings");
        fs::create_dir_all(&mappings_dir).map_err(|e| {
            TacosError::io(format!(
                "Failed to create mappings directory {}: {}",
                mappings_dir.display(),
                e
            ))
        })?;

        Ok(Self { mappings_dir })
    }

    pub fn default_location() -> Result<Self> {
        Self::new(TacosPaths::data_dir()?)
    }

    fn mapping_file(&self, session_id: &str) -> AtomicTomlFile<MappingFileV1> {
        AtomicTomlFile::new(
            self.mappings_dir
                .join(format!("{}.toml", encode_file_stem(session_id))),
        )
    }
}

#[async_trait]
impl IndexMappingRepository for TomlIndexMappingRepository {
    async fn store(&self, mapping: &IndexMapping) -> Result<()> {
        let file = self.mapping_file(&mapping.session_id);
        let mapping = mapping.clone();
        run_blocking(move || {
            let empty = MappingFileV1::empty(&mapping.session_id);
            file.update(empty, |current| {
                current.upsert(&mapping);
                Ok::<_, TacosError>(())
            })
        })
        .await
    }

    async fn find(&self, session_id: &str, stable_item_id: &str) -> Result<Option<IndexMapping>> {
        let stable_item_id = stable_item_id.to_string();
        Ok(self
            .list(session_id)
            .await?
            .into_iter()
            .find(|m| m.stable_item_id == stable_item_id))
    }

    async fn list(&self, session_id: &str) -> Result<Vec<IndexMapping>> {
        let file = self.mapping_file(session_id);
        run_blocking(move || {
            Ok(file
                .load()?
                .map(MappingFileV1::into_domain)
                .unwrap_or_default())
        })
        .await
    }

    async fn replace_all(&self, session_id: &str, mappings: &[IndexMapping]) -> Result<()> {
        let file = self.mapping_file(session_id);
        let contents = MappingFileV1::from_domain(session_id, mappings);
        run_blocking(move || Ok(file.store(&contents)?)).await?;

        tracing::debug!(session_id, count = mappings.len(), "Replaced index mappings");
        Ok(())
    }

    async fn remove_all(&self, session_id: &str) -> Result<()> {
        let file = self.mapping_file(session_id);
        run_blocking(move || Ok(file.remove()?)).await
    }
}
