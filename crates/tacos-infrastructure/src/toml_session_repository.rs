//! TOML-based SessionRepository implementation

use crate::dto::SessionRecordV1;
use crate::paths::TacosPaths;
use crate::storage::{AtomicTomlFile, decode_file_stem, encode_file_stem, run_blocking};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tacos_core::session::{CookieMap, OrderSession, SessionRepository, merge_cookie_maps};
use tacos_core::{Result, TacosError};

/// Stores each order session as its own TOML file.
///
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <session-id-1>.toml
///     └── <session-id-2>.toml
/// ```
///
/// Every read-modify-write runs under the record's file lock, so processes
/// sharing `base_dir` never lose each other's cookie updates.
#[derive(Debug, Clone)]
pub struct TomlSessionRepository {
    sessions_dir: PathBuf,
}

impl TomlSessionRepository {
    /// Creates the repository, creating `base_dir/sessions` if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = base_dir.as_ref().join("sessions");
        fs::create_dir_all(&sessions_dir).map_err(|e| {
            TacosError::io(format!(
                "Failed to create sessions directory {}: {}",
                sessions_dir.display(),
                e
            ))
        })?;

        Ok(Self { sessions_dir })
    }

    /// Creates the repository under the platform data directory.
    pub fn default_location() -> Result<Self> {
        Self::new(TacosPaths::data_dir()?)
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn record_file(sessions_dir: &Path, session_id: &str) -> AtomicTomlFile<SessionRecordV1> {
        AtomicTomlFile::new(sessions_dir.join(format!("{}.toml", encode_file_stem(session_id))))
    }

    /// Applies `f` to an existing record under its lock.
    async fn update<R, F>(&self, session_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut SessionRecordV1) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let file = Self::record_file(&self.sessions_dir, session_id);
        let id = session_id.to_string();
        run_blocking(move || {
            file.update_existing(f)?
                .ok_or_else(|| TacosError::session_not_found(id))
        })
        .await
    }
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<OrderSession>> {
        let file = Self::record_file(&self.sessions_dir, session_id);
        run_blocking(move || Ok(file.load()?.map(OrderSession::from))).await
    }

    async fn save(&self, session: &OrderSession) -> Result<()> {
        let file = Self::record_file(&self.sessions_dir, &session.session_id);
        let record = SessionRecordV1::from(session);
        run_blocking(move || Ok(file.store(&record)?)).await?;

        tracing::debug!(session_id = %session.session_id, "Saved session record");
        Ok(())
    }

    async fn merge_cookies(
        &self,
        session_id: &str,
        cookies: &CookieMap,
        token: Option<&str>,
    ) -> Result<OrderSession> {
        let incoming = cookies.clone();
        let token = token.map(str::to_string);

        let (record, changed) = self
            .update(session_id, move |record| {
                let changed = merge_cookie_maps(&mut record.cookies, &incoming);
                if let Some(token) = token {
                    record.last_token = Some(token);
                }
                record.last_activity_at = Utc::now();
                Ok((record.clone(), changed))
            })
            .await?;

        if changed > 0 {
            tracing::debug!(session_id, changed, "Merged cookies into session");
        }
        Ok(record.into())
    }

    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.update(session_id, move |record| {
            if at > record.last_activity_at {
                record.last_activity_at = at;
            }
            Ok(())
        })
        .await
    }

    async fn mark_submitted(&self, session_id: &str, order_id: &str) -> Result<()> {
        let order_id = order_id.to_string();
        self.update(session_id, move |record| {
            record.submitted_order_id = Some(order_id);
            record.last_activity_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let file = Self::record_file(&self.sessions_dir, session_id);
        run_blocking(move || Ok(file.remove()?)).await
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let dir = self.sessions_dir.clone();
        run_blocking(move || {
            let mut ids = Vec::new();
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                // Temp files start with '.', which the encoder never emits.
                match decode_file_stem(stem) {
                    Some(id) if !stem.starts_with('.') => ids.push(id),
                    _ => tracing::warn!("Skipping unrecognized session file: {}", path.display()),
                }
            }
            ids.sort();
            Ok(ids)
        })
        .await
    }

    async fn delete_if_idle_since(&self, session_id: &str, cutoff: DateTime<Utc>) -> Result<bool> {
        let file = Self::record_file(&self.sessions_dir, session_id);
        run_blocking(move || Ok(file.remove_if(|record| record.last_activity_at < cutoff)?)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn jar(pairs: &[(&str, &str)]) -> CookieMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        let session = OrderSession::new("cart-1", jar(&[("PHPSESSID", "abc")]), None);

        repo.save(&session).await.unwrap();

        let loaded = repo.find_by_id("cart-1").await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_survive_a_new_repository_instance() {
        let temp_dir = TempDir::new().unwrap();
        let session = OrderSession::new("cart-1", jar(&[("a", "1")]), None);
        TomlSessionRepository::new(temp_dir.path())
            .unwrap()
            .save(&session)
            .await
            .unwrap();

        let reopened = TomlSessionRepository::new(temp_dir.path()).unwrap();
        assert!(reopened.find_by_id("cart-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_merge_cookies_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        repo.save(&OrderSession::new("cart-1", CookieMap::new(), None))
            .await
            .unwrap();

        repo.merge_cookies("cart-1", &jar(&[("a", "1")]), None)
            .await
            .unwrap();
        let merged = repo
            .merge_cookies("cart-1", &jar(&[("b", "2")]), Some("tok"))
            .await
            .unwrap();

        assert_eq!(merged.cookies, jar(&[("a", "1"), ("b", "2")]));
        assert_eq!(merged.last_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_concurrent_merges_do_not_regress() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        repo.save(&OrderSession::new("cart-1", CookieMap::new(), None))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("c{}", i);
                repo.merge_cookies("cart-1", &jar(&[(name.as_str(), "v")]), None)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = repo.find_by_id("cart-1").await.unwrap().unwrap();
        assert_eq!(loaded.cookies.len(), 8);
    }

    #[tokio::test]
    async fn test_merge_into_missing_session_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();

        let err = repo
            .merge_cookies("ghost", &jar(&[("a", "1")]), None)
            .await
            .unwrap_err();
        assert!(err.is_session_not_found());
        assert!(repo.find_by_id("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_if_idle_rechecks_activity() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        let mut session = OrderSession::new("cart-1", CookieMap::new(), None);
        session.last_activity_at = Utc::now() - Duration::hours(30);
        repo.save(&session).await.unwrap();

        let cutoff = Utc::now() - Duration::hours(24);
        repo.touch("cart-1", Utc::now()).await.unwrap();

        assert!(!repo.delete_if_idle_since("cart-1", cutoff).await.unwrap());
        assert!(repo.find_by_id("cart-1").await.unwrap().is_some());

        let later_cutoff = Utc::now() + Duration::seconds(1);
        assert!(repo.delete_if_idle_since("cart-1", later_cutoff).await.unwrap());
        assert!(repo.find_by_id("cart-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ids_decodes_file_names() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        for id in ["b/2", "a 1"] {
            repo.save(&OrderSession::new(id, CookieMap::new(), None))
                .await
                .unwrap();
        }

        assert_eq!(repo.list_ids().await.unwrap(), vec!["a 1", "b/2"]);

        repo.delete("a 1").await.unwrap();
        repo.delete("a 1").await.unwrap();
        assert_eq!(repo.list_ids().await.unwrap(), vec!["b/2"]);
    }

    #[tokio::test]
    async fn test_mark_submitted_keeps_record() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        repo.save(&OrderSession::new("cart-1", CookieMap::new(), None))
            .await
            .unwrap();

        repo.mark_submitted("cart-1", "ORD-77").await.unwrap();

        let loaded = repo.find_by_id("cart-1").await.unwrap().unwrap();
        assert_eq!(loaded.submitted_order_id.as_deref(), Some("ORD-77"));
    }
}
