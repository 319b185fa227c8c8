//! Session repository trait.
//!
//! Defines the interface for durable session persistence.

use super::model::{CookieMap, OrderSession};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An abstract repository for persisting order sessions.
///
/// Records must survive process restarts, so implementations are expected to
/// write to durable storage rather than process memory.
///
/// # Implementation Notes
///
/// `merge_cookies`, `touch` and `delete_if_idle_since` are read-modify-write
/// operations and must be atomic with respect to each other for the same
/// session id. Concurrent partial cookie updates must never regress keys
/// acquired by another writer.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(OrderSession))`: Session found
    /// - `Ok(None)`: No record for this id
    /// - `Err(_)`: Storage failure
    async fn find_by_id(&self, session_id: &str) -> Result<Option<OrderSession>>;

    /// Inserts or fully replaces a session record.
    async fn save(&self, session: &OrderSession) -> Result<()>;

    /// Merges cookies (and optionally the latest token) into an existing record
    /// and bumps `last_activity_at`.
    ///
    /// # Returns
    ///
    /// - `Ok(OrderSession)`: The record after the merge
    /// - `Err(TacosError::SessionNotFound)`: No record for this id
    async fn merge_cookies(
        &self,
        session_id: &str,
        cookies: &CookieMap,
        token: Option<&str>,
    ) -> Result<OrderSession>;

    /// Sets `last_activity_at` to `at`.
    ///
    /// Fails with `SessionNotFound` when no record exists.
    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Records the remote order id after a successful submission.
    async fn mark_submitted(&self, session_id: &str, order_id: &str) -> Result<()>;

    /// Deletes a session record. Deleting a missing record is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists the ids of all stored sessions.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Deletes the record only if its `last_activity_at` is older than `cutoff`
    /// at the moment of deletion.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The record was idle and has been deleted
    /// - `Ok(false)`: The record is missing or was active after `cutoff`
    async fn delete_if_idle_since(&self, session_id: &str, cutoff: DateTime<Utc>) -> Result<bool>;
}
