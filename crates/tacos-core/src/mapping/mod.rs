//! Correspondence between remote positional slots and stable item ids.
//!
//! The remote cart is a plain 0-based array: deleting slot 2 of 5 renumbers
//! slots 3..5 down by one. Mappings are therefore a cache derived from the
//! latest decoded listing, never durable truth.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// `(session_id, stable_item_id) -> remote_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapping {
    pub session_id: String,
    pub stable_item_id: String,
    pub remote_index: usize,
    /// Hex recipe identity of the item stored at this slot, when known.
    /// Used to detect drift between the cache and the remote listing.
    #[serde(default)]
    pub recipe_hash: Option<String>,
}

/// Durable storage for index mappings.
#[async_trait]
pub trait IndexMappingRepository: Send + Sync {
    /// Upserts the mapping for `(session_id, stable_item_id)`.
    async fn store(&self, mapping: &IndexMapping) -> Result<()>;

    /// Looks up a single mapping.
    async fn find(&self, session_id: &str, stable_item_id: &str) -> Result<Option<IndexMapping>>;

    /// All mappings of a session ordered by ascending remote index.
    async fn list(&self, session_id: &str) -> Result<Vec<IndexMapping>>;

    /// Atomically replaces every mapping of a session.
    async fn replace_all(&self, session_id: &str, mappings: &[IndexMapping]) -> Result<()>;

    /// Removes every mapping of a session. Missing sessions are not an error.
    async fn remove_all(&self, session_id: &str) -> Result<()>;
}
