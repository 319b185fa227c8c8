//! On-disk record formats.
//!
//! Domain models never hit the disk directly: each file carries a schema
//! version so the layout can evolve without touching `tacos-core`. Table
//! fields are declared last because TOML cannot place plain values after a
//! table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tacos_core::mapping::IndexMapping;
use tacos_core::session::{CookieMap, OrderSession};

pub const SESSION_SCHEMA_VERSION: &str = "1.0.0";
pub const MAPPING_SCHEMA_VERSION: &str = "1.0.0";

fn default_session_version() -> String {
    SESSION_SCHEMA_VERSION.to_string()
}

fn default_mapping_version() -> String {
    MAPPING_SCHEMA_VERSION.to_string()
}

/// `sessions/<id>.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecordV1 {
    #[serde(default = "default_session_version")]
    pub schema_version: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_order_id: Option<String>,
    #[serde(default)]
    pub cookies: CookieMap,
}

impl From<&OrderSession> for SessionRecordV1 {
    fn from(session: &OrderSession) -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION.to_string(),
            session_id: session.session_id.clone(),
            last_token: session.last_token.clone(),
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            submitted_order_id: session.submitted_order_id.clone(),
            cookies: session.cookies.clone(),
        }
    }
}

impl From<SessionRecordV1> for OrderSession {
    fn from(record: SessionRecordV1) -> Self {
        Self {
            session_id: record.session_id,
            cookies: record.cookies,
            last_token: record.last_token,
            created_at: record.created_at,
            last_activity_at: record.last_activity_at,
            submitted_order_id: record.submitted_order_id,
        }
    }
}

/// One row of `mappings/<id>.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntryV1 {
    pub stable_item_id: String,
    pub remote_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_hash: Option<String>,
}

/// `mappings/<id>.toml`: every mapping of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingFileV1 {
    #[serde(default = "default_mapping_version")]
    pub schema_version: String,
    pub session_id: String,
    #[serde(default)]
    pub entries: Vec<MappingEntryV1>,
}

impl MappingFileV1 {
    pub fn empty(session_id: &str) -> Self {
        Self {
            schema_version: MAPPING_SCHEMA_VERSION.to_string(),
            session_id: session_id.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn from_domain(session_id: &str, mappings: &[IndexMapping]) -> Self {
        let mut file = Self::empty(session_id);
        for mapping in mappings {
            file.upsert(mapping);
        }
        file
    }

    /// Inserts or replaces the entry for `mapping.stable_item_id`, keeping
    /// entries sorted by remote index.
    pub fn upsert(&mut self, mapping: &IndexMapping) {
        let entry = MappingEntryV1 {
            stable_item_id: mapping.stable_item_id.clone(),
            remote_index: mapping.remote_index,
            recipe_hash: mapping.recipe_hash.clone(),
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.stable_item_id == entry.stable_item_id)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.entries.sort_by_key(|e| e.remote_index);
    }

    pub fn into_domain(self) -> Vec<IndexMapping> {
        let session_id = self.session_id;
        self.entries
            .into_iter()
            .map(|e| IndexMapping {
                session_id: session_id.clone(),
                stable_item_id: e.stable_item_id,
                remote_index: e.remote_index,
                recipe_hash: e.recipe_hash,
            })
            .collect()
    }
}
