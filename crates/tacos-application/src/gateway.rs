//! Integration facade: the one entry point the rest of an application uses.
//!
//! Every session-scoped operation holds that session's lock for its whole
//! duration, including the listing and mapping rebuild that follow a cart
//! mutation.

use crate::index_mapping::{IndexMappingStore, slot_of};
use crate::session_locks::SessionLocks;
use crate::session_store::{Handshake, SessionStore};
use crate::transport::{Transport, rejection_error};
use serde::Serialize;
use std::sync::Arc;
use tacos_core::config::AdapterConfig;
use tacos_core::item::{Catalog, ItemSpec, ParsedLineItem};
use tacos_core::mapping::{IndexMapping, IndexMappingRepository};
use tacos_core::order::{
    OrderConfirmation, OrderForm, OrderSummary, QuantityChange, SideItemForm, SideItemKind,
};
use tacos_core::recipe_id::{item_identity, line_item_identity};
use tacos_core::session::{CookieMap, OrderSession, SessionRepository};
use tacos_core::{Result, TacosError};
use tacos_infrastructure::{ConfigService, TomlIndexMappingRepository, TomlSessionRepository};
use tacos_interaction::classify::has_rate_limit_marker;
use tacos_interaction::decoder::{decode_line_item, decode_line_items, decode_order_summary};
use tacos_interaction::forms;
use tacos_interaction::{RemoteHttp, ReqwestRemote, ResponseClass, classify};
use tracing::{info, warn};

/// One decoded cart entry with its stable id, when the adapter knows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub remote_index: usize,
    pub stable_item_id: Option<String>,
    /// Hex recipe identity, absent for items without a decodable size
    pub recipe_id: Option<String>,
    pub item: ParsedLineItem,
}

pub struct OrderingGateway {
    sessions: SessionStore,
    transport: Transport,
    mappings: IndexMappingStore,
    remote: Arc<dyn RemoteHttp>,
    locks: SessionLocks,
}

impl OrderingGateway {
    /// Wires the TOML repositories under the configured data directory and
    /// the reqwest client.
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        let data_dir = ConfigService::data_dir(config)?;
        let session_repository = Arc::new(TomlSessionRepository::new(&data_dir)?);
        let mapping_repository = Arc::new(TomlIndexMappingRepository::new(&data_dir)?);
        let remote = Arc::new(ReqwestRemote::new(config)?);

        info!(data_dir = %data_dir.display(), base_url = %config.base_url, "Ordering gateway ready");
        Ok(Self::from_parts(
            session_repository,
            mapping_repository,
            remote,
            config,
        ))
    }

    pub fn from_parts(
        session_repository: Arc<dyn SessionRepository>,
        mapping_repository: Arc<dyn IndexMappingRepository>,
        remote: Arc<dyn RemoteHttp>,
        config: &AdapterConfig,
    ) -> Self {
        let sessions = SessionStore::new(
            session_repository,
            mapping_repository.clone(),
            remote.clone(),
            config.token_path.clone(),
            config.session_ttl(),
        );
        let transport = Transport::new(sessions.clone(), remote.clone(), config.token_path.clone());

        Self {
            sessions,
            transport,
            mappings: IndexMappingStore::new(mapping_repository),
            remote,
            locks: SessionLocks::new(),
        }
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn index_mappings(&self) -> &IndexMappingStore {
        &self.mappings
    }

    pub async fn create_session(&self, session_id: Option<String>) -> Result<OrderSession> {
        match session_id {
            Some(id) => {
                let _guard = self.locks.acquire(&id).await;
                self.sessions.create(Some(id.clone())).await
            }
            None => self.sessions.create(None).await,
        }
    }

    /// Sessionless handshake, e.g. to read the catalog.
    pub async fn handshake(&self) -> Result<Handshake> {
        self.sessions.handshake().await
    }

    /// Adds an item to the remote cart under `stable_id`.
    ///
    /// Returns the decoded cart line for the new item, or `None` when the
    /// remote rendered nothing decodable for it. Mystery items cannot be
    /// expressed through the item form and are rejected.
    pub async fn add_item(
        &self,
        session_id: &str,
        item: &ItemSpec,
        stable_id: &str,
        catalog: Option<&Catalog>,
    ) -> Result<Option<CartLine>> {
        let ItemSpec::Regular(order) = item else {
            return Err(TacosError::InvalidRequest(
                "Mystery items have no recipe and cannot be added through the item form".into(),
            ));
        };
        let request = forms::add_item_request(order)?;

        let _guard = self.locks.acquire(session_id).await;

        let existing = self.mappings.list(session_id).await?;
        if existing.iter().any(|m| m.stable_item_id == stable_id) {
            return Err(TacosError::InvalidRequest(format!(
                "Item '{}' is already in the cart of session '{}'",
                stable_id, session_id
            )));
        }

        let reply = self.transport.call(session_id, request).await?;
        let added = decode_line_item(&reply.response.body, catalog);

        // Provisional slot at the end of the cart until the listing confirms it.
        let provisional = existing.last().map_or(0, |m| m.remote_index + 1);
        self.mappings
            .store(session_id, provisional, stable_id, item_identity(item))
            .await?;

        let lines = self.refresh(session_id, catalog, None, Some(stable_id)).await?;
        let line = lines
            .into_iter()
            .find(|line| line.stable_item_id.as_deref() == Some(stable_id))
            .or_else(|| {
                added.map(|decoded| CartLine {
                    remote_index: provisional,
                    stable_item_id: Some(stable_id.to_string()),
                    recipe_id: line_item_identity(&decoded),
                    item: decoded,
                })
            });

        info!(session_id, stable_id, "Added item to remote cart");
        Ok(line)
    }

    /// Decodes the remote cart and rebuilds the index mapping from it.
    pub async fn list_items(
        &self,
        session_id: &str,
        catalog: Option<&Catalog>,
    ) -> Result<Vec<CartLine>> {
        let _guard = self.locks.acquire(session_id).await;
        self.refresh(session_id, catalog, None, None).await
    }

    pub async fn remove_item(&self, session_id: &str, stable_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;

        let remote_index = self.resolve(session_id, stable_id).await?;
        self.transport
            .call(session_id, forms::delete_item_request(remote_index))
            .await?;
        self.refresh(session_id, None, Some(stable_id), None).await?;

        info!(session_id, stable_id, remote_index, "Removed item from remote cart");
        Ok(())
    }

    /// Bumps the quantity of an item by one in either direction.
    pub async fn change_quantity(
        &self,
        session_id: &str,
        stable_id: &str,
        change: QuantityChange,
        catalog: Option<&Catalog>,
    ) -> Result<Option<CartLine>> {
        let _guard = self.locks.acquire(session_id).await;

        let remote_index = self.resolve(session_id, stable_id).await?;
        self.transport
            .call(session_id, forms::change_quantity_request(remote_index, change))
            .await?;

        let lines = self.refresh(session_id, catalog, None, None).await?;
        Ok(lines
            .into_iter()
            .find(|line| line.stable_item_id.as_deref() == Some(stable_id)))
    }

    /// Adds an extra, drink or dessert. Returns the remote JSON answer.
    pub async fn add_side_item(
        &self,
        session_id: &str,
        kind: SideItemKind,
        form: &SideItemForm,
    ) -> Result<serde_json::Value> {
        let request = forms::side_item_request(kind, form)?;

        let _guard = self.locks.acquire(session_id).await;
        let reply = self.transport.call(session_id, request).await?;
        reply.response.json()
    }

    pub async fn order_summary(&self, session_id: &str) -> Result<OrderSummary> {
        let _guard = self.locks.acquire(session_id).await;

        let reply = self
            .transport
            .call(session_id, forms::order_summary_request())
            .await?;
        decode_order_summary(&reply.response.body).ok_or_else(|| {
            TacosError::DecodeFailure("Order summary page has no recognizable section".into())
        })
    }

    /// Finalizes the order.
    ///
    /// The session is kept for tracking with the order id recorded; its
    /// index mappings are cleared. A second submission on the same session
    /// fails with `DuplicateSubmission` without contacting the remote.
    pub async fn submit_order(&self, session_id: &str, form: &OrderForm) -> Result<OrderConfirmation> {
        let request = forms::submit_order_request(form)?;

        let _guard = self.locks.acquire(session_id).await;

        let session = self.sessions.get(session_id).await?;
        if let Some(order_id) = &session.submitted_order_id {
            return Err(TacosError::DuplicateSubmission {
                message: format!("Session already submitted as order {}", order_id),
            });
        }

        let reply = self.transport.call(session_id, request).await?;
        let confirmation = parse_confirmation(reply.response.status, &reply.response.body)?;

        self.sessions
            .mark_submitted(session_id, &confirmation.order_id)
            .await?;
        self.mappings.remove_all(session_id).await?;
        Ok(confirmation)
    }

    /// Reads the stock catalog with an explicit token and optional jar.
    pub async fn fetch_catalog(&self, token: &str, cookies: Option<&CookieMap>) -> Result<Catalog> {
        let mut request = forms::catalog_request().with_token(token);
        if let Some(cookies) = cookies {
            request = request.with_cookies(cookies);
        }

        let response = self.remote.send(&request).await?;
        match classify(&response) {
            ResponseClass::Success => response.json(),
            other => Err(rejection_error(other)),
        }
    }

    pub async fn teardown(&self, session_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;
        self.sessions.teardown(session_id).await
    }

    pub async fn sweep_expired(&self, max_age: chrono::Duration) -> Result<usize> {
        self.sessions.sweep_expired(max_age).await
    }

    async fn resolve(&self, session_id: &str, stable_id: &str) -> Result<usize> {
        self.mappings
            .lookup_remote_index(session_id, stable_id)
            .await?
            .ok_or_else(|| {
                TacosError::InvalidRequest(format!(
                    "Item '{}' is not in the cart of session '{}'",
                    stable_id, session_id
                ))
            })
    }

    /// Lists the cart and rebuilds the mapping. `removed` is dropped from the
    /// expected items first; `appended` is the item the last call added.
    async fn refresh(
        &self,
        session_id: &str,
        catalog: Option<&Catalog>,
        removed: Option<&str>,
        appended: Option<&str>,
    ) -> Result<Vec<CartLine>> {
        let reply = self
            .transport
            .call(session_id, forms::list_items_request())
            .await?;
        let decoded = decode_line_items(&reply.response.body, catalog);

        let expected: Vec<IndexMapping> = self
            .mappings
            .list(session_id)
            .await?
            .into_iter()
            .filter(|m| Some(m.stable_item_id.as_str()) != removed)
            .collect();
        let rebuilt = self
            .mappings
            .reconcile(session_id, &expected, &decoded, appended)
            .await?;

        Ok(decoded
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                let remote_index = slot_of(&item, position);
                CartLine {
                    remote_index,
                    stable_item_id: rebuilt
                        .iter()
                        .find(|m| m.remote_index == remote_index)
                        .map(|m| m.stable_item_id.clone()),
                    recipe_id: line_item_identity(&item),
                    item,
                }
            })
            .collect())
    }
}

/// Reads `{"success": true, "orderId": ...}` from the submission answer.
fn parse_confirmation(status: u16, body: &str) -> Result<OrderConfirmation> {
    let raw: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        TacosError::DecodeFailure(format!("Order submission answered with non-JSON body: {}", e))
    })?;

    if raw.get("success").and_then(|v| v.as_bool()) == Some(false) {
        let message = raw
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Order rejected")
            .to_string();
        if has_rate_limit_marker(&message) {
            return Err(TacosError::RateLimited { message });
        }
        warn!(status, "Remote system rejected the order: {}", message);
        return Err(TacosError::Remote { status, message });
    }

    let order_id = match raw.get("orderId") {
        Some(serde_json::Value::String(id)) if !id.is_empty() => id.clone(),
        Some(serde_json::Value::Number(id)) => id.to_string(),
        _ => {
            return Err(TacosError::DecodeFailure(
                "Order submission answer carries no orderId".into(),
            ));
        }
    };

    Ok(OrderConfirmation { order_id, raw })
}
