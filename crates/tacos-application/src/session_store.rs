//! Session lifecycle on top of the session repository.

use crate::transport::fetch_token;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tacos_core::mapping::IndexMappingRepository;
use tacos_core::session::{CookieMap, OrderSession, SessionRepository, merge_cookie_maps};
use tacos_core::{Result, TacosError};
use tacos_interaction::forms::HOME_PATH;
use tacos_interaction::{RemoteHttp, RemoteRequest};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cookies and token obtained by visiting the site like a fresh browser.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub cookies: CookieMap,
    pub token: String,
}

/// Creates, reads, refreshes and expires order sessions.
///
/// Records live in the injected repository, so sessions survive restarts and
/// can be shared by several processes over the same data directory.
#[derive(Clone)]
pub struct SessionStore {
    repository: Arc<dyn SessionRepository>,
    mappings: Arc<dyn IndexMappingRepository>,
    remote: Arc<dyn RemoteHttp>,
    token_path: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        mappings: Arc<dyn IndexMappingRepository>,
        remote: Arc<dyn RemoteHttp>,
        token_path: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            mappings,
            remote,
            token_path: token_path.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Visits the entry point, then the order page, keeping both cookie sets.
    pub async fn handshake(&self) -> Result<Handshake> {
        let home = self.remote.send(&RemoteRequest::get(HOME_PATH)).await?;
        if !home.is_success() {
            warn!(status = home.status, "Entry point answered with a non-success status");
        }
        let mut cookies = home.cookies();

        let page = fetch_token(self.remote.as_ref(), &self.token_path, &cookies).await?;
        merge_cookie_maps(&mut cookies, &page.cookies);

        debug!(
            cookie_count = cookies.len(),
            token_len = page.token.len(),
            "Completed remote handshake"
        );
        Ok(Handshake {
            cookies,
            token: page.token,
        })
    }

    /// Starts a session with a fresh handshake.
    ///
    /// A record already stored under `session_id` is replaced, together with
    /// its index mappings: the new remote cart starts empty.
    pub async fn create(&self, session_id: Option<String>) -> Result<OrderSession> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if session_id.trim().is_empty() {
            return Err(TacosError::InvalidRequest("Session id must not be empty".into()));
        }

        let handshake = self.handshake().await?;
        let session = OrderSession::new(&session_id, handshake.cookies, Some(handshake.token));

        self.repository.save(&session).await?;
        self.mappings.remove_all(&session_id).await?;

        info!(session_id = %session_id, "Created order session");
        Ok(session)
    }

    /// Loads a live session.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when no record exists, `SessionExpired` when the
    /// record has been idle longer than the TTL and awaits the sweeper.
    pub async fn get(&self, session_id: &str) -> Result<OrderSession> {
        let session = self
            .repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| TacosError::session_not_found(session_id))?;

        let now = Utc::now();
        if session.is_idle_longer_than(self.ttl, now) {
            return Err(TacosError::SessionExpired {
                session_id: session_id.to_string(),
                idle_secs: session.idle_for(now).num_seconds(),
            });
        }
        Ok(session)
    }

    /// Merges `cookies` into the stored jar and marks the session active.
    pub async fn merge_cookies(&self, session_id: &str, cookies: &CookieMap) -> Result<OrderSession> {
        self.repository.merge_cookies(session_id, cookies, None).await
    }

    /// Like [`merge_cookies`](Self::merge_cookies), also remembering the
    /// token just fetched.
    pub async fn record_token(
        &self,
        session_id: &str,
        cookies: &CookieMap,
        token: &str,
    ) -> Result<OrderSession> {
        self.repository
            .merge_cookies(session_id, cookies, Some(token))
            .await
    }

    pub async fn touch(&self, session_id: &str) -> Result<()> {
        self.repository.touch(session_id, Utc::now()).await
    }

    /// Records the remote order id. The session is kept for tracking.
    pub async fn mark_submitted(&self, session_id: &str, order_id: &str) -> Result<()> {
        self.repository.mark_submitted(session_id, order_id).await?;
        info!(session_id, order_id, "Order submitted");
        Ok(())
    }

    /// Deletes the session and its index mappings.
    pub async fn teardown(&self, session_id: &str) -> Result<()> {
        self.repository.delete(session_id).await?;
        self.mappings.remove_all(session_id).await?;
        info!(session_id, "Tore down order session");
        Ok(())
    }

    /// Deletes every session idle for longer than `max_age`.
    ///
    /// Idleness is re-checked under each record's lock at delete time, so a
    /// session touched while the sweep runs survives. Failures on single
    /// records are logged and skipped.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0;

        for session_id in self.repository.list_ids().await? {
            match self.repository.delete_if_idle_since(&session_id, cutoff).await {
                Ok(true) => {
                    if let Err(e) = self.mappings.remove_all(&session_id).await {
                        warn!(session_id = %session_id, "Failed to remove mappings of swept session: {}", e);
                    }
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => warn!(session_id = %session_id, "Failed to sweep session: {}", e),
            }
        }

        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }
}
