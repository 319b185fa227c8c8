//! Session-aware calls to the remote site.
//!
//! Every call fetches a fresh anti-forgery token with the session's current
//! cookies, sends the real request with that token, and folds any returned
//! cookies back into the stored session. A rejected token triggers exactly
//! one retry with a newly fetched token.

use crate::session_store::SessionStore;
use std::sync::Arc;
use tacos_core::session::{CookieMap, OrderSession};
use tacos_core::{Result, TacosError};
use tacos_interaction::decoder::extract_token;
use tacos_interaction::{RemoteHttp, RemoteRequest, RemoteResponse, ResponseClass, classify};
use tracing::{debug, error, warn};

/// First attempt plus the single retry after a token rejection.
const MAX_ATTEMPTS: usize = 2;

/// Result of fetching the token page.
#[derive(Debug, Clone)]
pub struct TokenPage {
    pub token: String,
    /// Cookies set by the token page itself
    pub cookies: CookieMap,
}

/// Successful answer to a session call, with the session as stored after
/// cookies were merged.
#[derive(Debug, Clone)]
pub struct RemoteReply {
    pub response: RemoteResponse,
    pub session: OrderSession,
}

/// Fetches the order page with `cookies` and reads the token out of it.
pub async fn fetch_token(
    remote: &dyn RemoteHttp,
    token_path: &str,
    cookies: &CookieMap,
) -> Result<TokenPage> {
    let response = remote
        .send(&RemoteRequest::get(token_path).with_cookies(cookies))
        .await?;

    match classify(&response) {
        ResponseClass::Success => {}
        ResponseClass::TokenRejected => {
            return Err(TacosError::Remote {
                status: response.status,
                message: "Order page refused the session".to_string(),
            });
        }
        other => return Err(rejection_error(other)),
    }

    let token = extract_token(&response.body).ok_or_else(|| {
        TacosError::DecodeFailure("Order page carried no anti-forgery token".to_string())
    })?;
    debug!(token_len = token.len(), "Fetched anti-forgery token");

    Ok(TokenPage {
        token,
        cookies: response.cookies(),
    })
}

/// Maps a non-success, non-token classification onto its error kind.
pub(crate) fn rejection_error(class: ResponseClass) -> TacosError {
    match class {
        ResponseClass::RateLimited { message } => TacosError::RateLimited { message },
        ResponseClass::Duplicate { message } => TacosError::DuplicateSubmission { message },
        ResponseClass::Failed { status, message } => TacosError::Remote { status, message },
        ResponseClass::TokenRejected => TacosError::Remote {
            status: 403,
            message: "Anti-forgery token rejected".to_string(),
        },
        ResponseClass::Success => TacosError::internal("Success is not a rejection"),
    }
}

#[derive(Clone)]
pub struct Transport {
    sessions: SessionStore,
    remote: Arc<dyn RemoteHttp>,
    token_path: String,
}

impl Transport {
    pub fn new(sessions: SessionStore, remote: Arc<dyn RemoteHttp>, token_path: impl Into<String>) -> Self {
        Self {
            sessions,
            remote,
            token_path: token_path.into(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Sends `request` on behalf of `session_id`.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` / `SessionExpired` from the session store
    /// - `SessionInvalid` when the token is rejected on both attempts or the
    ///   order page stops issuing tokens
    /// - `RateLimited`, `DuplicateSubmission`, `Remote` per classification
    /// - `Unreachable` when no response arrives (never retried)
    pub async fn call(&self, session_id: &str, request: RemoteRequest) -> Result<RemoteReply> {
        let session = self.sessions.get(session_id).await?;
        let mut cookies = session.cookies;

        for attempt in 1..=MAX_ATTEMPTS {
            // Always the current jar: cookies may have rotated on the
            // rejected attempt.
            let page = fetch_token(self.remote.as_ref(), &self.token_path, &cookies)
                .await
                .map_err(|e| token_fetch_error(session_id, e))?;
            let session = self
                .sessions
                .record_token(session_id, &page.cookies, &page.token)
                .await?;

            let outgoing = request
                .clone()
                .with_cookies(&session.cookies)
                .with_token(&page.token);
            debug!(
                session_id,
                attempt,
                method = %outgoing.method,
                path = %outgoing.path,
                fields = ?outgoing.field_names(),
                "Calling remote system"
            );

            let response = self.remote.send(&outgoing).await?;
            let session = self
                .sessions
                .merge_cookies(session_id, &response.cookies())
                .await?;
            cookies = session.cookies.clone();

            match classify(&response) {
                ResponseClass::Success => return Ok(RemoteReply { response, session }),
                ResponseClass::TokenRejected => {
                    warn!(
                        session_id,
                        attempt,
                        path = %request.path,
                        "Remote system rejected the anti-forgery token"
                    );
                }
                other => {
                    let err = rejection_error(other);
                    warn!(session_id, path = %request.path, "Remote call failed: {}", err);
                    return Err(err);
                }
            }
        }

        error!(session_id, path = %request.path, "Token rejected on every attempt");
        Err(TacosError::session_invalid(
            session_id,
            format!("anti-forgery token rejected {} times", MAX_ATTEMPTS),
        ))
    }
}

/// A token page that stops issuing tokens or refuses the jar means the
/// remote session is gone.
fn token_fetch_error(session_id: &str, err: TacosError) -> TacosError {
    match err {
        TacosError::DecodeFailure(reason) => TacosError::session_invalid(session_id, reason),
        TacosError::Remote { status: 403, message } => {
            TacosError::session_invalid(session_id, message)
        }
        other => other,
    }
}
