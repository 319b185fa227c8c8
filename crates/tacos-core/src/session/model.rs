//! Order session domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cookie name to value, the remote system's notion of "who is this browser".
///
/// A `BTreeMap` keeps the rendered `Cookie` header deterministic.
pub type CookieMap = BTreeMap<String, String>;

/// One logical customer interaction with the remote system.
///
/// The session id is chosen by the application and doubles as the local cart
/// identifier. The anti-forgery token kept here is informational only: the
/// transport refetches a token for every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSession {
    /// Stable identifier chosen by the application
    pub session_id: String,
    /// Cookie jar accumulated from every remote response
    #[serde(default)]
    pub cookies: CookieMap,
    /// Most recently fetched anti-forgery token
    #[serde(default)]
    pub last_token: Option<String>,
    /// When the session was created (handshake time)
    pub created_at: DateTime<Utc>,
    /// Last successful remote call or explicit touch
    pub last_activity_at: DateTime<Utc>,
    /// Remote order id once the order has been submitted
    #[serde(default)]
    pub submitted_order_id: Option<String>,
}

impl OrderSession {
    /// Creates a session record from a completed handshake.
    pub fn new(session_id: impl Into<String>, cookies: CookieMap, token: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            cookies,
            last_token: token,
            created_at: now,
            last_activity_at: now,
            submitted_order_id: None,
        }
    }

    /// Merges `incoming` into the jar. Existing keys not present in `incoming`
    /// are left untouched.
    ///
    /// Returns the number of keys that were added or changed.
    pub fn merge_cookies(&mut self, incoming: &CookieMap) -> usize {
        merge_cookie_maps(&mut self.cookies, incoming)
    }

    /// Idle time relative to `now`.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity_at
    }

    /// Whether the session has been idle for longer than `max_age`.
    pub fn is_idle_longer_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.idle_for(now) > max_age
    }

    /// Whether an order was already submitted with this session.
    pub fn is_submitted(&self) -> bool {
        self.submitted_order_id.is_some()
    }

    /// Renders the jar as a `Cookie` header value (`a=1; b=2`).
    ///
    /// Returns `None` for an empty jar so callers can omit the header.
    pub fn cookie_header(&self) -> Option<String> {
        render_cookie_header(&self.cookies)
    }
}

/// Renders a jar as a `Cookie` header value, each pair exactly once.
pub fn render_cookie_header(cookies: &CookieMap) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Merges `incoming` into `target` without ever removing keys.
pub fn merge_cookie_maps(target: &mut CookieMap, incoming: &CookieMap) -> usize {
    let mut changed = 0;
    for (name, value) in incoming {
        if target.get(name) != Some(value) {
            target.insert(name.clone(), value.clone());
            changed += 1;
        }
    }
    changed
}
