mod common;

use chrono::{Duration, Utc};
use common::{card, cart, harness, script_handshake, token_page};
use std::collections::BTreeMap;
use tacos_application::spawn_sweeper;
use tacos_core::session::{OrderSession, SessionRepository};
use tokio_util::sync::CancellationToken;

fn jar(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let h = harness();
    let err = h.gateway.session_store().get("nope").await.unwrap_err();
    assert!(err.is_session_not_found());
}

#[tokio::test]
async fn test_idle_session_is_expired_until_swept() {
    let h = harness();
    let mut stale = OrderSession::new("stale", jar(&[("PHPSESSID", "x")]), None);
    stale.last_activity_at = Utc::now() - Duration::hours(25);
    h.sessions.save(&stale).await.unwrap();

    let store = h.gateway.session_store();
    let err = store.get("stale").await.unwrap_err();
    assert!(err.is_session_expired());

    assert_eq!(store.sweep_expired(Duration::hours(24)).await.unwrap(), 1);
    assert!(store.get("stale").await.unwrap_err().is_session_not_found());
}

#[tokio::test]
async fn test_sweep_keeps_recently_active_sessions() {
    let h = harness();
    script_handshake(&h.remote, "t");
    h.gateway.create_session(Some("fresh".into())).await.unwrap();

    let mut stale = OrderSession::new("stale", BTreeMap::new(), None);
    stale.last_activity_at = Utc::now() - Duration::hours(30);
    h.sessions.save(&stale).await.unwrap();

    let removed = h.gateway.sweep_expired(Duration::hours(24)).await.unwrap();

    assert_eq!(removed, 1);
    assert_eq!(h.sessions.list_ids().await.unwrap(), vec!["fresh".to_string()]);
}

#[tokio::test]
async fn test_merges_accumulate_cookies() {
    let h = harness();
    script_handshake(&h.remote, "t");
    h.gateway.create_session(Some("s1".into())).await.unwrap();

    let store = h.gateway.session_store();
    store.merge_cookies("s1", &jar(&[("a", "1")])).await.unwrap();
    let session = store.merge_cookies("s1", &jar(&[("b", "2")])).await.unwrap();

    assert_eq!(session.cookies["a"], "1");
    assert_eq!(session.cookies["b"], "2");
    assert_eq!(session.cookies["PHPSESSID"], "initial");
}

#[tokio::test]
async fn test_create_without_id_generates_one() {
    let h = harness();
    script_handshake(&h.remote, "t");

    let session = h.gateway.create_session(None).await.unwrap();

    assert!(!session.session_id.is_empty());
    assert_eq!(session.last_token.as_deref(), Some("t"));
    assert!(h.sessions.find_by_id(&session.session_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_handshake_without_token_fails() {
    let h = harness();
    h.remote
        .push(common::home("PHPSESSID=x"))
        .push(tacos_interaction::RemoteResponse::new(200, "<html>maintenance</html>"));

    let err = h.gateway.create_session(Some("s1".into())).await.unwrap_err();
    assert!(matches!(err, tacos_core::TacosError::DecodeFailure(_)));
    assert!(h.sessions.find_by_id("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_teardown_removes_session() {
    let h = harness();
    script_handshake(&h.remote, "t");
    h.gateway.create_session(Some("s1".into())).await.unwrap();

    h.gateway.teardown("s1").await.unwrap();

    assert!(h.sessions.find_by_id("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_background_sweeper_stops_on_cancel() {
    let h = harness();
    let mut stale = OrderSession::new("stale", BTreeMap::new(), None);
    stale.last_activity_at = Utc::now() - Duration::hours(48);
    h.sessions.save(&stale).await.unwrap();

    let cancel = CancellationToken::new();
    let handle = spawn_sweeper(
        h.gateway.session_store().clone(),
        std::time::Duration::from_millis(10),
        Duration::hours(24),
        cancel.clone(),
    );

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(h.sessions.find_by_id("stale").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_spares_session_touched_by_in_flight_call() {
    let h = harness();
    script_handshake(&h.remote, "t-create");
    h.gateway.create_session(Some("busy".into())).await.unwrap();

    let mut session = h.sessions.find_by_id("busy").await.unwrap().unwrap();
    session.last_activity_at = Utc::now() - Duration::hours(2);
    h.sessions.save(&session).await.unwrap();

    h.remote
        .push(token_page("t-1"))
        .push(cart(&[card(0, "Tacos L", "Poulet")]));
    // Requests 1 and 2 were the handshake; 3 fetches the token, 4 is the listing.
    let gate = h.remote.pause_at(4);

    let call = h.gateway.list_items("busy", None);
    let sweep = async {
        gate.reached.notified().await;
        let removed = h.gateway.sweep_expired(Duration::hours(1)).await.unwrap();
        gate.release.notify_one();
        removed
    };
    let (lines, removed) = tokio::join!(call, sweep);

    assert_eq!(removed, 0);
    assert_eq!(lines.unwrap().len(), 1);
    let survivor = h.sessions.find_by_id("busy").await.unwrap().unwrap();
    assert!(survivor.last_activity_at > Utc::now() - Duration::hours(1));
}
