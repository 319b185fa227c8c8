use super::{gateway, print_json};
use anyhow::Result;
use chrono::Duration;
use tacos_core::config::AdapterConfig;

pub async fn create(config: &AdapterConfig, id: Option<String>) -> Result<()> {
    let session = gateway(config)?.create_session(id).await?;
    print_json(&session)
}

pub async fn show(config: &AdapterConfig, session_id: &str) -> Result<()> {
    let session = gateway(config)?.session_store().get(session_id).await?;
    print_json(&session)
}

pub async fn teardown(config: &AdapterConfig, session_id: &str) -> Result<()> {
    gateway(config)?.teardown(session_id).await?;
    println!("Session '{}' removed", session_id);
    Ok(())
}

pub async fn sweep(config: &AdapterConfig, max_age_hours: Option<u64>) -> Result<()> {
    let max_age = match max_age_hours {
        Some(hours) => Duration::hours(hours as i64),
        None => config.session_ttl(),
    };
    let removed = gateway(config)?.sweep_expired(max_age).await?;
    println!("Removed {} expired session(s)", removed);
    Ok(())
}
