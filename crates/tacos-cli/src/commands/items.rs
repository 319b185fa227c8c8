use super::{gateway, print_json};
use anyhow::Result;
use tacos_core::config::AdapterConfig;

pub async fn list(config: &AdapterConfig, session_id: &str, with_catalog: bool) -> Result<()> {
    let gateway = gateway(config)?;

    let catalog = if with_catalog {
        let handshake = gateway.handshake().await?;
        Some(
            gateway
                .fetch_catalog(&handshake.token, Some(&handshake.cookies))
                .await?,
        )
    } else {
        None
    };

    let lines = gateway.list_items(session_id, catalog.as_ref()).await?;
    print_json(&lines)
}

pub async fn summary(config: &AdapterConfig, session_id: &str) -> Result<()> {
    let summary = gateway(config)?.order_summary(session_id).await?;
    print_json(&summary)
}

pub async fn catalog(config: &AdapterConfig) -> Result<()> {
    let gateway = gateway(config)?;
    let handshake = gateway.handshake().await?;
    let catalog = gateway
        .fetch_catalog(&handshake.token, Some(&handshake.cookies))
        .await?;
    print_json(&catalog)
}
