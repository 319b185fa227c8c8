pub mod items;
pub mod recipe;
pub mod session;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tacos_application::OrderingGateway;
use tacos_core::config::AdapterConfig;
use tacos_infrastructure::ConfigService;

pub fn load_config(path: Option<&Path>) -> Result<AdapterConfig> {
    let config = match path {
        Some(path) => ConfigService::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigService::load().context("Failed to load config")?,
    };
    tracing::debug!(base_url = %config.base_url, "Loaded configuration");
    Ok(config)
}

pub fn gateway(config: &AdapterConfig) -> Result<OrderingGateway> {
    OrderingGateway::new(config).context("Failed to initialize the ordering gateway")
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let value: Value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
