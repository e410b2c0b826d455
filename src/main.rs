use anyhow::{Context, Result};
use roost::config::{AdminConfig, ENV_CONFIG_PATH};
use roost::server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("roost=info,tower_http=info")),
        )
        .init();

    let config = match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) => AdminConfig::from_yaml_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => AdminConfig::default_config(),
    }
    .with_env();
    config.validate().context("invalid configuration")?;

    tracing::info!(backend = %config.backend.url, "starting roost-admin");

    ServerBuilder::connect(config).serve().await
}
