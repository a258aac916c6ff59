use anyhow::Result;
use blob_gateway_axum::{GatewayApp, GatewayConfig, GatewayState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let blobs = config.build_adapter().await?;
    let app = GatewayApp::new(GatewayState::new(blobs));

    let addr = config.addr();
    tracing::info!(%addr, store = ?config.store, "blob gateway listening");

    app.listen(addr).await?;

    Ok(())
}
