use std::sync::Arc;

use keygate::{ConfigLoader, Gateway, Provider};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ConfigLoader::from_env()?.into_config();

    if config.allowed_keys.is_empty() {
        tracing::warn!("ALLOWED_KEYS is empty; every request will be rejected");
    }
    for provider in [Provider::Gemini, Provider::Cerebras] {
        let keys = config.provider(provider).api_keys.len();
        if keys == 0 {
            tracing::warn!(%provider, env = provider.api_key_env(), "no API keys configured");
        } else {
            tracing::info!(%provider, keys, "loaded API key pool");
        }
    }

    let listen = config.listen_addr;
    let gateway = Arc::new(Gateway::new(&config)?);
    let app = keygate::app(gateway);

    let listener = TcpListener::bind(listen).await?;
    tracing::info!(%listen, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
