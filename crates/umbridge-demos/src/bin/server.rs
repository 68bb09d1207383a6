//! Hosts the `forward` and `posterior` demo models over HTTP.

use std::sync::Arc;

use umbridge_models::{Forward, Posterior};
use umbridge_server::{Registry, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = Registry::new()
        .with_model(Arc::new(Forward))
        .with_model(Arc::new(Posterior));
    let config = ServerConfig::new();

    umbridge_server::serve(registry, config).await?;
    Ok(())
}
