use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use placement_core::config;
use placement_core::Relay;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Config and relative store paths resolve against PLACEMENT_ROOT (default: cwd).
    let root = std::env::var_os("PLACEMENT_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let cfg = config::load_or_default(&root).map_err(anyhow::Error::msg)?;
    let bind = std::env::var("PLACEMENT_BIND").unwrap_or_else(|_| cfg.relay.bind.clone());

    let relay = Relay::from_config(&cfg, &root).context("initialize relay")?;
    placement_relay::serve(Arc::new(relay), &bind, cfg.relay.max_body_bytes).await
}
