// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ket::config::Config;
use ket::setup;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting ket");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: cluster={} kubernetes={} bin_dir={}",
        config.cluster_name,
        config.kubernetes_version,
        config.bin_dir.display()
    );

    let mut clients = setup::start(config).await?;

    match clients.api.namespaces().await {
        Ok(namespaces) => info!("Cluster is up with namespaces: {}", namespaces.join(", ")),
        Err(e) => warn!("Failed to list namespaces: {}", e),
    }

    let Some(deploy) = clients.deploy.take() else {
        return Ok(());
    };

    // Keep running while the deploy loop does
    let abort = deploy.abort_handle();
    tokio::select! {
        result = deploy.wait() => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping deploy loop");
            abort.abort();
        }
    }

    Ok(())
}
