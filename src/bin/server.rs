//! docrel server binary.
//!
//! Opens the file-backed document store and catalog under the data directory
//! and serves them over TCP.

use std::sync::Arc;

use anyhow::Context;
use docrel::catalog::{Catalog, JsonCatalogFile};
use docrel::executor::ExecutionEngine;
use docrel::server::{Server, ServerConfig};
use docrel::storage::FileStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match ServerConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!(
                "usage: docrel-server [--host HOST] [--port PORT] [--data-dir PATH] [--max-connections N]"
            );
            std::process::exit(1);
        }
    };

    info!(
        address = %config.bind_address(),
        data_dir = %config.data_dir.display(),
        "starting"
    );

    let store = FileStore::open(config.data_dir.join("store"))
        .await
        .context("failed to open document store")?;
    let catalog = Catalog::open(Arc::new(JsonCatalogFile::new(config.catalog_path())))
        .with_context(|| format!("failed to load catalog {}", config.catalog_path().display()))?;

    let engine = ExecutionEngine::new(Arc::new(catalog), Arc::new(store));
    Server::new(config, Arc::new(engine)).run().await?;

    info!("server stopped");
    Ok(())
}
