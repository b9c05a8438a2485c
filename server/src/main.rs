use anyhow::{Context, Result};
use clap::Parser;
use sift_core::persist::IndexPaths;
use sift_core::SearchIndex;
use sift_server::app_for_index;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// Read-only HTTP search over an index built by `sift-indexer build`.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let index = SearchIndex::open(IndexPaths::new(&args.index))
        .with_context(|| format!("loading index from {}", args.index.display()))?;
    let num_docs = index.meta().num_docs;
    let app = app_for_index(Arc::new(index));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, num_docs, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
