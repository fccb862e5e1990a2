//! Web front-end binary: upload form, processing endpoint and downloads.
//!
//! Reads `PORT` (default 5000), `LYRICDECK_STORAGE_DIR` (default `/tmp`) and
//! `LYRICDECK_MODEL` from the environment or a `.env` file.

use anyhow::Context;
use lyricdeck::web::storage::DirStorage;
use lyricdeck::web::{self, AppState};
use lyricdeck::{LyricsConfig, PdfiumRasterizer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STORAGE_DIR: &str = "/tmp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let port = match std::env::var("PORT") {
        Ok(p) => p.parse::<u16>().with_context(|| format!("Invalid PORT '{p}'"))?,
        Err(_) => DEFAULT_PORT,
    };
    let storage_dir =
        std::env::var("LYRICDECK_STORAGE_DIR").unwrap_or_else(|_| DEFAULT_STORAGE_DIR.to_string());

    let mut builder = LyricsConfig::builder();
    if let Ok(model) = std::env::var("LYRICDECK_MODEL") {
        builder = builder.model(model);
    }
    let config = builder.build().context("Invalid configuration")?;

    let state = Arc::new(AppState::new(
        Arc::new(DirStorage::new(&storage_dir)),
        Arc::new(PdfiumRasterizer::new()),
        config,
    ));
    let app = web::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Storage root: {}", storage_dir);
    info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
