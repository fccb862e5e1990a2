//! Browser front-end: an upload form, a processing endpoint and one-shot
//! downloads, wrapped in the gateway middleware.
//!
//! ```text
//! GET  /                  upload form
//! POST /process           multipart {file, title, api_key} → JSON
//! GET  /download/{name}   deck bytes, then both output files are deleted
//! GET  /health            liveness
//! GET  /test              environment self-check
//! ```
//!
//! The same routes answer under `/Prod/...`.

pub mod gateway;
pub mod handlers;
pub mod storage;
pub mod template;
pub mod upload;

use crate::config::LyricsConfig;
use crate::error::LyricsError;
use crate::model::{self, LyricModel};
use crate::pipeline::render::Rasterizer;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use storage::Storage;

/// Upload ceiling for `/process`.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Builds a model for the API key a user typed into the form.
pub type ModelConnector =
    Arc<dyn Fn(&str) -> Result<Arc<dyn LyricModel>, LyricsError> + Send + Sync>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub connector: ModelConnector,
    pub config: LyricsConfig,
}

impl AppState {
    /// State whose connector builds an OpenAI-compatible model per request.
    pub fn new(storage: Arc<dyn Storage>, rasterizer: Arc<dyn Rasterizer>, config: LyricsConfig) -> Self {
        let connect_config = config.clone();
        Self {
            storage,
            rasterizer,
            connector: Arc::new(move |key: &str| model::connect(Some(key), &connect_config)),
            config,
        }
    }

    pub fn with_connector(mut self, connector: ModelConnector) -> Self {
        self.connector = connector;
        self
    }
}

/// The complete application, gateway middleware included.
pub fn router(state: Arc<AppState>) -> Router {
    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/process", post(handlers::process))
        .route("/download/{name}", get(handlers::download))
        .route("/health", get(handlers::health))
        .route("/test", get(handlers::test_env))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    // The gateway rewrites the path, so it has to run before routing: the
    // outer router sends everything to `app` through its fallback.
    Router::new()
        .fallback_service(app)
        .layer(middleware::from_fn(gateway::gateway))
}
