use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::gateway::StagePrefix;
use super::storage::{self, Area, StorageError};
use super::{template, upload, AppState};
use crate::convert;
use crate::error::LyricsError;
use crate::export;

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
const DOWNLOAD_DISPOSITION: &str = "attachment; filename=lyrics_presentation.pptx";
const DEFAULT_FORM_TITLE: &str = "Unknown";

/// JSON body of every `/process` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pptx_path: Option<String>,
}

impl ProcessResponse {
    fn failure(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            error: Some(error.into()),
            lyrics_text: None,
            lyrics_html: None,
            pptx_path: None,
        })
    }
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error(transparent)]
    Lyrics(#[from] LyricsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub async fn index(req: Request) -> Html<String> {
    let base = req
        .extensions()
        .get::<StagePrefix>()
        .map(|p| p.0)
        .unwrap_or("");
    template::render_index(base)
}

pub async fn process(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<ProcessResponse> {
    let multipart = match multipart {
        Ok(m) => m,
        Err(e) => {
            debug!("Not a multipart request: {}", e);
            return ProcessResponse::failure("No file uploaded");
        }
    };

    let form = match upload::parse_multipart(multipart).await {
        Ok(f) => f,
        Err(e) => {
            warn!("Request error: {}", e);
            return ProcessResponse::failure(format!("Request failed: {e}"));
        }
    };

    let Some(file) = form.file else {
        return ProcessResponse::failure("No file uploaded");
    };
    if !upload::is_pdf_name(&file.filename) {
        return ProcessResponse::failure("Please upload a PDF file");
    }
    let api_key = form.api_key.unwrap_or_default();
    if api_key.trim().is_empty() {
        return ProcessResponse::failure("Please provide an OpenAI API key");
    }
    let title = form.title.unwrap_or_else(|| DEFAULT_FORM_TITLE.to_string());

    let stamp = storage::timestamp_prefix();
    let upload_name = format!("{stamp}_{}", storage::secure_filename(&file.filename));
    if let Err(e) = state.storage.save(Area::Uploads, &upload_name, &file.data).await {
        warn!("Could not store upload: {}", e);
        return ProcessResponse::failure(format!("Request failed: {e}"));
    }
    info!("File saved to: {}/{}", Area::Uploads, upload_name);

    let result = run_pipeline(&state, file.data, &title, &api_key, &stamp).await;

    if let Err(e) = state.storage.delete(Area::Uploads, &upload_name).await {
        warn!("Could not remove upload {}: {}", upload_name, e);
    }

    match result {
        Ok(response) => Json(response),
        Err(e) => {
            warn!("Processing error: {}", e);
            ProcessResponse::failure(format!("Processing failed: {e}"))
        }
    }
}

async fn run_pipeline(
    state: &AppState,
    pdf: Vec<u8>,
    title: &str,
    api_key: &str,
    stamp: &str,
) -> Result<ProcessResponse, ProcessError> {
    let model = (state.connector)(api_key.trim())?;
    let output = convert::convert_bytes(
        pdf,
        model.as_ref(),
        state.rasterizer.clone(),
        Some(title),
        &state.config,
    )
    .await?;

    let deck_name = format!("{stamp}_output.pptx");
    let deck_bytes = output.deck.to_bytes()?;
    state.storage.save(Area::Outputs, &deck_name, &deck_bytes).await?;
    state
        .storage
        .save(
            Area::Outputs,
            &export::lyrics_text_name(&deck_name),
            output.lyrics_text.as_bytes(),
        )
        .await?;

    Ok(ProcessResponse {
        success: true,
        error: None,
        lyrics_html: Some(export::lyrics_html(&output.lyrics_text)),
        lyrics_text: Some(output.lyrics_text),
        pptx_path: Some(deck_name),
    })
}

pub async fn download(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match take_output(&state, &name).await {
        Ok(Some(bytes)) => (
            [(CONTENT_TYPE, PPTX_MIME), (CONTENT_DISPOSITION, DOWNLOAD_DISPOSITION)],
            bytes,
        )
            .into_response(),
        Ok(None) | Err(StorageError::InvalidName(_)) => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            warn!("Download error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error downloading file").into_response()
        }
    }
}

/// Read a deck and remove it together with its lyric text.
///
/// Once the deck itself is gone the bytes are returned even if the text
/// file cannot be removed.
async fn take_output(state: &AppState, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
    let Some(bytes) = state.storage.read(Area::Outputs, name).await? else {
        return Ok(None);
    };
    state.storage.delete(Area::Outputs, name).await?;
    let text_name = export::lyrics_text_name(name);
    if let Err(e) = state.storage.delete(Area::Outputs, &text_name).await {
        warn!("Could not remove {}: {}", text_name, e);
    }
    Ok(Some(bytes))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Local::now().to_rfc3339(),
    }))
}

pub async fn test_env(State(state): State<Arc<AppState>>) -> Json<Value> {
    let storage = state.storage.status().await;
    let rasterizer = state.rasterizer.clone();
    let pdfium = tokio::task::spawn_blocking(move || rasterizer.status())
        .await
        .unwrap_or_else(|e| format!("unavailable: {e}"));

    Json(json!({
        "status": "ok",
        "platform": std::env::consts::OS,
        "crate_version": env!("CARGO_PKG_VERSION"),
        "storage_writable": storage.writable,
        "upload_folder_exists": storage.upload_folder_exists,
        "output_folder_exists": storage.output_folder_exists,
        "dependencies": {
            "pdfium": pdfium,
            "model": format!("{} via edgequake-llm", state.config.model),
            "pptx": "built-in",
        },
    }))
}
