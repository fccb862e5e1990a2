//! Error types for the lyricdeck library.
//!
//! Two tiers of failure exist and they never mix:
//!
//! * [`LyricsError`] — **Fatal**: the run cannot produce a deck (bad input,
//!   pdfium unavailable, nothing extracted, deck could not be written).
//!   Returned as `Err(LyricsError)` from the `convert*` entry points.
//!
//! * [`ModelError`] — **Soft**: one model call failed. The extractor turns it
//!   into an empty page, the reformatter into the unmodified block. It is
//!   logged and then dropped; it never reaches a caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the lyricdeck library.
#[derive(Debug, Error)]
pub enum LyricsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// The page selection matched no page of the document.
    #[error("No selected page is in range (document has {total} pages)")]
    PageOutOfRange { total: usize },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// PNG/JPEG encoding of a rendered page failed.
    #[error("Image encoding failed: {0}")]
    ImageEncoding(#[from] image::ImageError),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place libpdfium next to the binary,\n\
or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model provider could not be constructed (missing key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every page came back empty; there is nothing to put on slides.
    #[error("No lyrics found in the PDF ({pages} pages read)")]
    NoLyricsFound { pages: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The deck could not be serialised into a .pptx package.
    #[error("Failed to build presentation: {0}")]
    DeckEncoding(#[from] crate::deck::pptx::PptxError),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed call to the vision/text model.
///
/// Produced by [`crate::model::LyricModel`] implementations and consumed by
/// the pipeline stages, which substitute an empty or unchanged value.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The provider returned an error (network, auth, rate limit, 5xx …).
    #[error("model request failed: {0}")]
    Provider(String),

    /// The provider answered with no text at all.
    #[error("model returned an empty reply")]
    EmptyReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_lyrics_display() {
        let e = LyricsError::NoLyricsFound { pages: 4 };
        assert!(e.to_string().contains("4 pages"), "got: {e}");
    }

    #[test]
    fn rasterisation_display() {
        let e = LyricsError::RasterisationFailed {
            page: 3,
            detail: "bitmap".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("bitmap"));
    }

    #[test]
    fn not_a_pdf_display() {
        let e = LyricsError::NotAPdf {
            name: "score.png".into(),
            magic: b"\x89PNG".to_vec(),
        };
        assert!(e.to_string().contains("score.png"));
    }

    #[test]
    fn model_error_display() {
        let e = ModelError::Provider("401 invalid api key".into());
        assert!(e.to_string().contains("invalid api key"));
    }
}
