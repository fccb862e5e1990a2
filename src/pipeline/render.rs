//! PDF rasterisation via pdfium.
//!
//! ## Why a trait?
//!
//! The web front-end and the integration tests need to run the whole
//! pipeline without a pdfium shared library on the machine. [`Rasterizer`]
//! is the seam: [`PdfiumRasterizer`] is the real thing, tests plug in a stub
//! that hands back fixed page images.
//!
//! ## Why blocking?
//!
//! pdfium keeps thread-local state and is not async-safe. Callers run each
//! [`Rasterizer`] call inside its own `tokio::task::spawn_blocking`, one page
//! at a time, so a page is rendered only when the reader is ready for it.

use crate::config::LyricsConfig;
use crate::error::LyricsError;
use crate::pipeline::prepare::{self, PreparedPage};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Turns PDF bytes into upload-ready page images.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf: &[u8], config: &LyricsConfig) -> Result<usize, LyricsError>;

    /// Render the page at zero-based `index`, fitted to `config.image_limits`.
    fn render_page(
        &self,
        pdf: &[u8],
        index: usize,
        config: &LyricsConfig,
    ) -> Result<PreparedPage, LyricsError>;

    /// Short human-readable status for diagnostics endpoints.
    fn status(&self) -> String;
}

/// [`Rasterizer`] backed by a dynamically loaded pdfium library.
///
/// Library lookup order: the explicit path, `PDFIUM_LIB_PATH`, the current
/// directory, then the system library path. The document is reopened for
/// every call; pdfium handles cannot cross the blocking-pool threads.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, LyricsError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(&path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| LyricsError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Pdfium::new(bindings))
    }
}

fn open<'a>(
    pdfium: &'a Pdfium,
    pdf: &'a [u8],
    password: Option<&str>,
) -> Result<PdfDocument<'a>, LyricsError> {
    pdfium.load_pdf_from_byte_slice(pdf, password).map_err(|e| {
        let detail = format!("{e:?}");
        if !detail.to_lowercase().contains("password") {
            LyricsError::CorruptPdf { detail }
        } else if password.is_some() {
            LyricsError::WrongPassword
        } else {
            LyricsError::PasswordRequired
        }
    })
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf: &[u8], config: &LyricsConfig) -> Result<usize, LyricsError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf, config.password.as_deref())?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf: &[u8],
        index: usize,
        config: &LyricsConfig,
    ) -> Result<PreparedPage, LyricsError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf, config.password.as_deref())?;
        let pages = document.pages();
        let total = pages.len() as usize;
        if index >= total {
            return Err(LyricsError::PageOutOfRange { total });
        }

        let page_num = index + 1;
        let page = pages
            .get(index as u16)
            .map_err(|e| LyricsError::RasterisationFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;

        let image = prepare::fit_to_limit(
            |dpi| render_at_dpi(&page, page_num, dpi),
            &config.image_limits,
        )?;
        debug!(
            "Page {} → {}x{} px {} ({} bytes)",
            page_num,
            image.width,
            image.height,
            image.mime_type,
            image.bytes.len()
        );
        Ok(PreparedPage {
            page: page_num,
            image,
        })
    }

    fn status(&self) -> String {
        match self.bind() {
            Ok(_) => "available".to_string(),
            Err(e) => format!("unavailable: {e}"),
        }
    }
}

fn render_at_dpi(page: &PdfPage, page_num: usize, dpi: u32) -> Result<DynamicImage, LyricsError> {
    let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| LyricsError::RasterisationFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;
    Ok(bitmap.as_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_library() -> PdfiumRasterizer {
        PdfiumRasterizer::with_library_path("/nonexistent/lyricdeck/libpdfium.so")
    }

    #[test]
    fn status_reports_missing_library() {
        assert!(missing_library().status().starts_with("unavailable"));
    }

    #[test]
    fn calls_without_library_are_binding_errors() {
        let config = LyricsConfig::default();
        let err = missing_library().page_count(b"%PDF-1.7", &config).unwrap_err();
        assert!(matches!(err, LyricsError::PdfiumBindingFailed(_)), "got: {err}");

        let err = missing_library()
            .render_page(b"%PDF-1.7", 0, &config)
            .unwrap_err();
        assert!(matches!(err, LyricsError::PdfiumBindingFailed(_)), "got: {err}");
    }
}
