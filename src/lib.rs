//! # lyricdeck
//!
//! Turn a sheet-music PDF into a lyric slide deck using a vision language
//! model.
//!
//! ## Why a vision model?
//!
//! Lyrics in a score are not running text. Syllables are hyphenated under
//! notes, verses are stacked line over line beneath the same staff, and
//! art songs often print a translation under the original. Text extraction
//! gives back soup. A vision model reads the page the way a singer does,
//! and a second text-only pass restores the poem's own line breaks.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Source    local file or download from URL
//!  ├─ 2. Render    rasterise one page via pdfium (spawn_blocking)  ┐
//!  ├─ 3. Prepare   PNG DPI ladder → JPEG quality ladder → half size ├ per page
//!  ├─ 4. Extract   one vision call, JSON fragments                  ┘
//!  ├─ 5. Combine   stitch fragments across page turns by section
//!  ├─ 6. Reformat  identify the poem, re-break lines
//!  ├─ 7. Segment   one lyric line per slide
//!  └─ 8. Deck      16:9 .pptx + _lyrics.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lyricdeck::{convert_to_file, model, LyricsConfig, PdfiumRasterizer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LyricsConfig::default();
//!     let model = model::connect(Some("sk-..."), &config)?;
//!     let written = convert_to_file(
//!         "shenandoah.pdf",
//!         "shenandoah.pptx",
//!         model.as_ref(),
//!         Arc::new(PdfiumRasterizer::new()),
//!         Some("Shenandoah"),
//!         &config,
//!     )
//!     .await?;
//!     eprintln!("{} lyric slides", written.output.stats.lyric_slides);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | The `lyricdeck` binary (clap + indicatif + tracing-subscriber) |
//! | `web`   | on      | The `web` module and `lyricdeck-web` binary (axum) |
//!
//! Library-only use:
//! ```toml
//! lyricdeck = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod deck;
pub mod error;
pub mod export;
pub mod lyrics;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "web")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CallSettings, ImageLimits, LyricsConfig, LyricsConfigBuilder, PageSelection};
pub use convert::{
    convert, convert_bytes, convert_pages, convert_to_file, extract_lyrics, ConversionOutput,
    ConversionStats, WrittenFiles,
};
pub use deck::{build_deck, Deck};
pub use error::{LyricsError, ModelError};
pub use lyrics::{CombinedBlock, LyricFragment, LyricSheet, PageLyrics, SlideLine, SlideSegment};
pub use model::{LyricModel, ModelRequest, ProviderModel};
pub use pipeline::prepare::{PreparedImage, PreparedPage};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use progress::{NoopProgress, PipelineProgress, ProgressCallback, Stage};
