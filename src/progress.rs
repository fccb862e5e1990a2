//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn PipelineProgress>`] via
//! [`crate::config::LyricsConfigBuilder::progress_callback`] to receive
//! events while the pipeline reads pages and builds the deck. The CLI uses
//! this to drive its progress bar; the web front-end leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use lyricdeck::{LyricsConfig, PipelineProgress};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl PipelineProgress for PageCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize, _fragments: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = LyricsConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Coarse pipeline stages reported through [`PipelineProgress::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the PDF; pages are then rendered one by one as they are read.
    Rendering,
    /// Stitching page fragments into section blocks.
    Combining,
    /// Second pass: reflowing blocks into poetic lines.
    Reformatting,
    /// Laying out and writing the slide deck.
    BuildingDeck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Rendering => "Opening PDF",
            Stage::Combining => "Combining lyrics from all pages",
            Stage::Reformatting => "Reformatting lyrics into poetic lines",
            Stage::BuildingDeck => "Creating presentation",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it processes a score.
///
/// Pages are processed strictly in order, so implementations see
/// `on_page_start(n)` / `on_page_complete(n)` pairs without interleaving.
/// All methods default to no-ops.
pub trait PipelineProgress: Send + Sync {
    /// Called once the page count is known, before the first model call.
    fn on_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a pipeline stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called before the vision request for a page (1-indexed).
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called after a page was read. `fragments` is 0 when the page failed
    /// softly or genuinely carries no lyrics.
    fn on_page_complete(&self, page: usize, total_pages: usize, fragments: usize) {
        let _ = (page, total_pages, fragments);
    }

    /// Called after each block of the reformatting pass.
    fn on_block_reformatted(&self, index: usize, total_blocks: usize, changed: bool) {
        let _ = (index, total_blocks, changed);
    }

    /// Called once the deck has been built.
    fn on_complete(&self, lyric_slides: usize) {
        let _ = lyric_slides;
    }
}

/// Shared, clonable handle to a progress sink.
pub type ProgressCallback = Arc<dyn PipelineProgress>;

/// A callback that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl PipelineProgress for NoopProgress {}
