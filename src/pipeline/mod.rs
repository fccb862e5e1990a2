//! Pipeline stages for sheet-music-to-deck conversion.
//!
//! Each submodule implements exactly one transformation step and takes its
//! inputs as arguments, so every stage can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ render ──▶ prepare ──▶ extract ──▶ combine ──▶ reformat ──▶ segment
//! (path/URL)  (pdfium)   (≤ ceiling)  (vision)    (sections)  (text LLM)   (slides)
//! ```
//!
//! 1. [`source`]   — load PDF bytes from a local path or URL
//! 2. [`render`]   — rasterise selected pages; pdfium is blocking, so this
//!    runs inside `spawn_blocking`
//! 3. [`prepare`]  — step DPI, then JPEG quality, then size down until a page
//!    image fits the upload ceiling
//! 4. [`extract`]  — one vision call per page, reply parsed into fragments
//! 5. [`combine`]  — stitch fragments across pages into section blocks
//! 6. [`reformat`] — second pass reflowing each block into poetic lines
//! 7. [`segment`]  — one slide per lyric line
//!
//! [`cleanup`] holds the reply-parsing helpers shared by 4 and 6.

pub mod cleanup;
pub mod combine;
pub mod extract;
pub mod prepare;
pub mod reformat;
pub mod render;
pub mod segment;
pub mod source;
