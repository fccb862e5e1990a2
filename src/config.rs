//! Configuration types for sheet-music-to-deck conversion.
//!
//! Every knob of a run lives in [`LyricsConfig`], built via its
//! [`LyricsConfigBuilder`]. The CLI maps its flags onto the builder and the
//! web front-end clones one shared config per request.

use crate::error::LyricsError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default title used when neither the caller nor the score supplies one.
pub const DEFAULT_TITLE: &str = "Lyrics Presentation";

/// Configuration for one sheet-music conversion.
///
/// # Example
/// ```rust
/// use lyricdeck::LyricsConfig;
///
/// let config = LyricsConfig::builder()
///     .start_dpi(150)
///     .model("gpt-4o-mini")
///     .reformat(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.image_limits.start_dpi, 150);
/// ```
#[derive(Clone)]
pub struct LyricsConfig {
    /// Page image size fitting: DPI ladder, byte ceiling and JPEG ladder.
    pub image_limits: ImageLimits,

    /// Model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Provider name for `ProviderFactory` when no API key is passed
    /// explicitly (e.g. "anthropic", "ollama"). Default: None.
    pub provider_name: Option<String>,

    /// Sampling settings for the per-page vision call. Default: 0.1 / 2000.
    pub extraction: CallSettings,

    /// Sampling settings for the "identify this poem" lookup. Default: 0.1 / 1000.
    pub reference_lookup: CallSettings,

    /// Sampling settings for the poetic reflow pass. Default: 0.3 / 1000.
    pub reformatting: CallSettings,

    /// Run the second (poetic reflow) pass. Default: true.
    pub reformat: bool,

    /// Write `<deck>_lyrics.txt` next to the deck. Default: true.
    pub export_text: bool,

    /// Upper bound on lyric lines per slide. Default: 1.
    ///
    /// Segmentation currently always places one line on each slide; values
    /// above 1 are accepted and logged but do not group lines.
    pub max_lines_per_slide: usize,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted scores.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress events sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            image_limits: ImageLimits::default(),
            model: "gpt-4o".to_string(),
            provider_name: None,
            extraction: CallSettings {
                temperature: 0.1,
                max_tokens: 2000,
            },
            reference_lookup: CallSettings {
                temperature: 0.1,
                max_tokens: 1000,
            },
            reformatting: CallSettings {
                temperature: 0.3,
                max_tokens: 1000,
            },
            reformat: true,
            export_text: true,
            max_lines_per_slide: 1,
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for LyricsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LyricsConfig")
            .field("image_limits", &self.image_limits)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("extraction", &self.extraction)
            .field("reference_lookup", &self.reference_lookup)
            .field("reformatting", &self.reformatting)
            .field("reformat", &self.reformat)
            .field("export_text", &self.export_text)
            .field("max_lines_per_slide", &self.max_lines_per_slide)
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgress>"),
            )
            .finish()
    }
}

impl LyricsConfig {
    /// Create a new builder for `LyricsConfig`.
    pub fn builder() -> LyricsConfigBuilder {
        LyricsConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Temperature and output-token budget for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallSettings {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Limits applied when turning a PDF page into an upload-sized image.
///
/// The defaults mirror the vision API's 20 MiB image ceiling: start at
/// 200 DPI, step down by 50 to no lower than 100, then fall back to JPEG at
/// quality 85, 75 … 20, then to a half-size JPEG at quality 70.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLimits {
    pub max_bytes: usize,
    pub start_dpi: u32,
    pub min_dpi: u32,
    pub dpi_step: u32,
    pub start_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
    pub fallback_quality: u8,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            start_dpi: 200,
            min_dpi: 100,
            dpi_step: 50,
            start_quality: 85,
            min_quality: 20,
            quality_step: 10,
            fallback_quality: 70,
        }
    }
}

/// Builder for [`LyricsConfig`].
#[derive(Debug)]
pub struct LyricsConfigBuilder {
    config: LyricsConfig,
}

impl LyricsConfigBuilder {
    pub fn image_limits(mut self, limits: ImageLimits) -> Self {
        self.config.image_limits = limits;
        self
    }

    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.image_limits.max_bytes = bytes;
        self
    }

    pub fn start_dpi(mut self, dpi: u32) -> Self {
        self.config.image_limits.start_dpi = dpi.clamp(36, 600);
        self
    }

    pub fn min_dpi(mut self, dpi: u32) -> Self {
        self.config.image_limits.min_dpi = dpi.clamp(36, 600);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn extraction(mut self, settings: CallSettings) -> Self {
        self.config.extraction = settings;
        self
    }

    pub fn reference_lookup(mut self, settings: CallSettings) -> Self {
        self.config.reference_lookup = settings;
        self
    }

    pub fn reformatting(mut self, settings: CallSettings) -> Self {
        self.config.reformatting = settings;
        self
    }

    pub fn reformat(mut self, v: bool) -> Self {
        self.config.reformat = v;
        self
    }

    pub fn export_text(mut self, v: bool) -> Self {
        self.config.export_text = v;
        self
    }

    pub fn max_lines_per_slide(mut self, n: usize) -> Self {
        self.config.max_lines_per_slide = n;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LyricsConfig, LyricsError> {
        let c = &self.config;
        let l = &c.image_limits;
        if l.max_bytes == 0 {
            return Err(LyricsError::InvalidConfig(
                "image byte ceiling must be > 0".into(),
            ));
        }
        if l.min_dpi > l.start_dpi {
            return Err(LyricsError::InvalidConfig(format!(
                "minimum DPI {} is above starting DPI {}",
                l.min_dpi, l.start_dpi
            )));
        }
        if l.dpi_step == 0 || l.quality_step == 0 {
            return Err(LyricsError::InvalidConfig(
                "DPI and quality steps must be ≥ 1".into(),
            ));
        }
        for q in [l.start_quality, l.min_quality, l.fallback_quality] {
            if !(1..=100).contains(&q) {
                return Err(LyricsError::InvalidConfig(format!(
                    "JPEG quality must be 1–100, got {q}"
                )));
            }
        }
        if l.min_quality > l.start_quality {
            return Err(LyricsError::InvalidConfig(format!(
                "minimum JPEG quality {} is above starting quality {}",
                l.min_quality, l.start_quality
            )));
        }
        if c.max_lines_per_slide == 0 {
            return Err(LyricsError::InvalidConfig(
                "max lines per slide must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(LyricsError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the score to read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// Read a single page (1-indexed).
    Single(usize),
    /// Read a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Read specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_vision_api_limits() {
        let c = LyricsConfig::default();
        assert_eq!(c.image_limits.max_bytes, 20 * 1024 * 1024);
        assert_eq!(c.image_limits.start_dpi, 200);
        assert_eq!(c.image_limits.min_dpi, 100);
        assert_eq!(c.image_limits.dpi_step, 50);
        assert_eq!(c.extraction.max_tokens, 2000);
        assert_eq!(c.max_lines_per_slide, 1);
        assert!(c.reformat);
    }

    #[test]
    fn builder_rejects_inverted_dpi_ladder() {
        let err = LyricsConfig::builder()
            .start_dpi(100)
            .min_dpi(150)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("minimum DPI"));
    }

    #[test]
    fn builder_rejects_zero_lines_per_slide() {
        assert!(LyricsConfig::builder()
            .max_lines_per_slide(0)
            .build()
            .is_err());
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 9).to_indices(3), vec![1, 2]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(3),
            vec![0, 2]
        );
    }
}
