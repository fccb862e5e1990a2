//! Conversion entry points.
//!
//! The layering mirrors how callers hold their inputs:
//!
//! * [`convert_to_file`]: path or URL in, `.pptx` (and `_lyrics.txt`) on disk.
//!   This is what the CLI calls.
//! * [`convert`]: path or URL in, [`ConversionOutput`] in memory.
//! * [`convert_bytes`]: PDF bytes in (the web upload handler).
//! * [`convert_pages`]: already-rasterised pages in. No pdfium needed,
//!   which makes it the seam integration tests drive.
//! * [`extract_lyrics`]: both model passes, stopping before layout.
//!
//! Pages are read strictly one after another: a page is rendered, resized
//! and read by the model before the next page is rendered.

use crate::config::{LyricsConfig, DEFAULT_TITLE};
use crate::deck::{self, Deck};
use crate::error::LyricsError;
use crate::export;
use crate::lyrics::{LyricSheet, SlideSegment};
use crate::model::LyricModel;
use crate::pipeline::prepare::PreparedPage;
use crate::pipeline::render::Rasterizer;
use crate::pipeline::{combine, extract, reformat, segment, source};
use crate::progress::{NoopProgress, PipelineProgress, Stage};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Title shown on the first slide.
    pub title: String,
    pub sheet: LyricSheet,
    pub segments: Vec<SlideSegment>,
    pub deck: Deck,
    /// Content of the `_lyrics.txt` export.
    pub lyrics_text: String,
    pub stats: ConversionStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Pages sent to the model.
    pub pages: usize,
    /// Pages that yielded at least one fragment.
    pub pages_with_lyrics: usize,
    pub fragments: usize,
    pub blocks: usize,
    pub reformatted_blocks: usize,
    pub lyric_slides: usize,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Files written by [`convert_to_file`].
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub deck: PathBuf,
    /// `None` when text export is disabled.
    pub lyrics_text: Option<PathBuf>,
    pub output: ConversionOutput,
}

fn progress(config: &LyricsConfig) -> &dyn PipelineProgress {
    config.progress_callback.as_deref().unwrap_or(&NoopProgress)
}

/// Where the reader takes its pages from.
enum PageSource<'a> {
    Prepared(&'a [PreparedPage]),
    /// Rendered on demand, one blocking task per page.
    Pdf {
        rasterizer: Arc<dyn Rasterizer>,
        pdf: Arc<[u8]>,
        indices: Vec<usize>,
    },
}

impl PageSource<'_> {
    fn len(&self) -> usize {
        match self {
            PageSource::Prepared(pages) => pages.len(),
            PageSource::Pdf { indices, .. } => indices.len(),
        }
    }

    fn page_number(&self, i: usize) -> usize {
        match self {
            PageSource::Prepared(pages) => pages[i].page,
            PageSource::Pdf { indices, .. } => indices[i] + 1,
        }
    }

    async fn page(&self, i: usize, config: &LyricsConfig) -> Result<Cow<'_, PreparedPage>, LyricsError> {
        match self {
            PageSource::Prepared(pages) => Ok(Cow::Borrowed(&pages[i])),
            PageSource::Pdf {
                rasterizer,
                pdf,
                indices,
            } => {
                let index = indices[i];
                on_blocking_pool(rasterizer, pdf, config, move |r, pdf, config| {
                    r.render_page(pdf, index, config)
                })
                .await
                .map(Cow::Owned)
            }
        }
    }
}

async fn on_blocking_pool<T, F>(
    rasterizer: &Arc<dyn Rasterizer>,
    pdf: &Arc<[u8]>,
    config: &LyricsConfig,
    job: F,
) -> Result<T, LyricsError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Rasterizer, &[u8], &LyricsConfig) -> Result<T, LyricsError> + Send + 'static,
{
    let rasterizer = rasterizer.clone();
    let pdf = pdf.clone();
    let config = config.clone();
    tokio::task::spawn_blocking(move || job(&*rasterizer, &pdf[..], &config))
        .await
        .map_err(|e| LyricsError::Internal(format!("rasterisation task failed: {e}")))?
}

/// Run both model passes over prepared pages.
///
/// # Errors
/// [`LyricsError::NoLyricsFound`] when no page produced any lyric text.
/// Individual model failures never surface here.
pub async fn extract_lyrics(
    model: &dyn LyricModel,
    pages: &[PreparedPage],
    config: &LyricsConfig,
) -> Result<LyricSheet, LyricsError> {
    let (sheet, _) = read_sheet(model, &PageSource::Prepared(pages), config).await?;
    Ok(sheet)
}

/// Each page is fetched and read before the next one is touched. Returns
/// the sheet and the time spent fetching pages.
async fn read_sheet(
    model: &dyn LyricModel,
    source: &PageSource<'_>,
    config: &LyricsConfig,
) -> Result<(LyricSheet, Duration), LyricsError> {
    let cb = progress(config);
    let total = source.len();
    cb.on_start(total);

    let mut render = Duration::ZERO;
    let mut page_lyrics = Vec::with_capacity(total);
    for i in 0..total {
        let page_num = source.page_number(i);
        info!("Processing page {}/{}", page_num, total);
        cb.on_page_start(page_num, total);

        let fetch_start = Instant::now();
        let page = source.page(i, config).await?;
        render += fetch_start.elapsed();

        let lyrics = extract::extract_page(model, &page, config).await;
        cb.on_page_complete(page_num, total, lyrics.fragments.len());
        page_lyrics.push(lyrics);
    }

    cb.on_stage(Stage::Combining);
    let combined = combine::combine_pages(&page_lyrics);
    if combined.is_empty() {
        return Err(LyricsError::NoLyricsFound { pages: total });
    }
    info!("Combined lyrics into {} blocks", combined.len());

    let mut blocks = Vec::with_capacity(combined.len());
    let mut reformatted_blocks = 0;
    if config.reformat {
        cb.on_stage(Stage::Reformatting);
        for (i, block) in combined.iter().enumerate() {
            let out = reformat::reformat_block(model, block, config).await;
            let changed = out.text != block.text;
            if changed {
                reformatted_blocks += 1;
            }
            cb.on_block_reformatted(i + 1, combined.len(), changed);
            blocks.push(out);
        }
    } else {
        debug!("Reformatting disabled");
        blocks = combined;
    }

    let sheet = LyricSheet {
        pages: page_lyrics,
        blocks,
        reformatted_blocks,
    };
    Ok((sheet, render))
}

/// Convert prepared page images into a deck.
///
/// `title` wins when non-blank; otherwise the first song title the model
/// reported is used, then [`DEFAULT_TITLE`].
pub async fn convert_pages(
    model: &dyn LyricModel,
    pages: &[PreparedPage],
    title: Option<&str>,
    config: &LyricsConfig,
) -> Result<ConversionOutput, LyricsError> {
    let source = PageSource::Prepared(pages);
    build_output(model, &source, title, config, Instant::now(), Duration::ZERO).await
}

/// `render` carries fetch time spent before the first page (opening the PDF).
async fn build_output(
    model: &dyn LyricModel,
    source: &PageSource<'_>,
    title: Option<&str>,
    config: &LyricsConfig,
    start: Instant,
    render: Duration,
) -> Result<ConversionOutput, LyricsError> {
    let read_start = Instant::now();
    let (sheet, page_render) = read_sheet(model, source, config).await?;
    let render = render + page_render;
    let llm_duration = read_start.elapsed().saturating_sub(page_render);

    let title = resolve_title(title, &sheet);
    let segments = segment::segment_blocks(&sheet.blocks, config.max_lines_per_slide);

    let cb = progress(config);
    cb.on_stage(Stage::BuildingDeck);
    let deck = deck::build_deck(&title, &segments);
    let lyrics_text = export::render_lyrics_text(&sheet.blocks);
    cb.on_complete(deck.lyric_slide_count());

    let stats = ConversionStats {
        pages: source.len(),
        pages_with_lyrics: sheet.pages.iter().filter(|p| !p.fragments.is_empty()).count(),
        fragments: sheet.fragment_count(),
        blocks: sheet.blocks.len(),
        reformatted_blocks: sheet.reformatted_blocks,
        lyric_slides: deck.lyric_slide_count(),
        render_duration_ms: render.as_millis() as u64,
        llm_duration_ms: llm_duration.as_millis() as u64,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Created {} lyric slides from {}/{} pages",
        stats.lyric_slides, stats.pages_with_lyrics, stats.pages
    );

    Ok(ConversionOutput {
        title,
        sheet,
        segments,
        deck,
        lyrics_text,
        stats,
    })
}

/// Convert PDF bytes held in memory.
///
/// Pages are rendered lazily: page N+1 is not rasterised until the model
/// has answered for page N.
pub async fn convert_bytes(
    pdf: Vec<u8>,
    model: &dyn LyricModel,
    rasterizer: Arc<dyn Rasterizer>,
    title: Option<&str>,
    config: &LyricsConfig,
) -> Result<ConversionOutput, LyricsError> {
    source::check_pdf_magic("upload", &pdf)?;

    let start = Instant::now();
    progress(config).on_stage(Stage::Rendering);
    let pdf: Arc<[u8]> = pdf.into();
    let total = on_blocking_pool(&rasterizer, &pdf, config, |r, pdf, config| {
        r.page_count(pdf, config)
    })
    .await?;

    let indices = config.pages.to_indices(total);
    if indices.is_empty() {
        return Err(LyricsError::PageOutOfRange { total });
    }
    info!("PDF loaded: {} pages, {} selected", total, indices.len());

    let source = PageSource::Pdf {
        rasterizer,
        pdf,
        indices,
    };
    build_output(model, &source, title, config, start, start.elapsed()).await
}

/// Convert a local path or HTTP(S) URL.
pub async fn convert(
    input: &str,
    model: &dyn LyricModel,
    rasterizer: Arc<dyn Rasterizer>,
    title: Option<&str>,
    config: &LyricsConfig,
) -> Result<ConversionOutput, LyricsError> {
    info!("Processing sheet music: {}", input);
    let pdf = source::load_pdf(input, config.download_timeout_secs).await?;
    convert_bytes(pdf.bytes, model, rasterizer, title, config).await
}

/// Convert and write the deck to `output_path`, plus the lyric text beside
/// it when `config.export_text` is set.
///
/// The deck is written first through a temp file and rename, so a failed
/// run never leaves a truncated `.pptx` behind.
pub async fn convert_to_file(
    input: &str,
    output_path: impl AsRef<Path>,
    model: &dyn LyricModel,
    rasterizer: Arc<dyn Rasterizer>,
    title: Option<&str>,
    config: &LyricsConfig,
) -> Result<WrittenFiles, LyricsError> {
    let output = convert(input, model, rasterizer, title, config).await?;
    let path = output_path.as_ref();

    let bytes = output.deck.to_bytes()?;
    write_atomic(path, &bytes).await?;
    info!("Presentation saved to: {}", path.display());

    let lyrics_text = if config.export_text {
        let text_path = export::lyrics_text_path(path);
        write_atomic(&text_path, output.lyrics_text.as_bytes()).await?;
        info!("Lyrics text saved to: {}", text_path.display());
        Some(text_path)
    } else {
        None
    };

    Ok(WrittenFiles {
        deck: path.to_path_buf(),
        lyrics_text,
        output,
    })
}

fn resolve_title(explicit: Option<&str>, sheet: &LyricSheet) -> String {
    explicit
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| sheet.song_title())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LyricsError> {
    let io_err = |source| LyricsError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(io_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(io_err(e));
    }
    Ok(())
}
