//! CLI binary for lyricdeck.
//!
//! A thin shim over the library crate that maps CLI arguments to
//! `LyricsConfig`, runs one conversion and prints `Success` or `Error: ...`.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lyricdeck::{
    convert_to_file, model, LyricsConfig, PageSelection, PdfiumRasterizer, PipelineProgress,
    ProgressCallback, Stage,
};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the score is opened, a page bar while
/// the vision model reads it, then a spinner again for the later stages.
struct CliProgress {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening score…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
        self.bar.reset_eta();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl PipelineProgress for CliProgress {
    fn on_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading lyrics from {total_pages} pages…"))
        ));
    }

    fn on_stage(&self, stage: Stage) {
        if stage == Stage::Rendering {
            self.bar.set_message(stage.to_string());
            return;
        }
        if self.bar.length().is_some_and(|len| len > 0) {
            self.bar.set_style(spinner_style());
            self.bar.set_length(0);
        }
        self.bar.set_prefix("Working");
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_page_start(&self, page: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_complete(&self, page: usize, total: usize, fragments: usize) {
        let elapsed_ms = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let found = if fragments == 0 {
            dim("no lyrics")
        } else {
            format!("{fragments:>2} fragments")
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            page,
            total,
            found,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_block_reformatted(&self, index: usize, total_blocks: usize, changed: bool) {
        let mark = if changed { "reflowed" } else { "kept" };
        self.bar
            .set_message(format!("block {index}/{total_blocks} {}", dim(mark)));
    }

    fn on_complete(&self, lyric_slides: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} lyric slides",
            green("✔"),
            bold(&lyric_slides.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Classic four-argument form
  lyricdeck score.pdf slides.pptx "Shenandoah" sk-...

  # Key from the environment, title detected from the score
  LYRICDECK_API_KEY=sk-... lyricdeck score.pdf slides.pptx

  # Score from a URL, first four pages only, skip the reflow pass
  lyricdeck --pages 1-4 --no-reformat https://example.org/score.pdf out.pptx

  # Another provider (key read from its own env var)
  lyricdeck --provider anthropic --model claude-sonnet-4-20250514 score.pdf out.pptx

OUTPUT:
  <output>.pptx          16:9 deck: title slide, then one slide per lyric line
  <output>_lyrics.txt    plain text with [SECTION] headers (unless --no-text-export)

ENVIRONMENT VARIABLES:
  LYRICDECK_API_KEY       OpenAI API key (same as the fourth argument)
  OPENAI_API_KEY          Used when no key is given
  ANTHROPIC_API_KEY       Used with --provider anthropic
  LYRICDECK_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory or file of an existing libpdfium
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Turn a sheet-music PDF into a lyric slide deck using a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "lyricdeck",
    version,
    about = "Turn sheet-music PDFs into lyric slide decks using Vision LLMs",
    long_about = "Read the lyrics printed under the staves of a sheet-music PDF with a vision \
language model, restore their poetic line breaks, and lay them out as a 16:9 PowerPoint deck \
with one lyric line per slide.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Where to write the .pptx deck.
    output: PathBuf,

    /// Title for the first slide. Detected from the score when omitted.
    #[arg(env = "LYRICDECK_TITLE")]
    title: Option<String>,

    /// OpenAI API key. Falls back to provider env vars when omitted.
    #[arg(env = "LYRICDECK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Vision model ID (e.g. gpt-4o, gpt-4o-mini).
    #[arg(long, env = "LYRICDECK_MODEL", default_value = "gpt-4o")]
    model: String,

    /// LLM provider used when no API key is given: openai, anthropic, gemini, ollama.
    #[arg(long, env = "LYRICDECK_PROVIDER")]
    provider: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "LYRICDECK_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted scores.
    #[arg(long, env = "LYRICDECK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip the second pass that restores poetic line breaks.
    #[arg(long, env = "LYRICDECK_NO_REFORMAT")]
    no_reformat: bool,

    /// Do not write <output>_lyrics.txt.
    #[arg(long, env = "LYRICDECK_NO_TEXT_EXPORT")]
    no_text_export: bool,

    /// Upper bound on lyric lines per slide.
    #[arg(long, env = "LYRICDECK_MAX_LINES_PER_SLIDE", default_value_t = 1)]
    max_lines_per_slide: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "LYRICDECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "LYRICDECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LYRICDECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result line and errors.
    #[arg(short, long, env = "LYRICDECK_QUIET")]
    quiet: bool,
}

/// Parses arguments; usage errors exit 1, `--help` and `--version` exit 0.
fn parse_cli<I, T>(args: I) -> Result<Cli, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        u8::from(e.use_stderr())
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match parse_cli(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return ExitCode::from(code),
    };

    // The bar carries the feedback; INFO logs would tear through it.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => {
            println!("Success");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn PipelineProgress>)
    } else {
        None
    };

    let config = build_config(cli, progress)?;
    let model = model::connect(cli.api_key.as_deref(), &config)
        .context("Could not set up the language model")?;

    let written = convert_to_file(
        &cli.input,
        &cli.output,
        model.as_ref(),
        Arc::new(PdfiumRasterizer::new()),
        cli.title.as_deref(),
        &config,
    )
    .await
    .context("Conversion failed")?;

    if !cli.quiet {
        let stats = &written.output.stats;
        eprintln!(
            "{}  {}/{} pages with lyrics  {} slides  {}ms  →  {}",
            green("✔"),
            stats.pages_with_lyrics,
            stats.pages,
            stats.lyric_slides,
            stats.total_duration_ms,
            bold(&written.deck.display().to_string()),
        );
        if let Some(ref text) = written.lyrics_text {
            eprintln!("   {}", dim(&text.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `LyricsConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<LyricsConfig> {
    let mut builder = LyricsConfig::builder()
        .model(cli.model.clone())
        .pages(parse_pages(&cli.pages)?)
        .reformat(!cli.no_reformat)
        .export_text(!cli.no_text_export)
        .max_lines_per_slide(cli.max_lines_per_slide)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages`: `all`, `5`, `3-15` or `1,3,5`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();
    if s == "all" {
        return Ok(PageSelection::All);
    }

    if let Some((start, end)) = s.split_once('-') {
        let (start, end) = (page_number(start)?, page_number(end)?);
        if start > end {
            anyhow::bail!("Page range {start}-{end} runs backwards");
        }
        return Ok(PageSelection::Range(start, end));
    }

    if s.contains(',') {
        let pages = s.split(',').map(page_number).collect::<Result<Vec<_>>>()?;
        return Ok(PageSelection::Set(pages));
    }

    page_number(&s).map(PageSelection::Single)
}

fn page_number(s: &str) -> Result<usize> {
    let s = s.trim();
    let page: usize = s
        .parse()
        .with_context(|| format!("'{s}' is not a page number"))?;
    if page == 0 {
        anyhow::bail!("Pages are numbered from 1");
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_all_single_range_set() {
        assert_eq!(parse_pages("ALL").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 4 ").unwrap(), PageSelection::Single(4));
        assert_eq!(parse_pages("2-5").unwrap(), PageSelection::Range(2, 5));
        assert_eq!(
            parse_pages("1, 3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn pages_rejects_zero_and_inverted() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("0,2").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn four_positional_arguments() {
        let cli = Cli::try_parse_from(["lyricdeck", "in.pdf", "out.pptx", "Title", "sk-1"]).unwrap();
        assert_eq!(cli.input, "in.pdf");
        assert_eq!(cli.output, PathBuf::from("out.pptx"));
        assert_eq!(cli.title.as_deref(), Some("Title"));
        assert_eq!(cli.api_key.as_deref(), Some("sk-1"));
        assert!(!cli.no_reformat);
    }

    #[test]
    fn usage_errors_exit_with_failure() {
        assert_eq!(parse_cli(["lyricdeck", "in.pdf"]).err(), Some(1));
        assert_eq!(
            parse_cli(["lyricdeck", "in.pdf", "out.pptx", "--max-lines-per-slide", "x"]).err(),
            Some(1)
        );
    }

    #[test]
    fn help_and_version_exit_cleanly() {
        assert_eq!(parse_cli(["lyricdeck", "--help"]).err(), Some(0));
        assert_eq!(parse_cli(["lyricdeck", "--version"]).err(), Some(0));
    }
}
