//! Lyric data carried between pipeline stages.
//!
//! Every value here is created and consumed within one run. Stages take
//! these by reference and return new values; nothing is edited in place.

use serde::{Deserialize, Serialize};

/// One lyric excerpt read off a single page.
///
/// `section` is whatever label the model chose ("verse 1", "Chorus", "")
/// and is compared by exact string equality only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricFragment {
    pub text: String,
    pub section: String,
    /// 1-indexed page the fragment was read from.
    pub page: usize,
    pub line_number: usize,
}

/// Everything the extractor learned from one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLyrics {
    /// 1-indexed page number.
    pub page: usize,
    pub fragments: Vec<LyricFragment>,
    pub song_title: Option<String>,
    /// "strophic", "multilingual" or "standard" as reported by the model.
    pub song_type: Option<String>,
}

impl PageLyrics {
    /// The value used when a page could not be read.
    pub fn empty(page: usize) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }
}

/// Consecutive fragments sharing a section, joined by line breaks.
///
/// The reformatter returns the same shape with `text` reflowed, so this type
/// doubles as the reformatted block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedBlock {
    pub text: String,
    pub section: String,
    /// 1-based position of the block in the run.
    pub line_number: usize,
    /// Page of the block's first fragment.
    pub page: usize,
}

impl CombinedBlock {
    /// Non-blank, trimmed lines of the block in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n').map(str::trim).filter(|l| !l.is_empty())
    }
}

/// One lyric line destined for a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideLine {
    pub text: String,
    pub section: String,
    pub line_number: usize,
    pub page: usize,
}

/// The content of exactly one lyric slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSegment {
    pub lines: Vec<SlideLine>,
}

impl SlideSegment {
    /// Text shown on the slide, one lyric line per physical line.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Section label of the slide, taken from its first line.
    pub fn section(&self) -> &str {
        self.lines.first().map(|l| l.section.as_str()).unwrap_or("")
    }
}

/// The pipeline state after both model passes.
///
/// Returned by [`crate::convert::extract_lyrics`] and threaded explicitly
/// through the remaining stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricSheet {
    pub pages: Vec<PageLyrics>,
    /// Blocks after the reformatting pass (or straight from the combiner
    /// when reformatting is disabled).
    pub blocks: Vec<CombinedBlock>,
    /// Number of blocks the reformatter actually changed.
    pub reformatted_blocks: usize,
}

impl LyricSheet {
    /// First non-empty song title reported by any page.
    pub fn song_title(&self) -> Option<&str> {
        self.pages
            .iter()
            .filter_map(|p| p.song_title.as_deref())
            .map(str::trim)
            .find(|t| !t.is_empty())
    }

    pub fn fragment_count(&self) -> usize {
        self.pages.iter().map(|p| p.fragments.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_lines_skip_blanks_and_trim() {
        let block = CombinedBlock {
            text: "  first \n\n second\n   ".into(),
            section: "verse 1".into(),
            line_number: 1,
            page: 1,
        };
        assert_eq!(block.lines().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn song_title_skips_blank_pages() {
        let sheet = LyricSheet {
            pages: vec![
                PageLyrics {
                    page: 1,
                    song_title: Some("  ".into()),
                    ..Default::default()
                },
                PageLyrics {
                    page: 2,
                    song_title: Some("Le Secret".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(sheet.song_title(), Some("Le Secret"));
    }
}
