//! Plain-text lyric export, written next to the deck.
//!
//! The text file is what a singer pastes into a programme or a rehearsal
//! note: the reformatted blocks in order, with a `[SECTION]` header each
//! time the section changes.

use crate::lyrics::CombinedBlock;
use quick_xml::escape::escape;
use std::path::{Path, PathBuf};

/// Render blocks as the lyric text file.
///
/// A header `\n[SECTION]\n` is written before a block whose section is
/// non-empty and differs from the last header written. Blocks without a
/// section never emit a header and do not reset the last one.
pub fn render_lyrics_text(blocks: &[CombinedBlock]) -> String {
    let mut out = String::new();
    let mut last_header: Option<&str> = None;

    for block in blocks {
        let section = block.section.as_str();
        if !section.is_empty() && last_header != Some(section) {
            out.push('\n');
            out.push('[');
            out.push_str(&section.to_uppercase());
            out.push_str("]\n");
            last_header = Some(section);
        }
        out.push_str(&block.text);
        out.push('\n');
    }
    out
}

/// `song.pptx` → `song_lyrics.txt`. Any other extension keeps the full
/// name and gets `_lyrics.txt` appended.
pub fn lyrics_text_path(deck_path: &Path) -> PathBuf {
    let name = deck_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    deck_path.with_file_name(lyrics_text_name(&name))
}

/// The file-name half of [`lyrics_text_path`].
pub fn lyrics_text_name(deck_name: &str) -> String {
    match deck_name.strip_suffix(".pptx") {
        Some(stem) => format!("{stem}_lyrics.txt"),
        None => format!("{deck_name}_lyrics.txt"),
    }
}

/// Browser rendering of the lyric text for the web form.
///
/// `[X]` lines become section-header divs, other lines are escaped and
/// followed by `<br>`, blank lines become a bare `<br>`.
pub fn lyrics_html(text: &str) -> String {
    let mut html = String::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
            html.push_str(&format!(
                "<div class=\"section-header\">{}</div>",
                escape(trimmed)
            ));
        } else if trimmed.is_empty() {
            html.push_str("<br>");
        } else {
            html.push_str(&escape(line));
            html.push_str("<br>");
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, section: &str) -> CombinedBlock {
        CombinedBlock {
            text: text.into(),
            section: section.into(),
            line_number: 1,
            page: 1,
        }
    }

    #[test]
    fn headers_on_section_change() {
        let blocks = vec![
            block("a\nb", "verse 1"),
            block("c", "chorus"),
        ];
        assert_eq!(render_lyrics_text(&blocks), "\n[VERSE 1]\na\nb\n\n[CHORUS]\nc\n");
    }

    #[test]
    fn repeated_section_has_one_header() {
        let blocks = vec![block("a", "chorus"), block("b", "chorus")];
        assert_eq!(render_lyrics_text(&blocks), "\n[CHORUS]\na\nb\n");
    }

    #[test]
    fn empty_section_does_not_reset_header() {
        let blocks = vec![block("a", "chorus"), block("b", ""), block("c", "chorus")];
        assert_eq!(render_lyrics_text(&blocks), "\n[CHORUS]\na\nb\nc\n");
    }

    #[test]
    fn no_blocks_no_text() {
        assert_eq!(render_lyrics_text(&[]), "");
    }

    #[test]
    fn text_path_next_to_deck() {
        assert_eq!(
            lyrics_text_path(Path::new("/out/song.pptx")),
            PathBuf::from("/out/song_lyrics.txt")
        );
        assert_eq!(
            lyrics_text_path(Path::new("deck.ppt")),
            PathBuf::from("deck.ppt_lyrics.txt")
        );
        assert_eq!(
            lyrics_text_name("20240101_120000_ab12cd_output.pptx"),
            "20240101_120000_ab12cd_output_lyrics.txt"
        );
    }

    #[test]
    fn html_rendering() {
        let html = lyrics_html("\n[VERSE 1]\nTom & Jerry\n");
        assert_eq!(
            html,
            "<br><div class=\"section-header\">[VERSE 1]</div>Tom &amp; Jerry<br><br>"
        );
    }
}
