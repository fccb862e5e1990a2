//! Cross-page combining: stitch page fragments into section blocks.
//!
//! A verse often runs over a page turn. Fragments are flattened in page
//! order and a new block starts whenever the section label changes, so the
//! two halves of a verse split by a page break end up in one block.

use crate::lyrics::{CombinedBlock, LyricFragment, PageLyrics};

/// Group consecutive fragments with equal `section` into blocks.
///
/// Block `line_number`s are 1-based positions. Empty fragment texts are
/// skipped, and a block whose text is blank is dropped.
pub fn combine_pages(pages: &[PageLyrics]) -> Vec<CombinedBlock> {
    let fragments = pages.iter().flat_map(|p| p.fragments.iter());
    let mut blocks = combine_fragments(fragments);
    blocks.retain(|b| !b.text.trim().is_empty());
    for (i, block) in blocks.iter_mut().enumerate() {
        block.line_number = i + 1;
    }
    blocks
}

fn combine_fragments<'a>(fragments: impl Iterator<Item = &'a LyricFragment>) -> Vec<CombinedBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<&'a LyricFragment> = None;
    let mut lines: Vec<&'a str> = Vec::new();

    for fragment in fragments {
        if let Some(head) = current {
            if head.section != fragment.section && !lines.is_empty() {
                blocks.push(flush(head, &lines, blocks.len()));
                lines.clear();
                current = None;
            }
        }
        if fragment.text.trim().is_empty() {
            continue;
        }
        match current {
            Some(head) if head.section == fragment.section => {}
            _ => current = Some(fragment),
        }
        lines.push(fragment.text.as_str());
    }

    if let Some(head) = current {
        if !lines.is_empty() {
            blocks.push(flush(head, &lines, blocks.len()));
        }
    }
    blocks
}

/// `head` is the first non-empty fragment of the block.
fn flush(head: &LyricFragment, lines: &[&str], blocks_so_far: usize) -> CombinedBlock {
    CombinedBlock {
        text: lines.join("\n"),
        section: head.section.clone(),
        line_number: blocks_so_far + 1,
        page: head.page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, section: &str, page: usize) -> LyricFragment {
        LyricFragment {
            text: text.into(),
            section: section.into(),
            page,
            line_number: 1,
        }
    }

    fn page(n: usize, frags: Vec<LyricFragment>) -> PageLyrics {
        PageLyrics {
            page: n,
            fragments: frags,
            ..Default::default()
        }
    }

    #[test]
    fn verse_across_page_turn_is_one_block() {
        let pages = vec![
            page(1, vec![frag("O Shenandoah,", "verse 1", 1)]),
            page(2, vec![frag("I long to see you", "verse 1", 2)]),
        ];
        let blocks = combine_pages(&pages);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "O Shenandoah,\nI long to see you");
        assert_eq!(blocks[0].page, 1);
        assert_eq!(blocks[0].line_number, 1);
    }

    #[test]
    fn section_changes_start_new_blocks() {
        let pages = vec![page(
            1,
            vec![
                frag("a", "verse 1", 1),
                frag("b", "verse 1", 1),
                frag("c", "chorus", 1),
                frag("d", "verse 1", 1),
            ],
        )];
        let blocks = combine_pages(&pages);
        let summary: Vec<_> = blocks
            .iter()
            .map(|b| (b.section.as_str(), b.text.as_str(), b.line_number))
            .collect();
        assert_eq!(
            summary,
            vec![("verse 1", "a\nb", 1), ("chorus", "c", 2), ("verse 1", "d", 3)]
        );
    }

    #[test]
    fn block_count_equals_runs_of_equal_sections() {
        let sections = ["", "", "A", "A", "B", "", "", "A"];
        let frags: Vec<_> = sections
            .iter()
            .enumerate()
            .map(|(i, s)| frag(&format!("line {i}"), s, 1))
            .collect();
        let runs = 1 + sections.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(combine_pages(&[page(1, frags)]).len(), runs);
    }

    #[test]
    fn fragment_text_is_kept_verbatim() {
        let pages = vec![page(
            1,
            vec![frag("  Ave Maria,  ", "", 1), frag("gratia plena", "", 1)],
        )];
        let blocks = combine_pages(&pages);
        assert_eq!(blocks[0].text, "  Ave Maria,  \ngratia plena");
        assert_eq!(blocks[0].lines().collect::<Vec<_>>(), ["Ave Maria,", "gratia plena"]);
    }

    #[test]
    fn lines_are_preserved_in_order() {
        let pages = vec![
            page(1, vec![frag("one", "", 1), frag("  ", "", 1), frag("two", "x", 1)]),
            page(2, vec![frag("three", "x", 2), frag("four", "", 2)]),
        ];
        let blocks = combine_pages(&pages);
        let lines: Vec<_> = blocks.iter().flat_map(|b| b.lines()).collect();
        assert_eq!(lines, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn empty_fragments_produce_no_blocks() {
        let pages = vec![page(1, vec![frag("", "verse 1", 1), frag(" ", "chorus", 1)])];
        assert!(combine_pages(&pages).is_empty());
        assert!(combine_pages(&[]).is_empty());
    }

    #[test]
    fn section_is_compared_exactly() {
        let pages = vec![page(1, vec![frag("a", "Verse 1", 1), frag("b", "verse 1", 1)])];
        assert_eq!(combine_pages(&pages).len(), 2);
    }

    #[test]
    fn block_page_is_first_non_empty_fragment() {
        let pages = vec![
            page(1, vec![frag("", "chorus", 1)]),
            page(2, vec![frag("c", "chorus", 2)]),
        ];
        let blocks = combine_pages(&pages);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].page, 2);
    }
}
