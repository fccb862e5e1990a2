//! Slide segmentation: one lyric line per slide.

use crate::lyrics::{CombinedBlock, SlideLine, SlideSegment};
use tracing::warn;

/// Split blocks into slide segments, one non-blank line each.
///
/// `max_lines_per_slide` is accepted for forward compatibility; lyric
/// slides are projected behind a performer, so values above one are
/// currently ignored with a warning.
pub fn segment_blocks(blocks: &[CombinedBlock], max_lines_per_slide: usize) -> Vec<SlideSegment> {
    if max_lines_per_slide > 1 {
        warn!(
            "max_lines_per_slide = {} is not supported yet; using one line per slide",
            max_lines_per_slide
        );
    }

    blocks
        .iter()
        .flat_map(|block| {
            block.lines().map(move |line| SlideSegment {
                lines: vec![SlideLine {
                    text: line.to_string(),
                    section: block.section.clone(),
                    line_number: block.line_number,
                    page: block.page,
                }],
            })
        })
        .collect()
}
