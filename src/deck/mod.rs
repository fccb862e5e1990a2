//! Slide deck layout.
//!
//! A [`Deck`] is a plain value: a title slide followed by one slide per
//! [`SlideSegment`], every shape positioned in EMUs on a 16 in × 9 in
//! canvas. [`pptx`] serialises it. Building and writing are separate so the
//! layout can be tested without unzipping anything.

pub mod pptx;

use crate::error::LyricsError;
use crate::lyrics::SlideSegment;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

pub const SLIDE_WIDTH: i64 = 16 * EMU_PER_INCH;
pub const SLIDE_HEIGHT: i64 = 9 * EMU_PER_INCH;

const FONT: &str = "Arial";

fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64).round() as i64
}

/// 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// `RRGGBB`, as DrawingML's `srgbClr` wants it.
    pub fn hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    pub font: &'static str,
    pub size_pt: u32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
    pub align: Align,
    pub word_wrap: bool,
}

/// A positioned text box. `text` may contain `\n`; each line becomes its
/// own paragraph with the same style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBox {
    pub name: &'static str,
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub background: Rgb,
    pub boxes: Vec<TextBox>,
}

impl Slide {
    /// The box with the given `name`, if the slide has one.
    pub fn text_box(&self, name: &str) -> Option<&TextBox> {
        self.boxes.iter().find(|b| b.name == name)
    }
}

/// A finished presentation. `slides[0]` is the title slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Number of slides after the title slide.
    pub fn lyric_slide_count(&self) -> usize {
        self.slides.len().saturating_sub(1)
    }

    /// Serialise to `.pptx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LyricsError> {
        Ok(pptx::to_bytes(self)?)
    }
}

/// Lay out the title slide and one lyric slide per segment.
pub fn build_deck(title: &str, segments: &[SlideSegment]) -> Deck {
    let total = segments.len();
    let mut slides = Vec::with_capacity(total + 1);
    slides.push(title_slide(title));
    slides.extend(
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| lyric_slide(segment, i + 1, total)),
    );
    Deck {
        title: title.to_string(),
        slides,
    }
}

fn title_slide(title: &str) -> Slide {
    Slide {
        background: Rgb::BLACK,
        boxes: vec![TextBox {
            name: "Title",
            x: inches(2.0),
            y: inches(3.5),
            cx: inches(12.0),
            cy: inches(2.0),
            text: title.to_string(),
            style: TextStyle {
                font: FONT,
                size_pt: 60,
                bold: true,
                italic: false,
                color: Rgb::WHITE,
                align: Align::Center,
                word_wrap: true,
            },
        }],
    }
}

fn lyric_slide(segment: &SlideSegment, current: usize, total: usize) -> Slide {
    let section = segment.section();
    let mut boxes = Vec::with_capacity(3);

    if !section.is_empty() {
        boxes.push(TextBox {
            name: "Section",
            x: inches(1.0),
            y: inches(0.5),
            cx: inches(14.0),
            cy: inches(1.0),
            text: format!("[{}]", section.to_uppercase()),
            style: TextStyle {
                font: FONT,
                size_pt: 24,
                bold: false,
                italic: true,
                color: Rgb(200, 200, 200),
                align: Align::Center,
                word_wrap: false,
            },
        });
    }

    // The lyric sits lower when a section label occupies the top band.
    let top = if section.is_empty() { 2.0 } else { 2.5 };
    boxes.push(TextBox {
        name: "Lyrics",
        x: inches(1.0),
        y: inches(top),
        cx: inches(14.0),
        cy: inches(5.0),
        text: segment.text(),
        style: TextStyle {
            font: FONT,
            size_pt: 48,
            bold: true,
            italic: false,
            color: Rgb::WHITE,
            align: Align::Center,
            word_wrap: true,
        },
    });

    boxes.push(TextBox {
        name: "Counter",
        x: inches(14.5),
        y: inches(8.5),
        cx: inches(1.5),
        cy: inches(0.5),
        text: format!("{current}/{total}"),
        style: TextStyle {
            font: FONT,
            size_pt: 14,
            bold: false,
            italic: false,
            color: Rgb(150, 150, 150),
            align: Align::Right,
            word_wrap: false,
        },
    });

    Slide {
        background: Rgb::BLACK,
        boxes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::SlideLine;

    fn segment(text: &str, section: &str) -> SlideSegment {
        SlideSegment {
            lines: vec![SlideLine {
                text: text.into(),
                section: section.into(),
                line_number: 1,
                page: 1,
            }],
        }
    }

    #[test]
    fn title_plus_one_slide_per_segment() {
        let deck = build_deck("Shenandoah", &[segment("a", ""), segment("b", "")]);
        assert_eq!(deck.slides.len(), 3);
        assert_eq!(deck.lyric_slide_count(), 2);
        let title = deck.slides[0].text_box("Title").unwrap();
        assert_eq!(title.text, "Shenandoah");
        assert_eq!(title.style.size_pt, 60);
    }

    #[test]
    fn counter_reads_current_over_total() {
        let segs: Vec<_> = (0..3).map(|i| segment(&format!("line {i}"), "")).collect();
        let deck = build_deck("t", &segs);
        let counters: Vec<_> = deck.slides[1..]
            .iter()
            .map(|s| s.text_box("Counter").unwrap().text.clone())
            .collect();
        assert_eq!(counters, vec!["1/3", "2/3", "3/3"]);
    }

    #[test]
    fn section_label_moves_lyric_down() {
        let deck = build_deck("t", &[segment("a", "verse 1"), segment("b", "")]);

        let labelled = &deck.slides[1];
        assert_eq!(labelled.text_box("Section").unwrap().text, "[VERSE 1]");
        assert_eq!(labelled.text_box("Lyrics").unwrap().y, inches(2.5));

        let plain = &deck.slides[2];
        assert!(plain.text_box("Section").is_none());
        assert_eq!(plain.text_box("Lyrics").unwrap().y, inches(2.0));
    }

    #[test]
    fn no_segments_gives_title_only() {
        let deck = build_deck("t", &[]);
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.lyric_slide_count(), 0);
    }

    #[test]
    fn canvas_is_sixteen_by_nine() {
        assert_eq!(SLIDE_WIDTH, 14_630_400);
        assert_eq!(SLIDE_HEIGHT, 8_229_600);
        assert_eq!(Rgb(200, 200, 200).hex(), "C8C8C8");
    }
}
