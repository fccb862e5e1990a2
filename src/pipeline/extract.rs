//! Page lyric extraction: one vision request per page.
//!
//! The model is asked for a JSON object of the shape
//!
//! ```json
//! {"lyrics": [{"text": "...", "section": "verse 1", "line_number": 1}],
//!  "song_title": "...", "song_type": "strophic"}
//! ```
//!
//! Replies are parsed leniently: every field is optional and `line_number`
//! may arrive as a number or a string. A page that cannot be read (model
//! error, no JSON, malformed JSON) yields an empty [`PageLyrics`] and a
//! warning. The run carries on with the remaining pages.

use crate::config::LyricsConfig;
use crate::lyrics::{LyricFragment, PageLyrics};
use crate::model::{LyricModel, ModelRequest};
use crate::pipeline::cleanup;
use crate::pipeline::prepare::PreparedPage;
use crate::prompts::{EXTRACTION_PROMPT, EXTRACTION_SYSTEM_PROMPT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
struct PageReply {
    #[serde(default)]
    lyrics: Vec<FragmentReply>,
    #[serde(default)]
    song_title: Option<String>,
    #[serde(default)]
    song_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FragmentReply {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    line_number: Option<Value>,
}

/// Send one page image to the model and parse what comes back.
pub async fn extract_page(
    model: &dyn LyricModel,
    page: &PreparedPage,
    config: &LyricsConfig,
) -> PageLyrics {
    let request = ModelRequest {
        system: EXTRACTION_SYSTEM_PROMPT,
        prompt: EXTRACTION_PROMPT,
        settings: config.extraction,
    };

    match model.read_image(request, &page.image).await {
        Ok(reply) => {
            let lyrics = parse_page_reply(&reply, page.page);
            info!(
                "Page {}: Detected as {}",
                page.page,
                lyrics.song_type.as_deref().unwrap_or("unknown")
            );
            lyrics
        }
        Err(e) => {
            warn!("Error processing page {}: {}", page.page, e);
            PageLyrics::empty(page.page)
        }
    }
}

/// Parse a model reply for `page` into fragments.
///
/// Never fails: an unusable reply produces an empty page.
pub fn parse_page_reply(reply: &str, page: usize) -> PageLyrics {
    let Some(json) = cleanup::extract_json_object(reply) else {
        warn!("Could not parse JSON from the model's response on page {}", page);
        return PageLyrics::empty(page);
    };

    let parsed: PageReply = match serde_json::from_str(json) {
        Ok(p) => p,
        Err(e) => {
            warn!("Invalid JSON in the model's response on page {}: {}", page, e);
            return PageLyrics::empty(page);
        }
    };

    let fragments: Vec<LyricFragment> = parsed
        .lyrics
        .into_iter()
        .enumerate()
        .map(|(i, f)| LyricFragment {
            text: cleanup::remove_invisible_chars(&cleanup::normalise_line_endings(
                f.text.as_deref().unwrap_or_default(),
            )),
            section: f.section.unwrap_or_default(),
            page,
            line_number: f
                .line_number
                .as_ref()
                .and_then(line_number_of)
                .unwrap_or(i + 1),
        })
        .collect();
    debug!("Page {}: {} fragments", page, fragments.len());

    PageLyrics {
        page,
        fragments,
        song_title: non_blank(parsed.song_title),
        song_type: non_blank(parsed.song_type),
    }
}

fn line_number_of(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::pipeline::prepare::PreparedImage;
    use async_trait::async_trait;

    #[test]
    fn parses_full_reply() {
        let reply = r#"{
            "lyrics": [
                {"text": "Ich grolle nicht", "section": "verse 1", "line_number": 1},
                {"text": "und wenn das Herz auch bricht", "section": "verse 1", "line_number": "2"}
            ],
            "song_title": "Ich grolle nicht",
            "song_type": "standard"
        }"#;
        let page = parse_page_reply(reply, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.fragments.len(), 2);
        assert_eq!(page.fragments[1].line_number, 2);
        assert!(page.fragments.iter().all(|f| f.page == 3));
        assert_eq!(page.song_title.as_deref(), Some("Ich grolle nicht"));
        assert_eq!(page.song_type.as_deref(), Some("standard"));
    }

    #[test]
    fn json_wrapped_in_prose() {
        let reply = "Here are the lyrics:\n```json\n{\"lyrics\": [{\"text\": \"Shenandoah\", \"section\": \"\"}]}\n```\nLet me know!";
        let page = parse_page_reply(reply, 1);
        assert_eq!(page.fragments.len(), 1);
        assert_eq!(page.fragments[0].text, "Shenandoah");
        assert_eq!(page.fragments[0].section, "");
        assert_eq!(page.fragments[0].line_number, 1);
    }

    #[test]
    fn missing_fields_default() {
        let page = parse_page_reply(r#"{"lyrics": [{}, {"text": "b"}]}"#, 2);
        assert_eq!(page.fragments.len(), 2);
        assert_eq!(page.fragments[0].text, "");
        assert_eq!(page.fragments[1].line_number, 2);
        assert_eq!(page.song_title, None);
    }

    #[test]
    fn invalid_json_is_empty_page() {
        let page = parse_page_reply("{lyrics: nope}", 4);
        assert_eq!(page, PageLyrics::empty(4));
    }

    #[test]
    fn no_json_is_empty_page() {
        let page = parse_page_reply("This page contains only a piano interlude.", 5);
        assert!(page.fragments.is_empty());
    }

    #[test]
    fn blank_title_is_none() {
        let page = parse_page_reply(r#"{"lyrics": [], "song_title": "  "}"#, 1);
        assert_eq!(page.song_title, None);
    }

    struct FailingModel;

    #[async_trait]
    impl LyricModel for FailingModel {
        async fn read_image(
            &self,
            _request: ModelRequest<'_>,
            _image: &PreparedImage,
        ) -> Result<String, ModelError> {
            Err(ModelError::Provider("rate limited".into()))
        }

        async fn complete(&self, _request: ModelRequest<'_>) -> Result<String, ModelError> {
            Err(ModelError::EmptyReply)
        }
    }

    #[tokio::test]
    async fn model_error_is_empty_page() {
        let page = PreparedPage {
            page: 7,
            image: PreparedImage {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/png",
                dpi: 200,
                width: 1,
                height: 1,
            },
        };
        let lyrics = extract_page(&FailingModel, &page, &LyricsConfig::default()).await;
        assert_eq!(lyrics, PageLyrics::empty(7));
    }
}
