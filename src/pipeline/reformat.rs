//! Poetic reformatting: a text-only second pass over each combined block.
//!
//! Sheet music breaks lyric lines wherever the systems break, not where the
//! poem does. For each block the model is first asked whether it recognises
//! the poem (its reply, if any, becomes a reference structure), then asked to
//! re-break the block's lines without adding or removing words.
//!
//! Every failure here is soft. A block whose reformatting fails, or comes
//! back empty, is passed through unchanged.

use crate::config::LyricsConfig;
use crate::lyrics::CombinedBlock;
use crate::model::{LyricModel, ModelRequest};
use crate::pipeline::cleanup;
use crate::prompts::{
    identify_poem_prompt, reformat_prompt, REFERENCE_SYSTEM_PROMPT, REFORMAT_SYSTEM_PROMPT,
    UNKNOWN_MARKER,
};
use tracing::{debug, info, warn};

/// The excerpt used to identify a poem: the first two lines joined by a
/// space, or the first 100 characters when there are fewer than two lines.
pub fn reference_search_text(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() >= 2 {
        lines[..2].join(" ")
    } else {
        text.chars().take(100).collect()
    }
}

/// Ask the model for the original structure of the poem `text` comes from.
///
/// `None` when the model replies with the unknown marker or the call fails.
pub async fn reference_structure(
    model: &dyn LyricModel,
    text: &str,
    config: &LyricsConfig,
) -> Option<String> {
    let prompt = identify_poem_prompt(&reference_search_text(text));
    let request = ModelRequest {
        system: REFERENCE_SYSTEM_PROMPT,
        prompt: &prompt,
        settings: config.reference_lookup,
    };

    match model.complete(request).await {
        Ok(reply) => {
            let reply = reply.trim();
            if reply.contains(UNKNOWN_MARKER) {
                debug!("Poem not recognised");
                None
            } else {
                info!("Found reference structure for poem");
                Some(reply.to_string())
            }
        }
        Err(e) => {
            warn!("Could not find reference structure: {}", e);
            None
        }
    }
}

/// Re-break one block into poetic lines.
///
/// Returns the block unchanged when the model call fails or the cleaned
/// reply is empty. Section, line number and page are always preserved.
pub async fn reformat_block(
    model: &dyn LyricModel,
    block: &CombinedBlock,
    config: &LyricsConfig,
) -> CombinedBlock {
    let reference = reference_structure(model, &block.text, config).await;
    let prompt = reformat_prompt(&block.text, reference.as_deref());
    let request = ModelRequest {
        system: REFORMAT_SYSTEM_PROMPT,
        prompt: &prompt,
        settings: config.reformatting,
    };

    match model.complete(request).await {
        Ok(reply) => {
            let text = cleanup::clean_text_reply(&reply);
            if text.is_empty() {
                warn!("Reformatting returned no text; keeping the original block");
                return block.clone();
            }
            CombinedBlock {
                text,
                ..block.clone()
            }
        }
        Err(e) => {
            warn!("Error reformatting lyrics: {}", e);
            block.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::pipeline::prepare::PreparedImage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers `complete` calls from a queue and records each prompt.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LyricModel for Scripted {
        async fn read_image(
            &self,
            _request: ModelRequest<'_>,
            _image: &PreparedImage,
        ) -> Result<String, ModelError> {
            unreachable!("reformatting never sends images")
        }

        async fn complete(&self, request: ModelRequest<'_>) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyReply))
        }
    }

    fn block(text: &str) -> CombinedBlock {
        CombinedBlock {
            text: text.into(),
            section: "verse 2".into(),
            line_number: 4,
            page: 3,
        }
    }

    #[test]
    fn search_text_uses_first_two_lines() {
        assert_eq!(reference_search_text("one\ntwo\nthree"), "one two");
    }

    #[test]
    fn search_text_short_block_uses_prefix() {
        let long = "x".repeat(150);
        assert_eq!(reference_search_text(&long).len(), 100);
        assert_eq!(reference_search_text("single line"), "single line");
    }

    #[tokio::test]
    async fn unknown_reply_means_no_reference() {
        let model = Scripted::new(vec![Ok("UNKNOWN")]);
        let config = LyricsConfig::default();
        assert_eq!(reference_structure(&model, "a\nb", &config).await, None);
    }

    #[tokio::test]
    async fn reference_feeds_into_reformat_prompt() {
        let model = Scripted::new(vec![
            Ok("Dichterliebe, Heine\nIch grolle nicht"),
            Ok("Ich grolle nicht"),
        ]);
        let out = reformat_block(&model, &block("Ich grolle\nnicht"), &LyricsConfig::default()).await;
        assert_eq!(out.text, "Ich grolle nicht");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Ich grolle nicht"));
        assert!(prompts[1].contains("Dichterliebe, Heine"));
    }

    #[tokio::test]
    async fn reformat_strips_fences_and_keeps_metadata() {
        let model = Scripted::new(vec![Ok("UNKNOWN"), Ok("```\nline one\nline two\n```")]);
        let out = reformat_block(&model, &block("line\none line two"), &LyricsConfig::default()).await;
        assert_eq!(out.text, "line one\nline two");
        assert_eq!(out.section, "verse 2");
        assert_eq!(out.line_number, 4);
        assert_eq!(out.page, 3);
    }

    #[tokio::test]
    async fn failure_returns_block_unchanged() {
        let model = Scripted::new(vec![
            Err(ModelError::Provider("timeout".into())),
            Err(ModelError::Provider("timeout".into())),
        ]);
        let original = block("Shenandoah\naway you rolling river");
        let out = reformat_block(&model, &original, &LyricsConfig::default()).await;
        assert_eq!(out, original);
    }

    #[tokio::test]
    async fn empty_reply_returns_block_unchanged() {
        let model = Scripted::new(vec![Ok("UNKNOWN"), Ok("```\n```")]);
        let original = block("a\nb");
        let out = reformat_block(&model, &original, &LyricsConfig::default()).await;
        assert_eq!(out, original);
    }
}
