//! Offline stand-ins for the vision model and pdfium.
#![allow(dead_code)]

use async_trait::async_trait;
use lyricdeck::{
    LyricModel, LyricsConfig, LyricsError, ModelError, ModelRequest, PreparedImage, PreparedPage,
    Rasterizer,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies handed out in order; an exhausted queue answers with a provider error.
pub struct ScriptedModel {
    image_replies: Mutex<VecDeque<String>>,
    text_replies: Mutex<VecDeque<String>>,
    pub image_calls: Mutex<usize>,
    pub text_prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(image_replies: &[&str], text_replies: &[&str]) -> Self {
        Self {
            image_replies: Mutex::new(image_replies.iter().map(|s| s.to_string()).collect()),
            text_replies: Mutex::new(text_replies.iter().map(|s| s.to_string()).collect()),
            image_calls: Mutex::new(0),
            text_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn image_calls(&self) -> usize {
        *self.image_calls.lock().unwrap()
    }

    pub fn text_calls(&self) -> usize {
        self.text_prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LyricModel for ScriptedModel {
    async fn read_image(
        &self,
        _request: ModelRequest<'_>,
        _image: &PreparedImage,
    ) -> Result<String, ModelError> {
        *self.image_calls.lock().unwrap() += 1;
        self.image_replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Provider("no scripted image reply".into()))
    }

    async fn complete(&self, request: ModelRequest<'_>) -> Result<String, ModelError> {
        self.text_prompts
            .lock()
            .unwrap()
            .push(request.prompt.to_string());
        self.text_replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Provider("no scripted text reply".into()))
    }
}

/// A document of `count` tiny placeholder pages regardless of the PDF bytes.
pub struct StubRasterizer {
    pub count: usize,
}

impl Rasterizer for StubRasterizer {
    fn page_count(&self, _pdf: &[u8], _config: &LyricsConfig) -> Result<usize, LyricsError> {
        Ok(self.count)
    }

    fn render_page(
        &self,
        _pdf: &[u8],
        index: usize,
        _config: &LyricsConfig,
    ) -> Result<PreparedPage, LyricsError> {
        if index >= self.count {
            return Err(LyricsError::PageOutOfRange { total: self.count });
        }
        Ok(placeholder_page(index + 1))
    }

    fn status(&self) -> String {
        "stub".to_string()
    }
}

pub fn placeholder_page(page: usize) -> PreparedPage {
    PreparedPage {
        page,
        image: PreparedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png",
            dpi: 200,
            width: 10,
            height: 10,
        },
    }
}

pub fn pages(count: usize) -> Vec<PreparedPage> {
    (1..=count).map(placeholder_page).collect()
}

pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n%stub\n";

/// Config with the reflow pass on and no progress sink.
pub fn config() -> LyricsConfig {
    LyricsConfig::default()
}

/// Page reply carrying the given `(section, text)` fragments.
pub fn page_reply(title: Option<&str>, fragments: &[(&str, &str)]) -> String {
    let lyrics: Vec<serde_json::Value> = fragments
        .iter()
        .enumerate()
        .map(|(i, (section, text))| {
            serde_json::json!({"text": text, "section": section, "line_number": i + 1})
        })
        .collect();
    serde_json::json!({"lyrics": lyrics, "song_title": title, "song_type": "strophic"}).to_string()
}
