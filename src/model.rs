//! The model capability: "read this image" and "answer this prompt".
//!
//! Pipeline stages talk to [`LyricModel`] only. The production
//! implementation, [`ProviderModel`], forwards to an `edgequake-llm`
//! provider; tests substitute a scripted stub that returns canned replies.
//!
//! A model reply is plain text. Structure (JSON, line breaks) is recovered
//! by the calling stage, never here.

use crate::config::{CallSettings, LyricsConfig};
use crate::error::{LyricsError, ModelError};
use crate::pipeline::prepare::PreparedImage;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, OpenAIProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// One prompt to the model: a system role, the user text and sampling settings.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub settings: CallSettings,
}

/// A vision-capable language model, one method per modality.
#[async_trait]
pub trait LyricModel: Send + Sync {
    /// Send `request` together with a page image.
    async fn read_image(
        &self,
        request: ModelRequest<'_>,
        image: &PreparedImage,
    ) -> Result<String, ModelError>;

    /// Send a text-only request.
    async fn complete(&self, request: ModelRequest<'_>) -> Result<String, ModelError>;
}

/// [`LyricModel`] backed by any `edgequake-llm` provider.
#[derive(Clone)]
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        settings: CallSettings,
    ) -> Result<String, ModelError> {
        let options = CompletionOptions {
            temperature: Some(settings.temperature),
            max_tokens: Some(settings.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::Provider(e.to_string()))?;

        debug!(
            "model reply: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(ModelError::EmptyReply);
        }
        Ok(response.content)
    }
}

#[async_trait]
impl LyricModel for ProviderModel {
    async fn read_image(
        &self,
        request: ModelRequest<'_>,
        image: &PreparedImage,
    ) -> Result<String, ModelError> {
        // `detail: high` lets the model tile the page; small underlay text
        // disappears at the single-tile `low` setting.
        let data = ImageData::new(STANDARD.encode(&image.bytes), image.mime_type).with_detail("high");
        let messages = vec![
            ChatMessage::system(request.system),
            ChatMessage::user_with_images(request.prompt, vec![data]),
        ];
        self.chat(messages, request.settings).await
    }

    async fn complete(&self, request: ModelRequest<'_>) -> Result<String, ModelError> {
        let messages = vec![
            ChatMessage::system(request.system),
            ChatMessage::user(request.prompt),
        ];
        self.chat(messages, request.settings).await
    }
}

/// Resolve the model for a run.
///
/// 1. **Explicit API key** — the CLI argument or web form field; always an
///    OpenAI-compatible provider using `config.model`.
/// 2. **Named provider** (`config.provider_name`) — built by
///    `ProviderFactory`, which reads that provider's key from the environment.
/// 3. **Auto-detection** — `ProviderFactory::from_env` picks the first
///    provider with a key set.
pub fn connect(api_key: Option<&str>, config: &LyricsConfig) -> Result<Arc<dyn LyricModel>, LyricsError> {
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        let provider = OpenAIProvider::new(key).with_model(&config.model);
        return Ok(Arc::new(ProviderModel::new(Arc::new(provider))));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            LyricsError::ProviderNotConfigured {
                provider: name.clone(),
                hint: e.to_string(),
            }
        })?;
        return Ok(Arc::new(ProviderModel::new(provider)));
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LyricsError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "Pass an API key, or set OPENAI_API_KEY / ANTHROPIC_API_KEY.\nError: {e}"
            ),
        })?;
    Ok(Arc::new(ProviderModel::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_builds_a_model_without_network() {
        let config = LyricsConfig::default();
        assert!(connect(Some("sk-test"), &config).is_ok());
    }
}
