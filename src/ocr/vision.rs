//! [`OcrEngine`] backed by a vision language model through `edgequake-llm`.
//!
//! The lifecycle maps onto the provider like this:
//!
//! * `load`          — resolve the provider (explicit, named, or from the
//!   environment)
//! * `load_language` — pick the language hint sent with every page
//! * `initialize`    — check that a provider is bound
//! * `recognize`     — one chat call with the page PNG attached
//! * `terminate`     — drop the provider
//!
//! Image encoding failures are [`OcrError::Transient`] so the queue can try
//! the next input encoding; provider failures are [`OcrError::Fatal`].

use super::engine::{OcrEngine, OcrEngineFactory, OcrInput, OcrProgress};
use crate::error::OcrError;
use crate::pipeline::encode::{encode_png_base64, split_data_url};
use crate::prompts::{language_hint, TRANSCRIBE_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Settings shared by every session the factory creates.
#[derive(Clone)]
pub struct VisionOcrConfig {
    /// Pre-built provider; takes priority over everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,
    /// Provider name (`openai`, `anthropic`, `gemini`, `ollama`, ...).
    pub provider_name: Option<String>,
    pub model: Option<String>,
    /// Low temperature keeps transcription literal. Default: 0.0.
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for VisionOcrConfig {
    fn default() -> Self {
        Self {
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

impl fmt::Debug for VisionOcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionOcrConfig")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Resolve the provider, from most-specific to least-specific:
/// explicit provider, provider name + model, `OPENAI_API_KEY`, then
/// whatever `ProviderFactory::from_env` detects.
fn resolve_provider(config: &VisionOcrConfig) -> Result<Arc<dyn LLMProvider>, OcrError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return ProviderFactory::create_llm_provider(name, model)
            .map_err(|e| OcrError::Init(format!("provider '{}': {}", name, e)));
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return ProviderFactory::create_llm_provider("openai", model)
            .map_err(|e| OcrError::Init(format!("provider 'openai': {}", e)));
    }

    let (llm, _embedding) = ProviderFactory::from_env().map_err(|e| {
        OcrError::Init(format!(
            "no vision provider configured; set OPENAI_API_KEY or pass a provider ({})",
            e
        ))
    })?;
    Ok(llm)
}

/// Turn an OCR input into the image attachment for the chat request.
fn to_image_data(input: OcrInput) -> Result<ImageData, OcrError> {
    match input {
        OcrInput::Pixels(img) => {
            if img.width() == 0 || img.height() == 0 {
                return Err(OcrError::Transient("empty pixel buffer".into()));
            }
            let b64 = encode_png_base64(&img)
                .map_err(|e| OcrError::Transient(format!("PNG encoding failed: {}", e)))?;
            Ok(ImageData::new(b64, "image/png").with_detail("high"))
        }
        OcrInput::DataUrl(url) => {
            let (mime, payload) = split_data_url(&url)
                .ok_or_else(|| OcrError::Transient("malformed data URL".into()))?;
            Ok(ImageData::new(payload.to_string(), mime.to_string()).with_detail("high"))
        }
    }
}

/// One vision-model OCR session.
pub struct VisionOcrEngine {
    config: VisionOcrConfig,
    provider: Option<Arc<dyn LLMProvider>>,
    language: String,
}

impl VisionOcrEngine {
    pub fn new(config: VisionOcrConfig) -> Self {
        Self {
            config,
            provider: None,
            language: "por".to_string(),
        }
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    async fn load(&mut self) -> Result<(), OcrError> {
        let provider = resolve_provider(&self.config)?;
        debug!(
            provider = self.config.provider_name.as_deref().unwrap_or("auto"),
            "Vision OCR provider resolved"
        );
        self.provider = Some(provider);
        Ok(())
    }

    async fn load_language(&mut self, language: &str) -> Result<(), OcrError> {
        self.language = language.to_string();
        Ok(())
    }

    async fn initialize(&mut self, _language: &str) -> Result<(), OcrError> {
        if self.provider.is_none() {
            return Err(OcrError::Init("provider not loaded".into()));
        }
        Ok(())
    }

    async fn recognize(
        &mut self,
        input: OcrInput,
        progress: Option<OcrProgress>,
    ) -> Result<String, OcrError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| OcrError::Fatal("engine not initialized".into()))?;
        let image = to_image_data(input)?;
        if let Some(p) = &progress {
            p(0.1);
        }

        let messages = vec![
            ChatMessage::system(TRANSCRIBE_SYSTEM_PROMPT),
            ChatMessage::system(language_hint(&self.language)),
            ChatMessage::user_with_images("", vec![image]),
        ];
        let options = CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        };

        let start = Instant::now();
        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| OcrError::Fatal(e.to_string()))?;
        debug!(
            "Vision OCR: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if let Some(p) = &progress {
            p(1.0);
        }
        Ok(response.content)
    }

    async fn terminate(&mut self) {
        self.provider = None;
    }
}

/// Creates [`VisionOcrEngine`] sessions for the OCR queue.
#[derive(Debug, Clone, Default)]
pub struct VisionOcrFactory {
    config: VisionOcrConfig,
}

impl VisionOcrFactory {
    pub fn new(config: VisionOcrConfig) -> Self {
        Self { config }
    }
}

impl OcrEngineFactory for VisionOcrFactory {
    fn create(&self) -> Box<dyn OcrEngine> {
        Box::new(VisionOcrEngine::new(self.config.clone()))
    }
}
