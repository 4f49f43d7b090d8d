//! The OCR engine capability consumed by [`super::OcrQueue`].
//!
//! An engine is a stateful session with a fixed lifecycle:
//! `load → load_language → initialize → recognize* → terminate`.
//! Sessions are not reentrant; the queue guarantees that at most one
//! `recognize` call is in flight per session.

use crate::error::OcrError;
use crate::pipeline::encode::to_png_data_url;
use async_trait::async_trait;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

/// Per-job progress sink; receives the recognizer's own 0–1 progress.
pub type OcrProgress = Arc<dyn Fn(f32) + Send + Sync>;

/// Image handed to [`OcrEngine::recognize`].
#[derive(Clone, PartialEq)]
pub enum OcrInput {
    /// Raw RGBA pixels (owned copy).
    Pixels(RgbaImage),
    /// `data:image/png;base64,...` string form.
    DataUrl(String),
}

impl fmt::Debug for OcrInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrInput::Pixels(img) => write!(f, "Pixels({}x{})", img.width(), img.height()),
            OcrInput::DataUrl(url) => write!(f, "DataUrl({} bytes)", url.len()),
        }
    }
}

impl OcrInput {
    /// Input for a given attempt of the retry ladder: a fresh pixel copy for
    /// attempts 0 and 1, the data-URL encoding from attempt 2 on.
    pub fn for_attempt(attempt: u8, image: &RgbaImage) -> Result<OcrInput, OcrError> {
        if attempt < 2 {
            return Ok(OcrInput::Pixels(image.clone()));
        }
        to_png_data_url(image)
            .map(OcrInput::DataUrl)
            .map_err(|e| OcrError::Transient(format!("data-URL encoding failed: {}", e)))
    }
}

/// An OCR session.
#[async_trait]
pub trait OcrEngine: Send {
    /// Load the runtime.
    async fn load(&mut self) -> Result<(), OcrError>;

    /// Load a language model, e.g. `"por"`.
    async fn load_language(&mut self, language: &str) -> Result<(), OcrError>;

    /// Make the session ready for `language`.
    async fn initialize(&mut self, language: &str) -> Result<(), OcrError>;

    /// Recognize the text in `input`.
    ///
    /// Input transfer or decoding failures must be reported as
    /// [`OcrError::Transient`]; the queue retries those with another
    /// encoding.
    async fn recognize(
        &mut self,
        input: OcrInput,
        progress: Option<OcrProgress>,
    ) -> Result<String, OcrError>;

    /// Release the session. Called before the engine is dropped.
    async fn terminate(&mut self);
}

/// Creates fresh engine sessions for the queue.
pub trait OcrEngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn OcrEngine>;
}

impl<F> OcrEngineFactory for F
where
    F: Fn() -> Box<dyn OcrEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn OcrEngine> {
        self()
    }
}
