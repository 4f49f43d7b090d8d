//! Progress events emitted while an upload is processed.
//!
//! Inject an [`Arc<dyn UploadProgressListener>`] via
//! [`crate::config::UploadConfigBuilder::progress_callback`] to receive
//! events at each checkpoint of the pipeline. Events are advisory telemetry:
//! nothing in the result depends on them.
//!
//! Listeners are invoked synchronously from the task running the upload.
//! `ocr` events carry the recognizer's own progress, relayed from the OCR
//! worker while the page's job is the one being recognised.
//!
//! # Example
//!
//! ```rust
//! use budget_digitizer::{ProgressEvent, UploadConfig, UploadProgressListener};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl UploadProgressListener for Printer {
//!     fn on_progress(&self, event: &ProgressEvent) {
//!         eprintln!("{:?} {}/{} {:.0}%", event.stage, event.page, event.total_pages,
//!             event.progress * 100.0);
//!     }
//! }
//!
//! let config = UploadConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline stage tag carried by every [`ProgressEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStage {
    /// Opening the document / decoding the image.
    #[serde(rename = "carregando")]
    Loading,
    /// Native text extraction of a PDF page.
    #[serde(rename = "texto")]
    Text,
    /// Page rasterised and sent to OCR.
    #[serde(rename = "ocr")]
    Ocr,
    /// Canonical grid parsing.
    #[serde(rename = "parse")]
    Parse,
}

/// One progress checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 1-indexed page; 0 before any page is known.
    pub page: usize,
    pub total_pages: usize,
    /// Fraction in `0.0..=1.0`.
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: ProgressStage, page: usize, total_pages: usize, progress: f32) -> Self {
        Self {
            stage,
            page,
            total_pages,
            progress: progress.clamp(0.0, 1.0),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Receives [`ProgressEvent`]s from the upload pipeline.
pub trait UploadProgressListener: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> UploadProgressListener for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Convenience alias matching the type stored in [`crate::config::UploadConfig`].
pub type ProgressCallback = Arc<dyn UploadProgressListener>;

/// Fraction of the whole upload reached after `done` of `total` pages,
/// with `within` (0–1) of the current page completed.
pub(crate) fn page_fraction(done: usize, within: f32, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((done as f32 + within.clamp(0.0, 1.0)) / total as f32).clamp(0.0, 1.0)
}
