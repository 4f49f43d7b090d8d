//! Text acquisition: native text layer when it is dense enough, OCR
//! otherwise.
//!
//! ```text
//! PDF page ──▶ native text ──▶ density ≥ threshold && non-blank? ──▶ text
//!                                  │ no
//!                                  ▼
//!              render (dpi/72) ──▶ binarize ──▶ OCR queue ──▶ text
//!
//! image ──▶ decode ──▶ binarize ──▶ OCR queue ──▶ text
//! ```

use crate::error::BudgetError;
use crate::ocr::{OcrProgress, OcrQueue};
use crate::pipeline::binarize::binarize;
use crate::pipeline::encode::decode_image;
use crate::pipeline::render::PageSource;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Text obtained for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageExtractionResult {
    pub text: String,
    /// Native-text density; 0 for images.
    pub density: f64,
    pub used_ocr: bool,
}

/// Characters per square point: the sum of trimmed item lengths over the
/// page area. Degenerate pages score 0.
pub fn text_density(items: &[String], width: f32, height: f32) -> f64 {
    let area = width as f64 * height as f64;
    if !area.is_finite() || area <= 0.0 {
        return 0.0;
    }
    let chars: usize = items.iter().map(|s| s.trim().chars().count()).sum();
    chars as f64 / area
}

/// Whether a page's native text can be used without OCR.
pub fn accept_native_text(text: &str, density: f64, threshold: f64) -> bool {
    density >= threshold && !text.trim().is_empty()
}

/// Runs text acquisition against a shared OCR queue.
pub struct TextAcquirer<'a> {
    queue: &'a OcrQueue,
    dpi: u32,
    density_threshold: f64,
}

impl<'a> TextAcquirer<'a> {
    pub fn new(queue: &'a OcrQueue, dpi: u32, density_threshold: f64) -> Self {
        Self {
            queue,
            dpi,
            density_threshold,
        }
    }

    /// Acquire the text of one PDF page (0-based). `on_ocr` receives the
    /// recognizer's progress on the calling task, only if OCR runs.
    pub async fn pdf_page(
        &self,
        source: &mut dyn PageSource,
        index: usize,
        on_ocr: &(dyn Fn(f32) + Sync),
    ) -> Result<PageExtractionResult, BudgetError> {
        let native = source.page_text(index).await?;
        let density = text_density(&native.items, native.width, native.height);

        if accept_native_text(&native.text, density, self.density_threshold) {
            debug!(page = index + 1, density, "Native text accepted");
            return Ok(PageExtractionResult {
                text: native.text,
                density,
                used_ocr: false,
            });
        }

        info!(
            page = index + 1,
            density,
            threshold = self.density_threshold,
            "Native text too sparse, running OCR"
        );
        let scale = self.dpi as f32 / 72.0;
        let pixels = source.render_page(index, scale).await?;
        let text = self.recognize(pixels, on_ocr).await?;

        Ok(PageExtractionResult {
            text,
            density,
            used_ocr: true,
        })
    }

    /// Acquire the text of a standalone PNG/JPEG. Always OCR.
    pub async fn image(
        &self,
        bytes: Vec<u8>,
        on_ocr: &(dyn Fn(f32) + Sync),
    ) -> Result<PageExtractionResult, BudgetError> {
        let pixels = tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| BudgetError::Processing(format!("image decode task panicked: {}", e)))?
            .map_err(|e| BudgetError::Processing(format!("could not decode image: {}", e)))?;
        debug!("Decoded image {}x{}", pixels.width(), pixels.height());

        let text = self.recognize(pixels, on_ocr).await?;
        Ok(PageExtractionResult {
            text,
            density: 0.0,
            used_ocr: true,
        })
    }

    /// Binarize and submit to the queue, relaying job progress back to the
    /// calling task.
    async fn recognize(
        &self,
        pixels: RgbaImage,
        on_ocr: &(dyn Fn(f32) + Sync),
    ) -> Result<String, BudgetError> {
        let prepared = tokio::task::spawn_blocking(move || binarize(&pixels))
            .await
            .map_err(|e| BudgetError::Processing(format!("binarize task panicked: {}", e)))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<f32>();
        let sink: OcrProgress = Arc::new(move |p: f32| {
            let _ = tx.send(p);
        });

        let job = self.queue.submit(&prepared, Some(sink));
        tokio::pin!(job);
        let result = loop {
            tokio::select! {
                res = &mut job => break res,
                Some(p) = rx.recv() => on_ocr(p),
            }
        };
        while let Ok(p) = rx.try_recv() {
            on_ocr(p);
        }
        Ok(result?)
    }
}
