//! Upload orchestration: one document in, one [`BudgetUploadResult`] out.
//!
//! ## Steps
//!
//! 1. Size gate and file-kind classification (before any page work)
//! 2. Text acquisition, page by page in document order
//! 3. Per-page normalization into trimmed lines
//! 4. Canonical grid parse over the flattened line list
//! 5. Structured budget + downstream JSON shape
//!
//! Pages are processed sequentially. OCR capacity is serialized by the
//! shared [`OcrQueue`], so running pages concurrently would only queue them
//! there.

use crate::config::UploadConfig;
use crate::error::BudgetError;
use crate::ocr::OcrQueue;
use crate::output::{BudgetJson, BudgetUploadResult};
use crate::parse::{build_structured_budget, parse_canonical_grid};
use crate::pipeline::acquire::TextAcquirer;
use crate::pipeline::input::{FileKind, UploadTask};
use crate::pipeline::normalize::{join_pages, normalize_lines};
use crate::pipeline::render::PdfOpener;
use crate::progress::{page_fraction, ProgressEvent, ProgressStage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Informational warning added when any page went through OCR.
pub const OCR_WARNING: &str = "Texto obtido por OCR; confira quantidades e valores";

/// Runs uploads against a shared OCR queue and PDF backend.
///
/// Cheap to share: wrap in an `Arc` and call [`BudgetUploader::process`]
/// from as many tasks as needed.
pub struct BudgetUploader {
    queue: Arc<OcrQueue>,
    opener: Arc<dyn PdfOpener>,
    config: UploadConfig,
}

impl BudgetUploader {
    pub fn new(queue: Arc<OcrQueue>, opener: Arc<dyn PdfOpener>, config: UploadConfig) -> Self {
        Self {
            queue,
            opener,
            config,
        }
    }

    /// Digitize one document.
    ///
    /// # Errors
    /// * `file-too-large` / `unsupported-format` before any page is touched
    /// * `processing-error` when the PDF cannot be opened or rendered, or the
    ///   image cannot be decoded
    /// * `ocr-timeout` / `ocr-fatal` when a page's recognition fails
    ///
    /// A document without recognizable items is not an error: the result
    /// has no items and carries a warning.
    pub async fn process(&self, task: UploadTask) -> Result<BudgetUploadResult, BudgetError> {
        let start = Instant::now();
        let kind = task.validate(self.config.max_file_bytes)?;
        info!(
            "Processing '{}' ({} bytes) as {:?}",
            task.file_name,
            task.size(),
            kind
        );
        self.emit(
            ProgressEvent::new(ProgressStage::Loading, 0, 0, 0.0)
                .with_message(format!("Carregando {}", task.file_name)),
        );

        let acquirer = TextAcquirer::new(&self.queue, self.config.dpi, self.config.density_threshold);
        let (page_lines, used_ocr) = match kind {
            FileKind::Pdf => self.acquire_pdf(&acquirer, task.bytes).await?,
            FileKind::Png | FileKind::Jpeg => self.acquire_image(&acquirer, task.bytes).await?,
        };

        let total_pages = page_lines.len();
        self.emit(ProgressEvent::new(ProgressStage::Parse, total_pages, total_pages, 0.0));

        let lines: Vec<&str> = page_lines.iter().flatten().map(String::as_str).collect();
        let grid = parse_canonical_grid(&lines);
        debug!(
            rows = grid.rows.len(),
            ignored_by_noise = grid.ignored_by_noise,
            ignored_by_validation = grid.ignored_by_validation,
            "Grid parsed"
        );
        let mut structured = build_structured_budget(&lines, grid);
        if used_ocr {
            structured.push_warning(OCR_WARNING);
        }
        let json = BudgetJson::from(&structured);

        self.emit(
            ProgressEvent::new(ProgressStage::Parse, total_pages, total_pages, 1.0)
                .with_message(format!("{} itens", structured.items.len())),
        );
        info!(
            "Digitized {} items from {} pages in {:?} (ocr: {})",
            structured.items.len(),
            total_pages,
            start.elapsed(),
            used_ocr
        );

        Ok(BudgetUploadResult {
            json,
            plain_text: join_pages(&page_lines),
            pages: page_lines.iter().map(|l| l.join("\n")).collect(),
            structured,
            used_ocr,
        })
    }

    async fn acquire_pdf(
        &self,
        acquirer: &TextAcquirer<'_>,
        bytes: Vec<u8>,
    ) -> Result<(Vec<Vec<String>>, bool), BudgetError> {
        let mut source = self.opener.open(bytes).await?;
        let total = source.page_count();
        self.emit(ProgressEvent::new(ProgressStage::Loading, 0, total, 1.0));

        let mut pages = Vec::with_capacity(total);
        let mut used_ocr = false;
        for index in 0..total {
            let page = index + 1;
            self.emit(ProgressEvent::new(
                ProgressStage::Text,
                page,
                total,
                page_fraction(index, 0.0, total),
            ));
            let on_ocr = |p: f32| {
                self.emit(ProgressEvent::new(
                    ProgressStage::Ocr,
                    page,
                    total,
                    page_fraction(index, p, total),
                ))
            };

            let result = acquirer.pdf_page(&mut *source, index, &on_ocr).await?;
            used_ocr |= result.used_ocr;
            pages.push(normalize_lines(&result.text));
        }
        Ok((pages, used_ocr))
    }

    async fn acquire_image(
        &self,
        acquirer: &TextAcquirer<'_>,
        bytes: Vec<u8>,
    ) -> Result<(Vec<Vec<String>>, bool), BudgetError> {
        self.emit(ProgressEvent::new(ProgressStage::Ocr, 1, 1, 0.0));
        let on_ocr = |p: f32| self.emit(ProgressEvent::new(ProgressStage::Ocr, 1, 1, p));

        let result = acquirer.image(bytes, &on_ocr).await?;
        Ok((vec![normalize_lines(&result.text)], result.used_ocr))
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_progress(&event);
        }
    }
}
