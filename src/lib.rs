//! # budget-digitizer
//!
//! Digitize solar-equipment budgets (PDF or image) into structured line
//! items: product, quantity, unit and prices, plus header fields and the
//! document total.
//!
//! ## Why this crate?
//!
//! Supplier quotes arrive in every shape: digitally authored PDFs with a
//! clean text layer, scanned PDFs with no text at all, phone photos of a
//! printed page. Columns are separated by pipes, tabs or just spaces, and the
//! item table is surrounded by addresses, e-mails and payment terms. This
//! crate uses the native text layer when it is dense enough, falls back to
//! OCR otherwise, and runs a noise-tolerant grid parser that only emits rows
//! with a valid product and a positive integer quantity.
//!
//! ## Pipeline Overview
//!
//! ```text
//! UploadTask
//!  │
//!  ├─ 1. Input     size gate (40 MiB), PDF / PNG / JPEG classification
//!  ├─ 2. Acquire   native text per page, or render → binarize → OCR queue
//!  ├─ 3. Normalize NFKC, whitespace, trimmed non-empty lines
//!  ├─ 4. Parse     canonical grid: header/footer bounds, noise, columns,
//!  │               quantity + unit, product validation, continuations
//!  └─ 5. Output    StructuredBudget + downstream JSON (`itens`, `resumo`)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use budget_digitizer::{
//!     BudgetUploader, OcrQueue, OcrQueueConfig, PdfiumOpener, UploadConfig, UploadTask,
//!     VisionOcrConfig, VisionOcrFactory,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let factory = Arc::new(VisionOcrFactory::new(VisionOcrConfig::default()));
//!     let queue = Arc::new(OcrQueue::open(factory, OcrQueueConfig::default()));
//!     let uploader = BudgetUploader::new(
//!         Arc::clone(&queue),
//!         Arc::new(PdfiumOpener::new()),
//!         UploadConfig::default(),
//!     );
//!
//!     let task = UploadTask::from_path("orcamento.pdf").await?;
//!     let result = uploader.process(task).await?;
//!     println!("{}", serde_json::to_string_pretty(&result.json)?);
//!
//!     queue.close().await;
//!     Ok(())
//! }
//! ```
//!
//! The parser can also be used on its own:
//!
//! ```rust
//! use budget_digitizer::parse::{build_structured_budget, parse_canonical_grid};
//!
//! let lines = ["Produto | Qtd", "Inversor Solar 5kW | 2 un"];
//! let grid = parse_canonical_grid(&lines);
//! let budget = build_structured_budget(&lines, grid);
//! assert_eq!(budget.items[0].quantity, Some(2));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `budget2json` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! budget-digitizer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ocr;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sanitize;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrQueueConfig, UploadConfig, UploadConfigBuilder};
pub use error::{BudgetError, OcrError};
pub use ocr::{
    OcrEngine, OcrEngineFactory, OcrInput, OcrQueue, VisionOcrConfig, VisionOcrFactory,
    WorkerState,
};
pub use output::{BudgetJson, BudgetUploadResult, StructuredBudget};
pub use pipeline::input::{FileKind, UploadTask};
pub use pipeline::render::{PageSource, PageText, PdfOpener, PdfiumOpener};
pub use progress::{ProgressCallback, ProgressEvent, ProgressStage, UploadProgressListener};
pub use sanitize::sanitize_file_name;
pub use upload::BudgetUploader;
