//! Error types for the budget-digitizer library.
//!
//! Two error types reflect two distinct layers:
//!
//! * [`BudgetError`] — **Fatal**: the upload cannot produce a result at all
//!   (file too large, unsupported format, PDF engine unavailable, OCR gave
//!   up). Returned as `Err(BudgetError)` from
//!   [`crate::upload::BudgetUploader::process`].
//!
//! * [`OcrError`] — **Local to the OCR queue**: carries the
//!   transient / timeout / fatal classification that drives the retry state
//!   machine in [`crate::ocr::queue`]. Transient errors that are recovered
//!   by a retry never reach the caller.
//!
//! Parser-level problems (noise lines, invalid rows) are never errors; they
//! surface as counters and warnings in [`crate::output::StructuredBudget`].

use thiserror::Error;

/// All fatal errors returned by the upload pipeline.
#[derive(Debug, Error)]
pub enum BudgetError {
    // ── File validation ───────────────────────────────────────────────────
    /// The submitted file exceeds the configured size limit.
    #[error("File is too large: {size} bytes (limit is {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    /// Neither the declared MIME type nor the extension is PDF, PNG or JPEG.
    #[error("Unsupported format for '{file_name}' (declared type: {mime})\nSupported: PDF, PNG, JPEG.")]
    UnsupportedFormat { file_name: String, mime: String },

    // ── Processing ────────────────────────────────────────────────────────
    /// Environment or collaborator failure: pdfium not bound, corrupt PDF,
    /// undecodable image, render failure, OCR queue unavailable.
    #[error("Processing failed: {0}")]
    Processing(String),

    /// A recognition job did not complete within the OCR timeout.
    #[error("OCR timed out after {secs}s")]
    OcrTimeout { secs: u64 },

    /// OCR failed after the retry ladder was exhausted, or with a
    /// non-retryable engine error.
    #[error("OCR failed: {0}")]
    OcrFatal(String),

    // ── Loading (CLI / convenience constructors) ──────────────────────────
    /// Could not read the input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP download of the input failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BudgetError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            BudgetError::FileTooLarge { .. } => "file-too-large",
            BudgetError::UnsupportedFormat { .. } => "unsupported-format",
            BudgetError::OcrTimeout { .. } => "ocr-timeout",
            BudgetError::OcrFatal(_) => "ocr-fatal",
            BudgetError::Processing(_)
            | BudgetError::ReadFailed { .. }
            | BudgetError::DownloadFailed { .. }
            | BudgetError::InvalidConfig(_) => "processing-error",
        }
    }
}

/// Errors raised inside the OCR subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    /// The engine could not be loaded or initialised.
    #[error("OCR engine initialisation failed: {0}")]
    Init(String),

    /// The image could not be transferred to / decoded by the engine.
    /// Retried by the queue with escalating input encodings.
    #[error("OCR input transfer failed: {0}")]
    Transient(String),

    /// The recognition call exceeded the queue timeout.
    #[error("OCR timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Any other engine failure. Not retried.
    #[error("OCR engine error: {0}")]
    Fatal(String),

    /// Every attempt of the retry ladder failed with a transient error.
    #[error("OCR failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u8, last: String },

    /// The queue was closed before the job could complete.
    #[error("OCR queue is closed")]
    QueueClosed,
}

impl OcrError {
    /// Whether the retry ladder should try again with the next encoding.
    pub fn is_transient(&self) -> bool {
        matches!(self, OcrError::Transient(_))
    }
}

impl From<OcrError> for BudgetError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::Timeout { secs } => BudgetError::OcrTimeout { secs },
            OcrError::Fatal(_) | OcrError::Transient(_) | OcrError::RetriesExhausted { .. } => {
                BudgetError::OcrFatal(e.to_string())
            }
            OcrError::Init(_) | OcrError::QueueClosed => BudgetError::Processing(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display_and_code() {
        let e = BudgetError::FileTooLarge {
            size: 50,
            limit: 40,
        };
        assert!(e.to_string().contains("50 bytes"), "got: {e}");
        assert_eq!(e.code(), "file-too-large");
    }

    #[test]
    fn unsupported_format_code() {
        let e = BudgetError::UnsupportedFormat {
            file_name: "orcamento.docx".into(),
            mime: "application/msword".into(),
        };
        assert_eq!(e.code(), "unsupported-format");
        assert!(e.to_string().contains("orcamento.docx"));
    }

    #[test]
    fn ocr_errors_map_to_taxonomy() {
        let timeout: BudgetError = OcrError::Timeout { secs: 120 }.into();
        assert_eq!(timeout.code(), "ocr-timeout");

        let exhausted: BudgetError = OcrError::RetriesExhausted {
            attempts: 3,
            last: "DataCloneError".into(),
        }
        .into();
        assert_eq!(exhausted.code(), "ocr-fatal");
        assert!(exhausted.to_string().contains("3 attempts"));

        let closed: BudgetError = OcrError::QueueClosed.into();
        assert_eq!(closed.code(), "processing-error");
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(OcrError::Transient("x".into()).is_transient());
        assert!(!OcrError::Fatal("x".into()).is_transient());
        assert!(!OcrError::Timeout { secs: 1 }.is_transient());
    }
}
