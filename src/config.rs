//! Configuration types for budget uploads and the OCR queue.
//!
//! All upload behaviour is controlled through [`UploadConfig`], built via
//! [`UploadConfigBuilder`]. OCR session behaviour lives in
//! [`OcrQueueConfig`] because one queue is shared by many uploads.

use crate::error::BudgetError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Largest accepted upload: 40 MiB.
pub const MAX_FILE_BYTES: usize = 40 * 1024 * 1024;

/// Native-text density (characters per square point) at or above which a PDF
/// page is trusted without OCR. Empirical value.
pub const DEFAULT_DENSITY_THRESHOLD: f64 = 0.00012;

/// Default rasterisation resolution for pages that need OCR.
pub const DEFAULT_DPI: u32 = 300;

/// Recognition timeout per OCR job.
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for one [`crate::upload::BudgetUploader`].
///
/// # Example
/// ```rust
/// use budget_digitizer::UploadConfig;
///
/// let config = UploadConfig::builder()
///     .dpi(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct UploadConfig {
    /// Rasterisation DPI for pages sent to OCR. Range: 72–600. Default: 300.
    ///
    /// Pages are rendered at `dpi / 72` times their native point size.
    pub dpi: u32,

    /// Upload size limit in bytes. Default: 40 MiB.
    pub max_file_bytes: usize,

    /// Minimum native-text density for a PDF page to skip OCR.
    /// Default: [`DEFAULT_DENSITY_THRESHOLD`].
    pub density_threshold: f64,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_file_bytes: MAX_FILE_BYTES,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("dpi", &self.dpi)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("density_threshold", &self.density_threshold)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn UploadProgressListener>"),
            )
            .finish()
    }
}

impl UploadConfig {
    /// Create a new builder for `UploadConfig`.
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`UploadConfig`].
#[derive(Debug)]
pub struct UploadConfigBuilder {
    config: UploadConfig,
}

impl UploadConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_file_bytes(mut self, bytes: usize) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn density_threshold(mut self, threshold: f64) -> Self {
        self.config.density_threshold = threshold;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<UploadConfig, BudgetError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(BudgetError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_file_bytes == 0 {
            return Err(BudgetError::InvalidConfig(
                "max_file_bytes must be > 0".into(),
            ));
        }
        if !c.density_threshold.is_finite() || c.density_threshold < 0.0 {
            return Err(BudgetError::InvalidConfig(format!(
                "density threshold must be a non-negative number, got {}",
                c.density_threshold
            )));
        }
        Ok(self.config)
    }
}

/// Configuration for an [`crate::ocr::OcrQueue`] session.
#[derive(Debug, Clone)]
pub struct OcrQueueConfig {
    /// Language model loaded once per engine session. Default: `"por"`.
    pub language: String,
    /// Per-job recognition timeout. Default: 120 s.
    pub timeout: Duration,
}

impl Default for OcrQueueConfig {
    fn default() -> Self {
        Self {
            language: "por".to_string(),
            timeout: DEFAULT_OCR_TIMEOUT,
        }
    }
}

impl OcrQueueConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}
