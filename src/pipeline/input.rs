//! Upload intake: the submitted document, its size gate and kind.
//!
//! Classification looks at the declared MIME type first and falls back to
//! the file-name extension, so an `application/octet-stream` upload named
//! `orcamento.pdf` is still accepted. Size is checked before kind; both
//! checks run before any page is touched.

use crate::error::BudgetError;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Png,
    Jpeg,
}

impl FileKind {
    /// Classify by declared MIME type, then by extension.
    pub fn classify(mime: &str, file_name: &str) -> Option<FileKind> {
        Self::from_mime(mime).or_else(|| Self::from_extension(file_name))
    }

    fn from_mime(mime: &str) -> Option<FileKind> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            "image/png" => Some(FileKind::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(FileKind::Jpeg),
            _ => None,
        }
    }

    fn from_extension(file_name: &str) -> Option<FileKind> {
        let ext = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "png" => Some(FileKind::Png),
            "jpg" | "jpeg" => Some(FileKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Png => "image/png",
            FileKind::Jpeg => "image/jpeg",
        }
    }
}

/// One document submission. Consumed by a single upload.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub bytes: Vec<u8>,
    /// Declared MIME type; may be empty or generic.
    pub mime: String,
    pub file_name: String,
}

impl UploadTask {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            file_name: file_name.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Apply the size gate, then classify.
    pub fn validate(&self, max_bytes: usize) -> Result<FileKind, BudgetError> {
        if self.size() > max_bytes {
            return Err(BudgetError::FileTooLarge {
                size: self.size(),
                limit: max_bytes,
            });
        }
        FileKind::classify(&self.mime, &self.file_name).ok_or_else(|| {
            BudgetError::UnsupportedFormat {
                file_name: self.file_name.clone(),
                mime: if self.mime.is_empty() {
                    "unknown".to_string()
                } else {
                    self.mime.clone()
                },
            }
        })
    }

    /// Read a local file; the MIME type is guessed from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, BudgetError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| BudgetError::ReadFailed {
                path: path.display().to_string(),
                source: e,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = FileKind::from_extension(&file_name)
            .map(FileKind::mime)
            .unwrap_or("application/octet-stream");

        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::new(bytes, mime, file_name))
    }

    /// Download a document. The MIME type comes from `Content-Type`.
    pub async fn from_url(url: &str, timeout: Duration) -> Result<Self, BudgetError> {
        info!("Downloading budget from: {}", url);

        let failed = |reason: String| BudgetError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| failed(e.to_string()))?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                failed(format!("timed out after {}s", timeout.as_secs()))
            } else {
                failed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let file_name = file_name_from_url(url);

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        info!("Downloaded {} bytes as '{}'", bytes.len(), file_name);

        Ok(Self::new(bytes.to_vec(), mime, file_name))
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Last path segment of a URL when it has an extension.
fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "orcamento".to_string()
}
