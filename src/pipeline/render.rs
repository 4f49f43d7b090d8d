//! PDF page model: native text, page size and rasterisation.
//!
//! The upload pipeline only sees the [`PdfOpener`] / [`PageSource`] traits;
//! [`PdfiumOpener`] is the production implementation.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy rendering.
//! Every pdfium call runs on the blocking pool so the Tokio workers (and the
//! OCR drain task) never stall. Each call binds the library and reloads the
//! document from the shared byte buffer, so no pdfium handle ever crosses a
//! thread boundary.

use crate::error::BudgetError;
use async_trait::async_trait;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming a directory that contains the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Native text layer of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    /// Full text in reading order.
    pub text: String,
    /// Individual text runs, used for the density score.
    pub items: Vec<String>,
    /// Page width in points (1/72 inch).
    pub width: f32,
    /// Page height in points.
    pub height: f32,
}

/// An opened PDF document.
#[async_trait]
pub trait PageSource: Send {
    fn page_count(&self) -> usize;

    /// Native text of a 0-based page.
    async fn page_text(&mut self, index: usize) -> Result<PageText, BudgetError>;

    /// Rasterise a 0-based page at `scale` times its point size.
    async fn render_page(&mut self, index: usize, scale: f32) -> Result<RgbaImage, BudgetError>;
}

/// Opens PDF bytes into a [`PageSource`].
#[async_trait]
pub trait PdfOpener: Send + Sync {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PageSource>, BudgetError>;
}

/// pdfium-backed [`PdfOpener`].
///
/// Binds the library from `lib_dir` when given, otherwise from
/// `$PDFIUM_LIB_PATH`, otherwise from the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumOpener {
    lib_dir: Option<PathBuf>,
}

impl PdfiumOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            lib_dir: Some(dir.into()),
        }
    }

    fn resolved_lib_dir(&self) -> Option<PathBuf> {
        self.lib_dir.clone().or_else(|| {
            std::env::var(PDFIUM_LIB_PATH_ENV)
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        })
    }
}

fn bind_pdfium(lib_dir: Option<&PathBuf>) -> Result<Pdfium, BudgetError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .or_else(|_| Pdfium::bind_to_system_library()),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| BudgetError::Processing(format!("pdfium library unavailable: {:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn load_error(e: PdfiumError) -> BudgetError {
    let detail = format!("{:?}", e);
    if detail.to_ascii_lowercase().contains("password") {
        BudgetError::Processing("PDF is password-protected".to_string())
    } else {
        BudgetError::Processing(format!("invalid or corrupt PDF: {}", detail))
    }
}

#[async_trait]
impl PdfOpener for PdfiumOpener {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PageSource>, BudgetError> {
        let lib_dir = self.resolved_lib_dir();
        let bytes = Arc::new(bytes);

        let shared = Arc::clone(&bytes);
        let dir = lib_dir.clone();
        let page_count = tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(dir.as_ref())?;
            let document = pdfium
                .load_pdf_from_byte_slice(&shared, None)
                .map_err(load_error)?;
            Ok::<_, BudgetError>(document.pages().len() as usize)
        })
        .await
        .map_err(|e| BudgetError::Processing(format!("PDF open task panicked: {}", e)))??;

        info!("PDF loaded: {} pages", page_count);
        Ok(Box::new(PdfiumPages {
            bytes,
            lib_dir,
            page_count,
        }))
    }
}

/// A document opened by [`PdfiumOpener`].
pub struct PdfiumPages {
    bytes: Arc<Vec<u8>>,
    lib_dir: Option<PathBuf>,
    page_count: usize,
}

impl PdfiumPages {
    /// Run `f` against page `index` on the blocking pool.
    async fn with_page<T, F>(&self, index: usize, f: F) -> Result<T, BudgetError>
    where
        T: Send + 'static,
        F: FnOnce(&PdfPage) -> Result<T, BudgetError> + Send + 'static,
    {
        if index >= self.page_count {
            return Err(BudgetError::Processing(format!(
                "page {} out of range (document has {})",
                index + 1,
                self.page_count
            )));
        }
        let bytes = Arc::clone(&self.bytes);
        let dir = self.lib_dir.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(dir.as_ref())?;
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(load_error)?;
            let page = document.pages().get(index as u16).map_err(|e| {
                BudgetError::Processing(format!("page {}: {:?}", index + 1, e))
            })?;
            f(&page)
        })
        .await
        .map_err(|e| BudgetError::Processing(format!("pdfium task panicked: {}", e)))?
    }
}

#[async_trait]
impl PageSource for PdfiumPages {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page_text(&mut self, index: usize) -> Result<PageText, BudgetError> {
        self.with_page(index, move |page| {
            let width = page.width().value;
            let height = page.height().value;
            let text = page.text().map_err(|e| {
                BudgetError::Processing(format!("page {} text: {:?}", index + 1, e))
            })?;
            let items = text
                .segments()
                .iter()
                .map(|segment| segment.text())
                .collect::<Vec<_>>();
            Ok(PageText {
                text: text.all(),
                items,
                width,
                height,
            })
        })
        .await
    }

    async fn render_page(&mut self, index: usize, scale: f32) -> Result<RgbaImage, BudgetError> {
        self.with_page(index, move |page| {
            let pixel_width = (page.width().value * scale).round().max(1.0) as i32;
            let pixel_height = (page.height().value * scale).round().max(1.0) as i32;

            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(pixel_width)
                        .set_target_height(pixel_height)
                        .render_form_data(true),
                )
                .map_err(|e| {
                    BudgetError::Processing(format!("page {} render: {:?}", index + 1, e))
                })?;

            let image = bitmap.as_image().to_rgba8();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            Ok(image)
        })
        .await
    }
}
