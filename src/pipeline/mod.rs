//! Pipeline stages for budget digitization.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the PDF backend can be swapped without touching
//! the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ acquire ──────────────▶ normalize ──▶ parse
//! (task)   (pdfium)   (density / OCR)          (lines)
//!                        │
//!                        └─▶ binarize ──▶ encode ──▶ OCR queue
//! ```
//!
//! 1. [`input`]     — size gate and PDF/PNG/JPEG classification
//! 2. [`render`]    — native text and rasterisation; pdfium calls run in
//!    `spawn_blocking`
//! 3. [`acquire`]   — per-page density decision and OCR fallback
//! 4. [`binarize`]  — Otsu binarization blended with grayscale
//! 5. [`encode`]    — PNG / base64 / data-URL encodings for OCR engines
//! 6. [`normalize`] — Unicode normalization and line splitting

pub mod acquire;
pub mod binarize;
pub mod encode;
pub mod input;
pub mod normalize;
pub mod render;
