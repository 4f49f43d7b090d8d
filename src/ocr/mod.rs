//! OCR subsystem: the engine capability, the serialized worker queue and a
//! vision-model engine.
//!
//! Callers only talk to [`OcrQueue`]; engines are created through an
//! [`OcrEngineFactory`] so tests can inject scripted sessions.

pub mod engine;
pub mod queue;
pub mod vision;

pub use engine::{OcrEngine, OcrEngineFactory, OcrInput, OcrProgress};
pub use queue::{OcrQueue, WorkerState, MAX_ATTEMPTS};
pub use vision::{VisionOcrConfig, VisionOcrEngine, VisionOcrFactory};
