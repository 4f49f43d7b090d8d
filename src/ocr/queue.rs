//! Serialized OCR worker queue.
//!
//! One drain task owns the only engine session. Jobs arrive on an unbounded
//! FIFO channel and run one at a time to completion, so recognitions never
//! overlap and submission order is preserved across uploads that share the
//! queue.
//!
//! ```text
//! UNINITIALIZED ─▶ LOADING ─▶ READY ⇄ BUSY
//!                    ▲                  │ timeout / fatal / retries exhausted
//!                    └──── FAULTED ◀────┘
//! ```
//!
//! ## Retry ladder
//!
//! | attempt | input                              |
//! |---------|------------------------------------|
//! | 0       | pixel copy                         |
//! | 1       | fresh pixel copy                   |
//! | 2       | `data:image/png;base64,...` string |
//!
//! Only [`OcrError::Transient`] climbs the ladder. Every other failure, a
//! timeout, or an exhausted ladder tears the session down; the next job
//! re-initializes it.

use super::engine::{OcrEngine, OcrEngineFactory, OcrInput, OcrProgress};
use crate::config::OcrQueueConfig;
use crate::error::OcrError;
use image::RgbaImage;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Attempts per job, including the first.
pub const MAX_ATTEMPTS: u8 = 3;

/// Observable state of the engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    Uninitialized,
    Loading,
    Ready,
    Busy,
    Faulted,
}

struct OcrJob {
    id: u64,
    image: RgbaImage,
    progress: Option<OcrProgress>,
    reply: oneshot::Sender<Result<String, OcrError>>,
}

/// Handle to the OCR worker. Cheap to share behind an `Arc`.
pub struct OcrQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<OcrJob>>>,
    state: watch::Receiver<WorkerState>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl OcrQueue {
    /// Start the drain task. The engine itself is created lazily, on the
    /// first job. Must be called inside a Tokio runtime.
    pub fn open(factory: Arc<dyn OcrEngineFactory>, config: OcrQueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WorkerState::Uninitialized);

        let worker = Worker {
            factory,
            config,
            engine: None,
            state: state_tx,
        };
        let handle = tokio::spawn(worker.drain(rx));

        Self {
            tx: Mutex::new(Some(tx)),
            state: state_rx,
            worker: tokio::sync::Mutex::new(Some(handle)),
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Enqueue a recognition and wait for its result.
    ///
    /// The image is copied at submission; the caller's buffer is never
    /// shared with the worker. `progress` is only invoked while this job is
    /// the one being recognized.
    pub async fn submit(
        &self,
        image: &RgbaImage,
        progress: Option<OcrProgress>,
    ) -> Result<String, OcrError> {
        let (reply, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = OcrJob {
            id,
            image: image.clone(),
            progress,
            reply,
        };

        {
            let guard = self.tx.lock().map_err(|_| OcrError::QueueClosed)?;
            let tx = guard.as_ref().ok_or(OcrError::QueueClosed)?;
            tx.send(job).map_err(|_| OcrError::QueueClosed)?;
        }
        debug!(job = id, "OCR job enqueued");

        rx.await.map_err(|_| OcrError::QueueClosed)?
    }

    /// Current state of the engine session.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Stop accepting jobs, finish the queued ones and terminate the engine.
    pub async fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("OCR worker task failed: {}", e);
            }
        }
    }
}

/// Wraps a job's progress sink so it goes silent once the job is over.
struct ActiveProgress {
    active: Arc<AtomicBool>,
}

impl ActiveProgress {
    fn wrap(sink: Option<OcrProgress>) -> (Self, Option<OcrProgress>) {
        let active = Arc::new(AtomicBool::new(true));
        let gated = sink.map(|sink| {
            let flag = Arc::clone(&active);
            Arc::new(move |p: f32| {
                if flag.load(Ordering::Acquire) {
                    sink(p.clamp(0.0, 1.0));
                }
            }) as OcrProgress
        });
        (Self { active }, gated)
    }
}

impl Drop for ActiveProgress {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// State owned by the drain task.
struct Worker {
    factory: Arc<dyn OcrEngineFactory>,
    config: OcrQueueConfig,
    engine: Option<Box<dyn OcrEngine>>,
    state: watch::Sender<WorkerState>,
}

impl Worker {
    async fn drain(mut self, mut rx: mpsc::UnboundedReceiver<OcrJob>) {
        while let Some(job) = rx.recv().await {
            if job.reply.is_closed() {
                debug!(job = job.id, "OCR job abandoned before start");
                continue;
            }
            debug!(job = job.id, "OCR job started");
            let (gate, progress) = ActiveProgress::wrap(job.progress);
            let result = self.run(&job.image, progress).await;
            drop(gate);

            if let Err(ref e) = result {
                warn!(job = job.id, "OCR job failed: {}", e);
            }
            // The submitter may have gone away; nothing to do then.
            let _ = job.reply.send(result);
        }

        self.teardown().await;
        self.state.send_replace(WorkerState::Uninitialized);
        info!("OCR queue closed");
    }

    async fn run(
        &mut self,
        image: &RgbaImage,
        progress: Option<OcrProgress>,
    ) -> Result<String, OcrError> {
        let secs = self.config.timeout.as_secs();
        let mut last = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            self.ensure_engine().await?;

            let input = match OcrInput::for_attempt(attempt, image) {
                Ok(input) => input,
                Err(e) => {
                    warn!(attempt, "OCR input encoding failed: {}", e);
                    last = e.to_string();
                    continue;
                }
            };

            let Some(engine) = self.engine.as_mut() else {
                return Err(OcrError::Init("engine missing after initialization".into()));
            };
            self.state.send_replace(WorkerState::Busy);

            match timeout(self.config.timeout, engine.recognize(input, progress.clone())).await {
                Ok(Ok(text)) => {
                    self.state.send_replace(WorkerState::Ready);
                    if attempt > 0 {
                        info!(attempt, "OCR recovered after retry");
                    }
                    return Ok(text);
                }
                Ok(Err(e)) if e.is_transient() => {
                    warn!(attempt, "OCR transient failure: {}", e);
                    self.state.send_replace(WorkerState::Ready);
                    last = e.to_string();
                }
                Ok(Err(e)) => {
                    self.fault("engine error").await;
                    return Err(e);
                }
                Err(_) => {
                    warn!("OCR recognition timed out after {}s", secs);
                    self.fault("timeout").await;
                    return Err(OcrError::Timeout { secs });
                }
            }
        }

        self.fault("retries exhausted").await;
        Err(OcrError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
            last,
        })
    }

    /// Create and initialize a session if none is live.
    async fn ensure_engine(&mut self) -> Result<(), OcrError> {
        if self.engine.is_some() {
            return Ok(());
        }
        self.state.send_replace(WorkerState::Loading);
        info!(language = %self.config.language, "Initializing OCR engine");

        let mut engine = self.factory.create();
        let started = timeout(
            self.config.timeout,
            start_engine(engine.as_mut(), &self.config.language),
        )
        .await
        .unwrap_or_else(|_| Err(OcrError::Init("initialization timed out".into())));

        match started {
            Ok(()) => {
                self.engine = Some(engine);
                self.state.send_replace(WorkerState::Ready);
                Ok(())
            }
            Err(e) => {
                engine.terminate().await;
                self.state.send_replace(WorkerState::Faulted);
                Err(match e {
                    OcrError::Init(_) => e,
                    other => OcrError::Init(other.to_string()),
                })
            }
        }
    }

    async fn fault(&mut self, reason: &str) {
        warn!(reason, "Tearing down OCR engine");
        self.teardown().await;
        self.state.send_replace(WorkerState::Faulted);
    }

    async fn teardown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.terminate().await;
        }
    }
}

async fn start_engine(engine: &mut dyn OcrEngine, language: &str) -> Result<(), OcrError> {
    engine.load().await?;
    engine.load_language(language).await?;
    engine.initialize(language).await
}
