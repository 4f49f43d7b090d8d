//! Integration tests for the upload pipeline.
//!
//! The PDF backend and the OCR engine are replaced by in-memory fakes, so
//! these tests need neither pdfium nor network access.

use async_trait::async_trait;
use budget_digitizer::ocr::OcrProgress;
use budget_digitizer::parse::structured::NO_ITEMS_WARNING;
use budget_digitizer::pipeline::encode::encode_png;
use budget_digitizer::upload::OCR_WARNING;
use budget_digitizer::{
    BudgetError, BudgetUploader, OcrEngine, OcrError, OcrInput, OcrQueue, OcrQueueConfig,
    PageSource, PageText, PdfOpener, ProgressEvent, ProgressStage, UploadConfig, UploadTask,
};
use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct FakePage {
    text: &'static str,
    width: f32,
    height: f32,
}

impl FakePage {
    /// Small page, so any real text is far above the density threshold.
    fn dense(text: &'static str) -> Self {
        Self {
            text,
            width: 100.0,
            height: 100.0,
        }
    }

    /// A4 page with no text layer.
    fn scanned() -> Self {
        Self {
            text: "",
            width: 595.0,
            height: 842.0,
        }
    }
}

#[derive(Default)]
struct PdfCalls {
    opened: AtomicUsize,
    renders: Mutex<Vec<(usize, f32)>>,
}

struct FakeOpener {
    pages: Vec<FakePage>,
    calls: Arc<PdfCalls>,
}

struct FakeSource {
    pages: Vec<FakePage>,
    calls: Arc<PdfCalls>,
}

#[async_trait]
impl PdfOpener for FakeOpener {
    async fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn PageSource>, BudgetError> {
        self.calls.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSource {
            pages: self.pages.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[async_trait]
impl PageSource for FakeSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_text(&mut self, index: usize) -> Result<PageText, BudgetError> {
        let page = &self.pages[index];
        Ok(PageText {
            text: page.text.to_string(),
            items: page.text.lines().map(str::to_string).collect(),
            width: page.width,
            height: page.height,
        })
    }

    async fn render_page(&mut self, index: usize, scale: f32) -> Result<RgbaImage, BudgetError> {
        self.calls.renders.lock().unwrap().push((index, scale));
        Ok(RgbaImage::from_pixel(8, 8, Rgba([250, 250, 250, 255])))
    }
}

enum Reply {
    Text(&'static str),
    Fatal,
}

#[derive(Default)]
struct EngineCalls {
    recognized: AtomicUsize,
    replies: Mutex<VecDeque<Reply>>,
}

struct FakeEngine {
    calls: Arc<EngineCalls>,
}

#[async_trait]
impl OcrEngine for FakeEngine {
    async fn load(&mut self) -> Result<(), OcrError> {
        Ok(())
    }
    async fn load_language(&mut self, _language: &str) -> Result<(), OcrError> {
        Ok(())
    }
    async fn initialize(&mut self, _language: &str) -> Result<(), OcrError> {
        Ok(())
    }
    async fn recognize(
        &mut self,
        _input: OcrInput,
        progress: Option<OcrProgress>,
    ) -> Result<String, OcrError> {
        self.calls.recognized.fetch_add(1, Ordering::SeqCst);
        if let Some(p) = &progress {
            p(0.5);
        }
        match self.calls.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(t)) => Ok(t.to_string()),
            Some(Reply::Fatal) => Err(OcrError::Fatal("engine crashed".into())),
            None => Ok(String::new()),
        }
    }
    async fn terminate(&mut self) {}
}

struct Harness {
    uploader: BudgetUploader,
    queue: Arc<OcrQueue>,
    pdf: Arc<PdfCalls>,
    ocr: Arc<EngineCalls>,
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

/// Route library logs to the test output; `RUST_LOG=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn harness(pages: Vec<FakePage>, replies: Vec<Reply>, max_file_bytes: Option<usize>) -> Harness {
    init_tracing();
    let ocr = Arc::new(EngineCalls {
        recognized: AtomicUsize::new(0),
        replies: Mutex::new(replies.into()),
    });
    let engine_calls = Arc::clone(&ocr);
    let factory = Arc::new(move || {
        Box::new(FakeEngine {
            calls: Arc::clone(&engine_calls),
        }) as Box<dyn OcrEngine>
    });
    let queue = Arc::new(OcrQueue::open(factory, OcrQueueConfig::default()));

    let pdf = Arc::new(PdfCalls::default());
    let opener = Arc::new(FakeOpener {
        pages,
        calls: Arc::clone(&pdf),
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut builder = UploadConfig::builder().progress_callback(Arc::new(move |ev: &ProgressEvent| {
        sink.lock().unwrap().push(ev.clone());
    }));
    if let Some(limit) = max_file_bytes {
        builder = builder.max_file_bytes(limit);
    }
    let config = builder.build().unwrap();

    Harness {
        uploader: BudgetUploader::new(Arc::clone(&queue), opener, config),
        queue,
        pdf,
        ocr,
        events,
    }
}

fn pdf_task() -> UploadTask {
    UploadTask::new(b"%PDF-1.7 fake".to_vec(), "application/pdf", "orcamento.pdf")
}

const TWO_ITEMS: &str = "Produto Quantidade
Módulo Solar 550W
Quantidade: 8
Inversor Solar 5kW
Quantidade: 1
Valor total: R$ 23.580,00";

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn oversize_file_fails_before_any_work() {
    let h = harness(vec![FakePage::scanned()], vec![], Some(10));
    let task = UploadTask::new(vec![0u8; 11], "application/pdf", "grande.pdf");

    let err = h.uploader.process(task).await.unwrap_err();
    assert_eq!(err.code(), "file-too-large");
    assert_eq!(h.pdf.opened.load(Ordering::SeqCst), 0);
    assert_eq!(h.ocr.recognized.load(Ordering::SeqCst), 0);
    assert!(h.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let h = harness(vec![], vec![], None);
    let task = UploadTask::new(b"PK..".to_vec(), "application/msword", "contrato.docx");

    let err = h.uploader.process(task).await.unwrap_err();
    assert_eq!(err.code(), "unsupported-format");
    assert_eq!(h.pdf.opened.load(Ordering::SeqCst), 0);
}

// ── PDF text acquisition ─────────────────────────────────────────────────────

#[tokio::test]
async fn dense_pdf_page_skips_ocr_and_parses_items() {
    let h = harness(vec![FakePage::dense(TWO_ITEMS)], vec![], None);

    let result = h.uploader.process(pdf_task()).await.unwrap();
    assert!(!result.used_ocr);
    assert_eq!(h.ocr.recognized.load(Ordering::SeqCst), 0);
    assert!(h.pdf.renders.lock().unwrap().is_empty());

    let itens = &result.json.itens;
    assert_eq!(itens.len(), 2);
    assert_eq!(itens[0].produto, "Módulo Solar 550W");
    assert_eq!(itens[0].quantidade, Some(8));
    assert_eq!(itens[1].produto, "Inversor Solar 5kW");
    assert_eq!(itens[1].quantidade, Some(1));
    assert_eq!(result.json.resumo.valor_total, Some(23580.0));
    assert_eq!(result.json.resumo.moeda, "BRL");

    assert_eq!(result.pages.len(), 1);
    assert!(result.plain_text.starts_with("Produto Quantidade\nMódulo Solar 550W"));
    assert!(!result.structured.warnings.iter().any(|w| w == OCR_WARNING));
}

#[tokio::test]
async fn sparse_page_goes_through_ocr_at_configured_scale() {
    let h = harness(
        vec![
            FakePage::dense("Proposta comercial\nEmpresa Solar Ltda, fornecedora de equipamentos"),
            FakePage::scanned(),
        ],
        vec![Reply::Text("Produto | Qtd\nKit Fotovoltaico 8kWp | 2 kit")],
        None,
    );

    let result = h.uploader.process(pdf_task()).await.unwrap();
    assert!(result.used_ocr);
    assert_eq!(h.ocr.recognized.load(Ordering::SeqCst), 1);

    let renders = h.pdf.renders.lock().unwrap().clone();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].0, 1);
    assert!((renders[0].1 - 300.0 / 72.0).abs() < 1e-6);

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.json.itens.len(), 1);
    assert_eq!(result.json.itens[0].produto, "Kit Fotovoltaico 8kWp");
    assert_eq!(result.json.itens[0].quantidade, Some(2));
    assert_eq!(result.json.itens[0].unidade, "KIT");
    assert!(result.structured.warnings.iter().any(|w| w == OCR_WARNING));
}

#[tokio::test]
async fn empty_scanned_page_still_yields_a_page_entry() {
    let h = harness(vec![FakePage::scanned()], vec![Reply::Text("")], None);

    let result = h.uploader.process(pdf_task()).await.unwrap();
    assert_eq!(result.pages, vec![String::new()]);
    assert!(result.json.itens.is_empty());
    assert!(result.structured.warnings.iter().any(|w| w == NO_ITEMS_WARNING));
}

#[tokio::test]
async fn document_without_items_warns() {
    let h = harness(
        vec![FakePage::dense(
            "Proposta comercial\nObrigado pela preferência\nAtenciosamente, equipe de vendas",
        )],
        vec![],
        None,
    );

    let result = h.uploader.process(pdf_task()).await.unwrap();
    assert!(result.json.itens.is_empty());
    assert!(result.structured.warnings.iter().any(|w| w == NO_ITEMS_WARNING));
    assert_eq!(result.json.resumo.valor_total, None);
}

#[tokio::test]
async fn ocr_failure_fails_the_upload() {
    let h = harness(vec![FakePage::scanned()], vec![Reply::Fatal], None);

    let err = h.uploader.process(pdf_task()).await.unwrap_err();
    assert_eq!(err.code(), "ocr-fatal");
}

// ── Images ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_upload_always_uses_ocr() {
    let h = harness(
        vec![],
        vec![Reply::Text("Produto | Quantidade\nInversor Solar 5kW | 2 un")],
        None,
    );
    let png = encode_png(&RgbaImage::from_pixel(6, 6, Rgba([30, 30, 30, 255]))).unwrap();
    let task = UploadTask::new(png, "image/png", "foto.png");

    let result = h.uploader.process(task).await.unwrap();
    assert!(result.used_ocr);
    assert_eq!(h.ocr.recognized.load(Ordering::SeqCst), 1);
    assert_eq!(h.pdf.opened.load(Ordering::SeqCst), 0);
    assert_eq!(result.json.itens.len(), 1);
    assert_eq!(result.json.itens[0].quantidade, Some(2));
    assert_eq!(result.json.itens[0].unidade, "UN");
}

#[tokio::test]
async fn undecodable_image_is_a_processing_error() {
    let h = harness(vec![], vec![], None);
    let task = UploadTask::new(b"not a jpeg".to_vec(), "image/jpeg", "foto.jpg");

    let err = h.uploader.process(task).await.unwrap_err();
    assert_eq!(err.code(), "processing-error");
    assert_eq!(h.ocr.recognized.load(Ordering::SeqCst), 0);
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_events_follow_pipeline_order() {
    let h = harness(
        vec![FakePage::dense(TWO_ITEMS), FakePage::scanned()],
        vec![Reply::Text("")],
        None,
    );

    h.uploader.process(pdf_task()).await.unwrap();
    let events = h.events.lock().unwrap().clone();

    assert_eq!(events.first().map(|e| e.stage), Some(ProgressStage::Loading));
    assert_eq!(events.last().map(|e| e.stage), Some(ProgressStage::Parse));
    assert_eq!(events.last().map(|e| e.progress), Some(1.0));
    assert!(events.iter().all(|e| (0.0..=1.0).contains(&e.progress)));

    let text_pages: Vec<usize> = events
        .iter()
        .filter(|e| e.stage == ProgressStage::Text)
        .map(|e| e.page)
        .collect();
    assert_eq!(text_pages, vec![1, 2]);

    // Only the scanned page reports OCR progress; 0.5 within page 2 of 2.
    let ocr: Vec<&ProgressEvent> = events
        .iter()
        .filter(|e| e.stage == ProgressStage::Ocr)
        .collect();
    assert!(!ocr.is_empty());
    assert!(ocr.iter().all(|e| e.page == 2 && e.total_pages == 2));
    assert!(ocr.iter().any(|e| (e.progress - 0.75).abs() < 1e-6));

    h.queue.close().await;
}

// ── Shared queue ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_uploads_share_one_engine() {
    let h = harness(
        vec![FakePage::scanned()],
        vec![
            Reply::Text("Produto | Qtd\nModulo Solar 550W | 10 un"),
            Reply::Text("Produto | Qtd\nModulo Solar 550W | 20 un"),
            Reply::Text("Produto | Qtd\nModulo Solar 550W | 30 un"),
        ],
        None,
    );

    let uploads = (0..3).map(|_| h.uploader.process(pdf_task()));
    let results = futures::future::join_all(uploads).await;

    let mut quantities: Vec<i64> = results
        .into_iter()
        .map(|r| r.unwrap().json.itens[0].quantidade.unwrap())
        .collect();
    quantities.sort_unstable();
    assert_eq!(quantities, vec![10, 20, 30]);
    assert_eq!(h.ocr.recognized.load(Ordering::SeqCst), 3);

    h.queue.close().await;
    assert_eq!(h.queue.state(), budget_digitizer::WorkerState::Uninitialized);
}
