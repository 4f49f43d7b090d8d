//! CLI binary for budget-digitizer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `UploadConfig` / `OcrQueueConfig` and prints the result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use budget_digitizer::pipeline::input::is_url;
use budget_digitizer::{
    sanitize_file_name, BudgetUploadResult, BudgetUploader, OcrQueue, OcrQueueConfig,
    PdfiumOpener, ProgressCallback, ProgressEvent, ProgressStage, UploadConfig, UploadProgressListener,
    UploadTask, VisionOcrConfig, VisionOcrFactory,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress listener using indicatif ────────────────────────────────────

/// Renders upload progress as a percentage bar; the message shows the
/// current stage and page.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Carregando");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl UploadProgressListener for CliProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let prefix = match event.stage {
            ProgressStage::Loading => "Carregando",
            ProgressStage::Text => "Texto",
            ProgressStage::Ocr => "OCR",
            ProgressStage::Parse => "Analisando",
        };
        self.bar.set_prefix(prefix);
        self.bar.set_position((event.progress * 100.0).round() as u64);

        let page = if event.total_pages > 0 && event.page > 0 {
            format!("página {}/{}", event.page, event.total_pages)
        } else {
            String::new()
        };
        match event.message {
            Some(ref m) => self.bar.set_message(format!("{page} {}", dim(m))),
            None => self.bar.set_message(page),
        }

        if event.stage == ProgressStage::Parse && event.progress >= 1.0 {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Digitize a PDF quote (JSON on stdout)
  budget2json orcamento.pdf

  # Write the result to a file
  budget2json orcamento.pdf -o orcamento.json

  # Scanned image, written to a directory as <name>.json
  budget2json foto-orcamento.jpg --out-dir ./saida

  # Only print the normalized text
  budget2json orcamento.pdf --text

  # Use a specific vision model for OCR
  budget2json --provider anthropic --model claude-sonnet-4-20250514 scan.png

OUTPUT:
  JSON with `json` (header / itens / resumo), `structured` (parser view with
  warnings and counters), `plainText`, `pages` and `usedOcr`.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (default OCR provider)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_PROVIDER      Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium
"#;

/// Digitize solar-equipment budgets (PDF or image) into JSON line items.
#[derive(Parser, Debug)]
#[command(
    name = "budget2json",
    version,
    about = "Digitize solar-equipment budgets (PDF, PNG, JPEG) into JSON line items",
    long_about = "Extract line items (product, quantity, unit, prices), header fields and the \
document total from supplier budgets. Pages with a usable text layer are read directly; \
scanned pages and images go through a vision-model OCR engine.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path (PDF, PNG, JPEG) or HTTP/HTTPS URL.
    input: String,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "BUDGET2JSON_OUTPUT", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write `<input name>.json` into this directory.
    #[arg(long, env = "BUDGET2JSON_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Rasterisation DPI for pages that need OCR (72–600).
    #[arg(long, env = "BUDGET2JSON_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// OCR model ID (default: gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// OCR language code.
    #[arg(long, env = "BUDGET2JSON_LANG", default_value = "por")]
    lang: String,

    /// Per-page OCR timeout in seconds.
    #[arg(long, env = "BUDGET2JSON_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BUDGET2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the normalized plain text instead of JSON.
    #[arg(long)]
    text: bool,

    /// Disable progress bar.
    #[arg(long, env = "BUDGET2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BUDGET2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BUDGET2JSON_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let start = Instant::now();

    // ── Load input ───────────────────────────────────────────────────────
    let task = if is_url(&cli.input) {
        UploadTask::from_url(&cli.input, Duration::from_secs(cli.download_timeout)).await
    } else {
        UploadTask::from_path(&cli.input).await
    }
    .with_context(|| format!("Failed to load '{}'", cli.input))?;
    let file_name = task.file_name.clone();

    // ── Build pipeline ───────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn UploadProgressListener>)
    } else {
        None
    };

    let mut builder = UploadConfig::builder().dpi(cli.dpi);
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let factory = Arc::new(VisionOcrFactory::new(VisionOcrConfig {
        provider_name: cli.provider.clone(),
        model: cli.model.clone(),
        ..Default::default()
    }));
    let queue = Arc::new(OcrQueue::open(
        factory,
        OcrQueueConfig::default()
            .with_language(cli.lang.clone())
            .with_timeout(Duration::from_secs(cli.ocr_timeout)),
    ));
    let uploader = BudgetUploader::new(Arc::clone(&queue), Arc::new(PdfiumOpener::new()), config);

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = uploader.process(task).await;
    queue.close().await;
    let result = outcome.with_context(|| format!("Failed to digitize '{}'", file_name))?;

    // ── Write output ─────────────────────────────────────────────────────
    let rendered = if cli.text {
        result.plain_text.clone()
    } else {
        serde_json::to_string_pretty(&result).context("Failed to serialise output")?
    };

    let target = match (&cli.output, &cli.out_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(output_path_in(dir, &file_name, cli.text)),
        (None, None) => None,
    };

    if let Some(ref path) = target {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, rendered.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        print_summary(&result, target.as_deref(), start.elapsed());
    }

    Ok(())
}

/// `<dir>/<sanitized stem>.json` (or `.txt` with `--text`).
fn output_path_in(dir: &Path, file_name: &str, text: bool) -> PathBuf {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "orcamento".to_string());
    let ext = if text { "txt" } else { "json" };
    dir.join(format!("{}.{}", sanitize_file_name(&stem), ext))
}

fn print_summary(result: &BudgetUploadResult, target: Option<&Path>, elapsed: Duration) {
    let total = result
        .json
        .resumo
        .valor_total
        .map(|v| format!("R$ {v:.2}"))
        .unwrap_or_else(|| "sem total".to_string());
    eprintln!(
        "{}  {} itens  {}  {} páginas{}  {}ms{}",
        if result.structured.items.is_empty() {
            cyan("⚠")
        } else {
            green("✔")
        },
        bold(&result.structured.items.len().to_string()),
        total,
        result.pages.len(),
        if result.used_ocr { " (OCR)" } else { "" },
        elapsed.as_millis(),
        target
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default(),
    );
    for w in &result.structured.warnings {
        eprintln!("   {}", dim(w));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_dir_file_name_is_sanitized() {
        let p = output_path_in(Path::new("out"), "orç:12?.pdf", false);
        assert_eq!(p, Path::new("out").join("orç_12_.json"));
        let p = output_path_in(Path::new("out"), "", true);
        assert_eq!(p, Path::new("out").join("orcamento.txt"));
    }
}
