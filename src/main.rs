// src/main.rs

mod checks;
mod chunker;
mod config;
mod document;
mod extract;
mod ocr;
mod pipeline;
mod report;
mod summarizer;

use clap::{Parser, ValueEnum};
use document::{Document, DocumentKind};
use extract::ExtractionStatus;
use ocr::TesseractCli;
use pipeline::{Pipeline, PipelineOutput};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "billcheck",
    version,
    about = "Summarize a bill and flag suspicious tax rates and GSTINs"
)]
struct Cli {
    /// Bill to check (pdf, jpg, jpeg, png, heic, heif)
    file: PathBuf,

    /// Config file; without it `.config/billcheck.toml` is used if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the kind inferred from the file extension
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Where to write the summary PDF (defaults to the configured filename)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the summary PDF as a data URI instead of writing a file
    #[arg(long)]
    data_uri: bool,

    /// Print all outputs as one JSON document
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg {
    Pdf,
    Jpg,
    Png,
    Heic,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Pdf => DocumentKind::Pdf,
            KindArg::Jpg => DocumentKind::Jpg,
            KindArg::Png => DocumentKind::Png,
            KindArg::Heic => DocumentKind::Heic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing; logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::Config::resolve(cli.config.as_deref())?;

    let document = match cli.kind {
        Some(kind) => Document::new(std::fs::read(&cli.file)?, kind.into()),
        None => Document::from_path(&cli.file)?,
    };
    info!(file = %cli.file.display(), kind = ?document.kind(), bytes = document.bytes().len(), "Loaded bill");

    let summarizer = summarizer::build_summarizer(&cfg.summarizer).await;
    if !summarizer.is_available() {
        warn!(?summarizer, "AI summary disabled for this run; checks still apply");
    }
    let ocr = Arc::new(TesseractCli::new(
        cfg.ocr.tesseract_path.clone(),
        cfg.ocr.language.clone(),
    ));
    let report_name = cfg.report.filename.clone();
    let pipeline = Pipeline::new(cfg, summarizer, ocr)?;

    let output = pipeline.run(&document).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&output))?);
        return Ok(());
    }

    print_output(&output);

    let Some(report) = &output.report else {
        warn!("No summary PDF was produced");
        return Ok(());
    };
    if cli.data_uri {
        println!("\n--- Download Summary as PDF ({}) ---", report.filename);
        println!("{}", report.data_uri());
    } else {
        let path = cli.out.unwrap_or_else(|| PathBuf::from(report_name));
        std::fs::write(&path, &report.bytes)?;
        println!("\nSummary PDF written to {}", path.display());
    }

    Ok(())
}

fn print_output(output: &PipelineOutput) {
    match &output.extraction_status {
        ExtractionStatus::Ok => {}
        ExtractionStatus::ScannedPdf => {
            println!("⚠ PDF is scanned/image-only — no text layer to read.\n")
        }
        ExtractionStatus::Failed(reason) => {
            println!("✗ Failed to read the bill: {reason}\n")
        }
    }

    println!("--- Extracted Text ---");
    println!("{}", output.extracted_text.trim_end());
    println!("--- End ---\n");

    println!("--- AI Summary ---");
    println!("{}", output.summary.trim_end());
    println!("--- End ---\n");

    println!("--- GST & Tax Check ---");
    if output.tax_finding.is_clean() {
        println!("✓ All tax rates look normal (0%, 5%, 12%, 18%, 28%).");
    } else {
        println!(
            "⚠ Fake or unusual tax rates found: {}",
            output.tax_finding.unusual_rates.join(", ")
        );
    }

    println!("GSTIN Check:");
    for line in output.tax_id_finding.lines() {
        println!("  {line}");
    }
}

fn to_json(output: &PipelineOutput) -> serde_json::Value {
    let (status, reason) = match &output.extraction_status {
        ExtractionStatus::Ok => ("ok", None),
        ExtractionStatus::ScannedPdf => ("scanned_pdf", None),
        ExtractionStatus::Failed(reason) => ("failed", Some(reason.as_str())),
    };

    serde_json::json!({
        "extraction": { "status": status, "reason": reason },
        "extracted_text": output.extracted_text,
        "summary": output.summary,
        "tax_finding": output.tax_finding,
        "tax_id_finding": {
            "matches": output.tax_id_finding.matches(),
            "lines": output.tax_id_finding.lines(),
        },
        "report": output.report.as_ref().map(|r| serde_json::json!({
            "filename": r.filename,
            "base64": r.to_base64(),
        })),
    })
}
