// src/pipeline.rs

use crate::checks::{self, TaxFinding, TaxIdFinding, TaxIdMatcher};
use crate::chunker;
use crate::config::{Config, ConfigError};
use crate::document::Document;
use crate::extract::{self, ExtractionStatus};
use crate::ocr::OcrEngine;
use crate::report::{self, ReportArtifact, ReportLayout};
use crate::summarizer::{self, SummarizerHandle, SummaryParams};
use std::sync::Arc;
use tracing::{Instrument, error, info};

/// Everything one run hands to the presentation layer.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub extracted_text: String,
    pub extraction_status: ExtractionStatus,
    pub summary: String,
    pub tax_finding: TaxFinding,
    pub tax_id_finding: TaxIdFinding,
    /// `None` only if rendering itself failed.
    pub report: Option<ReportArtifact>,
}

/// The bill-checking pipeline. Holds only read-only collaborators; every
/// call to [`Pipeline::run`] is independent.
pub struct Pipeline {
    config: Config,
    tax_ids: TaxIdMatcher,
    summarizer: SummarizerHandle,
    ocr: Arc<dyn OcrEngine>,
    layout: ReportLayout,
}

impl Pipeline {
    pub fn new(
        config: Config,
        summarizer: SummarizerHandle,
        ocr: Arc<dyn OcrEngine>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tax_ids = TaxIdMatcher::new(&config.pipeline.tax_id_pattern)?;
        Ok(Self {
            config,
            tax_ids,
            summarizer,
            ocr,
            layout: ReportLayout::default(),
        })
    }

    /// Extract, then run every later stage. Never fails: broken input and
    /// model errors degrade to placeholder values.
    pub async fn run(&self, document: &Document) -> PipelineOutput {
        let fingerprint = document.fingerprint();
        let short = &fingerprint[..12];
        let span = tracing::info_span!("bill", doc = %short, kind = ?document.kind());

        async {
            let extraction = extract::extract(document, self.ocr.as_ref());
            let mut output = self.run_text(&extraction.text).await;
            output.extraction_status = extraction.status;
            output
        }
        .instrument(span)
        .await
    }

    /// Every stage after extraction, over already-extracted text.
    pub async fn run_text(&self, text: &str) -> PipelineOutput {
        let section = &self.config.pipeline;

        let chunks = chunker::chunk_text(text, section.chunk_size, section.max_total_length);
        info!(chars = text.chars().count(), chunks = chunks.len(), "Text chunked");

        let params = SummaryParams::new(
            self.config.summarizer.max_length,
            self.config.summarizer.min_length,
        );
        let summary =
            summarizer::summarize(&self.summarizer, &chunks, section.min_chunk_length, &params)
                .await;

        let tax_finding = checks::find_unusual_tax_rates(text, &section.valid_tax_rates);
        let tax_id_finding = self.tax_ids.find(text);
        info!(
            unusual_rates = tax_finding.unusual_rates.len(),
            tax_ids = tax_id_finding.matches().len(),
            "Checks complete"
        );

        let report = match report::render_report(&summary, &self.layout) {
            Ok(mut artifact) => {
                artifact.filename = self.config.report.filename.clone();
                Some(artifact)
            }
            Err(e) => {
                error!(error = %e, "Report rendering failed");
                None
            }
        };

        PipelineOutput {
            extracted_text: text.to_string(),
            extraction_status: ExtractionStatus::Ok,
            summary,
            tax_finding,
            tax_id_finding,
            report,
        }
    }
}
