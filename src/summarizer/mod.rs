// src/summarizer/mod.rs

mod remote;

pub use remote::build_summarizer;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Line substituted for a chunk whose summarization call failed.
pub const CHUNK_ERROR_PLACEHOLDER: &str = "[Error summarizing this part]";
/// Summary used when no chunk contributed anything.
pub const NO_SUMMARY: &str = "No summary generated.";
/// Summary used for every request when the model could not be set up.
pub const SUMMARIZER_UNAVAILABLE: &str = "Summarizer unavailable.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    Malformed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Decoding knobs handed to the model with every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryParams {
    pub max_length: usize,
    pub min_length: usize,
    /// Always `false`: summaries must be deterministic.
    pub do_sample: bool,
}

impl SummaryParams {
    pub fn new(max_length: usize, min_length: usize) -> Self {
        Self {
            max_length,
            min_length,
            do_sample: false,
        }
    }
}

/// A pretrained summarization model, treated as an opaque text -> text call.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, params: &SummaryParams)
    -> Result<String, SummarizeError>;
}

/// The model as injected into the pipeline: either ready to call, or known
/// to be unusable for the whole session.
#[derive(Clone)]
pub enum SummarizerHandle {
    Ready(Arc<dyn Summarizer>),
    Unavailable(String),
}

impl SummarizerHandle {
    pub fn ready(summarizer: impl Summarizer + 'static) -> Self {
        Self::Ready(Arc::new(summarizer))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Debug for SummarizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => write!(f, "SummarizerHandle::Ready"),
            Self::Unavailable(reason) => write!(f, "SummarizerHandle::Unavailable({reason})"),
        }
    }
}

/// What one chunk contributed to the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Summarized(String),
    Placeholder,
    Skipped,
}

/// Summarize every chunk in order. Chunks shorter than `min_chunk_length`
/// (after trimming) are skipped; a failed call turns into a placeholder
/// and the loop carries on.
pub async fn summarize_chunks(
    summarizer: &dyn Summarizer,
    chunks: &[String],
    min_chunk_length: usize,
    params: &SummaryParams,
) -> Vec<ChunkOutcome> {
    let mut outcomes = Vec::with_capacity(chunks.len());

    for (idx, chunk) in chunks.iter().enumerate() {
        let trimmed_len = chunk.trim().chars().count();
        if trimmed_len < min_chunk_length {
            info!(idx, chars = trimmed_len, "Chunk too short — skipped");
            outcomes.push(ChunkOutcome::Skipped);
            continue;
        }

        match summarizer.summarize(chunk, params).await {
            Ok(text) => {
                info!(idx, chars = text.chars().count(), "Chunk summarized");
                outcomes.push(ChunkOutcome::Summarized(text));
            }
            Err(e) => {
                warn!(idx, error = %e, "Chunk summarization failed");
                outcomes.push(ChunkOutcome::Placeholder);
            }
        }
    }

    outcomes
}

/// Join outcomes in chunk order, each followed by a blank line.
pub fn assemble_summary(outcomes: &[ChunkOutcome]) -> String {
    let mut summary = String::new();
    for outcome in outcomes {
        let piece = match outcome {
            ChunkOutcome::Summarized(text) => text.as_str(),
            ChunkOutcome::Placeholder => CHUNK_ERROR_PLACEHOLDER,
            ChunkOutcome::Skipped => continue,
        };
        summary.push_str(piece);
        summary.push_str("\n\n");
    }

    if summary.is_empty() {
        NO_SUMMARY.to_string()
    } else {
        summary
    }
}

/// Full summarization stage, including the unavailable-model short circuit.
pub async fn summarize(
    handle: &SummarizerHandle,
    chunks: &[String],
    min_chunk_length: usize,
    params: &SummaryParams,
) -> String {
    match handle {
        SummarizerHandle::Ready(summarizer) => {
            let outcomes =
                summarize_chunks(summarizer.as_ref(), chunks, min_chunk_length, params).await;
            assemble_summary(&outcomes)
        }
        SummarizerHandle::Unavailable(reason) => {
            warn!(reason = %reason, "Summarizer unavailable — skipping chunk work");
            SUMMARIZER_UNAVAILABLE.to_string()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn params() -> SummaryParams {
        SummaryParams::new(250, 30)
    }

    fn long(word: &str) -> String {
        format!("{word} {}", "x".repeat(40))
    }

    #[tokio::test]
    async fn test_short_chunks_are_skipped() {
        let echo = EchoSummarizer::default();
        let chunks = vec![long("alpha"), "   tiny   ".to_string(), long("gamma")];

        let outcomes = summarize_chunks(&echo, &chunks, 30, &params()).await;

        assert_eq!(
            outcomes,
            vec![
                ChunkOutcome::Summarized("summary of alpha".to_string()),
                ChunkOutcome::Skipped,
                ChunkOutcome::Summarized("summary of gamma".to_string()),
            ]
        );
        assert_eq!(echo.calls.lock().unwrap().len(), 2);
        assert_eq!(
            assemble_summary(&outcomes),
            "summary of alpha\n\nsummary of gamma\n\n"
        );
    }

    #[tokio::test]
    async fn test_always_failing_gives_one_placeholder_per_chunk() {
        let chunks = vec![long("a"), "short".to_string(), long("b"), long("c")];
        let outcomes = summarize_chunks(&FailingSummarizer, &chunks, 30, &params()).await;
        let summary = assemble_summary(&outcomes);

        let expected = format!("{CHUNK_ERROR_PLACEHOLDER}\n\n").repeat(3);
        assert_eq!(summary, expected);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort() {
        let flaky = FlakySummarizer { needle: "broken" };
        let chunks = vec![long("fine"), long("broken"), long("fine")];
        let outcomes = summarize_chunks(&flaky, &chunks, 30, &params()).await;

        assert_eq!(
            assemble_summary(&outcomes),
            format!("ok\n\n{CHUNK_ERROR_PLACEHOLDER}\n\nok\n\n")
        );
    }

    #[tokio::test]
    async fn test_nothing_contributed() {
        let handle = SummarizerHandle::ready(EchoSummarizer::default());
        assert_eq!(summarize(&handle, &[], 30, &params()).await, NO_SUMMARY);

        let chunks = vec!["a".to_string(), " b ".to_string()];
        assert_eq!(summarize(&handle, &chunks, 30, &params()).await, NO_SUMMARY);
    }

    #[tokio::test]
    async fn test_unavailable_short_circuits() {
        let handle = SummarizerHandle::Unavailable("no token".to_string());
        assert!(!handle.is_available());
        let chunks = vec![long("alpha")];
        assert_eq!(
            summarize(&handle, &chunks, 30, &params()).await,
            SUMMARIZER_UNAVAILABLE
        );
    }
}
