// src/summarizer/remote.rs

use super::{SummarizeError, Summarizer, SummarizerHandle, SummaryParams};
use crate::config::{EndpointConfig, SummarizerBackend, SummarizerSection};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Instructions for chat-style backends, which have no dedicated
/// summarization task.
const SYSTEM_PROMPT: &str = r#"You are a bill summarization assistant.
Given a fragment of raw text extracted from a bill or invoice, write a short, factual summary of it.

Notes:
- The text may be cut mid-sentence or garbled by OCR. Summarize what is there; do not guess missing values.
- Mention vendor, amounts, taxes and dates when present.
- Return ONLY the summary text, no headings, no markdown, no commentary."#;

// ---------------------------------------------------------------------------
// Hugging Face inference API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_length: usize,
    min_length: usize,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct InferenceOutput {
    // text2text models (flan-t5) answer with `generated_text`
    #[serde(alias = "generated_text")]
    summary_text: String,
}

/// A hosted summarization model behind the Hugging Face inference API.
pub struct HuggingFaceSummarizer {
    client: Client,
    url: String,
    token: String,
}

impl HuggingFaceSummarizer {
    pub fn new(client: Client, endpoint: &EndpointConfig, token: String) -> Self {
        Self {
            client,
            url: format!(
                "{}/models/{}",
                endpoint.base_url.trim_end_matches('/'),
                endpoint.model
            ),
            token,
        }
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<String, SummarizeError> {
        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                max_length: params.max_length,
                min_length: params.min_length,
                do_sample: params.do_sample,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api { status, body });
        }

        let body = response.text().await?;
        parse_inference_output(&body)
    }
}

fn parse_inference_output(body: &str) -> Result<String, SummarizeError> {
    let outputs: Vec<InferenceOutput> = serde_json::from_str(body)?;
    outputs
        .into_iter()
        .next()
        .map(|o| o.summary_text.trim().to_string())
        .ok_or_else(|| SummarizeError::Malformed("empty output list".to_string()))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat endpoints (Ollama, remote APIs)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct ChatSummarizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatSummarizer {
    pub fn new(client: Client, endpoint: &EndpointConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            api_key,
        }
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<String, SummarizeError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Summarize the following bill text:\n\n{text}"),
                },
            ],
            temperature: 0.0,
            max_tokens: params.max_length,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api { status, body });
        }

        let body = response.text().await?;
        parse_chat_output(&body)
    }
}

fn parse_chat_output(body: &str) -> Result<String, SummarizeError> {
    let chat: ChatResponse = serde_json::from_str(body)?;
    let content = chat
        .choices
        .first()
        .map(|c| c.message.content.trim())
        .ok_or_else(|| SummarizeError::Malformed("no choices in response".to_string()))?;

    // Reasoning models may prepend a <think> block
    let content = match content.rfind("</think>") {
        Some(pos) => content[pos + "</think>".len()..].trim(),
        None => content,
    };

    if content.is_empty() {
        return Err(SummarizeError::Malformed("empty completion".to_string()));
    }
    Ok(content.to_string())
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn read_key(endpoint: &EndpointConfig) -> Result<String, String> {
    let Some(var) = endpoint.api_key_env.as_deref() else {
        return Err("no api_key_env configured".to_string());
    };
    std::env::var(var).map_err(|_| format!("{var} env var required for this backend"))
}

/// Check if the Ollama server is reachable.
async fn check_ollama_health(client: &Client, base_url: &str) -> bool {
    // Ollama's health endpoint is at the root (not under /v1)
    let health_url = base_url.trim_end_matches('/').trim_end_matches("/v1");

    match client
        .get(health_url)
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            info!("Ollama server is reachable");
            true
        }
        Ok(resp) => {
            warn!(status = %resp.status(), "Ollama server returned non-OK status");
            false
        }
        Err(e) => {
            warn!(error = %e, "Ollama server not reachable");
            false
        }
    }
}

/// Set up the configured backend once per session. Any problem here makes
/// the summarizer unavailable instead of failing the process.
pub async fn build_summarizer(section: &SummarizerSection) -> SummarizerHandle {
    let client = Client::new();

    let handle = match section.backend {
        SummarizerBackend::HuggingFace => match read_key(&section.huggingface) {
            Ok(token) => {
                info!(model = %section.huggingface.model, "Using Hugging Face backend");
                SummarizerHandle::ready(HuggingFaceSummarizer::new(
                    client,
                    &section.huggingface,
                    token,
                ))
            }
            Err(reason) => SummarizerHandle::Unavailable(reason),
        },
        SummarizerBackend::Ollama => {
            if check_ollama_health(&client, &section.ollama.base_url).await {
                info!(
                    url = %section.ollama.base_url,
                    model = %section.ollama.model,
                    "Using Ollama (local) backend"
                );
                // required by the API shape but ignored by Ollama
                let key = read_key(&section.ollama).unwrap_or_else(|_| "ollama".to_string());
                SummarizerHandle::ready(ChatSummarizer::new(client, &section.ollama, key))
            } else {
                SummarizerHandle::Unavailable(format!(
                    "Ollama is not running at {}. Start it with: ollama serve",
                    section.ollama.base_url
                ))
            }
        }
        SummarizerBackend::Remote => match read_key(&section.remote) {
            Ok(key) => {
                info!(
                    url = %section.remote.base_url,
                    model = %section.remote.model,
                    "Using remote API backend"
                );
                SummarizerHandle::ready(ChatSummarizer::new(client, &section.remote, key))
            }
            Err(reason) => SummarizerHandle::Unavailable(reason),
        },
        SummarizerBackend::Disabled => {
            SummarizerHandle::Unavailable("summarizer disabled in configuration".to_string())
        }
    };

    if let SummarizerHandle::Unavailable(reason) = &handle {
        warn!(backend = ?section.backend, reason = %reason, "Summarizer unavailable");
    }
    handle
}
