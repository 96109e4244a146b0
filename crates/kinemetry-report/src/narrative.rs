//! Narrative generation: external backend seam and fallback policy.
//!
//! The external call is a single attempt bounded by a caller-supplied
//! timeout. Every failure mode (network error, non-success status,
//! malformed body, timeout) collapses into `Error::ExternalService` and
//! the caller falls back to the deterministic local template. The
//! External/Local distinction is kept in the result so consumers can
//! surface degraded mode.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use kinemetry_core::{Error, Result};

use crate::assembler::Report;
use crate::local::local_report;
use crate::prompts::build_report_prompt;

/// The human-readable session narrative, tagged by origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Narrative {
    /// Generated by the external text-generation service.
    External {
        content: String,
        /// Token usage metadata as returned by the service, if any.
        usage: Option<serde_json::Value>,
        /// Wall-clock duration of the external call, seconds.
        duration_secs: f64,
    },
    /// Deterministic local template, used when the external call failed.
    Local(String),
}

impl Narrative {
    pub fn text(&self) -> &str {
        match self {
            Narrative::External { content, .. } => content,
            Narrative::Local(content) => content,
        }
    }
}

/// Successful response from a narrative backend.
#[derive(Debug, Clone)]
pub struct NarrativeResponse {
    pub content: String,
    pub usage: Option<serde_json::Value>,
    pub duration_secs: f64,
}

/// Seam over the external text-generation service.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Single-attempt generation. Implementations map every failure to
    /// [`Error::ExternalService`].
    async fn generate(&self, prompt: &str) -> Result<NarrativeResponse>;
}

/// Backend configuration for an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer token; empty disables the Authorization header.
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    /// Per-call timeout, milliseconds.
    pub timeout_ms: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Production backend posting to an OpenAI-compatible chat-completions
/// endpoint.
pub struct ChatCompletionsBackend {
    config: NarrativeConfig,
    client: reqwest::Client,
}

impl ChatCompletionsBackend {
    pub fn new(config: NarrativeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ExternalService(format!("client construction failed: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &NarrativeConfig {
        &self.config
    }
}

#[async_trait]
impl NarrativeBackend for ChatCompletionsBackend {
    async fn generate(&self, prompt: &str) -> Result<NarrativeResponse> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            stream: false,
        };

        let mut request = self.client.post(&self.config.api_url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let started = std::time::Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!(
                "status {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::ExternalService("response contained no choices".to_string()))?;

        Ok(NarrativeResponse {
            content,
            usage: parsed.usage,
            duration_secs: started.elapsed().as_secs_f64(),
        })
    }
}

/// Generate the narrative for a report: one bounded external attempt,
/// local fallback on any failure. Never errors.
pub async fn narrate<B: NarrativeBackend + ?Sized>(
    backend: &B,
    report: &Report,
    call_timeout: Duration,
) -> Narrative {
    let prompt = build_report_prompt(report);
    tracing::debug!(
        total_frames = report.metadata.total_frames,
        "dispatching narrative request"
    );

    match timeout(call_timeout, backend.generate(&prompt)).await {
        Ok(Ok(response)) => Narrative::External {
            content: response.content,
            usage: response.usage,
            duration_secs: response.duration_secs,
        },
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "narrative backend failed, using local report");
            Narrative::Local(local_report(report))
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = call_timeout.as_millis() as u64,
                "narrative backend timed out, using local report"
            );
            Narrative::Local(local_report(report))
        }
    }
}
