//! Language-model collaborator.
//!
//! The rest of the system sees the model as an opaque
//! `generate(prompt) -> text` capability ([`ModelClient`]). The bundled
//! implementation speaks the OpenAI-compatible chat completions API. There
//! is no retry: any failure is returned to the caller unchanged.

mod wire;

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, instrument};

use crisisdesk_shared::{CrisisDeskError, ModelSettings, Result};

use wire::{ChatMessage, ChatRequest, ChatResponse, ErrorEnvelope};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("CrisisDesk/", env!("CARGO_PKG_VERSION"));

/// Longest provider error body echoed back to the user.
const MAX_ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Collaborator interface
// ---------------------------------------------------------------------------

/// One completion request: a fully built prompt plus sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
}

/// The opaque model capability.
pub trait ModelClient: Send + Sync {
    /// Send `request` and return the reply text.
    fn generate(&self, request: &CompletionRequest) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatClient {
    /// Build a client from resolved settings.
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| CrisisDeskError::Model(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            http,
            endpoint,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    /// The full chat-completions URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ModelClient for OpenAiCompatClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_len = request.prompt.len()))]
    async fn generate(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CrisisDeskError::Model(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CrisisDeskError::Model(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(CrisisDeskError::Model(format!(
                "HTTP {status}: {}",
                provider_error_message(&text)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            CrisisDeskError::Model(format!(
                "invalid completion response: {e} (got: {})",
                truncate_chars(&text, MAX_ERROR_BODY_CHARS)
            ))
        })?;

        if let Some(usage) = &parsed.usage {
            info!(
                tokens_in = usage.prompt_tokens,
                tokens_out = usage.completion_tokens,
                latency_ms = start.elapsed().as_millis() as u64,
                "model call complete"
            );
        }

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CrisisDeskError::Model("completion contained no message".into()))?;

        debug!(reply_len = reply.len(), "model reply received");
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull `error.message` out of a provider error body, or echo the body.
fn provider_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => truncate_chars(body, MAX_ERROR_BODY_CHARS),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
