//! OpenRouter chat-completions adapter.
//!
//! Speaks the OpenAI-compatible `/chat/completions` dialect. Search
//! augmentation routes the request to the configured search-capable model
//! (e.g. `perplexity/sonar`) and collects the citations those models attach
//! to their responses.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use copyforge_shared::{Citation, CopyForgeError, GenerationOptions, OpenRouterConfig, Result};

use crate::{Completion, TextGenerationClient};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("copyforge/", env!("CARGO_PKG_VERSION"));

/// Character cap on error-body snippets carried into error messages.
const ERROR_SNIPPET_CHARS: usize = 300;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// ---------------------------------------------------------------------------
// OpenRouterClient
// ---------------------------------------------------------------------------

/// HTTP client for the OpenRouter chat-completions API.
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
    search_model: String,
}

impl OpenRouterClient {
    /// Create a client, reading the API key from the configured env var.
    pub fn new(config: &OpenRouterConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            CopyForgeError::config(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key (embedders, tests).
    pub fn with_api_key(config: &OpenRouterConfig, api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(CopyForgeError::config("OpenRouter API key is empty"));
        }

        let base = Url::parse(&config.base_url).map_err(|e| {
            CopyForgeError::config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;
        let endpoint = format!("{}/chat/completions", base.as_str().trim_end_matches('/'));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CopyForgeError::completion(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            search_model: config.search_model.clone(),
        })
    }
}

// The API key never appears in Debug output.
impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("endpoint", &self.endpoint)
            .field("search_model", &self.search_model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerationClient for OpenRouterClient {
    #[instrument(skip_all, fields(model = %options.model, search = options.search_augmented))]
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<Completion> {
        let model = if options.search_augmented {
            self.search_model.as_str()
        } else {
            options.model.as_str()
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &options.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: false,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CopyForgeError::completion(format!("request to {model} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CopyForgeError::completion(format!(
                "{model}: HTTP {status}: {}",
                snippet(&body)
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            CopyForgeError::completion(format!("{model}: unreadable response body: {e}"))
        })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CopyForgeError::completion(format!(
                    "{model}: response missing choices[0].message.content"
                ))
            })?
            .to_string();

        // Usage accounting is best-effort; providers omit it freely.
        let model_used = body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(model)
            .to_string();
        let tokens_in = body
            .pointer("/usage/prompt_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        let tokens_out = body
            .pointer("/usage/completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        let citations = parse_citations(&body);

        debug!(
            chars = text.len(),
            tokens_in,
            tokens_out,
            latency_ms,
            citations = citations.len(),
            "completion received"
        );

        Ok(Completion {
            text,
            citations,
            model: model_used,
            tokens_in,
            tokens_out,
            latency_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

/// Collect citations from the two shapes search models return them in:
/// a top-level `citations` array of URLs, and per-message `annotations`
/// with `url_citation` entries.
fn parse_citations(body: &Value) -> Vec<Citation> {
    let mut citations = Vec::new();

    if let Some(urls) = body.get("citations").and_then(Value::as_array) {
        for entry in urls {
            if let Some(url) = entry.as_str() {
                citations.push(Citation {
                    url: url.to_string(),
                    title: None,
                });
            }
        }
    }

    if let Some(annotations) = body
        .pointer("/choices/0/message/annotations")
        .and_then(Value::as_array)
    {
        for annotation in annotations {
            if let Some(cite) = annotation.get("url_citation") {
                if let Some(url) = cite.get("url").and_then(Value::as_str) {
                    if citations.iter().any(|c| c.url == url) {
                        continue;
                    }
                    citations.push(Citation {
                        url: url.to_string(),
                        title: cite.get("title").and_then(Value::as_str).map(String::from),
                    });
                }
            }
        }
    }

    citations
}

/// First `ERROR_SNIPPET_CHARS` characters of an error body.
fn snippet(body: &str) -> String {
    if body.chars().count() <= ERROR_SNIPPET_CHARS {
        body.to_string()
    } else {
        let mut s: String = body.chars().take(ERROR_SNIPPET_CHARS).collect();
        s.push_str("...");
        s
    }
}
