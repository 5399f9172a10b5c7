//! Content generator adapter.
//!
//! `ContentGenerator` is the seam between the pipeline and the external
//! model. The phase runner receives it as `Arc<dyn ContentGenerator>`, so
//! tests can swap in canned responses. `AnthropicGenerator` is the production
//! backend talking to the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::errors::GeneratorError;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const JSON_ONLY_INSTRUCTION: &str =
    "IMPORTANT: Respond with valid JSON only. No markdown, no code blocks, just raw JSON.";

/// How many characters of an unparseable response to keep in the error.
const PARSE_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            system: None,
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Send one prompt and return the raw text of the reply.
    async fn generate(&self, prompt: &str, options: &GenerateOptions)
    -> Result<String, GeneratorError>;
}

/// Call `generator` and parse its reply as `T`.
///
/// The system instructions are extended to ask for raw JSON, and any code
/// fence the model wraps around its answer anyway is stripped before parsing.
pub async fn generate_structured<T: DeserializeOwned>(
    generator: &dyn ContentGenerator,
    prompt: &str,
    options: &GenerateOptions,
) -> Result<T, GeneratorError> {
    let system = match options.system.as_deref() {
        Some(system) => format!("{}\n\n{}", system, JSON_ONLY_INSTRUCTION),
        None => format!("You are a helpful assistant. {}", JSON_ONLY_INSTRUCTION),
    };
    let options = GenerateOptions {
        system: Some(system),
        ..options.clone()
    };

    let text = generator.generate(prompt, &options).await?;
    parse_json_response(&text)
}

/// Parse a generator reply, tolerating a surrounding markdown code fence.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, GeneratorError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).map_err(|e| GeneratorError::Parse {
        message: e.to_string(),
        snippet: cleaned.chars().take(PARSE_SNIPPET_CHARS).collect(),
    })
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` and a trailing ```` ``` ````.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

// ── Anthropic backend ─────────────────────────────────────────────────

/// Generator backed by the Anthropic Messages API.
///
/// A missing API key does not prevent construction; the first `generate`
/// call reports it as `GeneratorError::Misconfiguration`.
pub struct AnthropicGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
}

impl AnthropicGenerator {
    pub fn new(config: &GeneratorConfig, api_key: Option<String>) -> Result<Self, GeneratorError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GeneratorError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.is_empty()),
            api_key_env: config.api_key_env.clone(),
            timeout,
        })
    }

    /// Build from configuration, reading the key from `config.api_key_env`.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        Self::new(config, std::env::var(&config.api_key_env).ok())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn map_send_error(&self, e: reqwest::Error) -> GeneratorError {
        if e.is_timeout() {
            GeneratorError::Timeout {
                duration: self.timeout,
            }
        } else {
            GeneratorError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ContentGenerator for AnthropicGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, GeneratorError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GeneratorError::Misconfiguration(format!(
                "API key not found in environment variable '{}'",
                self.api_key_env
            ))
        })?;

        debug!(
            model = %self.model,
            max_tokens = options.max_tokens,
            temperature = options.temperature,
            prompt_len = prompt.len(),
            "Invoking Anthropic generator"
        );

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system: options.system.as_deref(),
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout {
                    duration: self.timeout,
                }
            } else {
                GeneratorError::Transport(format!("Failed to read generator response: {}", e))
            }
        })?;

        let text = parsed.text();
        if text.is_empty() {
            return Err(GeneratorError::EmptyResponse);
        }

        debug!(
            response_len = text.len(),
            input_tokens = ?parsed.usage.as_ref().map(|u| u.input_tokens),
            output_tokens = ?parsed.usage.as_ref().map(|u| u.output_tokens),
            "Anthropic generator completed"
        );
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

impl MessagesResponse {
    /// Concatenation of every `text` content block.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
