//! LLM API interaction for article field extraction.
//!
//! This module talks to an OpenAI-compatible chat-completions endpoint
//! (DeepSeek by default). The trait-based design keeps the detail stage
//! independent of the concrete backend:
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`ExtractionClient`]: HTTP client that sends page text together with
//!   the fixed extraction instruction and the article schema
//!
//! Failed calls are reported to the caller and never retried.

use crate::models::Article;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Instruction given to the model for every detail page.
pub const EXTRACTION_INSTRUCTION: &str = r#"You are a senior wind power industry intelligence analyst. Extract the key information from the web page content.

### 1. Core task: article category (category)
Set `category` to exactly one of the following, based on the main point of the article:
- "technical": turbine manufacturing, blade materials, O&M technology, construction methods, product launches, technical parameters, patents, research results.
- "policy": national or local notices, five-year plans, tariffs and subsidies, administrative measures, industry standards, project approvals, competitive allocation rules.
- "market": tender results, company news, investment and financing, installed capacity statistics.
- "other": anything that fits none of the above.

### 2. Other fields
- publish_date: the publication date, formatted strictly as YYYY-MM-DD.
- summary: the core facts (amounts, concrete parameters, companies involved), at most 150 characters, objective.
- tags: 3 to 5 concrete entity keywords.
- has_project_info / has_technical_specs: true when the article names projects and capacities / turbine models and technical parameters."#;

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and return its reply. The detail stage
/// is generic over this trait so tests can substitute canned replies.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client that extracts [`Article`] fields from page text.
#[derive(Clone)]
pub struct ExtractionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl fmt::Debug for ExtractionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ExtractionClient {
    /// Create a client for the API at `base_url` (without the
    /// `/chat/completions` suffix).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: system_prompt(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// The extraction instruction followed by the article JSON schema.
pub fn system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&Article::json_schema()).unwrap_or_default();
    format!(
        "{EXTRACTION_INSTRUCTION}\n\nReply with a single JSON object that matches this JSON schema:\n{schema}"
    )
}

impl AskAsync for ExtractionClient {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.0,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "LLM API error");
            return Err(format!("LLM API error ({status}): {body}").into());
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or("LLM returned no content")?;

        debug!(
            model = %self.model,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = content.len(),
            "LLM extraction call finished"
        );
        Ok(content)
    }
}
