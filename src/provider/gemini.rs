//! Google Generative Language (`generateContent`) client.
//!
//! Requests always use JSON response mode with a response schema matching
//! the structured reply, so no prose parsing is ever needed downstream.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ProviderConfig;
use crate::credentials::Credential;
use crate::provider::client::{GenerationRequest, ProviderClient};
use crate::provider::error::ProviderError;
use crate::storage::TurnRole;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";
/// Longest provider error message kept in an error value.
const MAX_ERROR_CHARS: usize = 300;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

/// Schema of the structured reply in the provider's schema dialect.
fn reply_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "text": {"type": "STRING"},
            "images": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "url": {"type": "STRING"},
                        "caption": {"type": "STRING"}
                    },
                    "required": ["url"]
                }
            },
            "video_links": {"type": "ARRAY", "items": {"type": "STRING"}},
            "suggestions": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["text"]
    })
}

const fn provider_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Assistant => "model",
    }
}

fn build_request(request: GenerationRequest<'_>) -> GenerateContentRequest {
    let contents = request
        .turns
        .iter()
        .map(|turn| Content {
            role: Some(provider_role(turn.role)),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.system_prompt.to_string(),
            }],
        },
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            response_mime_type: "application/json",
            response_schema: reply_schema(),
        },
    }
}

/// Map a non-success HTTP response to a classified error.
fn classify_status(status: u16, body: &str) -> ProviderError {
    let message: String = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
        .chars()
        .take(MAX_ERROR_CHARS)
        .collect();

    let quota = status == 429
        || status == 503
        || body.contains("RESOURCE_EXHAUSTED")
        || body.contains("UNAVAILABLE");
    let rejected = status == 401
        || status == 403
        || body.contains("API_KEY_INVALID")
        || body.contains("PERMISSION_DENIED");

    if quota {
        ProviderError::RateLimited { status, message }
    } else if rejected {
        ProviderError::Unauthorized { status, message }
    } else {
        ProviderError::Status { status, message }
    }
}

/// Join the answer parts of the first candidate, skipping thinking parts.
fn candidate_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::Malformed(
            "response carried no candidate text".to_string(),
        ));
    }
    Ok(text)
}

/// Provider client for the `generateContent` REST endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Build a client from provider settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Http(err.without_url())
        }
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn generate(
        &self,
        credential: &Credential,
        request: GenerationRequest<'_>,
    ) -> Result<String, ProviderError> {
        let body = build_request(request);

        let response = self
            .client
            .post(self.endpoint(request.model))
            .header(API_KEY_HEADER, credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &text));
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("undecodable response body: {e}")))?;
        candidate_text(parsed)
    }
}
