//! Model gateway: build chat-completion requests and call the vision model.
//!
//! This module owns the only network I/O in the service. It is intentionally
//! thin: prompt text lives in [`crate::prompts`] and text cleanup in
//! [`super::postprocess`], so this file only deals with the wire format and
//! with classifying failures.
//!
//! ## Wire format
//!
//! ```text
//! POST <endpoint>
//! Authorization: Bearer <api_key>
//! {
//!   "model": "<model>",
//!   "messages": [{"role": "user", "content": [
//!     {"type": "text", "text": "<prompt>"},
//!     {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,<b64>"}}
//!   ]}],
//!   "max_tokens": 1024,
//!   "temperature": 0.0
//! }
//! ```
//!
//! Only `choices[0].message.content` is read from the reply; the rest of the
//! body is ignored.
//!
//! No retries: a failed call is reported to the caller straight away.

use crate::config::ServiceConfig;
use crate::error::CardReaderError;
use crate::output::CardExtraction;
use crate::pipeline::normalize::ImagePayload;
use crate::pipeline::postprocess::{clean_transcription, parse_json_output};
use crate::prompts::{EXTRACT_PROMPT, MARKDOWN_PROMPT};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ── Request types ────────────────────────────────────────────────────────────

/// Body of a chat-completion call.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One role-tagged message with multimodal content.
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: Vec<ContentPart<'a>>,
}

/// A text or image part of a message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl<'a> ChatCompletionRequest<'a> {
    /// A single user turn: prompt text followed by the image.
    pub fn vision(
        model: &'a str,
        prompt: &'a str,
        image_url: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ],
            }],
            max_tokens,
            temperature,
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────────────────

/// Client for the configured chat-completions endpoint.
///
/// Cheap to share: hold it in an `Arc` and call it from any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct ModelGateway {
    client: reqwest::Client,
    config: Arc<ServiceConfig>,
}

impl ModelGateway {
    /// Build the HTTP client with the configured timeout.
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self, CardReaderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CardReaderError::Internal(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Structured business-card extraction.
    ///
    /// Returns the model's JSON answer verbatim; the card schema is asked for
    /// in the prompt but not enforced here.
    pub async fn extract(&self, image: &ImagePayload) -> Result<Value, CardReaderError> {
        let prompt = self
            .config
            .extract_prompt
            .as_deref()
            .unwrap_or(EXTRACT_PROMPT);
        let text = self
            .complete(prompt, image, self.config.extract_max_tokens)
            .await?;

        parse_json_output(&text).inspect_err(|e| {
            if let CardReaderError::ResponseParse { raw } = e {
                warn!("Model output is not JSON ({} chars after cleanup)", raw.len());
            }
        })
    }

    /// [`Self::extract`] followed by a lenient conversion to [`CardExtraction`].
    ///
    /// # Errors
    /// [`CardReaderError::ResponseParse`] when the JSON does not fit the card
    /// schema at all (e.g. `name` is not an array).
    pub async fn extract_card(
        &self,
        image: &ImagePayload,
    ) -> Result<CardExtraction, CardReaderError> {
        let value = self.extract(image).await?;
        CardExtraction::from_value(&value).ok_or_else(|| CardReaderError::ResponseParse {
            raw: value.to_string(),
        })
    }

    /// Verbatim transcription of the image as Markdown.
    pub async fn transcribe_markdown(
        &self,
        image: &ImagePayload,
    ) -> Result<String, CardReaderError> {
        let prompt = self
            .config
            .markdown_prompt
            .as_deref()
            .unwrap_or(MARKDOWN_PROMPT);
        let text = self
            .complete(prompt, image, self.config.markdown_max_tokens)
            .await?;
        Ok(clean_transcription(&text))
    }

    /// Send one vision request and return the first choice's text.
    async fn complete(
        &self,
        prompt: &str,
        image: &ImagePayload,
        max_tokens: u32,
    ) -> Result<String, CardReaderError> {
        let start = Instant::now();
        let request = ChatCompletionRequest::vision(
            &self.config.model,
            prompt,
            image.data_uri(self.config.image_label),
            max_tokens,
            self.config.temperature,
        );
        info!(
            "Calling model '{}' (max_tokens={}, image={} bytes base64)",
            self.config.model,
            max_tokens,
            image.base64.len()
        );

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        if !status.is_success() {
            warn!("Model endpoint returned {} after {:?}", status, start.elapsed());
            return Err(CardReaderError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let text = extract_message_content(&body)?;
        debug!(
            "Model answered in {:?}: {} chars",
            start.elapsed(),
            text.len()
        );
        Ok(text)
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> CardReaderError {
        if e.is_timeout() {
            warn!(
                "Model call timed out after {}s",
                self.config.request_timeout_secs
            );
            CardReaderError::GatewayTimeout {
                secs: self.config.request_timeout_secs,
            }
        } else {
            warn!("Model endpoint unreachable: {}", e);
            CardReaderError::ModelUnreachable {
                endpoint: self.config.endpoint.clone(),
                reason: e.to_string(),
            }
        }
    }
}

/// Read `choices[0].message.content` from a chat-completion body.
///
/// Content may be a plain string or an array of `{"type": "text", "text": …}`
/// parts, which are concatenated.
///
/// # Errors
/// [`CardReaderError::InvalidModelResponse`] with the full body when the body
/// is not JSON or the path is missing.
pub fn extract_message_content(body: &str) -> Result<String, CardReaderError> {
    let invalid = || CardReaderError::InvalidModelResponse {
        body: body.to_string(),
    };
    let v: Value = serde_json::from_str(body).map_err(|_| invalid())?;
    let content = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .ok_or_else(invalid)?;

    match content {
        Value::String(s) => Ok(s.clone()),
        Value::Array(parts) => Ok(parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("")),
        _ => Err(invalid()),
    }
}
