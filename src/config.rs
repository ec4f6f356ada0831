//! Configuration for the card-reader service.
//!
//! Endpoint URL, bearer token, model name and limits live in
//! [`ServiceConfig`]. It is built once at startup
//! through [`ServiceConfigBuilder`], wrapped in an `Arc`, and never mutated
//! afterwards; the gateway and the HTTP handlers only ever read it.

use crate::error::CardReaderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default per-call timeout for the model endpoint, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default inbound body limit (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Configuration shared by the model gateway and the HTTP server.
///
/// # Example
/// ```rust
/// use card_reader::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .endpoint("http://localhost:8105/v1/chat/completions")
///     .api_key("token-abc123")
///     .model("Qwen/Qwen3-VL-8B-Instruct-FP8")
///     .build()
///     .unwrap();
/// assert_eq!(config.extract_max_tokens, 1024);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,

    /// Bearer token sent in the `Authorization` header.
    pub api_key: String,

    /// Model identifier placed in every request body.
    pub model: String,

    /// Per-call timeout for the model endpoint. Default: 60.
    ///
    /// Expiry surfaces as [`CardReaderError::GatewayTimeout`].
    pub request_timeout_secs: u64,

    /// Token limit for structured extraction. Default: 1024.
    pub extract_max_tokens: u32,

    /// Token limit for markdown transcription. Default: 600.
    pub markdown_max_tokens: u32,

    /// Sampling temperature. Default: 0.0 (deterministic).
    pub temperature: f32,

    /// How outgoing images are labelled in the data URI. Default: [`ImageLabel::Jpeg`].
    pub image_label: ImageLabel,

    /// Replacement for the built-in extraction prompt.
    pub extract_prompt: Option<String>,

    /// Replacement for the built-in transcription prompt.
    pub markdown_prompt: Option<String>,

    /// Largest accepted request body in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Name reported by `GET /`.
    pub service_name: String,

    /// Deployment environment reported by `GET /`.
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            extract_max_tokens: 1024,
            markdown_max_tokens: 600,
            temperature: 0.0,
            image_label: ImageLabel::default(),
            extract_prompt: None,
            markdown_prompt: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            service_name: "Card Reader Service".to_string(),
            environment: "production".to_string(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("extract_max_tokens", &self.extract_max_tokens)
            .field("markdown_max_tokens", &self.markdown_max_tokens)
            .field("temperature", &self.temperature)
            .field("image_label", &self.image_label)
            .field("extract_prompt", &self.extract_prompt.as_ref().map(|p| p.len()))
            .field("markdown_prompt", &self.markdown_prompt.as_ref().map(|p| p.len()))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("service_name", &self.service_name)
            .field("environment", &self.environment)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn extract_max_tokens(mut self, n: u32) -> Self {
        self.config.extract_max_tokens = n;
        self
    }

    pub fn markdown_max_tokens(mut self, n: u32) -> Self {
        self.config.markdown_max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn image_label(mut self, label: ImageLabel) -> Self {
        self.config.image_label = label;
        self
    }

    pub fn extract_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extract_prompt = Some(prompt.into());
        self
    }

    pub fn markdown_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.markdown_prompt = Some(prompt.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    pub fn environment(mut self, env: impl Into<String>) -> Self {
        self.config.environment = env.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, CardReaderError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(CardReaderError::InvalidConfig(format!(
                "endpoint must be an http:// or https:// URL, got '{}'",
                c.endpoint
            )));
        }
        if c.api_key.trim().is_empty() {
            return Err(CardReaderError::InvalidConfig(
                "api_key must not be empty".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(CardReaderError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(CardReaderError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.extract_max_tokens == 0 || c.markdown_max_tokens == 0 {
            return Err(CardReaderError::InvalidConfig(
                "token limits must be ≥ 1".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(CardReaderError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Media type written into the outgoing `data:` URI.
///
/// | Label | Outgoing URI |
/// |-------|--------------|
/// | `Jpeg` | always `data:image/jpeg;base64,…` whatever the input said |
/// | `Preserve` | `data:image/<subtype>;base64,…` using the subtype the caller supplied |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLabel {
    /// Label every image as `image/jpeg`. (default)
    #[default]
    Jpeg,
    /// Keep the subtype captured from the data URI or upload content type.
    Preserve,
}

impl FromStr for ImageLabel {
    type Err = CardReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageLabel::Jpeg),
            "preserve" => Ok(ImageLabel::Preserve),
            other => Err(CardReaderError::InvalidConfig(format!(
                "unknown image label '{other}' (expected jpeg or preserve)"
            ))),
        }
    }
}
