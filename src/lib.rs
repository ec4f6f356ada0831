//! # card-reader
//!
//! An HTTP service that reads business cards and transcribes images with a
//! vision language model reached over a chat-completions API.
//!
//! ## Request Pipeline
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Normalise  data-URI string or uploaded bytes → base64 payload
//!  ├─ 2. Prompt     fixed extraction / transcription prompt + image
//!  ├─ 3. Model      one POST to the configured endpoint (bearer auth, timeout)
//!  ├─ 4. Clean      strip code fences; parse JSON or trim Markdown
//!  └─ 5. Respond    card JSON or {"markdown": …}
//! ```
//!
//! Nothing is persisted and nothing is shared between requests except the
//! read-only [`ServiceConfig`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use card_reader::{serve, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .endpoint("http://localhost:8105/v1/chat/completions")
//!         .api_key("token-abc123")
//!         .model("Qwen/Qwen3-VL-8B-Instruct-FP8")
//!         .build()?;
//!     serve("0.0.0.0:8000", config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Library use without HTTP
//!
//! ```rust,no_run
//! use card_reader::{normalize_from_data_uri, ModelGateway, ServiceConfig};
//! use std::sync::Arc;
//!
//! # async fn run(config: ServiceConfig) -> Result<(), card_reader::CardReaderError> {
//! let gateway = ModelGateway::new(Arc::new(config))?;
//! let image = normalize_from_data_uri("data:image/png;base64,iVBORw0KGgo=")?;
//! let card = gateway.extract_card(&image).await?;
//! println!("{:?}", card.extracted_info.name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `card-reader` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageLabel, ServiceConfig, ServiceConfigBuilder};
pub use error::CardReaderError;
pub use output::{
    AdditionalInfo, CardExtraction, ExtractedCard, MarkdownResponse, ServiceInfo, StatusResponse,
};
pub use pipeline::llm::ModelGateway;
pub use pipeline::normalize::{normalize_from_bytes, normalize_from_data_uri, ImagePayload};
pub use pipeline::postprocess::strip_code_fence;
pub use server::{router, serve, AppState};
