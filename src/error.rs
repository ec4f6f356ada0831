//! Error types for the card-reader library.
//!
//! Every request follows one linear pipeline (normalise → call model →
//! clean/parse), so a single error enum covers all of its exits:
//!
//! * **Client faults**: the caller sent something that is not an image
//!   ([`CardReaderError::InvalidEncoding`], [`CardReaderError::MissingUpload`],
//!   [`CardReaderError::InvalidUpload`], [`CardReaderError::UploadTooLarge`]).
//! * **Upstream faults**: the model endpoint failed, timed out, could not be
//!   reached, or answered with text we cannot use.
//! * **Startup faults**: [`CardReaderError::InvalidConfig`],
//!   [`CardReaderError::Bind`].
//!
//! Variants carry enough payload (upstream status and body, raw model output)
//! to reproduce a failure from the error message alone. The HTTP status each
//! variant maps to lives in [`crate::server`].

use thiserror::Error;

/// All errors returned by the card-reader library.
#[derive(Debug, Error)]
pub enum CardReaderError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The image string is not a `data:image/<type>;base64,<payload>` URI.
    #[error("Invalid base64 image format. Must start with data:image/...;base64, ({reason})")]
    InvalidEncoding { reason: String },

    /// A multipart upload arrived without the expected file field.
    #[error("Missing upload: multipart field '{field}' is required")]
    MissingUpload { field: String },

    /// The multipart body could not be read.
    #[error("Invalid upload: {reason}")]
    InvalidUpload { reason: String },

    /// The request body exceeded the configured upload limit.
    #[error("Upload too large: {reason}")]
    UploadTooLarge { reason: String },

    // ── Model endpoint errors ─────────────────────────────────────────────
    /// The model endpoint answered with a non-success HTTP status.
    #[error("LLM API Error ({status}): {body}")]
    Gateway { status: u16, body: String },

    /// The model endpoint answered 2xx but without `choices[0].message.content`.
    #[error("Invalid LLM response: {body}")]
    InvalidModelResponse { body: String },

    /// The model produced text that is not valid JSON where JSON was required.
    #[error("Failed to parse JSON from model output: {raw}")]
    ResponseParse { raw: String },

    /// The outbound model call exceeded the configured timeout.
    #[error("LLM API call timed out after {secs}s")]
    GatewayTimeout { secs: u64 },

    /// The model endpoint could not be reached at all.
    #[error("LLM API unreachable at '{endpoint}': {reason}")]
    ModelUnreachable { endpoint: String, reason: String },

    // ── Startup errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP listener could not be bound.
    #[error("Failed to bind '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardReaderError {
    /// `true` when the caller, not the service or the model, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CardReaderError::InvalidEncoding { .. }
                | CardReaderError::MissingUpload { .. }
                | CardReaderError::InvalidUpload { .. }
                | CardReaderError::UploadTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_display_includes_status_and_body() {
        let e = CardReaderError::Gateway {
            status: 503,
            body: "model overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("503"), "got: {msg}");
        assert!(msg.contains("model overloaded"), "got: {msg}");
    }

    #[test]
    fn invalid_response_display_includes_body() {
        let e = CardReaderError::InvalidModelResponse {
            body: r#"{"error":"nope"}"#.into(),
        };
        assert!(e.to_string().starts_with("Invalid LLM response"));
        assert!(e.to_string().contains("nope"));
    }

    #[test]
    fn timeout_display() {
        let e = CardReaderError::GatewayTimeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn client_error_classification() {
        assert!(CardReaderError::InvalidEncoding {
            reason: "x".into()
        }
        .is_client_error());
        assert!(CardReaderError::MissingUpload {
            field: "file".into()
        }
        .is_client_error());
        assert!(CardReaderError::UploadTooLarge {
            reason: "limit".into()
        }
        .is_client_error());
        assert!(!CardReaderError::ResponseParse { raw: "x".into() }.is_client_error());
        assert!(!CardReaderError::GatewayTimeout { secs: 1 }.is_client_error());
    }
}
