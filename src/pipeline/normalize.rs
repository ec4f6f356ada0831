//! Payload normalisation: data-URI string or raw upload → base64 [`ImagePayload`].
//!
//! The model endpoint wants images as base64 `data:` URIs inside the JSON
//! body. Callers reach us two ways: `POST /extract` sends a data URI string,
//! `POST /direct-markdown` uploads raw bytes. Both end up as the same
//! payload type so the gateway has a single input shape.
//!
//! Only the string path is validated, and only by shape: the payload after
//! `base64,` is forwarded untouched, and uploaded bytes are encoded without
//! sniffing their format.

use crate::config::ImageLabel;
use crate::error::CardReaderError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/([a-zA-Z]+);base64,(.*)$").unwrap());

/// Subtype assumed when the caller gave no usable media type.
const FALLBACK_SUBTYPE: &str = "jpeg";

/// A base64 image ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Base64 text exactly as it will appear after `base64,`.
    pub base64: String,
    /// Image subtype declared by the caller (`png`, `jpeg`, ...).
    pub subtype: String,
}

impl ImagePayload {
    /// Rebuild the `data:` URI sent to the model.
    pub fn data_uri(&self, label: ImageLabel) -> String {
        let subtype = match label {
            ImageLabel::Jpeg => FALLBACK_SUBTYPE,
            ImageLabel::Preserve => self.subtype.as_str(),
        };
        format!("data:image/{};base64,{}", subtype, self.base64)
    }
}

/// Validate a `data:image/<subtype>;base64,<payload>` string and split it.
///
/// A single trailing line break (`\n` or `\r\n`) is ignored; line breaks
/// anywhere else are rejected.
///
/// # Errors
/// [`CardReaderError::InvalidEncoding`] when the string does not match.
pub fn normalize_from_data_uri(input: &str) -> Result<ImagePayload, CardReaderError> {
    let input = input
        .strip_suffix("\r\n")
        .or_else(|| input.strip_suffix('\n'))
        .unwrap_or(input);
    let caps = RE_DATA_URI
        .captures(input)
        .ok_or_else(|| CardReaderError::InvalidEncoding {
            reason: describe_mismatch(input),
        })?;

    let payload = ImagePayload {
        subtype: caps[1].to_ascii_lowercase(),
        base64: caps[2].to_string(),
    };
    debug!(
        "Normalised data URI: image/{} → {} bytes base64",
        payload.subtype,
        payload.base64.len()
    );
    Ok(payload)
}

/// Base64-encode raw uploaded bytes.
///
/// `content_type` is the upload's declared media type, if any; an
/// `image/<subtype>` value sets the subtype, anything else falls back to
/// `jpeg`.
pub fn normalize_from_bytes(raw: &[u8], content_type: Option<&str>) -> ImagePayload {
    let subtype = content_type
        .and_then(image_subtype)
        .unwrap_or(FALLBACK_SUBTYPE)
        .to_ascii_lowercase();
    let base64 = STANDARD.encode(raw);
    debug!("Encoded upload: {} bytes → {} bytes base64", raw.len(), base64.len());
    ImagePayload { base64, subtype }
}

/// Extract `png` from `image/png` (ignoring parameters such as `; charset`).
fn image_subtype(content_type: &str) -> Option<&str> {
    let essence = content_type.split(';').next()?.trim();
    let subtype = essence.strip_prefix("image/")?;
    if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(subtype)
    } else {
        None
    }
}

fn describe_mismatch(input: &str) -> String {
    if input.is_empty() {
        "input is empty".to_string()
    } else if !input.starts_with("data:image/") {
        "missing 'data:image/' prefix".to_string()
    } else if !input.contains(";base64,") {
        "missing ';base64,' marker".to_string()
    } else {
        "malformed media type or payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_payload_verbatim() {
        for (uri, payload, subtype) in [
            ("data:image/png;base64,QUJD", "QUJD", "png"),
            ("data:image/jpeg;base64,/9j/4AAQ==", "/9j/4AAQ==", "jpeg"),
            ("data:image/WebP;base64,", "", "webp"),
            ("data:image/gif;base64,not even base64!", "not even base64!", "gif"),
        ] {
            let p = normalize_from_data_uri(uri).unwrap();
            assert_eq!(p.base64, payload, "uri: {uri}");
            assert_eq!(p.subtype, subtype, "uri: {uri}");
        }
    }

    #[test]
    fn trailing_line_break_is_ignored() {
        for uri in [
            "data:image/png;base64,QUJD\n",
            "data:image/png;base64,QUJD\r\n",
        ] {
            let p = normalize_from_data_uri(uri).unwrap();
            assert_eq!(p.base64, "QUJD", "uri: {uri:?}");
        }
        assert!(normalize_from_data_uri("data:image/png;base64,QUJD\n\n").is_err());
    }

    #[test]
    fn rejects_non_data_uri() {
        for bad in [
            "",
            "QUJD",
            "string",
            "data:text/plain;base64,QUJD",
            "data:image/png,QUJD",
            "data:image/svg+xml;base64,QUJD",
            " data:image/png;base64,QUJD",
            "data:image/png;base64,QU\nJD",
        ] {
            let err = normalize_from_data_uri(bad).unwrap_err();
            assert!(
                matches!(err, CardReaderError::InvalidEncoding { .. }),
                "input {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn jpeg_label_forces_media_type() {
        let p = normalize_from_data_uri("data:image/png;base64,QUJD").unwrap();
        assert_eq!(p.data_uri(ImageLabel::Jpeg), "data:image/jpeg;base64,QUJD");
        assert_eq!(p.data_uri(ImageLabel::Preserve), "data:image/png;base64,QUJD");
    }

    #[test]
    fn bytes_are_base64_encoded() {
        let p = normalize_from_bytes(b"ABC", None);
        assert_eq!(p.base64, "QUJD");
        assert_eq!(p.subtype, "jpeg");
        assert_eq!(STANDARD.decode(&p.base64).unwrap(), b"ABC");
    }

    #[test]
    fn bytes_take_subtype_from_content_type() {
        assert_eq!(normalize_from_bytes(b"x", Some("image/png")).subtype, "png");
        assert_eq!(
            normalize_from_bytes(b"x", Some("image/PNG; q=1")).subtype,
            "png"
        );
        assert_eq!(
            normalize_from_bytes(b"x", Some("application/octet-stream")).subtype,
            "jpeg"
        );
        assert_eq!(normalize_from_bytes(b"x", Some("image/svg+xml")).subtype, "jpeg");
    }

    #[test]
    fn arbitrary_bytes_are_accepted() {
        let p = normalize_from_bytes(&[0u8, 255, 1, 2], Some("text/plain"));
        assert_eq!(STANDARD.decode(&p.base64).unwrap(), vec![0u8, 255, 1, 2]);
    }
}
