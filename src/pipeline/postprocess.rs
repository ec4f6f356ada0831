//! Post-processing: turn raw model text into the service's output.
//!
//! Vision models regularly wrap their answer in a Markdown code fence even
//! when told not to: ` ```json\n{...}\n``` ` for extraction, ` ```markdown `
//! for transcription. Both responses go through [`strip_code_fence`] before
//! anything else looks at them.
//!
//! Each function is a pure `&str → …` transformation so it can be tested
//! without a model or an HTTP stack.

use crate::error::CardReaderError;
use serde_json::Value;

/// Language tags recognised directly after an opening fence.
const FENCE_TAGS: [&str; 3] = ["json", "markdown", "md"];

/// Remove an outer triple-backtick fence and surrounding whitespace.
///
/// Handles three shapes:
///
/// 1. no fence: the text is only trimmed;
/// 2. untagged fence: ` ```\n…\n``` `;
/// 3. tagged fence: ` ```json\n…\n``` ` (also `markdown`, `md`).
///
/// A missing closing fence is tolerated. Nested outer fences are peeled
/// until none is left, so the function is idempotent:
/// `strip_code_fence(&strip_code_fence(s)) == strip_code_fence(s)`.
pub fn strip_code_fence(input: &str) -> String {
    let mut text = input.trim();
    while let Some(rest) = text.strip_prefix("```") {
        let rest = rest.trim_start_matches('`');
        let rest = strip_fence_tag(rest);
        let rest = rest.trim_end().trim_end_matches('`');
        text = rest.trim();
    }
    text.to_string()
}

/// Drop a recognised language tag, but only when it stands alone
/// (`json\n{…}` yes, `jsonish` no). `json` may also touch the body
/// directly (`json{…}`, `json[…]`).
fn strip_fence_tag(s: &str) -> &str {
    for tag in FENCE_TAGS {
        if let Some(head) = s.get(..tag.len()) {
            if head.eq_ignore_ascii_case(tag) {
                let after = &s[tag.len()..];
                let glued_json = tag == "json" && after.starts_with(['{', '[']);
                if after.is_empty() || after.starts_with(char::is_whitespace) || glued_json {
                    return after;
                }
            }
        }
    }
    s
}

/// Strip any fence and parse the model's answer as JSON.
///
/// # Errors
/// [`CardReaderError::ResponseParse`] carrying the cleaned text when it is
/// not valid JSON.
pub fn parse_json_output(raw: &str) -> Result<Value, CardReaderError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(&cleaned).map_err(|_| CardReaderError::ResponseParse { raw: cleaned })
}

/// Clean a Markdown transcription: drop an outer fence and trim whitespace.
pub fn clean_transcription(raw: &str) -> String {
    strip_code_fence(raw)
}

// ── Tests ────────────────────────────────────────────────────────────────────
