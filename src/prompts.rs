//! Prompt templates sent to the vision model.
//!
//! Both prompts are fixed text. The card schema in [`EXTRACT_PROMPT`] is the
//! only place the `extracted_info` contract is stated; the service itself
//! never re-validates the model's answer against it, so changing a key here
//! changes the API response shape.
//!
//! Operators can replace either prompt through
//! [`crate::config::ServiceConfig::extract_prompt`] and
//! [`crate::config::ServiceConfig::markdown_prompt`].

/// Prompt for `POST /extract`: structured business-card extraction.
pub const EXTRACT_PROMPT: &str = r#"
Extract all possible details from the business card image.

Return ONLY valid JSON in the EXACT structure below:

{
    "extracted_info": {
        "name": [],
        "email": [],
        "phone": [],
        "designation": "",
        "company_name": "",
        "website": "",
        "address": "",
        "additional_info": {
            "category": [],
            "other": []
        }
    }
}

Rules:
- name, email, phone, category, other → arrays (even if one item)
- "category" = business classification such as: fire safety, govt approved, certifications, etc.
- "other" = ANY additional text found on the card not part of the main fields.
- Do NOT add fields outside this structure.
- Missing values must be empty "" or empty [].
- Preserve original spellings and text.
"#;

/// Prompt for `POST /direct-markdown`: verbatim transcription as Markdown.
pub const MARKDOWN_PROMPT: &str = r#"
Extract ALL readable text from this image.

Return the output **ONLY in Markdown format**.

Rules:
- Keep the exact text as visible in the image
- Preserve line breaks
- No additional JSON
- No extra explanation
- Only return markdown text
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prompt_names_every_schema_key() {
        for key in [
            "extracted_info",
            "name",
            "email",
            "phone",
            "designation",
            "company_name",
            "website",
            "address",
            "additional_info",
            "category",
            "other",
        ] {
            assert!(
                EXTRACT_PROMPT.contains(&format!("\"{key}\"")),
                "missing key {key}"
            );
        }
    }

    #[test]
    fn markdown_prompt_forbids_json() {
        assert!(MARKDOWN_PROMPT.contains("No additional JSON"));
        assert!(MARKDOWN_PROMPT.contains("Preserve line breaks"));
    }
}
