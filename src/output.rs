//! Response types: the business-card schema and the service's own JSON bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level object the extraction prompt asks the model to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardExtraction {
    #[serde(default)]
    pub extracted_info: ExtractedCard,
}

/// Fields read off a business card.
///
/// Every field defaults to empty so a partially-filled model answer still
/// converts. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedCard {
    pub name: Vec<String>,
    pub email: Vec<String>,
    pub phone: Vec<String>,
    pub designation: String,
    pub company_name: String,
    pub website: String,
    pub address: String,
    pub additional_info: AdditionalInfo,
}

/// Card text that does not belong to one of the main fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalInfo {
    pub category: Vec<String>,
    pub other: Vec<String>,
}

impl CardExtraction {
    /// Lenient conversion from the model's parsed JSON.
    ///
    /// Returns `None` when the value's field types disagree with the schema
    /// (e.g. `name` is a string rather than an array).
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl ExtractedCard {
    /// `true` when the model found nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == ExtractedCard::default()
    }
}

/// Body of `POST /direct-markdown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownResponse {
    pub markdown: String,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub code: u16,
}

impl Default for StatusResponse {
    fn default() -> Self {
        Self {
            status: "API is working".to_string(),
            service: "extractor".to_string(),
            code: 200,
        }
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub environment: String,
    pub docs_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_card_fills_defaults() {
        let v = json!({"extracted_info": {"name": ["A"], "website": "a.example"}});
        let card = CardExtraction::from_value(&v).unwrap().extracted_info;
        assert_eq!(card.name, vec!["A"]);
        assert_eq!(card.website, "a.example");
        assert!(card.email.is_empty());
        assert!(card.additional_info.other.is_empty());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let v = json!({"extracted_info": {"name": "not-an-array"}});
        assert!(CardExtraction::from_value(&v).is_none());
    }

    #[test]
    fn empty_card() {
        let card = CardExtraction::from_value(&json!({})).unwrap();
        assert!(card.extracted_info.is_empty());
    }

    #[test]
    fn status_body_is_fixed() {
        let v = serde_json::to_value(StatusResponse::default()).unwrap();
        assert_eq!(
            v,
            json!({"status": "API is working", "service": "extractor", "code": 200})
        );
    }
}
