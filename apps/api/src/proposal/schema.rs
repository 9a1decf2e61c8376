//! Output schema — the JSON shape the model must return, and the validation
//! that guards every `ProposalResult`.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm_client::strip_json_fences;
use crate::proposal::error::GenerationError;
use crate::proposal::prompts::{
    CLIENT_SUMMARY_DESCRIPTION, PROPOSAL_DRAFT_DESCRIPTION, SUGGESTED_SKILLS_DESCRIPTION,
};

/// A validated proposal. Only constructed through [`OutputSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProposalResult {
    pub client_summary: Vec<String>,
    pub proposal_draft: String,
    pub suggested_skills: Vec<String>,
}

/// Declarative descriptor of the required output.
///
/// `draft_words` is advisory: drafts outside it are logged, not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    pub summary_items: RangeInclusive<usize>,
    pub min_skills: usize,
    pub draft_words: RangeInclusive<usize>,
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self {
            summary_items: 2..=3,
            min_skills: 5,
            draft_words: 150..=250,
        }
    }
}

impl OutputSchema {
    /// The schema in the provider's `responseSchema` dialect.
    pub fn response_schema(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "clientSummary": {
                    "type": "ARRAY",
                    "description": CLIENT_SUMMARY_DESCRIPTION,
                    "items": { "type": "STRING" },
                    "minItems": self.summary_items.start(),
                    "maxItems": self.summary_items.end()
                },
                "proposalDraft": {
                    "type": "STRING",
                    "description": PROPOSAL_DRAFT_DESCRIPTION
                },
                "suggestedSkills": {
                    "type": "ARRAY",
                    "description": SUGGESTED_SKILLS_DESCRIPTION,
                    "items": { "type": "STRING" },
                    "minItems": self.min_skills
                }
            },
            "required": ["clientSummary", "proposalDraft", "suggestedSkills"],
            "propertyOrdering": ["clientSummary", "proposalDraft", "suggestedSkills"]
        })
    }

    /// Checks field set, types, and bounds. Nothing partial escapes on failure.
    pub fn validate(&self, payload: Value) -> Result<ProposalResult, GenerationError> {
        let result: ProposalResult = serde_json::from_value(payload)
            .map_err(|e| GenerationError::SchemaValidation(e.to_string()))?;

        if !self.summary_items.contains(&result.client_summary.len()) {
            return Err(GenerationError::SchemaValidation(format!(
                "clientSummary must have {}-{} items, got {}",
                self.summary_items.start(),
                self.summary_items.end(),
                result.client_summary.len()
            )));
        }
        if result.suggested_skills.len() < self.min_skills {
            return Err(GenerationError::SchemaValidation(format!(
                "suggestedSkills must have at least {} items, got {}",
                self.min_skills,
                result.suggested_skills.len()
            )));
        }
        if result.proposal_draft.trim().is_empty() {
            return Err(GenerationError::SchemaValidation(
                "proposalDraft must not be empty".to_string(),
            ));
        }
        if let Some(field) = first_blank_item(&result) {
            return Err(GenerationError::SchemaValidation(format!(
                "{field} must not contain blank entries"
            )));
        }

        let words = result.proposal_draft.split_whitespace().count();
        if !self.draft_words.contains(&words) {
            warn!(
                "proposalDraft has {} words (expected {}-{})",
                words,
                self.draft_words.start(),
                self.draft_words.end()
            );
        }

        Ok(result)
    }
}

fn first_blank_item(result: &ProposalResult) -> Option<&'static str> {
    let blank = |items: &[String]| items.iter().any(|s| s.trim().is_empty());
    if blank(&result.client_summary) {
        Some("clientSummary")
    } else if blank(&result.suggested_skills) {
        Some("suggestedSkills")
    } else {
        None
    }
}

/// Turns the model's text payload into a validated result.
///
/// Parsed once, then branched: an object with an `error` key is an embedded
/// service error; anything else must satisfy the schema.
pub fn decode_payload(text: &str, schema: &OutputSchema) -> Result<ProposalResult, GenerationError> {
    let value: Value = serde_json::from_str(strip_json_fences(text)).map_err(|e| {
        GenerationError::SchemaValidation(format!("payload is not valid JSON: {e}"))
    })?;

    if let Some(error) = value.get("error") {
        return Err(GenerationError::EmbeddedService(embedded_message(error)));
    }

    schema.validate(value)
}

fn embedded_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> Value {
        json!({
            "clientSummary": [
                "Build a Shopify storefront with custom theme",
                "Integrate Stripe subscriptions"
            ],
            "proposalDraft": "Hi there,\n\nI have shipped a dozen Shopify stores — including \"headless\" builds.",
            "suggestedSkills": ["Shopify", "Liquid", "JavaScript", "Stripe", "CSS"]
        })
    }

    #[test]
    fn test_valid_payload_round_trips_byte_identical() {
        let payload = valid_payload();
        let text = payload.to_string();

        let result = decode_payload(&text, &OutputSchema::default()).unwrap();

        assert_eq!(result.client_summary[0], payload["clientSummary"][0].as_str().unwrap());
        assert_eq!(result.client_summary[1], payload["clientSummary"][1].as_str().unwrap());
        assert_eq!(result.proposal_draft, payload["proposalDraft"].as_str().unwrap());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            payload,
            "serialized result must equal the input payload"
        );
    }

    #[test]
    fn test_missing_proposal_draft_is_schema_error() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("proposalDraft");

        let err = decode_payload(&payload.to_string(), &OutputSchema::default()).unwrap_err();
        match err {
            GenerationError::SchemaValidation(msg) => assert!(msg.contains("proposalDraft"), "{msg}"),
            other => panic!("expected SchemaValidation, got {other:?}"),
        }
    }

    #[test]
    fn test_embedded_error_object_is_surfaced() {
        let text = r#"{"error": {"message": "quota exceeded"}}"#;
        let err = decode_payload(text, &OutputSchema::default()).unwrap_err();
        assert_eq!(err, GenerationError::EmbeddedService("quota exceeded".to_string()));
    }

    #[test]
    fn test_embedded_error_string_is_surfaced() {
        let text = r#"{"error": "model overloaded"}"#;
        let err = decode_payload(text, &OutputSchema::default()).unwrap_err();
        assert_eq!(err, GenerationError::EmbeddedService("model overloaded".to_string()));
    }

    #[test]
    fn test_non_json_payload_is_schema_error() {
        let err = decode_payload("Sure! Here is your proposal:", &OutputSchema::default())
            .unwrap_err();
        assert!(matches!(err, GenerationError::SchemaValidation(_)));
    }

    #[test]
    fn test_fenced_payload_is_accepted() {
        let text = format!("```json\n{}\n```", valid_payload());
        assert!(decode_payload(&text, &OutputSchema::default()).is_ok());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut payload = valid_payload();
        payload["budget"] = json!("$500");
        let err = OutputSchema::default().validate(payload).unwrap_err();
        assert!(matches!(err, GenerationError::SchemaValidation(_)));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let mut payload = valid_payload();
        payload["suggestedSkills"] = json!("Shopify, Liquid");
        let err = OutputSchema::default().validate(payload).unwrap_err();
        assert!(matches!(err, GenerationError::SchemaValidation(_)));
    }

    #[test]
    fn test_summary_bounds_are_enforced() {
        for items in [json!(["only one"]), json!(["a", "b", "c", "d"])] {
            let mut payload = valid_payload();
            payload["clientSummary"] = items;
            let err = OutputSchema::default().validate(payload).unwrap_err();
            assert!(matches!(err, GenerationError::SchemaValidation(_)));
        }
    }

    #[test]
    fn test_too_few_skills_is_rejected() {
        let mut payload = valid_payload();
        payload["suggestedSkills"] = json!(["Shopify", "Liquid"]);
        let err = OutputSchema::default().validate(payload).unwrap_err();
        assert!(matches!(err, GenerationError::SchemaValidation(_)));
    }

    #[test]
    fn test_blank_entries_are_rejected() {
        let mut payload = valid_payload();
        payload["proposalDraft"] = json!("   ");
        assert!(OutputSchema::default().validate(payload).is_err());

        let mut payload = valid_payload();
        payload["suggestedSkills"] = json!(["Shopify", "", "JavaScript", "Stripe", "CSS"]);
        assert!(OutputSchema::default().validate(payload).is_err());
    }

    #[test]
    fn test_short_draft_is_accepted_with_warning() {
        // valid_payload's draft is far below 150 words
        assert!(OutputSchema::default().validate(valid_payload()).is_ok());
    }

    #[test]
    fn test_response_schema_lists_required_fields() {
        let schema = OutputSchema::default().response_schema();
        assert_eq!(
            schema["required"],
            json!(["clientSummary", "proposalDraft", "suggestedSkills"])
        );
        assert_eq!(schema["properties"]["clientSummary"]["maxItems"], json!(3));
        assert_eq!(schema["properties"]["suggestedSkills"]["minItems"], json!(5));
    }
}
