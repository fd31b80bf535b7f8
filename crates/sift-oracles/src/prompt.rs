//! Prompt and response-schema construction shared by the HTTP oracles.
//!
//! Every request carries the record ids so that responses can be correlated
//! by id rather than by position.

use serde_json::{Value, json};
use sift_abstraction::{AnnotationBatch, LabelVocabulary};

fn quoted_list(labels: &std::collections::BTreeSet<String>) -> String {
    labels.iter().map(|l| format!("\"{}\"", l)).collect::<Vec<_>>().join(",")
}

/// Builds the system instruction describing the label vocabulary.
pub fn system_instruction(vocabulary: &LabelVocabulary) -> String {
    let primary = quoted_list(&vocabulary.primary);
    let secondary = quoted_list(&vocabulary.secondary);

    format!(
        "You classify mobile-banking user reviews using TWO orthogonal labels.\n\
         Output strictly as a JSON array of objects, each with ONLY these keys:\n\
         {{\"record_id\": <the id given in the input>, \"primary_category\": <one of [{primary}]>, \
         \"secondary_categories\": <array of zero or more of [{secondary}]>}}\n\
         Do NOT include text, explanations, or extra fields.\n\n\
         Decision rules:\n\
         1) Primary is the NATURE of feedback (Why). Pick exactly ONE.\n\
         \x20  Severity priority when mixed: BUG > UI/UX > PERFORMANCE > FEATURE_REQUEST.\n\
         2) Secondary is the FEATURE AREA (What/Where).\n\
         3) Primary and secondary are independent; a primary value never repeats as a secondary.\n\
         4) If ambiguous, use INVALID (primary) and GENERAL (secondary) when those labels exist.\n\
         5) Answer every record exactly once and copy its record_id verbatim."
    )
}

/// Builds the user prompt carrying the batch payload.
pub fn user_prompt(batch: &AnnotationBatch) -> String {
    let reviews: Vec<Value> = batch
        .records
        .iter()
        .map(|record| json!({ "record_id": record.id.as_str(), "text": record.text }))
        .collect();
    let payload = json!({ "reviews": reviews });

    format!(
        "Classify the following reviews.\n\
         Return ONLY the JSON array of objects with keys {{record_id, primary_category, secondary_categories}} as per schema.\n\
         Input:\n{}",
        payload
    )
}

/// Builds a Gemini `responseSchema` constraining the output to the vocabulary.
pub fn response_schema(vocabulary: &LabelVocabulary) -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "record_id": { "type": "STRING" },
                "primary_category": {
                    "type": "STRING",
                    "enum": vocabulary.primary.iter().collect::<Vec<_>>(),
                },
                "secondary_categories": {
                    "type": "ARRAY",
                    "items": {
                        "type": "STRING",
                        "enum": vocabulary.secondary.iter().collect::<Vec<_>>(),
                    },
                },
            },
            "required": ["record_id", "primary_category", "secondary_categories"],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sift_abstraction::{RecordId, SourcePlatform, UnlabeledRecord};

    fn vocabulary() -> LabelVocabulary {
        LabelVocabulary::split(["BUG", "POSITIVE"], ["ACCOUNT", "GENERAL"])
    }

    #[test]
    fn test_system_instruction_lists_vocabulary() {
        let text = system_instruction(&vocabulary());
        assert!(text.contains(r#""BUG","POSITIVE""#));
        assert!(text.contains(r#""ACCOUNT","GENERAL""#));
        assert!(text.contains("record_id"));
    }

    #[test]
    fn test_user_prompt_carries_ids() {
        let batch = AnnotationBatch {
            batch_id: "r1-b0".to_string(),
            round: 1,
            records: vec![UnlabeledRecord {
                id: RecordId::from("gp-42"),
                source_platform: SourcePlatform::GooglePlay,
                text: "無法登入".to_string(),
                rating: 1,
                submitted_at: Utc::now(),
            }],
        };

        let prompt = user_prompt(&batch);
        assert!(prompt.contains(r#""record_id":"gp-42""#));
        assert!(prompt.contains("無法登入"));
    }

    #[test]
    fn test_response_schema_enums() {
        let schema = response_schema(&vocabulary());
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["properties"]["primary_category"]["enum"], json!(["BUG", "POSITIVE"]));
        assert_eq!(
            schema["items"]["properties"]["secondary_categories"]["items"]["enum"],
            json!(["ACCOUNT", "GENERAL"])
        );
        assert_eq!(schema["items"]["required"][0], "record_id");
    }
}
