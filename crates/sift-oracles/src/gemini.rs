//! Google Gemini oracle implementation.
//!
//! This module provides an implementation of the `LabelOracle` trait backed by
//! Gemini's `generateContent` endpoint with a JSON response schema.

use crate::coerce::{LabelAliases, parse_candidates};
use crate::{fault_from_status, prompt};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sift_abstraction::{AnnotationBatch, LabelCandidate, LabelOracle, LabelVocabulary, OracleFault};
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Google Gemini oracle.
#[derive(Debug, Clone)]
pub struct GeminiOracle {
    /// The model ID (e.g., "gemini-2.5-flash").
    model_id: String,
    /// Identifier used in logs, `gemini:<model>`.
    oracle_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Gemini API.
    base_url: String,
    /// Allowed labels, rendered into the prompt and the response schema.
    vocabulary: LabelVocabulary,
    /// Spelling corrections applied to the response.
    aliases: LabelAliases,
    temperature: f32,
    max_output_tokens: u32,
    /// HTTP client for making requests.
    client: Client,
}

impl GeminiOracle {
    /// Creates a new `GeminiOracle` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String, vocabulary: LabelVocabulary) -> Self {
        Self {
            oracle_id: format!("gemini:{}", model_id),
            model_id,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            vocabulary,
            aliases: LabelAliases::default(),
            temperature: 0.1,
            max_output_tokens: 60_000,
            client: Client::new(),
        }
    }

    /// Points the oracle at a different endpoint (used by tests and proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the alias table applied to responses.
    #[must_use]
    pub fn with_aliases(mut self, aliases: LabelAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Overrides the sampling temperature and output token budget.
    #[must_use]
    pub fn with_generation(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    fn build_request(&self, batch: &AnnotationBatch) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt::user_prompt(batch) }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: prompt::system_instruction(&self.vocabulary) }],
            },
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                top_p: 0.9,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: "application/json".to_string(),
                response_schema: prompt::response_schema(&self.vocabulary),
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| GeminiSafetySetting {
                    category: (*category).to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LabelOracle for GeminiOracle {
    async fn annotate(&self, batch: &AnnotationBatch) -> Result<Vec<LabelCandidate>, OracleFault> {
        debug!(
            model_id = %self.model_id,
            batch_id = %batch.batch_id,
            records = batch.len(),
            "GeminiOracle labeling batch"
        );

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);
        let request_body = self.build_request(batch);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, batch_id = %batch.batch_id, "Failed to send request to Gemini API");
                OracleFault::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                batch_id = %batch.batch_id,
                "Gemini API returned error status"
            );
            return Err(fault_from_status("gemini", status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini API response");
            OracleFault::MalformedResponse(format!("Failed to parse response: {}", e))
        })?;

        let candidate = gemini_response.candidates.first().ok_or_else(|| {
            error!(batch_id = %batch.batch_id, "No candidates in Gemini API response");
            OracleFault::MalformedResponse("No candidates in API response".to_string())
        })?;

        if let Some(reason) = &candidate.finish_reason {
            debug!(batch_id = %batch.batch_id, finish_reason = %reason, "Gemini finished");
        }

        let text: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        parse_candidates(&text, batch, &self.aliases)
    }

    fn oracle_id(&self) -> &str {
        &self.oracle_id
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}
