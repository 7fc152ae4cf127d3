use std::borrow::Cow;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::entities::insight::{ExtractedInsight, GeneratedSummary};
use crate::error::InsightError;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_BASE_ENV: &str = "PUBMED_INSIGHTS_GEMINI_BASE";

/// Minimum and maximum number of abstracts accepted by `summarize`.
pub const SUMMARIZE_MIN: usize = 2;
pub const SUMMARIZE_MAX: usize = 5;

/// Lower randomness for single-abstract extraction than for multi-abstract
/// synthesis, to bias toward schema-conformant output.
const EXTRACT_TEMPERATURE: f32 = 0.2;
const SUMMARIZE_TEMPERATURE: f32 = 0.3;

/// Client for the Gemini `generateContent` endpoint, constrained to JSON
/// output through a declared response schema.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base: Cow<'static, str>,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, InsightError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            base: crate::sources::env_base(GEMINI_BASE, GEMINI_BASE_ENV),
            config,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, InsightError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            base: Cow::Owned(base),
            config: GeminiConfig::for_test("test-key"),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base.as_ref().trim_end_matches('/'),
            self.config.model
        )
    }

    /// Sends one structured-generation request and parses the returned text
    /// as `T`. Every transport, HTTP, or conformance failure is re-raised as
    /// a single `Generation` error; no partial result is ever returned.
    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: String,
        schema: serde_json::Value,
        temperature: f32,
    ) -> Result<T, InsightError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: schema,
                temperature,
            },
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| InsightError::Generation(format!("request failed: {err}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| InsightError::Generation(format!("failed to read response: {err}")))?;
        if !status.is_success() {
            return Err(InsightError::Generation(format!(
                "HTTP {status}: {}",
                crate::sources::body_excerpt(&bytes)
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes).map_err(|err| {
            InsightError::Generation(format!(
                "invalid response envelope: {} ({err})",
                crate::sources::body_excerpt(&bytes)
            ))
        })?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                InsightError::Generation("response contained no candidate text".into())
            })?;
        debug!(bytes = text.len(), "received structured generation output");

        serde_json::from_str(text.trim()).map_err(|err| {
            InsightError::Generation(format!("output did not match the declared schema: {err}"))
        })
    }

    /// Extracts a structured insight from a single abstract.
    pub async fn extract_insight(
        &self,
        abstract_text: &str,
    ) -> Result<ExtractedInsight, InsightError> {
        let prompt = format!(
            "You are an expert biomedical researcher. Analyze the following PubMed article \
             abstract and extract the specified information. Return the information in a valid \
             JSON object format that strictly adheres to the provided schema.\n\n\
             Abstract:\n---\n{abstract_text}\n---"
        );
        let insight: ExtractedInsight = self
            .generate(prompt, insight_response_schema(), EXTRACT_TEMPERATURE)
            .await?;
        insight.validate().map_err(InsightError::Generation)?;
        Ok(insight)
    }

    /// Synthesizes a cross-article summary over 2 to 5 abstracts.
    pub async fn summarize(&self, abstracts: &[String]) -> Result<GeneratedSummary, InsightError> {
        if abstracts.len() < SUMMARIZE_MIN || abstracts.len() > SUMMARIZE_MAX {
            return Err(InsightError::InvalidArgument(format!(
                "summarize requires {SUMMARIZE_MIN} to {SUMMARIZE_MAX} abstracts, got {}",
                abstracts.len()
            )));
        }

        let mut joined = String::new();
        for (index, text) in abstracts.iter().enumerate() {
            let _ = write!(joined, "Abstract {}:\n---\n{text}\n---\n\n", index + 1);
        }
        let prompt = format!(
            "You are an expert biomedical researcher. Analyze the following collection of PubMed \
             article abstracts on a similar topic. Synthesize the information to provide a \
             consolidated overview. Return the information in a valid JSON object format that \
             strictly adheres to the provided schema.\n\nAbstracts:\n{joined}"
        );
        let summary: GeneratedSummary = self
            .generate(prompt, summary_response_schema(), SUMMARIZE_TEMPERATURE)
            .await?;
        summary.validate().map_err(InsightError::Generation)?;
        Ok(summary)
    }
}

/// Response schema for single-abstract extraction. Kept as data rather than
/// types because the same description is transmitted to the remote service.
fn insight_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A concise, one-paragraph summary of the abstract."
            },
            "keyFindings": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "minItems": 2,
                "maxItems": 4,
                "description": "A list of 2-4 of the most important findings or results reported in the abstract."
            },
            "methodology": {
                "type": "STRING",
                "description": "A brief description of the primary methodology or experimental approach used."
            },
            "clinicalSignificance": {
                "type": "STRING",
                "description": "A sentence explaining the potential clinical significance or implications of the research."
            }
        },
        "required": ["summary", "keyFindings", "methodology", "clinicalSignificance"]
    })
}

/// Response schema for cross-abstract synthesis.
fn summary_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "overallSummary": {
                "type": "STRING",
                "description": "A high-level summary synthesizing the findings from all provided abstracts."
            },
            "commonThemes": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "minItems": 3,
                "maxItems": 5,
                "description": "A list of 3-5 common themes or recurring findings observed across the different abstracts."
            },
            "differingFindings": {
                "type": "STRING",
                "description": "A sentence or two noting any contradictory, differing, or unique findings. If none, state that the findings are consistent."
            }
        },
        "required": ["overallSummary", "commonThemes", "differingFindings"]
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
