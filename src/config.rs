use crate::error::InsightError;

const API_KEY_ENV: &str = "GEMINI_API_KEY";
const MODEL_ENV: &str = "GEMINI_MODEL";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Process-wide Gemini configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    /// Reads the credential and model from the environment. A missing or
    /// blank `GEMINI_API_KEY` is a fatal startup error.
    pub fn from_env() -> Result<Self, InsightError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(InsightError::MissingApiKey)?;
        let model = std::env::var(MODEL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self { api_key, model })
    }

    #[cfg(test)]
    pub(crate) fn for_test(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}
