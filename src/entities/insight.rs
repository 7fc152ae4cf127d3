use serde::{Deserialize, Serialize};

/// Structured insight extracted from a single article abstract.
///
/// Field names are camelCase on the wire because the same shape is declared
/// to the Gemini API as its response schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInsight {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub methodology: String,
    pub clinical_significance: String,
}

impl ExtractedInsight {
    /// Checks the cardinality constraints the response schema declares.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.key_findings.len();
        if !(2..=4).contains(&n) {
            return Err(format!("model returned {n} key findings, expected 2-4"));
        }
        Ok(())
    }
}

/// Cross-article synthesis over up to 5 abstracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSummary {
    pub overall_summary: String,
    pub common_themes: Vec<String>,
    pub differing_findings: String,
}

impl GeneratedSummary {
    /// Checks the cardinality constraints the response schema declares.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.common_themes.len();
        if !(3..=5).contains(&n) {
            return Err(format!("model returned {n} common themes, expected 3-5"));
        }
        Ok(())
    }
}
