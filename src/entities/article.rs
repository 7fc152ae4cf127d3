use serde::{Deserialize, Serialize};

/// Placeholder stored when efetch returns no abstract for a PMID. Distinct
/// from the empty string so callers can tell "absent" from "blank".
pub const NO_ABSTRACT: &str = "No abstract available.";

/// Placeholder author used when esummary returns no author list.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// One PubMed article, merged from the esummary and efetch responses.
/// Immutable after creation; a new search replaces the whole result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub pmid: String,
    pub title: String,
    pub authors: Vec<String>,
    pub journal: String,
    pub pub_date: String,
    pub abstract_text: String,
}

impl ArticleRecord {
    /// Whether the record carries real abstract text rather than the sentinel.
    pub fn has_abstract(&self) -> bool {
        !self.abstract_text.is_empty() && self.abstract_text != NO_ABSTRACT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(abstract_text: &str) -> ArticleRecord {
        ArticleRecord {
            pmid: "22663011".into(),
            title: "Test article".into(),
            authors: vec!["Doe J".into()],
            journal: "Nature".into(),
            pub_date: "2024 Jan".into(),
            abstract_text: abstract_text.into(),
        }
    }

    #[test]
    fn has_abstract_rejects_sentinel_and_empty() {
        assert!(record("Real abstract text.").has_abstract());
        assert!(!record(NO_ABSTRACT).has_abstract());
        assert!(!record("").has_abstract());
    }
}
