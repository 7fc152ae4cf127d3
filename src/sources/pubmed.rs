use std::borrow::Cow;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::entities::article::ArticleRecord;
use crate::error::InsightError;
use crate::transform;

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const PUBMED_API: &str = "pubmed";
const EUTILS_BASE_ENV: &str = "PUBMED_INSIGHTS_EUTILS_BASE";

/// Fixed cap on esearch results per query.
pub const MAX_RESULTS: usize = 20;

/// Client for the three NCBI E-utilities endpoints used by a search:
/// esearch (ids), esummary (metadata), efetch (abstracts).
#[derive(Clone)]
pub struct PubMedClient {
    client: reqwest::Client,
    base: Cow<'static, str>,
}

impl PubMedClient {
    pub fn new() -> Result<Self, InsightError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            base: crate::sources::env_base(EUTILS_BASE, EUTILS_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, InsightError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            base: Cow::Owned(base),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, InsightError> {
        let resp = req.send().await.map_err(|err| InsightError::Network {
            api: PUBMED_API.to_string(),
            message: format!("Request failed: {err}"),
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            return Err(InsightError::Network {
                api: PUBMED_API.to_string(),
                message: format!("HTTP {status}: {}", crate::sources::body_excerpt(&body)),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, InsightError> {
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await.map_err(|err| InsightError::Network {
            api: PUBMED_API.to_string(),
            message: format!("Failed to read response body: {err}"),
        })?;
        serde_json::from_slice(&bytes).map_err(|source| InsightError::Network {
            api: PUBMED_API.to_string(),
            message: format!(
                "Invalid JSON response: {} ({source})",
                crate::sources::body_excerpt(&bytes)
            ),
        })
    }

    async fn get_text(&self, req: reqwest::RequestBuilder) -> Result<String, InsightError> {
        let resp = self.send(req).await?;
        resp.text().await.map_err(|err| InsightError::Network {
            api: PUBMED_API.to_string(),
            message: format!("Failed to read response body: {err}"),
        })
    }

    /// Runs the three-step search sequence and merges the responses into
    /// article records.
    ///
    /// Returns an empty vec when esearch matches nothing; the caller decides
    /// whether that is an error. Output order follows the esummary result-map
    /// iteration order, which is not guaranteed to match esearch rank order.
    pub async fn search(&self, query: &str) -> Result<Vec<ArticleRecord>, InsightError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InsightError::InvalidArgument("Query is required".into()));
        }

        let retmax = MAX_RESULTS.to_string();
        let search: ESearchResponse = self
            .get_json(self.client.get(self.endpoint("esearch.fcgi")).query(&[
                ("db", "pubmed"),
                ("term", query),
                ("retmode", "json"),
                ("retmax", retmax.as_str()),
            ]))
            .await?;
        let ids = search.esearchresult.map(|r| r.idlist).unwrap_or_default();
        debug!(query, count = ids.len(), "esearch matched ids");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let summary: ESummaryResponse = self
            .get_json(self.client.get(self.endpoint("esummary.fcgi")).query(&[
                ("db", "pubmed"),
                ("id", joined.as_str()),
                ("retmode", "json"),
            ]))
            .await?;

        let xml = self
            .get_text(self.client.get(self.endpoint("efetch.fcgi")).query(&[
                ("db", "pubmed"),
                ("id", joined.as_str()),
                ("retmode", "xml"),
            ]))
            .await?;
        let abstracts = transform::article::abstracts_from_efetch_xml(&xml);

        let mut out = Vec::new();
        for (key, value) in summary.result.unwrap_or_default() {
            if key == "uids" {
                continue;
            }
            match serde_json::from_value::<ESummaryDocSum>(value) {
                Ok(doc) => out.push(transform::article::from_docsum(doc, &abstracts)),
                Err(err) => warn!(pmid = key.as_str(), %err, "Skipping malformed docsum"),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ESummaryResponse {
    result: Option<serde_json::Map<String, serde_json::Value>>,
}

/// One entry of the esummary `result` map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ESummaryDocSum {
    pub uid: String,
    pub title: String,
    pub authors: Vec<ESummaryAuthor>,
    pub fulljournalname: String,
    pub pubdate: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ESummaryAuthor {
    pub name: String,
}
