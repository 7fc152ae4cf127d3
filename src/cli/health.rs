use std::time::Instant;

use crate::error::InsightError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# PubMed Insights Health Check\n\n");
        out.push_str("| API | Status | Latency |\n");
        out.push_str("|-----|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} APIs healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

async fn check_one(api: &str, req: reqwest::RequestBuilder) -> HealthRow {
    let start = Instant::now();
    match req.send().await {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: api.to_string(),
                    status: "ok".into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: api.to_string(),
                    status: "error".into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: api.to_string(),
                status: "error".into(),
                latency: reason.into(),
            }
        }
    }
}

/// Runs connectivity checks for the two upstream APIs.
///
/// # Errors
///
/// Returns an error when the shared HTTP client cannot be created.
pub async fn check() -> Result<HealthReport, InsightError> {
    let client = crate::sources::http_client()?;

    let pubmed_req = client.get(
        "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?db=pubmed&term=cancer&retmode=json&retmax=1",
    );
    let pubmed = check_one("PubMed E-utilities", pubmed_req);

    let gemini = async {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                let req = client
                    .get("https://generativelanguage.googleapis.com/v1beta/models")
                    .header("x-goog-api-key", key.trim());
                check_one("Gemini", req).await
            }
            _ => HealthRow {
                api: "Gemini".into(),
                status: "error".into(),
                latency: "no API key".into(),
            },
        }
    };

    let (pubmed, gemini) = tokio::join!(pubmed, gemini);
    let rows = vec![pubmed, gemini];
    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    Ok(HealthReport {
        healthy,
        total: rows.len(),
        rows,
    })
}
