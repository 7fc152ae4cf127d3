//! Thin HTTP client adapters for the two upstream services.

use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::InsightError;

pub mod gemini;
pub mod pubmed;

/// Shared HTTP client. No request timeout is set: callers wait until the
/// transport itself fails (see SessionState docs on in-flight handling).
pub(crate) fn http_client() -> Result<reqwest::Client, InsightError> {
    static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("pubmed-insights/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(InsightError::HttpClientInit)?;

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| InsightError::Network {
                api: "http".into(),
                message: "HTTP client initialization race".into(),
            }),
    }
}

/// Base URL for an API, overridable through an environment variable so tests
/// and proxies can point the client elsewhere.
pub(crate) fn env_base(default: &'static str, env: &str) -> Cow<'static, str> {
    match std::env::var(env) {
        Ok(value) if !value.trim().is_empty() => Cow::Owned(value.trim().to_string()),
        _ => Cow::Borrowed(default),
    }
}

/// Short lossy excerpt of a response body, for error messages.
pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    const MAX_EXCERPT: usize = 200;
    let text = String::from_utf8_lossy(bytes);
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() <= MAX_EXCERPT {
        collapsed
    } else {
        let mut cut = MAX_EXCERPT;
        while !collapsed.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &collapsed[..cut])
    }
}
