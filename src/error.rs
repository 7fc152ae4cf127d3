use thiserror::Error;

/// Error taxonomy for the whole crate.
///
/// Everything crossing the session boundary is flattened into a single
/// user-visible message via `Display`; nothing is retried.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// Transport failure, non-2xx status, or an unparseable payload from an
    /// upstream API.
    #[error("{api} error: {message}")]
    Network { api: String, message: String },

    /// Zero matches for a query. Informational, not fatal.
    #[error("No articles found for your query.")]
    EmptyResults,

    /// Local precondition failure, detected before any network call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The generative AI call failed or returned output that does not
    /// conform to the declared response schema.
    #[error("Insight generation failed: {0}")]
    Generation(String),

    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingApiKey,
}
