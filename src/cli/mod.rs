//! Top-level CLI parsing and command execution.

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::config::GeminiConfig;
use crate::error::InsightError;
use crate::session::Session;
use crate::sources::gemini::GeminiClient;
use crate::sources::pubmed::PubMedClient;

pub mod health;
pub mod render;

#[derive(Parser, Debug)]
#[command(
    name = "pubmed-insights",
    about = "Search PubMed and extract AI-generated insights from article abstracts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON instead of Markdown
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search PubMed for articles matching a query
    Search {
        /// Free-text query, e.g. "BRAF melanoma vemurafenib"
        query: String,
    },
    /// Search, then extract a structured insight from one result's abstract
    Insight {
        query: String,
        /// 1-based position of the article in the search results
        #[arg(short, long, default_value = "1")]
        pick: usize,
    },
    /// Search, then synthesize a cross-article summary of the top results
    Summarize { query: String },
    /// Check external API connectivity
    Health,
}

fn build_session() -> anyhow::Result<Session<PubMedClient, GeminiClient>> {
    // The Gemini credential is process-wide configuration: a missing key is
    // fatal at startup, before any command runs.
    let config = GeminiConfig::from_env()?;
    Ok(Session::new(
        PubMedClient::new()?,
        GeminiClient::new(config)?,
    ))
}

/// Bails with the session's user-visible error message, if one is set.
fn check_session_error(error: &Option<String>) -> anyhow::Result<()> {
    if let Some(message) = error {
        bail!("{message}");
    }
    Ok(())
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Search { query } => {
            let mut session = build_session()?;
            session.search(&query).await;
            let state = session.state();
            check_session_error(&state.error)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&state.articles)?);
            } else {
                print!("{}", render::articles_markdown(&state.articles));
            }
        }
        Commands::Insight { query, pick } => {
            let mut session = build_session()?;
            session.search(&query).await;
            check_session_error(&session.state().error)?;

            let count = session.state().articles.len();
            let article = session
                .state()
                .articles
                .get(pick.checked_sub(1).unwrap_or(usize::MAX))
                .cloned()
                .ok_or_else(|| {
                    InsightError::InvalidArgument(format!(
                        "--pick must be between 1 and {count}"
                    ))
                })?;
            session.select_article(&article).await;

            let state = session.state();
            check_session_error(&state.error)?;
            let insight = state
                .insight
                .as_ref()
                .ok_or_else(|| InsightError::Generation("no insight produced".into()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(insight)?);
            } else {
                print!("{}", render::detail_markdown(&article, insight));
            }
        }
        Commands::Summarize { query } => {
            let mut session = build_session()?;
            session.search(&query).await;
            check_session_error(&session.state().error)?;

            session.summarize_top().await;
            let state = session.state();
            check_session_error(&state.error)?;
            let summary = state
                .summary
                .as_ref()
                .ok_or_else(|| InsightError::Generation("no summary produced".into()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(summary)?);
            } else {
                print!("{}", render::summary_markdown(summary));
            }
        }
        Commands::Health => {
            let report = health::check().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.to_markdown());
            }
            if !report.all_healthy() {
                bail!("one or more upstream APIs are unreachable");
            }
        }
    }
    Ok(())
}
