//! View-state orchestration over the two client adapters.
//!
//! A `Session` owns the sole mutable `SessionState` and sequences at most one
//! outstanding client call at a time. Each dispatched operation carries a
//! `Ticket`; a finishing operation whose ticket is no longer current is
//! ignored, so a stale response can never overwrite newer state. The
//! `begin_*`/`finish_*` pairs are synchronous state transitions; the async
//! action methods compose them around the single client call.

use async_trait::async_trait;

use crate::entities::article::ArticleRecord;
use crate::entities::insight::{ExtractedInsight, GeneratedSummary};
use crate::error::InsightError;
use crate::sources::gemini::{GeminiClient, SUMMARIZE_MAX, SUMMARIZE_MIN};
use crate::sources::pubmed::PubMedClient;
use tracing::debug;

/// Seam between the session and the literature search backend.
#[async_trait]
pub trait LiteratureSearch {
    async fn search(&self, query: &str) -> Result<Vec<ArticleRecord>, InsightError>;
}

/// Seam between the session and the generative backend.
#[async_trait]
pub trait InsightGeneration {
    async fn extract_insight(&self, abstract_text: &str)
    -> Result<ExtractedInsight, InsightError>;
    async fn summarize(&self, abstracts: &[String]) -> Result<GeneratedSummary, InsightError>;
}

#[async_trait]
impl LiteratureSearch for PubMedClient {
    async fn search(&self, query: &str) -> Result<Vec<ArticleRecord>, InsightError> {
        PubMedClient::search(self, query).await
    }
}

#[async_trait]
impl InsightGeneration for GeminiClient {
    async fn extract_insight(
        &self,
        abstract_text: &str,
    ) -> Result<ExtractedInsight, InsightError> {
        GeminiClient::extract_insight(self, abstract_text).await
    }

    async fn summarize(&self, abstracts: &[String]) -> Result<GeneratedSummary, InsightError> {
        GeminiClient::summarize(self, abstracts).await
    }
}

/// Which operation is currently in flight, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loading {
    #[default]
    Idle,
    Search,
    Extract,
    Summarize,
}

/// The three mutually exclusive result views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Idle,
    Article,
    Summary,
}

/// UI-session state. At most one of {selected-with-insight, summary} is
/// populated at any time.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub articles: Vec<ArticleRecord>,
    pub selected: Option<ArticleRecord>,
    pub insight: Option<ExtractedInsight>,
    pub summary: Option<GeneratedSummary>,
    pub loading: Loading,
    pub error: Option<String>,
}

impl SessionState {
    pub fn focus(&self) -> Focus {
        if self.summary.is_some() {
            Focus::Summary
        } else if self.selected.is_some() {
            Focus::Article
        } else {
            Focus::Idle
        }
    }
}

/// Tag for one dispatched operation. Finishing with a ticket that is no
/// longer current is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

pub struct Session<L, I> {
    state: SessionState,
    literature: L,
    insights: I,
    next_ticket: u64,
    current: Option<Ticket>,
}

impl<L: LiteratureSearch, I: InsightGeneration> Session<L, I> {
    pub fn new(literature: L, insights: I) -> Self {
        Self {
            state: SessionState::default(),
            literature,
            insights,
            next_ticket: 0,
            current: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.current = Some(ticket);
        ticket
    }

    fn take_if_current(&mut self, ticket: Ticket) -> bool {
        if self.current == Some(ticket) {
            self.current = None;
            true
        } else {
            debug!(?ticket, "dropping stale operation result");
            false
        }
    }

    /// Searches the literature database and replaces the result list.
    pub async fn search(&mut self, query: &str) {
        let Some(ticket) = self.begin_search(query) else {
            return;
        };
        let result = self.literature.search(query).await;
        self.finish_search(ticket, result);
    }

    /// Enters search-loading state. Returns `None` for a blank query, which
    /// is a no-op.
    pub fn begin_search(&mut self, query: &str) -> Option<Ticket> {
        if query.trim().is_empty() {
            return None;
        }
        self.state.loading = Loading::Search;
        self.state.error = None;
        self.state.selected = None;
        self.state.insight = None;
        self.state.summary = None;
        Some(self.issue_ticket())
    }

    pub fn finish_search(&mut self, ticket: Ticket, result: Result<Vec<ArticleRecord>, InsightError>) {
        if !self.take_if_current(ticket) {
            return;
        }
        self.state.loading = Loading::Idle;
        match result {
            Ok(articles) => {
                if articles.is_empty() {
                    self.state.error = Some(InsightError::EmptyResults.to_string());
                }
                self.state.articles = articles;
            }
            Err(err) => {
                self.state.error = Some(format!("Failed to fetch articles. {err}"));
            }
        }
    }

    /// Selects an article and requests an insight for its abstract.
    pub async fn select_article(&mut self, article: &ArticleRecord) {
        let Some(ticket) = self.begin_select(article) else {
            return;
        };
        let result = self.insights.extract_insight(&article.abstract_text).await;
        self.finish_select(ticket, result);
    }

    /// Moves to article focus. Returns `None` when the article has no
    /// abstract: the insight call is short-circuited with a local validation
    /// error and nothing is dispatched.
    pub fn begin_select(&mut self, article: &ArticleRecord) -> Option<Ticket> {
        self.current = None;
        self.state.selected = Some(article.clone());
        self.state.summary = None;
        self.state.insight = None;
        self.state.error = None;
        if !article.has_abstract() {
            self.state.loading = Loading::Idle;
            self.state.error = Some("This article does not have an abstract to analyze.".into());
            return None;
        }
        self.state.loading = Loading::Extract;
        Some(self.issue_ticket())
    }

    pub fn finish_select(&mut self, ticket: Ticket, result: Result<ExtractedInsight, InsightError>) {
        if !self.take_if_current(ticket) {
            return;
        }
        self.state.loading = Loading::Idle;
        match result {
            Ok(insight) => self.state.insight = Some(insight),
            Err(err) => {
                self.state.error =
                    Some(format!("Failed to extract insights from the abstract. {err}"));
            }
        }
    }

    /// Summarizes the top results (first 5, skipping articles without an
    /// abstract).
    pub async fn summarize_top(&mut self) {
        let Some((ticket, abstracts)) = self.begin_summarize() else {
            return;
        };
        let result = self.insights.summarize(&abstracts).await;
        self.finish_summarize(ticket, result);
    }

    /// Moves to summary focus. Returns `None` when the preconditions fail
    /// (fewer than 2 results, or fewer than 2 usable abstracts among the
    /// first 5); the validation error is surfaced without dispatching.
    pub fn begin_summarize(&mut self) -> Option<(Ticket, Vec<String>)> {
        if self.state.articles.len() < 2 {
            self.state.error = Some("Summarizing requires at least 2 search results.".into());
            return None;
        }
        self.current = None;
        self.state.selected = None;
        self.state.insight = None;
        self.state.summary = None;
        self.state.error = None;

        let abstracts: Vec<String> = self
            .state
            .articles
            .iter()
            .take(SUMMARIZE_MAX)
            .filter(|a| a.has_abstract())
            .map(|a| a.abstract_text.clone())
            .collect();
        if abstracts.len() < SUMMARIZE_MIN {
            self.state.loading = Loading::Idle;
            self.state.error =
                Some("Not enough articles with abstracts available to generate a summary.".into());
            return None;
        }
        self.state.loading = Loading::Summarize;
        Some((self.issue_ticket(), abstracts))
    }

    pub fn finish_summarize(
        &mut self,
        ticket: Ticket,
        result: Result<GeneratedSummary, InsightError>,
    ) {
        if !self.take_if_current(ticket) {
            return;
        }
        self.state.loading = Loading::Idle;
        match result {
            Ok(summary) => self.state.summary = Some(summary),
            Err(err) => {
                self.state.error = Some(format!("Failed to generate summary. {err}"));
            }
        }
    }

    /// Drops the selection and its insight, returning to the idle view.
    /// Any in-flight extraction result is discarded when it arrives.
    pub fn clear_selection(&mut self) {
        self.current = None;
        self.state.selected = None;
        self.state.insight = None;
        self.state.loading = Loading::Idle;
    }

    /// Drops the summary, returning to the idle view.
    pub fn clear_summary(&mut self) {
        self.current = None;
        self.state.summary = None;
        self.state.loading = Loading::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::article::NO_ABSTRACT;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn article(pmid: &str, abstract_text: &str) -> ArticleRecord {
        ArticleRecord {
            pmid: pmid.into(),
            title: format!("Article {pmid}"),
            authors: vec!["Doe J".into()],
            journal: "Journal".into(),
            pub_date: "2024".into(),
            abstract_text: abstract_text.into(),
        }
    }

    fn insight(tag: &str) -> ExtractedInsight {
        ExtractedInsight {
            summary: tag.into(),
            key_findings: vec!["a".into(), "b".into()],
            methodology: "m".into(),
            clinical_significance: "c".into(),
        }
    }

    fn summary() -> GeneratedSummary {
        GeneratedSummary {
            overall_summary: "overall".into(),
            common_themes: vec!["t1".into(), "t2".into(), "t3".into()],
            differing_findings: "none".into(),
        }
    }

    #[derive(Clone, Default)]
    struct MockLiterature {
        results: Vec<ArticleRecord>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LiteratureSearch for MockLiterature {
        async fn search(&self, _query: &str) -> Result<Vec<ArticleRecord>, InsightError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InsightError::Network {
                    api: "pubmed".into(),
                    message: "HTTP 503".into(),
                });
            }
            Ok(self.results.clone())
        }
    }

    #[derive(Clone, Default)]
    struct MockInsights {
        extract_calls: Arc<AtomicUsize>,
        summarize_args: Arc<Mutex<Vec<Vec<String>>>>,
        fail: bool,
    }

    #[async_trait]
    impl InsightGeneration for MockInsights {
        async fn extract_insight(
            &self,
            abstract_text: &str,
        ) -> Result<ExtractedInsight, InsightError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InsightError::Generation("model unavailable".into()));
            }
            Ok(insight(abstract_text))
        }

        async fn summarize(&self, abstracts: &[String]) -> Result<GeneratedSummary, InsightError> {
            self.summarize_args.lock().unwrap().push(abstracts.to_vec());
            if self.fail {
                return Err(InsightError::Generation("model unavailable".into()));
            }
            Ok(summary())
        }
    }

    fn session(
        results: Vec<ArticleRecord>,
    ) -> (Session<MockLiterature, MockInsights>, MockLiterature, MockInsights) {
        let literature = MockLiterature {
            results,
            ..Default::default()
        };
        let insights = MockInsights::default();
        (
            Session::new(literature.clone(), insights.clone()),
            literature,
            insights,
        )
    }

    #[tokio::test]
    async fn search_populates_results_and_clears_prior_views() {
        let (mut s, _, _) = session(vec![article("1", "x"), article("2", "y")]);
        s.state.summary = Some(summary());
        s.state.error = Some("old".into());

        s.search("braf melanoma").await;
        let state = s.state();
        assert_eq!(state.articles.len(), 2);
        assert!(state.summary.is_none());
        assert!(state.error.is_none());
        assert_eq!(state.loading, Loading::Idle);
        assert_eq!(state.focus(), Focus::Idle);
    }

    #[tokio::test]
    async fn search_with_blank_query_is_a_no_op() {
        let (mut s, literature, _) = session(vec![article("1", "x")]);
        s.search("   ").await;
        assert_eq!(literature.calls.load(Ordering::SeqCst), 0);
        assert!(s.state().articles.is_empty());
    }

    #[tokio::test]
    async fn search_with_zero_matches_surfaces_informational_error() {
        let (mut s, _, _) = session(Vec::new());
        s.search("no such thing").await;
        assert_eq!(
            s.state().error.as_deref(),
            Some("No articles found for your query.")
        );
        assert!(s.state().articles.is_empty());
    }

    #[tokio::test]
    async fn search_failure_surfaces_network_error() {
        let literature = MockLiterature {
            fail: true,
            ..Default::default()
        };
        let mut s = Session::new(literature, MockInsights::default());
        s.search("braf").await;
        let error = s.state().error.as_deref().unwrap();
        assert!(error.starts_with("Failed to fetch articles."));
        assert_eq!(s.state().loading, Loading::Idle);
    }

    #[tokio::test]
    async fn selecting_article_without_abstract_never_calls_the_client() {
        let (mut s, _, insights) = session(vec![article("1", NO_ABSTRACT)]);
        s.search("q").await;
        let picked = s.state().articles[0].clone();

        s.select_article(&picked).await;
        assert_eq!(insights.extract_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            s.state().error.as_deref(),
            Some("This article does not have an abstract to analyze.")
        );
        assert!(s.state().insight.is_none());
        assert_eq!(s.state().focus(), Focus::Article);
    }

    #[tokio::test]
    async fn selecting_article_populates_insight_and_clears_summary() {
        let (mut s, _, insights) = session(vec![article("1", "real text"), article("2", "more")]);
        s.search("q").await;
        s.summarize_top().await;
        assert_eq!(s.state().focus(), Focus::Summary);

        let picked = s.state().articles[0].clone();
        s.select_article(&picked).await;
        assert_eq!(insights.extract_calls.load(Ordering::SeqCst), 1);
        assert!(s.state().summary.is_none());
        assert_eq!(s.state().focus(), Focus::Article);
        assert_eq!(s.state().insight.as_ref().unwrap().summary, "real text");
    }

    #[tokio::test]
    async fn extraction_failure_surfaces_error_and_clears_loading() {
        let insights = MockInsights {
            fail: true,
            ..Default::default()
        };
        let mut s = Session::new(
            MockLiterature {
                results: vec![article("1", "x")],
                ..Default::default()
            },
            insights,
        );
        s.search("q").await;
        let picked = s.state().articles[0].clone();
        s.select_article(&picked).await;

        let error = s.state().error.as_deref().unwrap();
        assert!(error.starts_with("Failed to extract insights from the abstract."));
        assert!(error.contains("model unavailable"));
        assert_eq!(s.state().loading, Loading::Idle);
        assert!(s.state().insight.is_none());
    }

    #[tokio::test]
    async fn summarize_requires_two_usable_abstracts() {
        let (mut s, _, insights) = session(vec![article("A", "x"), article("B", NO_ABSTRACT)]);
        s.search("q").await;
        s.summarize_top().await;

        assert!(insights.summarize_args.lock().unwrap().is_empty());
        assert_eq!(
            s.state().error.as_deref(),
            Some("Not enough articles with abstracts available to generate a summary.")
        );
        assert!(s.state().summary.is_none());
    }

    #[tokio::test]
    async fn summarize_requires_more_than_one_result() {
        let (mut s, _, insights) = session(vec![article("A", "x")]);
        s.search("q").await;
        s.summarize_top().await;

        assert!(insights.summarize_args.lock().unwrap().is_empty());
        assert_eq!(
            s.state().error.as_deref(),
            Some("Summarizing requires at least 2 search results.")
        );
    }

    #[tokio::test]
    async fn summarize_sends_usable_abstracts_from_first_five_in_order() {
        let (mut s, _, insights) = session(vec![
            article("1", "first"),
            article("2", NO_ABSTRACT),
            article("3", "third"),
            article("4", NO_ABSTRACT),
            article("5", "fifth"),
            article("6", "beyond the window"),
        ]);
        s.search("q").await;
        s.select_article(&s.state().articles[0].clone()).await;
        s.summarize_top().await;

        let calls = insights.summarize_args.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["first".to_string(), "third".to_string(), "fifth".to_string()]
        );
        drop(calls);

        // Summary focus dropped the selection and its insight.
        assert!(s.state().selected.is_none());
        assert!(s.state().insight.is_none());
        assert!(s.state().summary.is_some());
        assert_eq!(s.state().focus(), Focus::Summary);
    }

    #[tokio::test]
    async fn stale_insight_result_never_overwrites_newer_selection() {
        let (mut s, _, _) = session(vec![article("X", "abstract x"), article("Y", "abstract y")]);
        s.search("q").await;
        let x = s.state().articles[0].clone();
        let y = s.state().articles[1].clone();

        // Dispatch for X, then for Y before X resolves.
        let ticket_x = s.begin_select(&x).unwrap();
        let ticket_y = s.begin_select(&y).unwrap();

        // X resolves late: ignored. Y resolves: applied.
        s.finish_select(ticket_x, Ok(insight("for X")));
        assert!(s.state().insight.is_none());
        assert_eq!(s.state().loading, Loading::Extract);

        s.finish_select(ticket_y, Ok(insight("for Y")));
        assert_eq!(s.state().insight.as_ref().unwrap().summary, "for Y");
        assert_eq!(s.state().selected.as_ref().unwrap().pmid, "Y");
        assert_eq!(s.state().loading, Loading::Idle);
    }

    #[tokio::test]
    async fn clearing_selection_discards_in_flight_extraction() {
        let (mut s, _, _) = session(vec![article("X", "abstract x"), article("Y", "y")]);
        s.search("q").await;
        let x = s.state().articles[0].clone();

        let ticket = s.begin_select(&x).unwrap();
        s.clear_selection();
        s.finish_select(ticket, Ok(insight("late")));

        assert_eq!(s.state().focus(), Focus::Idle);
        assert!(s.state().insight.is_none());
        assert!(s.state().selected.is_none());
    }

    #[tokio::test]
    async fn clear_actions_return_to_idle() {
        let (mut s, _, _) = session(vec![article("1", "x"), article("2", "y")]);
        s.search("q").await;

        s.select_article(&s.state().articles[0].clone()).await;
        assert_eq!(s.state().focus(), Focus::Article);
        s.clear_selection();
        assert_eq!(s.state().focus(), Focus::Idle);
        assert!(s.state().selected.is_none() && s.state().insight.is_none());

        s.summarize_top().await;
        assert_eq!(s.state().focus(), Focus::Summary);
        s.clear_summary();
        assert_eq!(s.state().focus(), Focus::Idle);
        assert!(s.state().summary.is_none());
    }

    #[tokio::test]
    async fn selection_and_summary_are_never_both_populated() {
        let (mut s, _, _) = session(vec![article("1", "x"), article("2", "y")]);
        s.search("q").await;

        s.select_article(&s.state().articles[0].clone()).await;
        s.summarize_top().await;
        assert!(!(s.state().selected.is_some() && s.state().summary.is_some()));

        s.select_article(&s.state().articles[1].clone()).await;
        assert!(!(s.state().selected.is_some() && s.state().summary.is_some()));
    }
}
