//! Markdown rendering for the three result views.

use std::fmt::Write as _;

use crate::entities::article::ArticleRecord;
use crate::entities::insight::{ExtractedInsight, GeneratedSummary};

pub fn articles_markdown(articles: &[ArticleRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Search Results ({})\n", articles.len());
    for (index, article) in articles.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**", index + 1, article.title);
        let _ = writeln!(
            out,
            "   {} — {} ({}) [PMID: {}]",
            article.authors.join(", "),
            article.journal,
            article.pub_date,
            article.pmid
        );
        if !article.has_abstract() {
            let _ = writeln!(out, "   _{}_", article.abstract_text);
        }
    }
    out
}

pub fn detail_markdown(article: &ArticleRecord, insight: &ExtractedInsight) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", article.title);
    let _ = writeln!(
        out,
        "{} — {} ({}) [PMID: {}]\n",
        article.authors.join(", "),
        article.journal,
        article.pub_date,
        article.pmid
    );
    let _ = writeln!(out, "## Abstract\n\n{}\n", article.abstract_text);
    let _ = writeln!(out, "## AI Summary\n\n{}\n", insight.summary);
    let _ = writeln!(out, "## Key Findings\n");
    for finding in &insight.key_findings {
        let _ = writeln!(out, "- {finding}");
    }
    let _ = writeln!(out, "\n## Methodology\n\n{}\n", insight.methodology);
    let _ = writeln!(
        out,
        "## Clinical Significance\n\n{}",
        insight.clinical_significance
    );
    out
}

pub fn summary_markdown(summary: &GeneratedSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Summary of Top Results\n");
    let _ = writeln!(out, "{}\n", summary.overall_summary);
    let _ = writeln!(out, "## Common Themes\n");
    for theme in &summary.common_themes {
        let _ = writeln!(out, "- {theme}");
    }
    let _ = writeln!(out, "\n## Differing Findings\n\n{}", summary.differing_findings);
    out
}
