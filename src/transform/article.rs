use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::entities::article::{ArticleRecord, NO_ABSTRACT, UNKNOWN_AUTHOR};
use crate::sources::pubmed::ESummaryDocSum;

fn article_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<PubmedArticle\b.*?</PubmedArticle>").unwrap())
}

fn pmid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<PMID[^>]*>([^<]+)</PMID>").unwrap())
}

fn abstract_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<AbstractText[^>]*>(.*?)</AbstractText>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parses an efetch XML payload into a PMID -> abstract text mapping.
///
/// Only the first PMID and first AbstractText element of each PubmedArticle
/// block are read; inline markup inside the abstract is stripped. Articles
/// without an AbstractText element are simply absent from the map.
pub fn abstracts_from_efetch_xml(xml: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for block in article_block_re().find_iter(xml) {
        let block = block.as_str();
        let Some(pmid) = pmid_re()
            .captures(block)
            .map(|c| c[1].trim().to_string())
            .filter(|v| !v.is_empty())
        else {
            continue;
        };
        let Some(raw) = abstract_re().captures(block).map(|c| c[1].to_string()) else {
            continue;
        };
        let text = unescape_entities(tag_re().replace_all(&raw, "").trim());
        if !text.is_empty() {
            out.insert(pmid, text);
        }
    }
    out
}

/// Merges one esummary docsum with the abstract map into an `ArticleRecord`.
///
/// A PMID present in the metadata but absent from the abstract map yields
/// exactly the `NO_ABSTRACT` sentinel, never an empty string. An empty
/// author list becomes the single `UNKNOWN_AUTHOR` sentinel.
pub fn from_docsum(doc: ESummaryDocSum, abstracts: &HashMap<String, String>) -> ArticleRecord {
    let abstract_text = abstracts
        .get(&doc.uid)
        .cloned()
        .unwrap_or_else(|| NO_ABSTRACT.to_string());
    let authors: Vec<String> = doc
        .authors
        .into_iter()
        .map(|a| a.name)
        .filter(|v| !v.trim().is_empty())
        .collect();
    let authors = if authors.is_empty() {
        vec![UNKNOWN_AUTHOR.to_string()]
    } else {
        authors
    };

    ArticleRecord {
        pmid: doc.uid,
        title: doc.title,
        authors,
        journal: doc.fulljournalname,
        pub_date: doc.pubdate,
        abstract_text,
    }
}
