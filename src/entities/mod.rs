pub mod article;
pub mod insight;

pub use article::{ArticleRecord, NO_ABSTRACT, UNKNOWN_AUTHOR};
pub use insight::{ExtractedInsight, GeneratedSummary};
