//! Search PubMed and extract AI-generated insights from article abstracts.
//!
//! Three parts: a literature client over the NCBI E-utilities
//! (esearch/esummary/efetch), an insight client over Gemini structured
//! generation, and a session that sequences calls to them while keeping the
//! three result views mutually exclusive.

pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod session;
pub mod sources;
pub mod transform;
