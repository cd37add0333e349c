//! RetrievalService trait: topical welfare context for the welfare specialist.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// Default number of programs pulled into an LLM context block.
pub const DEFAULT_TOP_K: usize = 3;

/// One welfare program matched by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramMatch {
    pub program_id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub benefit: String,
    #[serde(default)]
    pub eligibility: Vec<String>,
    pub how_to_apply: String,
    pub contact: String,
    /// Relevance in [0, 1]; higher is more relevant.
    pub score: f32,
}

#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Context text for the language model, built from the top `top_k` matches.
    async fn get_context(&self, query: &str, top_k: usize) -> std::result::Result<String, RetrievalError>;

    /// Ranked program matches, optionally restricted to one category.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
    ) -> std::result::Result<Vec<ProgramMatch>, RetrievalError>;

    /// All known categories, sorted.
    async fn categories(&self) -> std::result::Result<Vec<String>, RetrievalError> {
        Ok(Vec::new())
    }
}
