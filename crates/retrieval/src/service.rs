//! `RetrievalService` backed by an in-process welfare catalog.

use async_trait::async_trait;
use carebridge_core::error::RetrievalError;
use carebridge_core::retrieval::{ProgramMatch, RetrievalService};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::WelfareCatalog;
use crate::search;

pub struct CatalogRetrieval {
    catalog: Arc<WelfareCatalog>,
}

impl CatalogRetrieval {
    pub fn new(catalog: WelfareCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn builtin() -> Self {
        Self::new(WelfareCatalog::builtin())
    }

    /// Use the catalog file at `path` when given, the built-in catalog otherwise.
    pub fn from_path(path: Option<&Path>) -> Result<Self, RetrievalError> {
        match path {
            Some(path) => Ok(Self::new(WelfareCatalog::from_json_file(path)?)),
            None => Ok(Self::builtin()),
        }
    }

    pub fn catalog(&self) -> &WelfareCatalog {
        &self.catalog
    }
}

#[async_trait]
impl RetrievalService for CatalogRetrieval {
    async fn get_context(&self, query: &str, top_k: usize) -> Result<String, RetrievalError> {
        let matches = search::rank(&self.catalog, query, top_k, None);
        debug!(matches = matches.len(), top_k, "Welfare context built");
        Ok(search::format_context(&matches))
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
    ) -> Result<Vec<ProgramMatch>, RetrievalError> {
        Ok(search::rank(&self.catalog, query, top_k, category))
    }

    async fn categories(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(self.catalog.categories())
    }
}
