//! Welfare program retrieval for CareBridge.
//!
//! Provides the catalog, keyword relevance search and the
//! `RetrievalService` implementation consumed by the welfare specialist
//! and the HTTP gateway.

pub mod catalog;
pub mod search;
pub mod service;

pub use catalog::{WelfareCatalog, WelfareProgram};
pub use service::CatalogRetrieval;
