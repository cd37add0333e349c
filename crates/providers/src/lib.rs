//! LLM provider implementations for CareBridge.
//!
//! All providers implement the `carebridge_core::Provider` trait.
//! `ProviderCompletion` adapts one of them to the timeout-bounded
//! `TextCompletion` capability the turn pipeline consumes.

pub mod completion;
pub mod openai_compat;
pub mod router;

pub use completion::ProviderCompletion;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
