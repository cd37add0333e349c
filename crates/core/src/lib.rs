//! # CareBridge Core
//!
//! Domain types, collaborator traits, and error definitions for the CareBridge
//! elder-care conversation pipeline. This crate has **no framework
//! dependencies**; it defines the model that every other crate implements
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the turn pipeline (language model, memory
//! store, welfare retrieval, crisis alerting) is a trait here. Implementations
//! live in their respective crates, so the pipeline can be exercised with
//! scripted fakes and wired to real services through configuration.

pub mod error;
pub mod message;
pub mod profile;
pub mod emotion;
pub mod state;
pub mod provider;
pub mod memory;
pub mod retrieval;
pub mod alert;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use profile::{FamilyMember, UserProfile};
pub use emotion::{EmotionAnalysis, PrimaryEmotion, RiskLevel};
pub use state::{AgentKind, TurnState};
pub use provider::{Provider, ProviderRequest, ProviderResponse, TextCompletion};
pub use memory::{ConversationRecord, MemoryGateway, RiskEvent};
pub use retrieval::{ProgramMatch, RetrievalService};
pub use alert::CrisisAlert;
pub use event::{DomainEvent, EventBus};
