//! MemoryGateway trait: profile loading and turn persistence.
//!
//! The gateway owns the profile lifecycle (many sessions) and the per-session
//! conversation log. The pipeline touches it exactly twice per turn: one
//! `load` at the start, one `save` at the end.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::emotion::{EmotionAnalysis, PrimaryEmotion, RiskLevel};
use crate::error::MemoryError;
use crate::message::Message;
use crate::profile::UserProfile;

/// Default number of session messages above which a summary is requested.
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 10;

/// A risk observation recorded for downstream alerting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub user_id: String,
    pub session_id: String,
    pub risk_level: RiskLevel,
    pub primary: PrimaryEmotion,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl RiskEvent {
    pub fn from_analysis(user_id: &str, session_id: &str, emotion: &EmotionAnalysis) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            risk_level: emotion.risk_level,
            primary: emotion.primary,
            keywords: emotion.keywords.iter().cloned().collect(),
            recorded_at: Utc::now(),
        }
    }
}

/// The stored conversation of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub session_id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the session grew past the summary threshold.
    #[serde(default)]
    pub summary_requested: bool,
}

impl ConversationRecord {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            summary_requested: false,
        }
    }
}

/// The core MemoryGateway trait.
///
/// Implementations: in-memory (reference, tests), none (no-op).
#[async_trait]
pub trait MemoryGateway: Send + Sync {
    /// The backend name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Load a user's profile. `Ok(None)` means a new user.
    async fn load(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, MemoryError>;

    /// Persist one turn's messages and risk assessment.
    ///
    /// Records a risk event when `risk_level >= 1` and raises the
    /// summarization obligation when the session grows past the threshold.
    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        messages: &[Message],
        emotion: Option<&EmotionAnalysis>,
    ) -> std::result::Result<(), MemoryError>;

    /// Create or replace a profile.
    async fn upsert_profile(&self, profile: UserProfile) -> std::result::Result<(), MemoryError>;

    /// Fetch a session's stored conversation.
    async fn conversation(&self, session_id: &str) -> std::result::Result<Option<ConversationRecord>, MemoryError>;

    /// Drop a session's conversation. Returns whether it existed.
    async fn end_session(&self, session_id: &str) -> std::result::Result<bool, MemoryError>;

    /// Risk events recorded for a user, oldest first.
    async fn risk_events(&self, user_id: &str) -> std::result::Result<Vec<RiskEvent>, MemoryError>;
}
