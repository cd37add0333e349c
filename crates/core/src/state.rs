//! Per-turn state threaded through the pipeline stages.
//!
//! Every stage receives a `&TurnState` and returns a new value. There is no
//! `&mut` access: the only ways to derive a state are the `with_*` methods,
//! which clone the input and change one aspect of the copy.

use serde::{Deserialize, Serialize};

use crate::emotion::EmotionAnalysis;
use crate::message::{Message, Role};
use crate::profile::UserProfile;

/// Which agent the classifier selected for this turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Supervisor,
    Welfare,
    Companion,
    Daily,
    End,
}

impl AgentKind {
    /// Parse a label such as `"welfare"`. Returns `None` for anything outside
    /// the declared set.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "supervisor" => Some(Self::Supervisor),
            "welfare" => Some(Self::Welfare),
            "companion" => Some(Self::Companion),
            "daily" => Some(Self::Daily),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supervisor => "supervisor",
            Self::Welfare => "welfare",
            Self::Companion => "companion",
            Self::Daily => "daily",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work flowing through one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    session_id: String,
    user_id: String,
    messages: Vec<Message>,
    user_profile: Option<UserProfile>,
    current_agent: AgentKind,
    emotion_analysis: Option<EmotionAnalysis>,
    retrieved_context: Vec<String>,
    error: Option<String>,
}

impl TurnState {
    /// A fresh state for one inbound utterance.
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        utterance: impl Into<String>,
    ) -> Self {
        Self::empty(session_id, user_id).with_message(Message::user(utterance))
    }

    /// A state with no messages at all.
    pub fn empty(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            user_profile: None,
            current_agent: AgentKind::Supervisor,
            emotion_analysis: None,
            retrieved_context: Vec::new(),
            error: None,
        }
    }

    // ── Read access ──

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn user_profile(&self) -> Option<&UserProfile> {
        self.user_profile.as_ref()
    }

    pub fn current_agent(&self) -> AgentKind {
        self.current_agent
    }

    pub fn emotion_analysis(&self) -> Option<&EmotionAnalysis> {
        self.emotion_analysis.as_ref()
    }

    pub fn retrieved_context(&self) -> &[String] {
        &self.retrieved_context
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Text of the most recent user message, if the turn has one.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Text of the most recent message when it was written by the assistant.
    pub fn reply(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    // ── Derivation ──

    /// Append a message.
    pub fn with_message(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    /// Attach the loaded profile. A profile that is already present is kept:
    /// once loaded it stays fixed for the rest of the turn.
    pub fn with_profile(&self, profile: UserProfile) -> Self {
        let mut next = self.clone();
        if next.user_profile.is_none() {
            next.user_profile = Some(profile);
        } else {
            tracing::warn!(user_id = %self.user_id, "Profile already loaded for this turn, ignoring reload");
        }
        next
    }

    /// Record the classifier's decision.
    pub fn with_agent(&self, agent: AgentKind) -> Self {
        let mut next = self.clone();
        next.current_agent = agent;
        next
    }

    /// Record the emotion analysis. Produced once per turn; a second analysis
    /// is ignored.
    pub fn with_emotion(&self, emotion: EmotionAnalysis) -> Self {
        let mut next = self.clone();
        if next.emotion_analysis.is_none() {
            next.emotion_analysis = Some(emotion);
        } else {
            tracing::warn!(session_id = %self.session_id, "Emotion already analysed for this turn, ignoring");
        }
        next
    }

    /// Append a retrieved context block.
    pub fn with_context(&self, block: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.retrieved_context.push(block.into());
        next
    }

    /// Annotate a recovered failure. A later error replaces an earlier one.
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.error = Some(error.into());
        next
    }

    /// Whether `self` could have been derived from `earlier` under the
    /// append-only rules: same identity, message list extended (never
    /// rewritten), profile never swapped once present.
    pub fn extends(&self, earlier: &TurnState) -> bool {
        self.session_id == earlier.session_id
            && self.user_id == earlier.user_id
            && self.messages.len() >= earlier.messages.len()
            && self.messages[..earlier.messages.len()] == earlier.messages[..]
            && self.retrieved_context.starts_with(&earlier.retrieved_context)
            && (earlier.user_profile.is_none() || self.user_profile == earlier.user_profile)
    }
}
