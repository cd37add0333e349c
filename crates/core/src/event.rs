//! Domain event system: decoupled communication between bounded contexts.
//!
//! Events are published when something interesting happens during a turn.
//! Alerting, summarization and monitoring subscribe without the pipeline
//! knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::emotion::RiskLevel;
use crate::state::AgentKind;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A new utterance entered the pipeline
    TurnStarted {
        session_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The classifier chose an agent
    IntentClassified {
        session_id: String,
        intent: AgentKind,
        via_fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// A risk event was recorded by the memory gateway
    RiskRecorded {
        user_id: String,
        session_id: String,
        risk_level: RiskLevel,
        timestamp: DateTime<Utc>,
    },

    /// The companion entered the crisis branch
    CrisisEscalated {
        user_id: String,
        risk_level: RiskLevel,
        message_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// A session grew past the summary threshold
    SummarizationRequested {
        user_id: String,
        session_id: String,
        message_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A recovered failure
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Truncate text to at most `max_chars` characters for log/event previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
