//! In-memory gateway: the reference implementation used by the runtime
//! and tests. Nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use carebridge_core::emotion::EmotionAnalysis;
use carebridge_core::error::MemoryError;
use carebridge_core::event::{DomainEvent, EventBus};
use carebridge_core::memory::{ConversationRecord, DEFAULT_SUMMARY_THRESHOLD, MemoryGateway, RiskEvent};
use carebridge_core::message::Message;
use carebridge_core::profile::UserProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Profiles, session logs and risk events held behind async locks.
pub struct InMemoryGateway {
    profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
    sessions: Arc<RwLock<HashMap<String, ConversationRecord>>>,
    risk_events: Arc<RwLock<Vec<RiskEvent>>>,
    summary_threshold: usize,
    events: Option<Arc<EventBus>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            risk_events: Arc::new(RwLock::new(Vec::new())),
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            events: None,
        }
    }

    /// A gateway that already knows the sample profile (`user_001`).
    pub fn with_sample_profile() -> Self {
        let sample = UserProfile::sample();
        let profiles = HashMap::from([(sample.user_id.clone(), sample)]);
        Self {
            profiles: Arc::new(RwLock::new(profiles)),
            ..Self::new()
        }
    }

    pub fn with_summary_threshold(mut self, threshold: usize) -> Self {
        self.summary_threshold = threshold.max(1);
        self
    }

    /// Publish risk and summarization events on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryGateway for InMemoryGateway {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, MemoryError> {
        let profile = self.profiles.read().await.get(user_id).cloned();
        debug!(user_id, found = profile.is_some(), "Profile lookup");
        Ok(profile)
    }

    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        messages: &[Message],
        emotion: Option<&EmotionAnalysis>,
    ) -> Result<(), MemoryError> {
        if let Some(emotion) = emotion.filter(|e| e.risk_level.needs_record()) {
            warn!(
                user_id,
                session_id,
                risk_level = emotion.risk_level.as_u8(),
                primary = %emotion.primary,
                "Risk detected, recording event"
            );
            self.risk_events
                .write()
                .await
                .push(RiskEvent::from_analysis(user_id, session_id, emotion));
            self.publish(DomainEvent::RiskRecorded {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                risk_level: emotion.risk_level,
                timestamp: Utc::now(),
            });
        }

        let mut sessions = self.sessions.write().await;
        let record = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationRecord::new(session_id, user_id));
        record.messages.extend_from_slice(messages);
        record.updated_at = Utc::now();

        let message_count = record.messages.len();
        if message_count > self.summary_threshold && !record.summary_requested {
            record.summary_requested = true;
            info!(user_id, session_id, message_count, "Session summary requested");
            self.publish(DomainEvent::SummarizationRequested {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                message_count,
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), MemoryError> {
        if profile.user_id.trim().is_empty() {
            return Err(MemoryError::Storage("profile has an empty user_id".into()));
        }
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn conversation(&self, session_id: &str) -> Result<Option<ConversationRecord>, MemoryError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn end_session(&self, session_id: &str) -> Result<bool, MemoryError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn risk_events(&self, user_id: &str) -> Result<Vec<RiskEvent>, MemoryError> {
        Ok(self
            .risk_events
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}
