//! No-op gateway: disables memory entirely. Every user is new, nothing is kept.

use async_trait::async_trait;
use carebridge_core::emotion::EmotionAnalysis;
use carebridge_core::error::MemoryError;
use carebridge_core::memory::{ConversationRecord, MemoryGateway, RiskEvent};
use carebridge_core::message::Message;
use carebridge_core::profile::UserProfile;

pub struct NoopGateway;

#[async_trait]
impl MemoryGateway for NoopGateway {
    fn name(&self) -> &str { "none" }

    async fn load(&self, _user_id: &str) -> Result<Option<UserProfile>, MemoryError> {
        Ok(None)
    }

    async fn save(
        &self,
        _user_id: &str,
        _session_id: &str,
        _messages: &[Message],
        _emotion: Option<&EmotionAnalysis>,
    ) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn upsert_profile(&self, _profile: UserProfile) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn conversation(&self, _session_id: &str) -> Result<Option<ConversationRecord>, MemoryError> {
        Ok(None)
    }

    async fn end_session(&self, _session_id: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }

    async fn risk_events(&self, _user_id: &str) -> Result<Vec<RiskEvent>, MemoryError> {
        Ok(Vec::new())
    }
}
