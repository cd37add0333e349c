//! The two memory touch points of a turn: profile load at the start,
//! persistence at the end. Neither can fail the turn.

use carebridge_core::event::{DomainEvent, EventBus};
use carebridge_core::memory::MemoryGateway;
use carebridge_core::state::TurnState;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Attach the stored profile, if any. Skipped for a turn with no user message.
pub async fn load_profile(memory: &dyn MemoryGateway, state: &TurnState) -> TurnState {
    if state.last_user_message().is_none_or(|m| m.trim().is_empty()) {
        debug!(session_id = %state.session_id(), "No utterance, skipping profile load");
        return state.clone();
    }

    match memory.load(state.user_id()).await {
        Ok(Some(profile)) => {
            debug!(user_id = %state.user_id(), "Profile loaded");
            state.with_profile(profile)
        }
        Ok(None) => {
            debug!(user_id = %state.user_id(), "No stored profile, using defaults");
            state.clone()
        }
        Err(e) => {
            warn!(user_id = %state.user_id(), error = %e, "Profile load failed, continuing without profile");
            state.with_error(format!("profile load failed: {e}"))
        }
    }
}

/// Persist the turn. Failures are logged and announced, never raised.
/// Returns whether anything was written.
pub async fn persist(memory: &dyn MemoryGateway, state: &TurnState, events: &EventBus) -> bool {
    if state.messages().is_empty() {
        debug!(session_id = %state.session_id(), "Nothing to persist");
        return false;
    }

    match memory
        .save(
            state.user_id(),
            state.session_id(),
            state.messages(),
            state.emotion_analysis(),
        )
        .await
    {
        Ok(()) => {
            info!(
                user_id = %state.user_id(),
                session_id = %state.session_id(),
                messages = state.messages().len(),
                "Turn persisted"
            );
            true
        }
        Err(e) => {
            warn!(
                user_id = %state.user_id(),
                session_id = %state.session_id(),
                error = %e,
                "Turn persistence failed"
            );
            events.publish(DomainEvent::ErrorOccurred {
                context: "memory_save".into(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::CountingMemory;
    use carebridge_core::message::Message;

    #[tokio::test]
    async fn load_attaches_known_profile() {
        let memory = CountingMemory::new();
        let state = TurnState::new("s1", "user_001", "안녕하세요");

        let next = load_profile(&memory, &state).await;
        assert_eq!(next.user_profile().unwrap().name.as_deref(), Some("김순자"));
        assert!(next.extends(&state));
    }

    #[tokio::test]
    async fn load_skipped_without_utterance() {
        let memory = CountingMemory::new();
        load_profile(&memory, &TurnState::empty("s1", "user_001")).await;
        load_profile(&memory, &TurnState::new("s1", "user_001", " ")).await;
        assert_eq!(memory.loads(), 0);
    }

    #[tokio::test]
    async fn persist_failure_is_reported_not_raised() {
        let memory = CountingMemory::failing_saves();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let state = TurnState::new("s1", "u1", "안녕").with_message(Message::assistant("반가워요"));

        assert!(!persist(&memory, &state, &events).await);
        assert_eq!(memory.saves(), 1);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event.as_ref(), DomainEvent::ErrorOccurred { context, .. } if context == "memory_save"));
    }

    #[tokio::test]
    async fn persist_writes_turn_messages() {
        let memory = CountingMemory::new();
        let state = TurnState::new("s1", "u1", "안녕").with_message(Message::assistant("반가워요"));

        assert!(persist(&memory, &state, &EventBus::default()).await);
        let record = memory.conversation("s1").await.unwrap().unwrap();
        assert_eq!(record.messages.len(), 2);
    }
}
