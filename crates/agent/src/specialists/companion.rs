//! Companion specialist: empathetic small talk, plus the crisis branch.
//!
//! At risk level 2 the reply follows the crisis template and the crisis
//! alert fires once for the turn. A crisis reply always carries a safety
//! check question and the 1393 hotline, whatever the model wrote.

use async_trait::async_trait;
use carebridge_core::alert::CrisisAlert;
use carebridge_core::message::Message;
use carebridge_core::provider::TextCompletion;
use carebridge_core::state::{AgentKind, TurnState};
use std::sync::Arc;
use tracing::warn;

use super::{Specialist, clean_reply, finish};
use crate::prompts;

pub const CRISIS_HOTLINE: &str = "1393";

const SAFETY_CUES: &[&str] = &["안전", "괜찮", "다치", "위험"];

/// Whether some question sentence in `text` checks on the user's safety.
pub fn has_safety_question(text: &str) -> bool {
    text.split_inclusive(['?', '？'])
        .filter(|segment| segment.ends_with(['?', '？']))
        .any(|question| {
            let sentence = question.rsplit(['.', '!', '\n']).next().unwrap_or(question);
            SAFETY_CUES.iter().any(|cue| sentence.contains(cue))
        })
}

/// Append the fixed safety line unless `text` already has both the safety
/// question and the hotline.
pub fn ensure_crisis_safety(text: &str) -> String {
    if has_safety_question(text) && text.contains(CRISIS_HOTLINE) {
        text.to_string()
    } else {
        format!("{text} {}", prompts::CRISIS_SAFETY_LINE)
    }
}

pub struct CompanionSpecialist {
    completion: Arc<dyn TextCompletion>,
    alert: Arc<dyn CrisisAlert>,
}

impl CompanionSpecialist {
    pub fn new(completion: Arc<dyn TextCompletion>, alert: Arc<dyn CrisisAlert>) -> Self {
        Self { completion, alert }
    }

    async fn respond_to_crisis(&self, state: &TurnState, utterance: &str) -> TurnState {
        let profile = state.user_profile();
        let emotion = state.emotion_analysis();
        let risk_level = emotion.map(|e| e.risk_level).unwrap_or_default();

        warn!(
            user_id = %state.user_id(),
            session_id = %state.session_id(),
            risk_level = risk_level.as_u8(),
            "Crisis detected, escalating"
        );
        if let Err(e) = self.alert.notify(state.user_id(), risk_level, utterance).await {
            warn!(user_id = %state.user_id(), error = %e, "Crisis alert failed");
        }

        let outcome = self
            .completion
            .complete(
                &prompts::companion_system(profile, emotion),
                &prompts::crisis_request(utterance, emotion),
            )
            .await;

        match outcome {
            Ok(raw) => match clean_reply(&raw) {
                Some(text) => state.with_message(Message::assistant(ensure_crisis_safety(&text))),
                None => state
                    .with_message(Message::assistant(prompts::crisis_fallback(profile)))
                    .with_error("companion: empty crisis reply after sanitizing"),
            },
            Err(e) => {
                warn!(user_id = %state.user_id(), error = %e, "Crisis reply generation failed, using fixed reply");
                state
                    .with_message(Message::assistant(prompts::crisis_fallback(profile)))
                    .with_error(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Specialist for CompanionSpecialist {
    fn kind(&self) -> AgentKind {
        AgentKind::Companion
    }

    async fn respond(&self, state: &TurnState) -> TurnState {
        let Some(utterance) = state.last_user_message() else {
            return state.clone();
        };

        if state.emotion_analysis().is_some_and(|e| e.risk_level.is_crisis()) {
            return self.respond_to_crisis(state, utterance).await;
        }

        let profile = state.user_profile();
        let emotion = state.emotion_analysis();
        let outcome = self
            .completion
            .complete(
                &prompts::companion_system(profile, emotion),
                &prompts::companion_request(utterance, emotion),
            )
            .await;

        finish(state, self.kind(), outcome, prompts::companion_apology(profile))
    }
}
