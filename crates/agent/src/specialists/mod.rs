//! Specialist responders: one per routable intent.
//!
//! Each specialist reads the latest user message and appends exactly one
//! assistant reply. Failures never escape: a provider error becomes the
//! specialist's fixed apology plus an `error` annotation on the state.

pub mod companion;
pub mod daily;
pub mod welfare;

pub use companion::CompanionSpecialist;
pub use daily::DailySpecialist;
pub use welfare::WelfareSpecialist;

use async_trait::async_trait;
use carebridge_core::error::ProviderError;
use carebridge_core::message::Message;
use carebridge_core::state::{AgentKind, TurnState};
use tracing::{info, warn};

use crate::sanitizer::sanitize;

#[async_trait]
pub trait Specialist: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Produce the reply for `state`. A state without a user message is
    /// returned unchanged.
    async fn respond(&self, state: &TurnState) -> TurnState;
}

/// Sanitized reply text, or `None` when nothing is left after sanitizing.
pub(crate) fn clean_reply(raw: &str) -> Option<String> {
    Some(sanitize(raw)).filter(|text| !text.is_empty())
}

/// Append the sanitized model reply, or `apology` when the call failed or
/// produced nothing usable.
pub(crate) fn finish(
    state: &TurnState,
    kind: AgentKind,
    outcome: Result<String, ProviderError>,
    apology: String,
) -> TurnState {
    match outcome {
        Ok(raw) => match clean_reply(&raw) {
            Some(text) => {
                info!(
                    session_id = %state.session_id(),
                    agent = %kind,
                    reply_len = text.chars().count(),
                    "Specialist reply generated"
                );
                state.with_message(Message::assistant(text))
            }
            None => {
                warn!(session_id = %state.session_id(), agent = %kind, "Reply empty after sanitizing");
                state
                    .with_message(Message::assistant(apology))
                    .with_error(format!("{kind}: empty reply after sanitizing"))
            }
        },
        Err(e) => {
            warn!(session_id = %state.session_id(), agent = %kind, error = %e, "Specialist call failed");
            state
                .with_message(Message::assistant(apology))
                .with_error(e.to_string())
        }
    }
}
