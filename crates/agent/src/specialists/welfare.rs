//! Welfare specialist: answers benefit questions from retrieved program data.

use async_trait::async_trait;
use carebridge_core::provider::TextCompletion;
use carebridge_core::retrieval::{DEFAULT_TOP_K, RetrievalService};
use carebridge_core::state::{AgentKind, TurnState};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Specialist, finish};
use crate::prompts;

pub struct WelfareSpecialist {
    completion: Arc<dyn TextCompletion>,
    retrieval: Arc<dyn RetrievalService>,
    top_k: usize,
}

impl WelfareSpecialist {
    pub fn new(completion: Arc<dyn TextCompletion>, retrieval: Arc<dyn RetrievalService>) -> Self {
        Self {
            completion,
            retrieval,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Retrieved context for `query`, or the basic-pension block when
    /// retrieval is down. Retrieval failure is not a turn-level error.
    async fn context_for(&self, query: &str) -> String {
        match self.retrieval.get_context(query, self.top_k).await {
            Ok(context) => {
                debug!(context_len = context.len(), "Welfare context retrieved");
                context
            }
            Err(e) => {
                warn!(error = %e, "Welfare retrieval failed, using basic pension fallback");
                prompts::WELFARE_FALLBACK_CONTEXT.to_string()
            }
        }
    }
}

#[async_trait]
impl Specialist for WelfareSpecialist {
    fn kind(&self) -> AgentKind {
        AgentKind::Welfare
    }

    async fn respond(&self, state: &TurnState) -> TurnState {
        let Some(utterance) = state.last_user_message() else {
            return state.clone();
        };
        let profile = state.user_profile();

        let context = self.context_for(utterance).await;
        let next = state.with_context(context.as_str());

        let outcome = self
            .completion
            .complete(
                &prompts::welfare_system(profile, &context),
                &prompts::welfare_request(utterance),
            )
            .await;

        finish(&next, self.kind(), outcome, prompts::welfare_apology(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingRetrieval, ScriptedCompletion};
    use carebridge_core::error::ProviderError;
    use carebridge_retrieval::CatalogRetrieval;

    #[tokio::test]
    async fn retrieved_context_reaches_prompt_and_state() {
        let completion = Arc::new(ScriptedCompletion::replies(&["기초연금은 월 최대 32.4만원이에요."]));
        let specialist = WelfareSpecialist::new(completion.clone(), Arc::new(CatalogRetrieval::builtin()));
        let state = TurnState::new("s1", "u1", "기초연금 얼마 받아요?");

        let next = specialist.respond(&state).await;
        assert_eq!(next.reply(), Some("기초연금은 월 최대 32.4만원이에요."));
        assert_eq!(next.retrieved_context().len(), 1);
        assert!(next.retrieved_context()[0].starts_with("[관련 복지 정보]"));

        let calls = completion.calls();
        assert!(calls[0].0.contains(next.retrieved_context()[0].as_str()));
        assert_eq!(calls[0].1, "사용자 질문: 기초연금 얼마 받아요?");
    }

    #[tokio::test]
    async fn retrieval_failure_uses_fallback_block_without_error() {
        let completion = Arc::new(ScriptedCompletion::replies(&["주민센터에 문의해 보세요."]));
        let specialist = WelfareSpecialist::new(completion, Arc::new(FailingRetrieval));
        let state = TurnState::new("s1", "u1", "복지 혜택 있나요?");

        let next = specialist.respond(&state).await;
        assert!(!next.reply().unwrap().is_empty());
        assert_eq!(next.retrieved_context(), [prompts::WELFARE_FALLBACK_CONTEXT.to_string()]);
        assert!(next.error().is_none());
    }

    #[tokio::test]
    async fn provider_failure_gives_welfare_apology() {
        let completion = Arc::new(ScriptedCompletion::failing(ProviderError::RateLimited { retry_after_secs: 5 }));
        let specialist = WelfareSpecialist::new(completion, Arc::new(CatalogRetrieval::builtin()));
        let state = TurnState::new("s1", "u1", "에너지바우처 신청");

        let next = specialist.respond(&state).await;
        assert_eq!(next.reply(), Some(prompts::welfare_apology(None).as_str()));
        assert!(next.error().is_some());
    }

    #[tokio::test]
    async fn no_user_message_is_a_no_op() {
        let completion = Arc::new(ScriptedCompletion::replies(&[]));
        let specialist = WelfareSpecialist::new(completion.clone(), Arc::new(FailingRetrieval));
        let state = TurnState::empty("s1", "u1");

        let next = specialist.respond(&state).await;
        assert!(next.messages().is_empty());
        assert_eq!(completion.call_count(), 0);
    }
}
