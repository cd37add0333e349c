//! Daily-life specialist: weather, news, hospital and schedule questions
//! answered from the static information block.

use async_trait::async_trait;
use carebridge_core::provider::TextCompletion;
use carebridge_core::state::{AgentKind, TurnState};
use std::sync::Arc;

use super::{Specialist, finish};
use crate::prompts;

pub struct DailySpecialist {
    completion: Arc<dyn TextCompletion>,
}

impl DailySpecialist {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Specialist for DailySpecialist {
    fn kind(&self) -> AgentKind {
        AgentKind::Daily
    }

    async fn respond(&self, state: &TurnState) -> TurnState {
        let Some(utterance) = state.last_user_message() else {
            return state.clone();
        };
        let profile = state.user_profile();

        let outcome = self
            .completion
            .complete(&prompts::daily_system(profile), &prompts::daily_request(utterance))
            .await;

        finish(state, self.kind(), outcome, prompts::daily_apology(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedCompletion;
    use carebridge_core::error::ProviderError;
    use carebridge_core::profile::UserProfile;

    #[tokio::test]
    async fn prompt_carries_info_block_and_profile() {
        let completion = Arc::new(ScriptedCompletion::replies(&["오늘 서울은 맑고 영하 3도예요. 따뜻하게 입으세요!"]));
        let specialist = DailySpecialist::new(completion.clone());
        let state = TurnState::new("s1", "user_001", "오늘 날씨 어때요?").with_profile(UserProfile::sample());

        let next = specialist.respond(&state).await;
        assert_eq!(next.reply(), Some("오늘 서울은 맑고 영하 3도예요. 따뜻하게 입으세요!"));

        let calls = completion.calls();
        let (system, user) = &calls[0];
        assert!(system.contains("[오늘의 날씨 - 서울]"));
        assert!(system.contains("주소: 서울 강북구"));
        assert!(user.contains("확인 후 알려드릴게요"));
    }

    #[tokio::test]
    async fn provider_failure_gives_daily_apology() {
        let completion = Arc::new(ScriptedCompletion::failing(ProviderError::AuthenticationFailed("bad key".into())));
        let specialist = DailySpecialist::new(completion);

        let next = specialist.respond(&TurnState::new("s1", "u1", "약국 어디 있어요?")).await;
        assert_eq!(
            next.reply(),
            Some("어르신, 지금 정보를 가져오는 데 문제가 생겼어요. 잠시 후 다시 물어봐 주시겠어요?")
        );
        assert!(next.error().unwrap().contains("bad key"));
    }
}
