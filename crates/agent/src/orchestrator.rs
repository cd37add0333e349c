//! The turn pipeline.
//!
//! ```text
//! memory_load → classify ─┬─ welfare ───┐
//!                         ├─ companion ─┼→ memory_save → done
//!                         ├─ daily ─────┘
//!                         └─ (end) ───────→ memory_save → done
//! ```
//!
//! Each stage takes the current [`TurnState`] and returns a derived one.
//! The next stage is a pure function of the stage just run and the state it
//! produced. Turns for the same session run one at a time.

use carebridge_core::alert::CrisisAlert;
use carebridge_core::emotion::EmotionAnalysis;
use carebridge_core::event::{DomainEvent, EventBus};
use carebridge_core::memory::MemoryGateway;
use carebridge_core::provider::TextCompletion;
use carebridge_core::retrieval::RetrievalService;
use carebridge_core::state::{AgentKind, TurnState};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

use crate::memory_stage;
use crate::prompts::{DEFAULT_REPLY, FAREWELL_REPLY};
use crate::router::{NextStage, route};
use crate::specialists::{CompanionSpecialist, DailySpecialist, Specialist, WelfareSpecialist};
use crate::supervisor::{Resolution, Supervisor};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MemoryLoad,
    Classify,
    Welfare,
    Companion,
    Daily,
    MemorySave,
    Done,
}

impl Stage {
    pub const START: Stage = Stage::MemoryLoad;

    /// The stage that follows `self`, given the state `self` produced.
    pub fn next(self, state: &TurnState) -> Stage {
        match self {
            Stage::MemoryLoad => Stage::Classify,
            Stage::Classify => match route(state.current_agent()) {
                NextStage::Welfare => Stage::Welfare,
                NextStage::Companion => Stage::Companion,
                NextStage::Daily => Stage::Daily,
                NextStage::Finalize => Stage::MemorySave,
            },
            Stage::Welfare | Stage::Companion | Stage::Daily => Stage::MemorySave,
            Stage::MemorySave | Stage::Done => Stage::Done,
        }
    }
}

/// One user utterance entering the system.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Continue this session; a new id is generated when absent or blank.
    pub session_id: Option<String>,
    pub user_id: String,
    pub message: String,
}

impl TurnInput {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: None,
            user_id: user_id.into(),
            message: message.into(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// What the caller gets back for one turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutput {
    pub session_id: String,
    pub reply: String,
    pub agent_type: AgentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<EmotionAnalysis>,
    /// Recovered failure, if any. Never shown to the user.
    #[serde(skip)]
    pub error: Option<String>,
}

type SessionLock = Arc<tokio::sync::Mutex<()>>;

pub struct Orchestrator {
    memory: Arc<dyn MemoryGateway>,
    supervisor: Supervisor,
    welfare: WelfareSpecialist,
    companion: CompanionSpecialist,
    daily: DailySpecialist,
    events: Arc<EventBus>,
    session_locks: Mutex<HashMap<String, SessionLock>>,
}

impl Orchestrator {
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        memory: Arc<dyn MemoryGateway>,
        retrieval: Arc<dyn RetrievalService>,
        alert: Arc<dyn CrisisAlert>,
    ) -> Self {
        Self {
            memory,
            supervisor: Supervisor::new(completion.clone()),
            welfare: WelfareSpecialist::new(completion.clone(), retrieval),
            companion: CompanionSpecialist::new(completion.clone(), alert),
            daily: DailySpecialist::new(completion),
            events: Arc::new(EventBus::default()),
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Number of welfare programs placed in the prompt context.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.welfare = self.welfare.with_top_k(top_k);
        self
    }

    pub fn memory(&self) -> &Arc<dyn MemoryGateway> {
        &self.memory
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Sessions with a turn currently in flight or queued.
    pub fn active_sessions(&self) -> usize {
        self.locks().len()
    }

    /// Run one turn end to end. Never fails: every recovered error is
    /// reported in [`TurnOutput::error`] next to a usable reply.
    pub async fn handle_turn(&self, input: TurnInput) -> TurnOutput {
        let session_id = input
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let slot = self.acquire_session(&session_id);
        let output = {
            let _turn = slot.lock.lock().await;

            self.events.publish(DomainEvent::TurnStarted {
                session_id: session_id.clone(),
                user_id: input.user_id.clone(),
                timestamp: Utc::now(),
            });

            let initial = if input.message.trim().is_empty() {
                TurnState::empty(session_id.as_str(), input.user_id.as_str())
            } else {
                TurnState::new(session_id.as_str(), input.user_id.as_str(), input.message.as_str())
            };
            let state = self.process(initial).await;
            Self::output(&state)
        };
        drop(slot);

        info!(
            session_id = %output.session_id,
            agent = %output.agent_type,
            risk_level = output.emotion.as_ref().map_or(0, |e| e.risk_level.as_u8()),
            recovered_error = output.error.is_some(),
            "Turn complete"
        );
        output
    }

    /// Drive `state` through every stage. No locking; callers that share a
    /// session go through [`Orchestrator::handle_turn`].
    pub async fn process(&self, initial: TurnState) -> TurnState {
        let mut state = initial;
        let mut stage = Stage::START;

        while stage != Stage::Done {
            let next = self.run_stage(stage, &state).await;
            if next.extends(&state) {
                state = next;
            } else {
                error!(
                    session_id = %state.session_id(),
                    stage = ?stage,
                    "Stage rewrote turn history, discarding its output"
                );
            }
            debug!(session_id = %state.session_id(), stage = ?stage, "Stage finished");
            stage = stage.next(&state);
        }

        state
    }

    async fn run_stage(&self, stage: Stage, state: &TurnState) -> TurnState {
        match stage {
            Stage::MemoryLoad => memory_stage::load_profile(self.memory.as_ref(), state).await,
            Stage::Classify => {
                let (next, resolution) = self.supervisor.run(state).await;
                if resolution != Resolution::EmptyInput {
                    self.events.publish(DomainEvent::IntentClassified {
                        session_id: next.session_id().to_string(),
                        intent: next.current_agent(),
                        via_fallback: resolution != Resolution::Model,
                        timestamp: Utc::now(),
                    });
                }
                next
            }
            Stage::Welfare => self.welfare.respond(state).await,
            Stage::Companion => self.companion.respond(state).await,
            Stage::Daily => self.daily.respond(state).await,
            Stage::MemorySave => {
                memory_stage::persist(self.memory.as_ref(), state, &self.events).await;
                state.clone()
            }
            Stage::Done => state.clone(),
        }
    }

    fn output(state: &TurnState) -> TurnOutput {
        let reply = match state.reply() {
            Some(reply) => reply.to_string(),
            None if state.current_agent() == AgentKind::End => FAREWELL_REPLY.to_string(),
            None => DEFAULT_REPLY.to_string(),
        };

        TurnOutput {
            session_id: state.session_id().to_string(),
            reply,
            agent_type: state.current_agent(),
            emotion: state.emotion_analysis().cloned(),
            error: state.error().map(String::from),
        }
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionLock>> {
        self.session_locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire_session(&self, session_id: &str) -> SessionSlot<'_> {
        let lock = self.locks().entry(session_id.to_string()).or_default().clone();
        SessionSlot {
            locks: &self.session_locks,
            session_id: session_id.to_string(),
            lock,
        }
    }
}

/// A turn's claim on its session lock. Dropping it, on completion or when
/// the turn future is cancelled, removes the map entry once no other turn
/// holds or waits on it.
struct SessionSlot<'a> {
    locks: &'a Mutex<HashMap<String, SessionLock>>,
    session_id: String,
    lock: SessionLock,
}

impl Drop for SessionSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this slot are the only owners left.
        let idle = Arc::strong_count(&self.lock) <= 2;
        let same = locks
            .get(&self.session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        if idle && same {
            locks.remove(&self.session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialists::companion::has_safety_question;
    use crate::prompts::WELFARE_FALLBACK_CONTEXT;
    use crate::test_helpers::{
        CountingMemory, FailingRetrieval, RecordingAlert, ScriptedCompletion, classification_json,
    };
    use async_trait::async_trait;
    use carebridge_core::emotion::RiskLevel;
    use carebridge_core::error::ProviderError;
    use carebridge_core::message::Role;
    use carebridge_retrieval::CatalogRetrieval;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Harness {
        completion: Arc<ScriptedCompletion>,
        memory: Arc<CountingMemory>,
        alert: Arc<RecordingAlert>,
        orchestrator: Orchestrator,
    }

    fn harness(script: &[&str]) -> Harness {
        harness_with(ScriptedCompletion::replies(script), CountingMemory::new(), Arc::new(CatalogRetrieval::builtin()))
    }

    fn harness_with(
        completion: ScriptedCompletion,
        memory: CountingMemory,
        retrieval: Arc<dyn RetrievalService>,
    ) -> Harness {
        let completion = Arc::new(completion);
        let memory = Arc::new(memory);
        let alert = Arc::new(RecordingAlert::default());
        let orchestrator = Orchestrator::new(completion.clone(), memory.clone(), retrieval, alert.clone());
        Harness {
            completion,
            memory,
            alert,
            orchestrator,
        }
    }

    #[test]
    fn stage_transitions() {
        let state = TurnState::new("s1", "u1", "안녕");
        assert_eq!(Stage::START.next(&state), Stage::Classify);
        assert_eq!(Stage::Classify.next(&state.with_agent(AgentKind::Welfare)), Stage::Welfare);
        assert_eq!(Stage::Classify.next(&state.with_agent(AgentKind::Daily)), Stage::Daily);
        assert_eq!(Stage::Classify.next(&state.with_agent(AgentKind::Companion)), Stage::Companion);
        assert_eq!(Stage::Classify.next(&state.with_agent(AgentKind::End)), Stage::MemorySave);
        assert_eq!(Stage::Classify.next(&state), Stage::Companion);
        assert_eq!(Stage::Daily.next(&state), Stage::MemorySave);
        assert_eq!(Stage::MemorySave.next(&state), Stage::Done);
        assert_eq!(Stage::Done.next(&state), Stage::Done);
    }

    #[tokio::test]
    async fn empty_message_makes_no_external_calls() {
        let h = harness(&[]);

        let output = h.orchestrator.handle_turn(TurnInput::new("user_001", "   ")).await;
        assert_eq!(output.agent_type, AgentKind::Companion);
        assert_eq!(output.reply, DEFAULT_REPLY);
        assert_eq!(output.error.as_deref(), Some("empty message"));
        assert_eq!(h.completion.call_count(), 0);
        assert_eq!(h.memory.loads(), 0);
        assert_eq!(h.memory.saves(), 0);
    }

    #[tokio::test]
    async fn weather_question_with_unparseable_classifier_goes_to_daily() {
        let h = harness(&["음, 날씨 질문 같네요", "오늘 서울은 맑아요. 따뜻하게 입으세요."]);

        let state = h.orchestrator.process(TurnState::new("s1", "user_001", "오늘 날씨 어때요?")).await;
        assert_eq!(state.current_agent(), AgentKind::Daily);
        assert_eq!(state.reply(), Some("오늘 서울은 맑아요. 따뜻하게 입으세요."));
        assert_eq!(state.emotion_analysis(), Some(&EmotionAnalysis::default()));
        assert!(state.error().unwrap().contains("keyword fallback"));
        assert_eq!(h.completion.call_count(), 2);
    }

    #[tokio::test]
    async fn welfare_keyword_with_unparseable_classifier_goes_to_welfare() {
        let h = harness(&["not json", "기초연금을 신청해 보세요."]);

        let state = h.orchestrator.process(TurnState::new("s1", "user_001", "복지 혜택 뭐 있어요?")).await;
        assert_eq!(state.current_agent(), AgentKind::Welfare);
        assert_eq!(state.retrieved_context().len(), 1);
        assert_eq!(state.reply(), Some("기초연금을 신청해 보세요."));
    }

    #[tokio::test]
    async fn farewell_bypasses_specialists() {
        let classifier = serde_json::json!({
            "intent": "end",
            "emotion": {"primary": "happy", "risk_level": 0},
            "greeting_response": "안녕히 가세요. 또 이야기해요!"
        })
        .to_string();
        let h = harness(&[classifier.as_str()]);

        let state = h.orchestrator.process(TurnState::new("s1", "user_001", "잘가")).await;
        assert_eq!(state.current_agent(), AgentKind::End);
        let roles: Vec<Role> = state.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
        assert_eq!(state.reply(), Some("안녕히 가세요. 또 이야기해요!"));
        assert_eq!(h.completion.call_count(), 1);
        assert_eq!(h.memory.saves(), 1);
    }

    #[tokio::test]
    async fn farewell_without_greeting_leaves_messages_and_says_goodbye() {
        let h = harness(&["???"]);

        let output = h
            .orchestrator
            .handle_turn(TurnInput::new("user_001", "잘가").with_session("s-end"))
            .await;
        assert_eq!(output.agent_type, AgentKind::End);
        assert_eq!(output.reply, FAREWELL_REPLY);
        assert_eq!(h.completion.call_count(), 1);

        let record = h.memory.conversation("s-end").await.unwrap().unwrap();
        assert_eq!(record.messages.len(), 1);
        assert!(record.messages[0].is_user());
        assert_eq!(record.messages[0].content, "잘가");
    }

    #[tokio::test]
    async fn crisis_turn_alerts_once_and_answers_safely() {
        let h = harness(&[classification_json("companion", 2).as_str(), "말씀해 주셔서 고마워요. 혼자가 아니에요."]);

        let output = h
            .orchestrator
            .handle_turn(TurnInput::new("user_001", "다 끝내고 싶어요").with_session("s-crisis"))
            .await;
        assert_eq!(output.agent_type, AgentKind::Companion);
        assert!(output.reply.contains("1393"));
        assert!(has_safety_question(&output.reply));
        assert_eq!(output.emotion.unwrap().risk_level, RiskLevel::Crisis);
        assert_eq!(h.alert.count(), 1);

        let risks = h.memory.risk_events("user_001").await.unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].risk_level, RiskLevel::Crisis);
    }

    #[tokio::test]
    async fn welfare_retrieval_outage_uses_fallback_block() {
        let h = harness_with(
            ScriptedCompletion::replies(&[classification_json("welfare", 0).as_str(), "주민센터에 문의해 보세요."]),
            CountingMemory::new(),
            Arc::new(FailingRetrieval),
        );

        let state = h.orchestrator.process(TurnState::new("s1", "user_001", "기초연금 받을 수 있나요?")).await;
        assert_eq!(state.current_agent(), AgentKind::Welfare);
        assert!(!state.reply().unwrap().is_empty());
        assert_eq!(state.retrieved_context(), [WELFARE_FALLBACK_CONTEXT.to_string()]);
    }

    #[tokio::test]
    async fn save_failure_still_returns_reply() {
        let h = harness_with(
            ScriptedCompletion::replies(&[classification_json("companion", 0).as_str(), "반가워요! 오늘 기분은 어떠세요?"]),
            CountingMemory::failing_saves(),
            Arc::new(CatalogRetrieval::builtin()),
        );
        let mut events = h.orchestrator.events().subscribe();

        let output = h.orchestrator.handle_turn(TurnInput::new("user_001", "안녕하세요")).await;
        assert_eq!(output.reply, "반가워요! 오늘 기분은 어떠세요?");
        assert_eq!(h.memory.saves(), 1);

        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::ErrorOccurred { context, .. } = event.as_ref() {
                saw_error |= context == "memory_save";
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn classifier_outage_still_answers_as_companion() {
        let h = harness_with(
            ScriptedCompletion::new(vec![
                Err(ProviderError::Timeout("60s".into())),
                Ok("네, 듣고 있어요.".into()),
            ]),
            CountingMemory::new(),
            Arc::new(CatalogRetrieval::builtin()),
        );

        let output = h.orchestrator.handle_turn(TurnInput::new("user_001", "있잖아요")).await;
        assert_eq!(output.agent_type, AgentKind::Companion);
        assert_eq!(output.reply, "네, 듣고 있어요.");
        assert!(output.emotion.is_none());
        assert!(output.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn profile_reaches_specialist_prompt() {
        let h = harness(&[classification_json("daily", 0).as_str(), "강북구 약국은 9시에 열어요."]);

        h.orchestrator.process(TurnState::new("s1", "user_001", "약국 언제 열어요?")).await;
        let calls = h.completion.calls();
        assert!(calls[1].0.contains("김순자"));
        assert_eq!(h.memory.loads(), 1);
    }

    #[tokio::test]
    async fn session_id_generated_or_kept() {
        let h = harness(&["{\"intent\": \"end\"}", "{\"intent\": \"end\"}"]);

        let generated = h.orchestrator.handle_turn(TurnInput::new("user_001", "잘가요")).await;
        assert!(uuid::Uuid::parse_str(&generated.session_id).is_ok());

        let kept = h
            .orchestrator
            .handle_turn(TurnInput::new("user_001", "잘가요").with_session("s-kept"))
            .await;
        assert_eq!(kept.session_id, "s-kept");
    }

    #[tokio::test]
    async fn turns_accumulate_in_session_history() {
        let h = harness(&[
            &classification_json("companion", 0),
            "반가워요!",
            &classification_json("companion", 0),
            "그러셨군요.",
        ]);

        for message in ["안녕하세요", "오늘 산책했어요"] {
            h.orchestrator
                .handle_turn(TurnInput::new("user_001", message).with_session("s-history"))
                .await;
        }
        let record = h.memory.conversation("s-history").await.unwrap().unwrap();
        let contents: Vec<&str> = record.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["안녕하세요", "반가워요!", "오늘 산책했어요", "그러셨군요."]);
    }

    /// Completion that answers "end" after a delay and tracks how many calls
    /// overlap.
    #[derive(Default)]
    struct OverlapProbe {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TextCompletion for OverlapProbe {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok("{\"intent\": \"end\"}".into())
        }
    }

    fn probe_orchestrator(probe: Arc<OverlapProbe>) -> Orchestrator {
        Orchestrator::new(
            probe,
            Arc::new(CountingMemory::new()),
            Arc::new(CatalogRetrieval::builtin()),
            Arc::new(RecordingAlert::default()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn same_session_turns_are_serialized() {
        let probe = Arc::new(OverlapProbe::default());
        let orchestrator = probe_orchestrator(probe.clone());

        tokio::join!(
            orchestrator.handle_turn(TurnInput::new("user_001", "잘가").with_session("shared")),
            orchestrator.handle_turn(TurnInput::new("user_001", "잘가요").with_session("shared")),
        );
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn different_sessions_run_concurrently() {
        let probe = Arc::new(OverlapProbe::default());
        let orchestrator = probe_orchestrator(probe.clone());

        tokio::join!(
            orchestrator.handle_turn(TurnInput::new("user_001", "잘가").with_session("a")),
            orchestrator.handle_turn(TurnInput::new("user_002", "잘가").with_session("b")),
        );
        assert_eq!(probe.peak.load(Ordering::SeqCst), 2);
        assert_eq!(orchestrator.active_sessions(), 0);
    }

    /// Completion that never answers within a test's patience.
    struct StalledCompletion;

    #[async_trait]
    impl TextCompletion for StalledCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("{\"intent\": \"end\"}".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_turns_release_sessions_and_persist_nothing() {
        let memory = Arc::new(CountingMemory::new());
        let orchestrator = Orchestrator::new(
            Arc::new(StalledCompletion),
            memory.clone(),
            Arc::new(CatalogRetrieval::builtin()),
            Arc::new(RecordingAlert::default()),
        );

        for i in 0..5 {
            let turn = orchestrator.handle_turn(TurnInput::new("user_001", "안녕하세요").with_session(format!("s-{i}")));
            assert!(tokio::time::timeout(Duration::from_millis(10), turn).await.is_err());
        }

        assert_eq!(orchestrator.active_sessions(), 0);
        assert_eq!(memory.saves(), 0);
        for i in 0..5 {
            assert!(memory.conversation(&format!("s-{i}")).await.unwrap().is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_one_turn_keeps_the_queued_turn_on_its_session() {
        let probe = Arc::new(OverlapProbe::default());
        let orchestrator = probe_orchestrator(probe.clone());

        let first = orchestrator.handle_turn(TurnInput::new("user_001", "잘가").with_session("shared"));
        let second = orchestrator.handle_turn(TurnInput::new("user_001", "잘가요").with_session("shared"));
        let (cancelled, finished) = tokio::join!(tokio::time::timeout(Duration::from_millis(10), first), second);

        assert!(cancelled.is_err());
        assert_eq!(finished.session_id, "shared");
        assert_eq!(finished.agent_type, AgentKind::End);
        assert_eq!(orchestrator.active_sessions(), 0);
    }
}
