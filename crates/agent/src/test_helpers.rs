//! Shared test doubles for pipeline tests.

use async_trait::async_trait;
use carebridge_core::emotion::{EmotionAnalysis, RiskLevel};
use carebridge_core::error::{AlertError, MemoryError, ProviderError, RetrievalError};
use carebridge_core::memory::{ConversationRecord, MemoryGateway, RiskEvent};
use carebridge_core::message::Message;
use carebridge_core::profile::UserProfile;
use carebridge_core::provider::TextCompletion;
use carebridge_core::retrieval::{ProgramMatch, RetrievalService};
use carebridge_core::alert::CrisisAlert;
use carebridge_memory::InMemoryGateway;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A completion that returns scripted results in order and records every
/// prompt pair it was given. Once the script runs out every call fails.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// `(system_prompt, user_prompt)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::NotConfigured("script exhausted".into())))
    }
}

/// Classifier JSON with the given intent and risk level.
pub fn classification_json(intent: &str, risk_level: u8) -> String {
    serde_json::json!({
        "intent": intent,
        "intent_confidence": 0.9,
        "emotion": {
            "primary": if risk_level > 0 { "sad" } else { "neutral" },
            "confidence": 0.8,
            "risk_level": risk_level,
            "keywords": []
        },
        "greeting_response": ""
    })
    .to_string()
}

/// Retrieval that is always down.
pub struct FailingRetrieval;

#[async_trait]
impl RetrievalService for FailingRetrieval {
    async fn get_context(&self, _query: &str, _top_k: usize) -> Result<String, RetrievalError> {
        Err(RetrievalError::Unavailable("index offline".into()))
    }

    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _category: Option<&str>,
    ) -> Result<Vec<ProgramMatch>, RetrievalError> {
        Err(RetrievalError::Unavailable("index offline".into()))
    }
}

/// Alert that records every notification.
#[derive(Default)]
pub struct RecordingAlert {
    pub notified: Mutex<Vec<(String, RiskLevel, String)>>,
}

impl RecordingAlert {
    pub fn count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }
}

#[async_trait]
impl CrisisAlert for RecordingAlert {
    async fn notify(&self, user_id: &str, risk_level: RiskLevel, last_message: &str) -> Result<(), AlertError> {
        self.notified
            .lock()
            .unwrap()
            .push((user_id.to_string(), risk_level, last_message.to_string()));
        Ok(())
    }
}

/// In-memory gateway that counts loads and saves and can be told to fail saves.
pub struct CountingMemory {
    inner: InMemoryGateway,
    loads: AtomicUsize,
    saves: AtomicUsize,
    fail_saves: bool,
}

impl CountingMemory {
    pub fn new() -> Self {
        Self {
            inner: InMemoryGateway::with_sample_profile(),
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            fail_saves: false,
        }
    }

    pub fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Self::new()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemoryGateway for CountingMemory {
    fn name(&self) -> &str {
        "counting"
    }

    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, MemoryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(user_id).await
    }

    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        messages: &[Message],
        emotion: Option<&EmotionAnalysis>,
    ) -> Result<(), MemoryError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(MemoryError::Storage("disk full".into()));
        }
        self.inner.save(user_id, session_id, messages, emotion).await
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), MemoryError> {
        self.inner.upsert_profile(profile).await
    }

    async fn conversation(&self, session_id: &str) -> Result<Option<ConversationRecord>, MemoryError> {
        self.inner.conversation(session_id).await
    }

    async fn end_session(&self, session_id: &str) -> Result<bool, MemoryError> {
        self.inner.end_session(session_id).await
    }

    async fn risk_events(&self, user_id: &str) -> Result<Vec<RiskEvent>, MemoryError> {
        self.inner.risk_events(user_id).await
    }
}
