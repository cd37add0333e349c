//! Supervisor: intent and emotion classification for the latest utterance.
//!
//! The model is asked for a single JSON object. When its output cannot be
//! parsed the supervisor falls back to keyword routing; when the model
//! cannot be reached at all the turn goes to the companion. Neither case is
//! surfaced to the caller as an error.

use std::sync::Arc;
use carebridge_core::emotion::{EmotionAnalysis, PrimaryEmotion, RiskLevel};
use carebridge_core::error::ProviderError;
use carebridge_core::profile::UserProfile;
use carebridge_core::provider::TextCompletion;
use carebridge_core::state::{AgentKind, TurnState};
use carebridge_core::message::Message;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::prompts;

pub const WELFARE_KEYWORDS: &[&str] = &["복지", "지원", "혜택", "연금", "수당", "보조금", "신청", "자격"];
pub const DAILY_KEYWORDS: &[&str] = &["날씨", "병원", "약국", "일정", "예약", "시간"];
pub const END_KEYWORDS: &[&str] = &["잘가", "끝", "종료", "나중에"];

const DEFAULT_INTENT_CONFIDENCE: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classifier output could not be parsed: {0}")]
    Parse(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// The classifier's reading of one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: AgentKind,
    pub intent_confidence: f32,
    pub emotion: EmotionAnalysis,
    /// Non-empty greeting to append before routing.
    pub greeting: Option<String>,
}

/// How the supervisor reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Model,
    KeywordFallback,
    ProviderFailure,
    EmptyInput,
}

/// Pull the JSON object out of raw model text.
///
/// Takes the inside of a fenced code block when there is one, then the first
/// balanced `{...}` span.
pub fn extract_json(raw: &str) -> Result<Value, ClassifyError> {
    let body = fenced_block(raw).unwrap_or(raw);
    let span = first_balanced_object(body)
        .ok_or_else(|| ClassifyError::Parse("no balanced JSON object in output".into()))?;
    serde_json::from_str(span).map_err(|e| ClassifyError::Parse(e.to_string()))
}

fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")? + 3;
    let rest = &raw[start..];
    // Skip an info string such as "json" on the opening fence line
    let rest = match rest.find('\n') {
        Some(nl) if !rest[..nl].contains('{') => &rest[nl + 1..],
        _ => rest,
    };
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_risk(value: &Value) -> Option<RiskLevel> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(RiskLevel::from_raw(raw))
}

/// Interpret a parsed classifier object. Missing fields take defaults and an
/// unrecognised intent resolves to the companion.
pub fn parse_classification(value: &Value) -> Result<Classification, ClassifyError> {
    let object = value
        .as_object()
        .ok_or_else(|| ClassifyError::Parse("classifier output is not a JSON object".into()))?;

    let intent = object
        .get("intent")
        .and_then(Value::as_str)
        .and_then(AgentKind::parse)
        .filter(|kind| *kind != AgentKind::Supervisor)
        .unwrap_or(AgentKind::Companion);

    let intent_confidence = object
        .get("intent_confidence")
        .and_then(as_f32)
        .filter(|c| !c.is_nan())
        .map_or(DEFAULT_INTENT_CONFIDENCE, |c| c.clamp(0.0, 1.0));

    let emotion = match object.get("emotion").and_then(Value::as_object) {
        Some(e) => {
            let primary = e
                .get("primary")
                .and_then(Value::as_str)
                .map(PrimaryEmotion::from_label)
                .unwrap_or_default();
            let confidence = e
                .get("confidence")
                .and_then(as_f32)
                .unwrap_or(EmotionAnalysis::DEFAULT_CONFIDENCE);
            let risk = e.get("risk_level").and_then(as_risk).unwrap_or_default();
            let keywords = e
                .get("keywords")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(String::from)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            EmotionAnalysis::new(primary, confidence, risk).with_keywords(keywords)
        }
        None => EmotionAnalysis::default(),
    };

    let greeting = object
        .get("greeting_response")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(String::from);

    Ok(Classification {
        intent,
        intent_confidence,
        emotion,
        greeting,
    })
}

/// Deterministic routing used when the model output is unusable.
///
/// Checks welfare, then daily, then end keywords; anything else is companion.
pub fn keyword_fallback(utterance: &str) -> AgentKind {
    let lower = utterance.to_lowercase();
    let hits = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if hits(WELFARE_KEYWORDS) {
        AgentKind::Welfare
    } else if hits(DAILY_KEYWORDS) {
        AgentKind::Daily
    } else if hits(END_KEYWORDS) {
        AgentKind::End
    } else {
        AgentKind::Companion
    }
}

pub struct Supervisor {
    completion: Arc<dyn TextCompletion>,
}

impl Supervisor {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    /// Ask the model to classify `utterance`.
    pub async fn classify(
        &self,
        utterance: &str,
        profile: Option<&UserProfile>,
    ) -> Result<Classification, ClassifyError> {
        let system = prompts::supervisor_system(profile);
        let request = prompts::supervisor_request(utterance);

        let raw = self.completion.complete(&system, &request).await?;
        debug!(raw_len = raw.len(), "Classifier output received");

        let value = extract_json(&raw)?;
        parse_classification(&value)
    }

    /// Classification stage: derive the next state from `state`.
    pub async fn run(&self, state: &TurnState) -> (TurnState, Resolution) {
        let Some(utterance) = state
            .last_user_message()
            .filter(|m| !m.trim().is_empty())
        else {
            warn!(session_id = %state.session_id(), "Empty message, routing to companion");
            let next = state
                .with_agent(AgentKind::Companion)
                .with_error("empty message");
            return (next, Resolution::EmptyInput);
        };

        match self.classify(utterance, state.user_profile()).await {
            Ok(classification) => {
                info!(
                    session_id = %state.session_id(),
                    intent = %classification.intent,
                    primary = %classification.emotion.primary,
                    risk_level = classification.emotion.risk_level.as_u8(),
                    "Classified utterance"
                );
                let mut next = state.with_emotion(classification.emotion);
                if let Some(greeting) = classification.greeting {
                    next = next.with_message(Message::assistant(greeting));
                }
                (next.with_agent(classification.intent), Resolution::Model)
            }
            Err(ClassifyError::Parse(reason)) => {
                let intent = keyword_fallback(utterance);
                warn!(
                    session_id = %state.session_id(),
                    %reason,
                    intent = %intent,
                    "Classifier output unparseable, using keyword fallback"
                );
                let next = state
                    .with_emotion(EmotionAnalysis::default())
                    .with_agent(intent)
                    .with_error(format!("classifier parse error, keyword fallback: {intent}"));
                (next, Resolution::KeywordFallback)
            }
            Err(ClassifyError::Provider(e)) => {
                warn!(session_id = %state.session_id(), error = %e, "Classifier unavailable, routing to companion");
                let next = state
                    .with_agent(AgentKind::Companion)
                    .with_error(e.to_string());
                (next, Resolution::ProviderFailure)
            }
        }
    }
}
