//! Emotion and risk assessment produced once per turn by the classifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The dominant emotion detected in the user's utterance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryEmotion {
    Happy,
    #[default]
    Neutral,
    Sad,
    Anxious,
    Angry,
    Lonely,
}

impl PrimaryEmotion {
    /// Parse a model-supplied label. Unknown labels map to `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "happy" => Self::Happy,
            "sad" => Self::Sad,
            "anxious" => Self::Anxious,
            "angry" => Self::Angry,
            "lonely" => Self::Lonely,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
            Self::Lonely => "lonely",
        }
    }
}

impl std::fmt::Display for PrimaryEmotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotional crisis severity for the current turn: 0 normal, 1 caution, 2 crisis.
///
/// Serialized as the bare integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum RiskLevel {
    #[default]
    Normal,
    Caution,
    Crisis,
}

impl RiskLevel {
    /// Clamp any integer into the 0..=2 range.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            i64::MIN..=0 => Self::Normal,
            1 => Self::Caution,
            _ => Self::Crisis,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Caution => 1,
            Self::Crisis => 2,
        }
    }

    /// Whether a risk event must be recorded for downstream alerting.
    pub fn needs_record(self) -> bool {
        self >= Self::Caution
    }

    /// Whether the crisis-escalation branch applies.
    pub fn is_crisis(self) -> bool {
        self == Self::Crisis
    }
}

impl From<u8> for RiskLevel {
    fn from(raw: u8) -> Self {
        Self::from_raw(i64::from(raw))
    }
}

impl From<RiskLevel> for u8 {
    fn from(level: RiskLevel) -> Self {
        level.as_u8()
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// The classifier's emotion/risk assessment for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub primary: PrimaryEmotion,

    /// Always within [0, 1].
    pub confidence: f32,

    pub risk_level: RiskLevel,

    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl EmotionAnalysis {
    pub const DEFAULT_CONFIDENCE: f32 = 0.5;

    pub fn new(primary: PrimaryEmotion, confidence: f32, risk_level: RiskLevel) -> Self {
        Self {
            primary,
            confidence: clamp_confidence(confidence),
            risk_level,
            keywords: BTreeSet::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }
}

impl Default for EmotionAnalysis {
    /// The neutral assessment used when no model judgement is available.
    fn default() -> Self {
        Self::new(PrimaryEmotion::Neutral, Self::DEFAULT_CONFIDENCE, RiskLevel::Normal)
    }
}

fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        EmotionAnalysis::DEFAULT_CONFIDENCE
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_label_is_neutral() {
        assert_eq!(PrimaryEmotion::from_label("bored"), PrimaryEmotion::Neutral);
        assert_eq!(PrimaryEmotion::from_label(" Lonely "), PrimaryEmotion::Lonely);
    }

    #[test]
    fn risk_level_clamps() {
        assert_eq!(RiskLevel::from_raw(-3), RiskLevel::Normal);
        assert_eq!(RiskLevel::from_raw(1), RiskLevel::Caution);
        assert_eq!(RiskLevel::from_raw(7), RiskLevel::Crisis);
    }

    #[test]
    fn risk_level_serializes_as_integer() {
        let json = serde_json::to_string(&RiskLevel::Crisis).unwrap();
        assert_eq!(json, "2");
        let parsed: RiskLevel = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, RiskLevel::Caution);
    }

    #[test]
    fn default_analysis_is_neutral() {
        let emotion = EmotionAnalysis::default();
        assert_eq!(emotion.primary, PrimaryEmotion::Neutral);
        assert!((emotion.confidence - 0.5).abs() < f32::EPSILON);
        assert_eq!(emotion.risk_level, RiskLevel::Normal);
        assert!(emotion.keywords.is_empty());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(EmotionAnalysis::new(PrimaryEmotion::Sad, 3.0, RiskLevel::Normal).confidence, 1.0);
        assert_eq!(EmotionAnalysis::new(PrimaryEmotion::Sad, -1.0, RiskLevel::Normal).confidence, 0.0);
    }
}
