//! User profile: the long-lived record owned by the memory gateway.
//!
//! A profile spans many turns and sessions. Within a single turn it is
//! loaded once and then treated as read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A family member listed on the profile (e.g. 아들 민수).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub relation: String,
    pub name: String,
}

impl FamilyMember {
    pub fn new(relation: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            name: name.into(),
        }
    }
}

/// An elder user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub health_conditions: BTreeSet<String>,

    /// Whether the user currently receives the basic pension (기초연금).
    #[serde(default)]
    pub receives_basic_pension: bool,

    /// Ordered as entered; the first member is the primary contact.
    #[serde(default)]
    pub family_members: Vec<FamilyMember>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_hospital: Option<String>,
}

impl UserProfile {
    /// An empty profile for the given user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            age: None,
            address: None,
            health_conditions: BTreeSet::new(),
            receives_basic_pension: false,
            family_members: Vec::new(),
            income_level: None,
            preferred_hospital: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.health_conditions.insert(condition.into());
        self
    }

    pub fn with_basic_pension(mut self, receives: bool) -> Self {
        self.receives_basic_pension = receives;
        self
    }

    pub fn with_family_member(mut self, relation: impl Into<String>, name: impl Into<String>) -> Self {
        self.family_members.push(FamilyMember::new(relation, name));
        self
    }

    /// The sample profile used to seed development deployments.
    pub fn sample() -> Self {
        Self::new("user_001")
            .with_name("김순자")
            .with_age(75)
            .with_address("서울 강북구")
            .with_condition("고혈압")
            .with_condition("당뇨")
            .with_condition("무릎 관절염")
            .with_basic_pension(true)
            .with_family_member("아들", "민수")
            .with_family_member("손녀", "지은")
    }

    /// Family members rendered as "아들 민수, 손녀 지은".
    pub fn family_summary(&self) -> Option<String> {
        if self.family_members.is_empty() {
            return None;
        }
        Some(
            self.family_members
                .iter()
                .map(|m| format!("{} {}", m.relation, m.name))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    /// Health conditions rendered as a comma-separated list.
    pub fn conditions_summary(&self) -> Option<String> {
        if self.health_conditions.is_empty() {
            return None;
        }
        Some(
            self.health_conditions
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}
