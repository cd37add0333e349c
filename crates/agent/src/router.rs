//! Routing decision after classification. Pure and total.

use carebridge_core::state::AgentKind;

/// Where the turn goes once the classifier has spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage {
    Welfare,
    Companion,
    Daily,
    /// Skip the specialists and go straight to persistence.
    Finalize,
}

pub fn route(agent: AgentKind) -> NextStage {
    match agent {
        AgentKind::Welfare => NextStage::Welfare,
        AgentKind::Companion => NextStage::Companion,
        AgentKind::Daily => NextStage::Daily,
        AgentKind::End => NextStage::Finalize,
        AgentKind::Supervisor => NextStage::Companion,
    }
}

/// Route a raw label; anything outside the declared set goes to the companion.
pub fn route_label(label: &str) -> NextStage {
    AgentKind::parse(label).map_or(NextStage::Companion, route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_agents_route_to_themselves() {
        assert_eq!(route(AgentKind::Welfare), NextStage::Welfare);
        assert_eq!(route(AgentKind::Companion), NextStage::Companion);
        assert_eq!(route(AgentKind::Daily), NextStage::Daily);
        assert_eq!(route(AgentKind::End), NextStage::Finalize);
    }

    #[test]
    fn supervisor_falls_through_to_companion() {
        assert_eq!(route(AgentKind::Supervisor), NextStage::Companion);
    }

    #[test]
    fn unknown_labels_route_to_companion() {
        for label in ["", "weather", "WELFARE ", "finance", "종료"] {
            let expected = if label == "WELFARE " {
                NextStage::Welfare
            } else {
                NextStage::Companion
            };
            assert_eq!(route_label(label), expected, "label {label:?}");
        }
    }

    #[test]
    fn routing_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(route_label("daily"), NextStage::Daily);
            assert_eq!(route_label("end"), NextStage::Finalize);
        }
    }
}
