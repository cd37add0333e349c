//! Wiring: build every collaborator of the pipeline from [`AppConfig`].

use carebridge_config::AppConfig;
use carebridge_core::event::EventBus;
use carebridge_core::memory::MemoryGateway;
use carebridge_core::provider::TextCompletion;
use carebridge_core::retrieval::RetrievalService;
use carebridge_core::{Error, Result};
use carebridge_providers::ProviderCompletion;
use carebridge_retrieval::CatalogRetrieval;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::alert::LoggingCrisisAlert;
use crate::orchestrator::Orchestrator;

/// A fully wired pipeline plus the collaborators the outer surfaces read
/// directly (history, welfare search).
pub struct Runtime {
    pub orchestrator: Arc<Orchestrator>,
    pub memory: Arc<dyn MemoryGateway>,
    pub retrieval: Arc<dyn RetrievalService>,
    pub events: Arc<EventBus>,
    /// `provider/model` that answers the turns.
    pub model_label: String,
}

impl Runtime {
    /// Build from configuration using the configured default provider.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let router = carebridge_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| Error::Config {
            message: format!("default provider '{}' is not available", config.default_provider),
        })?;

        let completion = ProviderCompletion::from_config(provider, config);
        let model_label = format!("{}/{}", router.default_name(), completion.model());
        Self::assemble(config, Arc::new(completion), model_label)
    }

    /// Build from configuration with an injected completion capability.
    pub fn with_completion(config: &AppConfig, completion: Arc<dyn TextCompletion>) -> Result<Self> {
        Self::assemble(config, completion, "injected".into())
    }

    fn assemble(config: &AppConfig, completion: Arc<dyn TextCompletion>, model_label: String) -> Result<Self> {
        let events = Arc::new(EventBus::default());
        let memory = carebridge_memory::build_from_config(&config.memory, events.clone());
        let retrieval: Arc<dyn RetrievalService> =
            Arc::new(CatalogRetrieval::from_path(config.retrieval.catalog_path.as_deref().map(Path::new))?);
        let alert = Arc::new(LoggingCrisisAlert::new(events.clone()));

        let orchestrator = Orchestrator::new(completion, memory.clone(), retrieval.clone(), alert)
            .with_event_bus(events.clone())
            .with_top_k(config.retrieval.top_k);

        info!(
            model = %model_label,
            memory = memory.name(),
            top_k = config.retrieval.top_k,
            "Pipeline ready"
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            memory,
            retrieval,
            events,
            model_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::TurnInput;
    use crate::test_helpers::{ScriptedCompletion, classification_json};
    use carebridge_core::state::AgentKind;

    #[tokio::test]
    async fn from_config_uses_default_provider() {
        let runtime = Runtime::from_config(&AppConfig::default()).unwrap();
        assert_eq!(runtime.model_label, "upstage/solar-pro2");
        assert_eq!(runtime.memory.name(), "in_memory");
        assert_eq!(runtime.retrieval.categories().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn injected_completion_drives_turns() {
        let completion = Arc::new(ScriptedCompletion::replies(&[
            classification_json("welfare", 0).as_str(),
            "에너지바우처는 주민센터에서 신청하실 수 있어요.",
        ]));
        let runtime = Runtime::with_completion(&AppConfig::default(), completion).unwrap();

        let output = runtime
            .orchestrator
            .handle_turn(TurnInput::new("user_001", "에너지바우처 신청 방법").with_session("s1"))
            .await;
        assert_eq!(output.agent_type, AgentKind::Welfare);
        assert!(runtime.memory.conversation("s1").await.unwrap().is_some());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let mut config = AppConfig::default();
        config.retrieval.catalog_path = Some("/nonexistent/catalog.json".into());
        let completion = Arc::new(ScriptedCompletion::replies(&[]));
        assert!(matches!(
            Runtime::with_completion(&config, completion),
            Err(Error::Retrieval(_))
        ));
    }
}
