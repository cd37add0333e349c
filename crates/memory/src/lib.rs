//! Memory gateway implementations for CareBridge.

pub mod noop;
pub mod in_memory;

pub use noop::NoopGateway;
pub use in_memory::InMemoryGateway;

use carebridge_core::event::EventBus;
use carebridge_core::memory::MemoryGateway;
use std::sync::Arc;

/// Build the configured gateway.
pub fn build_from_config(
    config: &carebridge_config::MemoryConfig,
    events: Arc<EventBus>,
) -> Arc<dyn MemoryGateway> {
    match config.backend.as_str() {
        "none" => Arc::new(NoopGateway),
        _ => {
            let gateway = if config.seed_sample_profile {
                InMemoryGateway::with_sample_profile()
            } else {
                InMemoryGateway::new()
            };
            Arc::new(
                gateway
                    .with_summary_threshold(config.summary_threshold)
                    .with_event_bus(events),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_seeded_in_memory_by_default() {
        let memory = build_from_config(&carebridge_config::MemoryConfig::default(), Arc::new(EventBus::default()));
        assert_eq!(memory.name(), "in_memory");
        assert!(memory.load("user_001").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn builds_noop_backend() {
        let config = carebridge_config::MemoryConfig {
            backend: "none".into(),
            ..Default::default()
        };
        let memory = build_from_config(&config, Arc::new(EventBus::default()));
        assert_eq!(memory.name(), "none");
    }
}
