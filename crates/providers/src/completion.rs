//! Bounded text completion on top of any `Provider`.
//!
//! The turn pipeline speaks `TextCompletion` (system + user prompt in, text
//! out). `ProviderCompletion` builds the chat request and enforces the
//! per-call timeout with `tokio::time::timeout`.

use async_trait::async_trait;
use carebridge_core::error::ProviderError;
use carebridge_core::message::Message;
use carebridge_core::provider::{Provider, ProviderRequest, TextCompletion};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct ProviderCompletion {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ProviderCompletion {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from application config and a resolved provider.
    pub fn from_config(provider: Arc<dyn Provider>, config: &carebridge_config::AppConfig) -> Self {
        Self::new(provider, &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_timeout(config.request_timeout())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextCompletion for ProviderCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> std::result::Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let provider_name = self.provider.name().to_string();
        debug!(provider = %provider_name, model = %self.model, "Text completion");

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response.message.content),
            Ok(Err(e)) => {
                warn!(provider = %provider_name, error = %e, "Completion failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    provider = %provider_name,
                    timeout_secs = self.timeout.as_secs(),
                    "Completion timed out"
                );
                Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}
