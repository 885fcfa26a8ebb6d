use crate::config::Config;
use crate::error::{LoopError, Result};
use crate::providers::{OllamaProvider, OpenAIProvider};
use crate::traits::Provider;
use std::sync::Arc;
use tracing::info;

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider_name();
    info!(provider = provider_name, model = config.model_name(), "model backend selected");

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut provider = OllamaProvider::new()
                .with_model(config.model_name())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "openai" => {
            if config.api_key.is_empty() {
                return Err(LoopError::Config(
                    "No API key found. Set OPEN_API_KEY or run 'toolloop onboard'.".into(),
                ));
            }
            let mut provider = OpenAIProvider::new(config.api_key.clone())
                .with_model(config.model_name())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        _ => Err(LoopError::Config(format!(
            "Unknown provider: {}. Available: openai, ollama",
            provider_name
        ))),
    }
}
