//! Provider router: selects the correct LLM provider based on config.
//!
//! Handles provider creation and assembles the fallback chain that the
//! assistant dispatcher submits to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use propdesk_core::provider::Provider;
use tracing::{debug, warn};
use crate::anthropic::AnthropicProvider;
use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes generation requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
    fallback_order: Vec<String>,
    timeouts: HashMap<String, Duration>,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
            fallback_order: Vec::new(),
            timeouts: HashMap::new(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Set the providers tried after the default one, in order.
    pub fn set_fallbacks(&mut self, names: Vec<String>) {
        self.fallback_order = names;
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The provider the dispatcher should submit to.
    ///
    /// Without fallbacks this is the default provider itself. With fallbacks
    /// it is a [`FallbackProvider`] walking default → fallbacks in order.
    /// Fallback names that were never registered are skipped with a warning.
    pub fn chain(&self) -> Option<Arc<dyn Provider>> {
        let primary = self.default()?;
        if self.fallback_order.is_empty() {
            return Some(primary);
        }

        let timeout_for = |name: &str| {
            self.timeouts
                .get(name)
                .copied()
                .unwrap_or(Duration::from_secs(120))
        };

        let mut chain = FallbackProvider::new(format!("{}+fallback", self.default_provider))
            .add(primary, timeout_for(&self.default_provider));

        for name in &self.fallback_order {
            if name == &self.default_provider {
                continue;
            }
            match self.get(name) {
                Some(provider) => chain = chain.add(provider, timeout_for(name)),
                None => warn!(provider = %name, "Fallback provider not configured, skipping"),
            }
        }

        debug!(providers = chain.len(), "Built provider fallback chain");
        Some(Arc::new(chain))
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &propdesk_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        let provider: Arc<dyn Provider> = if name == "anthropic" {
            let mut p = AnthropicProvider::new(&api_key);
            if provider_config.api_url.is_some() {
                p = p.with_base_url(&base_url);
            }
            Arc::new(p)
        } else {
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key))
        };

        if let Some(secs) = provider_config.timeout_secs {
            router.timeouts.insert(name.clone(), Duration::from_secs(secs));
        }
        router.register(name.clone(), provider);
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);

        let provider: Arc<dyn Provider> = if config.default_provider == "anthropic" {
            Arc::new(AnthropicProvider::new(&api_key))
        } else {
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            ))
        };

        router.register(config.default_provider.clone(), provider);
    }

    router.set_fallbacks(config.fallback_providers.clone());
    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "anthropic" => "https://api.anthropic.com".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdesk_config::{AppConfig, ProviderConfig};

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openrouter");
        let provider = Arc::new(OpenAiCompatProvider::new(
            "openrouter",
            default_base_url("openrouter"),
            "sk-test",
        ));
        router.register("openrouter", provider);

        assert!(router.get("openrouter").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(router.list(), ["openrouter"]);
        let chain = router.chain().unwrap();
        assert_eq!(chain.name(), "openrouter");
    }

    #[test]
    fn fallbacks_wrap_default_in_chain() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: None,
                timeout_secs: Some(5),
            },
        );
        config.fallback_providers = vec!["ollama".into(), "missing".into()];

        let router = build_from_config(&config);
        let chain = router.chain().unwrap();
        assert_eq!(chain.name(), "openrouter+fallback");
        assert_eq!(router.timeouts.get("ollama"), Some(&Duration::from_secs(5)));
    }
}
