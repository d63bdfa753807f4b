//! Provider router: builds the configured providers and selects the one a
//! turn talks to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use affinity_config::AppConfig;
use affinity_core::provider::Provider;
use tracing::{debug, warn};

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Named providers plus the default selection.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The default provider followed by `fallbacks`, as one provider.
    ///
    /// Returns the default provider unwrapped when no fallback resolves.
    /// Unknown fallback names are skipped with a warning.
    pub fn with_fallbacks(&self, fallbacks: &[String], timeout: Duration) -> Option<Arc<dyn Provider>> {
        let primary = self.default()?;

        let extra: Vec<Arc<dyn Provider>> = fallbacks
            .iter()
            .filter(|name| **name != self.default_provider)
            .filter_map(|name| {
                let found = self.get(name);
                if found.is_none() {
                    warn!(provider = %name, "Unknown fallback provider, skipping");
                }
                found
            })
            .collect();

        if extra.is_empty() {
            return Some(primary);
        }

        let chain = extra
            .into_iter()
            .fold(FallbackProvider::new("fallback").add(primary, timeout), |chain, p| {
                chain.add(p, timeout)
            });
        debug!(len = chain.len(), "Built provider fallback chain");
        Some(Arc::new(chain))
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
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

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)),
        );
    }

    // The default provider exists even if not explicitly configured
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
        );
    }

    router
}

/// The provider every generation call of a turn goes through.
pub fn primary_from_config(config: &AppConfig) -> Option<Arc<dyn Provider>> {
    build_from_config(config).with_fallbacks(
        &config.fallback_providers,
        Duration::from_secs(config.engine.generation_timeout_secs),
    )
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affinity_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openrouter");
        router.register(
            "openrouter",
            Arc::new(OpenAiCompatProvider::new("openrouter", default_base_url("openrouter"), "sk-test")),
        );

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
        assert_eq!(router.default().as_deref().map(|p| p.name()), Some("openrouter"));
        assert!(router.get("openai").is_none());
    }

    #[test]
    fn primary_without_fallbacks_is_the_default_provider() {
        let config = AppConfig::default();
        let primary = primary_from_config(&config).unwrap();
        assert_eq!(primary.name(), "openrouter");
    }

    #[test]
    fn fallbacks_wrap_the_default_in_a_chain() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "deepseek".into(),
            ProviderConfig {
                api_key: Some("sk-ds".into()),
                api_url: None,
                default_model: None,
            },
        );
        config.fallback_providers = vec!["deepseek".into(), "missing".into()];

        let primary = primary_from_config(&config).unwrap();
        assert_eq!(primary.name(), "fallback");
    }

    #[test]
    fn unknown_fallbacks_only_keep_the_default() {
        let mut config = AppConfig::default();
        config.fallback_providers = vec!["missing".into(), "openrouter".into()];
        let primary = primary_from_config(&config).unwrap();
        assert_eq!(primary.name(), "openrouter");
    }
}
