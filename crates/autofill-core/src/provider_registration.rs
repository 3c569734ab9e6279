//! Provider registration logic for the Agent.
//!
//! Only the providers a run can reach are built: the default one and, when
//! configured, the one tools use for their own model calls. Each is
//! registered under its full reference (`openai.default`, `groq.default`).

use anyhow::Result;
use autofill_config::{Config, ProviderConfigRef};
use autofill_providers::{OpenAIProvider, ProviderRegistry};
use tracing::debug;

/// Provider references a run needs, default first, without duplicates.
pub fn determine_providers_to_register(config: &Config) -> Vec<String> {
    let mut providers = vec![config.providers.default_provider.clone()];
    let tools = config.get_tools_provider();
    if !providers.iter().any(|p| p == tools) {
        providers.push(tools.to_string());
    }
    providers
}

pub fn register_providers(config: &Config) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    for reference in determine_providers_to_register(config) {
        let settings = match config.get_provider_config(&reference)? {
            ProviderConfigRef::OpenAI(settings) | ProviderConfigRef::OpenAICompatible(settings) => {
                settings
            }
        };

        debug!("Registering provider {} (model {})", reference, settings.model);
        let provider = OpenAIProvider::new_with_name(
            reference.clone(),
            settings.resolved_api_key()?,
            Some(settings.model.clone()),
            settings.base_url.clone(),
            settings.max_tokens,
            settings.temperature,
        )?;
        registry.register(provider);
    }

    debug!(
        "Setting default provider to: {}",
        config.providers.default_provider
    );
    registry.set_default(&config.providers.default_provider)?;
    debug!("Registered providers: {:?}", registry.list_providers());

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autofill_config::OpenAIConfig;

    fn config_with_key() -> Config {
        let mut config = Config::default();
        for settings in config.providers.openai.values_mut() {
            settings.api_key = "sk-test".to_string();
        }
        config
    }

    #[test]
    fn test_default_only() {
        let config = config_with_key();
        assert_eq!(determine_providers_to_register(&config), vec!["openai.default"]);

        let registry = register_providers(&config).unwrap();
        let provider = registry.get(None).unwrap();
        assert_eq!(provider.name(), "openai.default");
        assert_eq!(provider.model(), "gpt-4o");
    }

    #[test]
    fn test_tools_provider_registered_under_full_reference() {
        let mut config = config_with_key();
        config.providers.openai_compatible.insert(
            "groq".to_string(),
            OpenAIConfig {
                api_key: "gsk-test".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                base_url: Some("https://api.groq.com/openai/v1".to_string()),
                max_tokens: None,
                temperature: Some(0.2),
            },
        );
        config.providers.tools = Some("groq.default".to_string());

        let registry = register_providers(&config).unwrap();
        let tools = registry.get(Some("groq.default")).unwrap();
        assert_eq!(tools.model(), "llama-3.3-70b-versatile");
        assert_eq!(registry.get(None).unwrap().name(), "openai.default");

        let mut names = registry.list_providers();
        names.sort();
        assert_eq!(names, vec!["groq.default", "openai.default"]);
    }

    #[test]
    fn test_unknown_reference_fails() {
        let mut config = config_with_key();
        config.providers.default_provider = "openai.missing".to_string();
        assert!(register_providers(&config).is_err());
    }
}
