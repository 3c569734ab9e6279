use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable consulted when an OpenAI config leaves `api_key` empty
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an automation assistant for the user. Complete the tasks using the tools provided.";

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "./autofill.toml",
    "~/.config/autofill/config.toml",
    "~/.autofill.toml",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
}

/// Provider configuration with named configs per provider type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Default provider in format "<provider_type>.<config_name>"
    pub default_provider: String,

    /// Provider for model calls made inside tools (search summaries, field
    /// mapping). Falls back to `default_provider`.
    pub tools: Option<String>,

    /// Named OpenAI provider configs
    #[serde(default)]
    pub openai: HashMap<String, OpenAIConfig>,

    /// Multiple named OpenAI-compatible providers (e.g., openrouter, groq, etc.)
    #[serde(default)]
    pub openai_compatible: HashMap<String, OpenAIConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl OpenAIConfig {
    /// The configured key, or `OPENAI_API_KEY` when the file leaves it empty
    pub fn resolved_api_key(&self) -> Result<String> {
        if !self.api_key.trim().is_empty() {
            return Ok(self.api_key.clone());
        }
        match std::env::var(OPENAI_API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!(
                "No API key configured. Set `api_key` in the provider config or export {}",
                OPENAI_API_KEY_ENV
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on model calls in one run
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Append the configured spreadsheet path and form URL to the system prompt
    #[serde(default = "default_true")]
    pub include_environment_context: bool,
}

fn default_max_turns() -> u32 {
    25
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            system_prompt: default_system_prompt(),
            include_environment_context: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search page URL; the query is sent as the `q` parameter
    pub engine_url: String,
    /// How long to let the system browser render before capturing the screen
    pub render_delay_ms: u64,
    /// Where temporary screenshots are written (system temp dir when unset)
    pub screenshot_dir: Option<String>,
    pub tesseract_binary: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine_url: "https://www.google.com/search".to_string(),
            render_delay_ms: 5000,
            screenshot_dir: None,
            tesseract_binary: "tesseract".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub url: String,
    /// Upper bound on waiting for `document.readyState == "complete"`
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub keep_browser_open: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            ready_timeout_ms: 10_000,
            poll_interval_ms: 250,
            keep_browser_open: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadsheetConfig {
    /// Spreadsheet the model is told about in its system prompt
    pub default_path: Option<String>,
}

/// Browser type for WebDriver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebDriverBrowser {
    #[default]
    Safari,
    #[serde(rename = "chrome-headless")]
    ChromeHeadless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub browser: WebDriverBrowser,
    pub safari_port: u16,
    pub chrome_port: u16,
    /// Optional path to Chrome binary (e.g., Chrome for Testing)
    /// If not set, ChromeDriver will use the default Chrome installation
    pub chrome_binary: Option<String>,
    /// Optional path to the chromedriver executable (defaults to `chromedriver` on PATH)
    pub chromedriver_binary: Option<String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            browser: WebDriverBrowser::Safari,
            safari_port: 4444,
            chrome_port: 9515,
            chrome_binary: None,
            chromedriver_binary: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut openai_configs = HashMap::new();
        openai_configs.insert(
            "default".to_string(),
            OpenAIConfig {
                api_key: String::new(),
                model: "gpt-4o".to_string(),
                base_url: None,
                max_tokens: Some(4096),
                temperature: None,
            },
        );

        Self {
            providers: ProvidersConfig {
                default_provider: "openai.default".to_string(),
                tools: None,
                openai: openai_configs,
                openai_compatible: HashMap::new(),
            },
            agent: AgentConfig::default(),
            search: SearchConfig::default(),
            form: FormConfig::default(),
            spreadsheet: SpreadsheetConfig::default(),
            webdriver: WebDriverConfig::default(),
        }
    }
}

/// Reference to a provider configuration
#[derive(Debug)]
pub enum ProviderConfigRef<'a> {
    OpenAI(&'a OpenAIConfig),
    OpenAICompatible(&'a OpenAIConfig),
}

impl<'a> ProviderConfigRef<'a> {
    pub fn settings(&self) -> &'a OpenAIConfig {
        match self {
            ProviderConfigRef::OpenAI(c) | ProviderConfigRef::OpenAICompatible(c) => c,
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config_path_to_load = match config_path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    anyhow::bail!("Config file not found: {}", expanded);
                }
                Some(expanded)
            }
            None => DEFAULT_CONFIG_PATHS.iter().find_map(|path| {
                let expanded_path = shellexpand::tilde(path);
                if Path::new(expanded_path.as_ref()).exists() {
                    Some(expanded_path.to_string())
                } else {
                    None
                }
            }),
        };

        let Some(path) = config_path_to_load else {
            // First run: write a default config the user can edit
            let default_config = Self::default();
            default_config.write_default_file();
            return Ok(default_config);
        };

        let config_content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&config_content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path, e))?;

        config.validate_provider_reference(&config.providers.default_provider)?;
        if let Some(tools) = &config.providers.tools {
            config.validate_provider_reference(tools)?;
        }

        Ok(config)
    }

    fn write_default_file(&self) {
        let config_dir = dirs::home_dir()
            .map(|mut path| {
                path.push(".config");
                path.push("autofill");
                path
            })
            .unwrap_or_else(|| std::path::PathBuf::from("."));

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            warn!("Could not create config directory {}: {}", config_dir.display(), e);
            return;
        }

        let config_file = config_dir.join("config.toml");
        match self.save(&config_file) {
            Ok(()) => info!(
                "Created default configuration at: {}",
                config_file.display()
            ),
            Err(e) => warn!("Could not save default config: {}", e),
        }
    }

    /// Validate a provider reference (format: "<provider_type>.<config_name>")
    pub fn validate_provider_reference(&self, reference: &str) -> Result<()> {
        let (provider_type, config_name) = Self::parse_provider_reference(reference)?;

        match provider_type.as_str() {
            "openai" => {
                if !self.providers.openai.contains_key(&config_name) {
                    anyhow::bail!(
                        "Provider config 'openai.{}' not found. Available: {:?}",
                        config_name,
                        self.providers.openai.keys().collect::<Vec<_>>()
                    );
                }
            }
            _ => {
                if !self.providers.openai_compatible.contains_key(&provider_type) {
                    anyhow::bail!(
                        "Unknown provider type '{}'. Valid types: openai, or openai_compatible names",
                        provider_type
                    );
                }
            }
        }

        Ok(())
    }

    /// Parse a provider reference into (provider_type, config_name)
    pub fn parse_provider_reference(reference: &str) -> Result<(String, String)> {
        let parts: Vec<&str> = reference.split('.').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            anyhow::bail!(
                "Invalid provider reference '{}'. Expected format: '<provider_type>.<config_name>'",
                reference
            );
        }
        Ok((parts[0].to_string(), parts[1].to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        provider_override: Option<String>,
        model_override: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        if let Some(provider) = provider_override {
            config.validate_provider_reference(&provider)?;
            config.providers.default_provider = provider;
        }

        // Apply model override to the active provider
        if let Some(model) = model_override {
            let (provider_type, config_name) =
                Self::parse_provider_reference(&config.providers.default_provider)?;

            let target = match provider_type.as_str() {
                "openai" => config.providers.openai.get_mut(&config_name),
                _ => config.providers.openai_compatible.get_mut(&provider_type),
            };
            match target {
                Some(provider_config) => provider_config.model = model,
                None => anyhow::bail!(
                    "Provider config '{}' not found.",
                    config.providers.default_provider
                ),
            }
        }

        Ok(config)
    }

    /// Get the provider reference used for model calls made by tools
    pub fn get_tools_provider(&self) -> &str {
        self.providers
            .tools
            .as_deref()
            .unwrap_or(&self.providers.default_provider)
    }

    /// Look up the config behind a provider reference
    pub fn get_provider_config(&self, reference: &str) -> Result<ProviderConfigRef<'_>> {
        let (provider_type, config_name) = Self::parse_provider_reference(reference)?;

        match provider_type.as_str() {
            "openai" => self
                .providers
                .openai
                .get(&config_name)
                .map(ProviderConfigRef::OpenAI)
                .ok_or_else(|| anyhow::anyhow!("OpenAI config '{}' not found", config_name)),
            _ => self
                .providers
                .openai_compatible
                .get(&provider_type)
                .map(ProviderConfigRef::OpenAICompatible)
                .ok_or_else(|| {
                    anyhow::anyhow!("OpenAI compatible config '{}' not found", provider_type)
                }),
        }
    }

    /// Get the current default provider's config
    pub fn get_default_provider_config(&self) -> Result<ProviderConfigRef<'_>> {
        self.get_provider_config(&self.providers.default_provider)
    }
}

#[cfg(test)]
mod tests;
