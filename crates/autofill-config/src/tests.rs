use crate::{Config, WebDriverBrowser, DEFAULT_SYSTEM_PROMPT, OPENAI_API_KEY_ENV};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

fn write_config(temp_dir: &TempDir, content: &str) -> String {
    let config_path = temp_dir.path().join("test_config.toml");
    fs::write(&config_path, content).unwrap();
    config_path.to_str().unwrap().to_string()
}

#[test]
fn test_minimal_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[providers]
default_provider = "openai.default"

[providers.openai.default]
api_key = "test-key"
model = "gpt-4o"
"#,
    );

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.form.url, "http://localhost:8000");
    assert_eq!(config.agent.max_turns, 25);
    assert_eq!(config.agent.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(config.search.engine_url, "https://www.google.com/search");
    assert_eq!(config.search.render_delay_ms, 5000);
    assert_eq!(config.search.tesseract_binary, "tesseract");
    assert_eq!(config.webdriver.browser, WebDriverBrowser::Safari);
    assert_eq!(config.webdriver.safari_port, 4444);
    assert!(config.spreadsheet.default_path.is_none());
}

#[test]
fn test_sections_override_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[providers]
default_provider = "openai.default"

[providers.openai.default]
api_key = "test-key"
model = "gpt-4o"

[agent]
max_turns = 5

[form]
url = "http://forms.internal:9000/new"
keep_browser_open = true

[spreadsheet]
default_path = "/data/company.xlsx"

[webdriver]
browser = "chrome-headless"
chrome_port = 9600
"#,
    );

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.agent.max_turns, 5);
    assert_eq!(config.agent.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(config.form.url, "http://forms.internal:9000/new");
    assert!(config.form.keep_browser_open);
    assert_eq!(config.form.ready_timeout_ms, 10_000);
    assert_eq!(
        config.spreadsheet.default_path.as_deref(),
        Some("/data/company.xlsx")
    );
    assert_eq!(config.webdriver.browser, WebDriverBrowser::ChromeHeadless);
    assert_eq!(config.webdriver.chrome_port, 9600);
    assert_eq!(config.webdriver.safari_port, 4444);
}

#[test]
fn test_tools_provider_falls_back_to_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[providers]
default_provider = "openai.default"

[providers.openai.default]
api_key = "test-key"
model = "gpt-4o"
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.get_tools_provider(), "openai.default");
}

#[test]
fn test_tools_provider_reference() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[providers]
default_provider = "openai.default"
tools = "openai.cheap"

[providers.openai.default]
api_key = "test-key"
model = "gpt-4o"

[providers.openai.cheap]
api_key = "test-key"
model = "gpt-4o-mini"
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.get_tools_provider(), "openai.cheap");
    let tools_config = config.get_provider_config("openai.cheap").unwrap();
    assert_eq!(tools_config.settings().model, "gpt-4o-mini");
}

#[test]
fn test_unknown_default_provider_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[providers]
default_provider = "openai.missing"

[providers.openai.default]
api_key = "test-key"
model = "gpt-4o"
"#,
    );

    let err_msg = Config::load(Some(&path)).unwrap_err().to_string();
    assert!(
        err_msg.contains("not found"),
        "Expected a 'not found' error, got: {}",
        err_msg
    );
}

#[test]
fn test_malformed_reference_is_rejected() {
    assert!(Config::parse_provider_reference("openai").is_err());
    assert!(Config::parse_provider_reference("openai.").is_err());
    assert!(Config::parse_provider_reference("a.b.c").is_err());
    assert_eq!(
        Config::parse_provider_reference("openai.default").unwrap(),
        ("openai".to_string(), "default".to_string())
    );
}

#[test]
fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some("/nonexistent/autofill.toml")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_openai_compatible_provider_and_model_override() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[providers]
default_provider = "openai.default"

[providers.openai.default]
api_key = "test-key"
model = "gpt-4o"

[providers.openai_compatible.groq]
api_key = "groq-key"
model = "llama-3.1-70b"
base_url = "https://api.groq.com/openai/v1"
"#,
    );

    let config = Config::load_with_overrides(
        Some(&path),
        Some("groq.default".to_string()),
        Some("llama-3.3-70b".to_string()),
    )
    .unwrap();

    assert_eq!(config.providers.default_provider, "groq.default");
    let active = config.get_default_provider_config().unwrap();
    assert_eq!(active.settings().model, "llama-3.3-70b");
    assert_eq!(
        active.settings().base_url.as_deref(),
        Some("https://api.groq.com/openai/v1")
    );
}

#[test]
fn test_save_and_reload_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("saved.toml");

    let mut config = Config::default();
    config.form.url = "http://localhost:9999".to_string();
    config.save(&config_path).unwrap();

    let reloaded = Config::load(Some(config_path.to_str().unwrap())).unwrap();
    assert_eq!(reloaded.form.url, "http://localhost:9999");
    assert_eq!(reloaded.providers.default_provider, "openai.default");
}

#[test]
#[serial]
fn test_api_key_falls_back_to_environment() {
    let config = Config::default();
    let openai = config.get_default_provider_config().unwrap().settings().clone();

    std::env::set_var(OPENAI_API_KEY_ENV, "env-key");
    assert_eq!(openai.resolved_api_key().unwrap(), "env-key");

    std::env::remove_var(OPENAI_API_KEY_ENV);
    let err = openai.resolved_api_key().unwrap_err();
    assert!(err.to_string().contains(OPENAI_API_KEY_ENV));
}

#[test]
#[serial]
fn test_configured_api_key_wins_over_environment() {
    let mut config = Config::default();
    if let Some(openai) = config.providers.openai.get_mut("default") {
        openai.api_key = "file-key".to_string();
    }

    std::env::set_var(OPENAI_API_KEY_ENV, "env-key");
    let key = config
        .get_default_provider_config()
        .unwrap()
        .settings()
        .resolved_api_key()
        .unwrap();
    std::env::remove_var(OPENAI_API_KEY_ENV);

    assert_eq!(key, "file-key");
}
