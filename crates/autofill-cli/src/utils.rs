//! Utility functions for the autofill CLI.

use std::io::BufRead;

use anyhow::{Context, Result};
use autofill_config::{Config, WebDriverBrowser};

use crate::cli_args::Cli;

pub fn initialize_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in [
        "autofill",
        "autofill_cli",
        "autofill_core",
        "autofill_providers",
        "autofill_config",
        "autofill_computer_control",
    ] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load configuration with CLI argument overrides applied.
pub fn load_config_with_cli_overrides(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_with_overrides(
        cli.config.as_deref(),
        cli.provider.clone(),
        cli.model.clone(),
    )?;
    apply_cli_overrides(&mut config, cli);
    Ok(config)
}

/// The overrides that need no validation against the provider table.
pub fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_turns) = cli.max_turns {
        config.agent.max_turns = max_turns;
    }
    if let Some(url) = &cli.form_url {
        config.form.url = url.clone();
    }
    if let Some(path) = &cli.spreadsheet {
        config.spreadsheet.default_path = Some(path.clone());
    }
    if cli.safari {
        config.webdriver.browser = WebDriverBrowser::Safari;
    } else if cli.chrome_headless {
        config.webdriver.browser = WebDriverBrowser::ChromeHeadless;
    }
}

/// The task to run: the positional argument, else one line from `input`.
pub fn resolve_task(task: Option<&str>, input: impl BufRead) -> Result<String> {
    if let Some(task) = task {
        return Ok(task.to_string());
    }

    let mut line = String::new();
    let mut input = input;
    input
        .read_line(&mut line)
        .context("Failed to read the task from stdin")?;

    let line = line.trim();
    if line.is_empty() {
        anyhow::bail!("No task given. Pass it as an argument or on stdin.");
    }
    Ok(line.to_string())
}
