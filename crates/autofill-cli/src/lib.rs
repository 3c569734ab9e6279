//! Command line entry point: parse arguments, load configuration and run one
//! task through the agent.

pub mod cli_args;
pub mod ui_writer_impl;
pub mod utils;

use anyhow::Result;
use autofill_core::prompts::build_system_prompt;
use autofill_core::ui_writer::UiWriter;
use autofill_core::Agent;
use clap::Parser;
use tracing::{debug, error};

pub use cli_args::Cli;
use ui_writer_impl::ConsoleUiWriter;
use utils::{initialize_logging, load_config_with_cli_overrides, resolve_task};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(cli.verbose);

    let config = load_config_with_cli_overrides(&cli)?;
    debug!(
        "Using provider {} with form at {}",
        config.providers.default_provider, config.form.url
    );

    let task = resolve_task(cli.task.as_deref(), std::io::stdin().lock())?;

    let ui_writer = ConsoleUiWriter::new();
    if cli.show_prompt {
        let prompt = cli
            .system_prompt
            .clone()
            .unwrap_or_else(|| build_system_prompt(&config));
        ui_writer.print_system_prompt(&prompt);
    }

    let mut agent = Agent::new(config, ui_writer)?;
    match agent.run(&task, cli.system_prompt.as_deref()).await {
        Ok(result) => {
            debug!("Finished in {} turn(s)", result.turns);
            if cli.verbose {
                println!("{}", agent.format_tool_stats());
            }
            Ok(())
        }
        Err(e) => {
            error!("Task failed: {}", e);
            Err(e.into())
        }
    }
}
