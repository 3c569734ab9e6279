//! CLI argument parsing for autofill.

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(name = "autofill")]
#[command(about = "An agent that gathers company data and enters it into a web form")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show the system prompt being sent to the LLM
    #[arg(long)]
    pub show_prompt: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Task to execute (read from stdin when omitted)
    pub task: Option<String>,

    /// Override the configured provider (e.g. 'openai.default')
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Override the model for the selected provider
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Maximum number of model turns before giving up
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_turns: Option<u32>,

    /// Replace the system prompt for this run
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// URL of the data entry form
    #[arg(long, value_name = "URL")]
    pub form_url: Option<String>,

    /// Default spreadsheet to mention to the model
    #[arg(long, value_name = "PATH")]
    pub spreadsheet: Option<String>,

    /// Fill the form in Safari
    #[arg(long, conflicts_with = "chrome_headless")]
    pub safari: bool,

    /// Fill the form in headless Chrome
    #[arg(long)]
    pub chrome_headless: bool,
}
