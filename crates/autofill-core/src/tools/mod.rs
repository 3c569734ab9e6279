//! Tool implementations the agent can execute.
//!
//! - `spreadsheet` - read tabular data files into row records
//! - `web_search` - search in the system browser, OCR the screen, summarize
//! - `form_fill` - map free text onto a web form and fill it via WebDriver

pub mod executor;
pub mod form_fill;
pub mod spreadsheet;
pub mod web_search;

pub use executor::{Collaborators, ToolContext};
