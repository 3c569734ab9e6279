//! Context and collaborator handles passed to tool implementations.

use anyhow::Result;
use autofill_computer_control::{ComputerController, OCREngine, SystemBrowser, TesseractOCR, UrlOpener};
use autofill_config::Config;
use autofill_providers::LLMProvider;

use crate::tools::form_fill::{HttpPageFetcher, PageFetcher};
use crate::tools::spreadsheet::{SpreadsheetReader, WorkbookReader};
use crate::ui_writer::UiWriter;
use crate::webdriver_session::{FormBrowserLauncher, WebDriverLauncher};

/// External capabilities the tools call into.
///
/// Owned by one [`crate::Agent`] and lent to each tool call, so tests can
/// swap any of them for a stub.
pub struct Collaborators {
    pub spreadsheet_reader: Box<dyn SpreadsheetReader>,
    pub url_opener: Box<dyn UrlOpener>,
    pub screen_capture: Box<dyn ComputerController>,
    pub ocr: Box<dyn OCREngine>,
    pub page_fetcher: Box<dyn PageFetcher>,
    pub form_browser: Box<dyn FormBrowserLauncher>,
}

impl Collaborators {
    /// The real implementations, configured from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            spreadsheet_reader: Box::new(WorkbookReader),
            url_opener: Box::new(SystemBrowser),
            screen_capture: autofill_computer_control::create_controller()?,
            ocr: Box::new(TesseractOCR::with_binary(&config.search.tesseract_binary)),
            page_fetcher: Box::new(HttpPageFetcher::new()),
            form_browser: Box::new(WebDriverLauncher::new(config.webdriver.clone())),
        })
    }
}

/// Context passed to tool executors containing shared state.
pub struct ToolContext<'a, W: UiWriter> {
    pub config: &'a Config,
    pub ui_writer: &'a W,
    /// Provider for model calls made inside tools
    pub provider: &'a dyn LLMProvider,
    pub collaborators: &'a Collaborators,
}
