//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use autofill_computer_control::{ComputerController, OCREngine, UrlOpener};
use autofill_config::Config;
use autofill_core::tools::form_fill::PageFetcher;
use autofill_core::tools::spreadsheet::{Record, SpreadsheetReader};
use autofill_core::ui_writer::NullUiWriter;
use autofill_core::webdriver_session::{FormBrowser, FormBrowserLauncher};
use autofill_core::{Agent, Collaborators};
use autofill_providers::mock::MockProvider;
use autofill_providers::ProviderRegistry;
use serde_json::Value;

pub const FORM_HTML: &str = r#"<html><body><form>
  <input type="hidden" name="csrf" value="t0k3n">
  <input id="company_name" name="company" type="text" placeholder="Company">
  <textarea id="address" name="address" placeholder="Street address"></textarea>
  <input type="submit" value="Save">
</form></body></html>"#;

/// Everything the stubs observed during a run
#[derive(Debug, Default)]
pub struct Observed {
    pub spreadsheet_paths: Vec<String>,
    pub opened_urls: Vec<String>,
    pub screenshot_paths: Vec<String>,
    pub ocr_paths: Vec<String>,
    pub fetched_urls: Vec<String>,
    pub browser_launches: usize,
    pub browser_events: Vec<String>,
}

pub type Log = Arc<Mutex<Observed>>;

pub struct StubSpreadsheet {
    pub rows: Option<Vec<Record>>,
    pub log: Log,
}

#[async_trait]
impl SpreadsheetReader for StubSpreadsheet {
    async fn read(&self, path: &Path) -> Result<Vec<Record>> {
        self.log
            .lock()
            .unwrap()
            .spreadsheet_paths
            .push(path.display().to_string());
        match &self.rows {
            Some(rows) => Ok(rows.clone()),
            None => anyhow::bail!("No such file: {}", path.display()),
        }
    }
}

pub struct RecordingOpener {
    pub log: Log,
}

#[async_trait]
impl UrlOpener for RecordingOpener {
    async fn open(&self, url: &str) -> Result<()> {
        self.log.lock().unwrap().opened_urls.push(url.to_string());
        Ok(())
    }
}

/// Writes a fake PNG to the requested path.
pub struct FileWritingCapture {
    pub log: Log,
}

#[async_trait]
impl ComputerController for FileWritingCapture {
    async fn take_screenshot(&self, path: &str) -> Result<()> {
        std::fs::write(path, b"\x89PNG fake")?;
        self.log.lock().unwrap().screenshot_paths.push(path.to_string());
        Ok(())
    }
}

pub struct StubOcr {
    pub text: Option<String>,
    pub log: Log,
}

#[async_trait]
impl OCREngine for StubOcr {
    async fn extract_text(&self, path: &str) -> Result<String> {
        assert!(Path::new(path).exists(), "screenshot must exist while OCR reads it");
        self.log.lock().unwrap().ocr_paths.push(path.to_string());
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => anyhow::bail!("tesseract exited with status 1"),
        }
    }

    fn name(&self) -> &str {
        "stub-ocr"
    }
}

pub struct StubPageFetcher {
    pub html: Option<String>,
    pub log: Log,
}

#[async_trait]
impl PageFetcher for StubPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.log.lock().unwrap().fetched_urls.push(url.to_string());
        match &self.html {
            Some(html) => Ok(html.clone()),
            None => anyhow::bail!("Form page {} returned an error status: 500", url),
        }
    }
}

/// Browser whose page only has the fields in `present`.
pub struct RecordingBrowser {
    present: Vec<String>,
    log: Log,
}

#[async_trait]
impl FormBrowser for RecordingBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().browser_events.push(format!("navigate {}", url));
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration, _poll_interval: Duration) -> Result<()> {
        self.log.lock().unwrap().browser_events.push("ready".to_string());
        Ok(())
    }

    async fn fill_field(&mut self, key: &str, value: &str) -> Result<()> {
        if !self.present.iter().any(|p| p == key) {
            anyhow::bail!("No form field with id or name '{}'", key);
        }
        self.log
            .lock()
            .unwrap()
            .browser_events
            .push(format!("set {}={}", key, value));
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.log.lock().unwrap().browser_events.push("quit".to_string());
        Ok(())
    }
}

pub struct RecordingLauncher {
    pub present: Vec<String>,
    pub log: Log,
}

#[async_trait]
impl FormBrowserLauncher for RecordingLauncher {
    async fn launch(&self) -> Result<Box<dyn FormBrowser>> {
        self.log.lock().unwrap().browser_launches += 1;
        Ok(Box::new(RecordingBrowser {
            present: self.present.clone(),
            log: self.log.clone(),
        }))
    }
}

/// Builder for a full set of stub collaborators
pub struct Stubs {
    pub rows: Option<Vec<Record>>,
    pub ocr_text: Option<String>,
    pub form_html: Option<String>,
    pub present_fields: Vec<String>,
    pub log: Log,
}

impl Default for Stubs {
    fn default() -> Self {
        Self {
            rows: Some(Vec::new()),
            ocr_text: Some("Search results".to_string()),
            form_html: Some(FORM_HTML.to_string()),
            present_fields: vec!["company_name".to_string(), "address".to_string()],
            log: Log::default(),
        }
    }
}

impl Stubs {
    pub fn with_rows(mut self, rows: Value) -> Self {
        self.rows = Some(
            rows.as_array()
                .unwrap()
                .iter()
                .map(|row| row.as_object().unwrap().clone())
                .collect(),
        );
        self
    }

    pub fn build(&self) -> Collaborators {
        Collaborators {
            spreadsheet_reader: Box::new(StubSpreadsheet {
                rows: self.rows.clone(),
                log: self.log.clone(),
            }),
            url_opener: Box::new(RecordingOpener {
                log: self.log.clone(),
            }),
            screen_capture: Box::new(FileWritingCapture {
                log: self.log.clone(),
            }),
            ocr: Box::new(StubOcr {
                text: self.ocr_text.clone(),
                log: self.log.clone(),
            }),
            page_fetcher: Box::new(StubPageFetcher {
                html: self.form_html.clone(),
                log: self.log.clone(),
            }),
            form_browser: Box::new(RecordingLauncher {
                present: self.present_fields.clone(),
                log: self.log.clone(),
            }),
        }
    }
}

/// Config with no waiting and screenshots in `screenshot_dir`.
pub fn test_config(screenshot_dir: &Path) -> Config {
    let mut config = Config::default();
    config.search.render_delay_ms = 0;
    config.search.screenshot_dir = Some(screenshot_dir.display().to_string());
    config.form.ready_timeout_ms = 100;
    config.form.poll_interval_ms = 10;
    config
}

pub fn create_agent_with_mock(
    provider: MockProvider,
    config: Config,
    collaborators: Collaborators,
) -> Agent<NullUiWriter> {
    let mut registry = ProviderRegistry::new();
    registry.register(provider);
    Agent::with_parts(config, NullUiWriter, registry, collaborators)
}
