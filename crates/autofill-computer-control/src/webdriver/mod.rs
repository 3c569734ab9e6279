pub mod chrome;
pub mod safari;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementLocator {
    Id(String),
    Name(String),
}

impl ElementLocator {
    /// CSS selector used for name lookups; quotes and backslashes are escaped.
    fn name_selector(name: &str) -> String {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("[name=\"{}\"]", escaped)
    }

    pub(crate) async fn find(&self, client: &fantoccini::Client) -> Result<WebElement> {
        let elem = match self {
            ElementLocator::Id(id) => client.find(fantoccini::Locator::Id(id)).await?,
            ElementLocator::Name(name) => {
                let selector = Self::name_selector(name);
                client.find(fantoccini::Locator::Css(&selector)).await?
            }
        };
        Ok(WebElement { inner: elem })
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementLocator::Id(id) => write!(f, "id={}", id),
            ElementLocator::Name(name) => write!(f, "name={}", name),
        }
    }
}

/// WebDriver controller for browser automation
#[async_trait]
pub trait WebDriverController: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Find a single element
    async fn find_element(&mut self, locator: &ElementLocator) -> Result<WebElement>;

    /// Execute JavaScript in the browser
    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Quit the browser session
    async fn quit(self) -> Result<()>;
}

/// Represents a web element in the DOM
pub struct WebElement {
    pub(crate) inner: fantoccini::elements::Element,
}

impl WebElement {
    /// Send keys/text to the element
    pub async fn send_keys(&mut self, text: &str) -> Result<()> {
        self.inner.send_keys(text).await?;
        Ok(())
    }

    /// Clear the element's content (for input fields)
    pub async fn clear(&mut self) -> Result<()> {
        self.inner.clear().await?;
        Ok(())
    }
}

/// Poll `document.readyState` until it reports `complete` or `timeout` elapses.
pub async fn wait_for_document_ready<D>(
    driver: &mut D,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()>
where
    D: WebDriverController + ?Sized,
{
    let start = Instant::now();

    loop {
        let state = driver
            .execute_script("return document.readyState;", vec![])
            .await?;
        if state.as_str() == Some("complete") {
            tracing::debug!("Page ready after {:?}", start.elapsed());
            return Ok(());
        }

        if start.elapsed() >= timeout {
            anyhow::bail!(
                "Timeout waiting for page to load (readyState={}) after {:?}",
                state,
                timeout
            );
        }

        tokio::time::sleep(poll_interval).await;
    }
}
