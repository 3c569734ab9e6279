use super::{ElementLocator, WebDriverController, WebElement};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// SafariDriver WebDriver controller
pub struct SafariDriver {
    client: Client,
}

impl SafariDriver {
    /// Connect to SafariDriver on `port`.
    ///
    /// "Allow Remote Automation" must be enabled in Safari's Develop menu first,
    /// or once from a terminal:
    /// ```bash
    /// /usr/bin/safaridriver --enable
    /// ```
    pub async fn with_port(port: u16) -> Result<Self> {
        Self::connect(port, CONNECT_TIMEOUT).await
    }

    async fn connect(port: u16, timeout: Duration) -> Result<Self> {
        let url = format!("http://localhost:{}", port);

        let mut caps = serde_json::Map::new();
        caps.insert(
            "browserName".to_string(),
            Value::String("safari".to_string()),
        );

        let mut builder = ClientBuilder::native();
        let connect_future = builder.capabilities(caps).connect(&url);

        let client = tokio::time::timeout(timeout, connect_future)
            .await
            .with_context(|| format!("Connection to SafariDriver timed out after {:?}", timeout))?
            .context("Failed to connect to SafariDriver. Make sure SafariDriver is running and 'Allow Remote Automation' is enabled in Safari's Develop menu.")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebDriverController for SafariDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn find_element(&mut self, locator: &ElementLocator) -> Result<WebElement> {
        locator
            .find(&self.client)
            .await
            .with_context(|| format!("Failed to find element {}", locator))
    }

    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn quit(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
