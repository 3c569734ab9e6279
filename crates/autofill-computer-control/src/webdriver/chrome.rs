use super::{ElementLocator, WebDriverController, WebElement};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;

/// ChromeDriver WebDriver controller with headless support
pub struct ChromeDriver {
    client: Client,
}

impl ChromeDriver {
    /// Create a new ChromeDriver instance with a custom port and optional Chrome binary path
    pub async fn with_port_headless_and_binary(
        port: u16,
        chrome_binary: Option<&str>,
    ) -> Result<Self> {
        let url = format!("http://localhost:{}", port);

        let mut caps = serde_json::Map::new();
        caps.insert(
            "browserName".to_string(),
            Value::String("chrome".to_string()),
        );

        let mut chrome_options = serde_json::Map::new();
        chrome_options.insert(
            "args".to_string(),
            Value::Array(vec![
                // Use a unique temp directory to avoid conflicts with running Chrome instances
                Value::String(format!(
                    "--user-data-dir={}",
                    std::env::temp_dir()
                        .join(format!("autofill-chrome-{}", std::process::id()))
                        .display()
                )),
                Value::String("--headless=new".to_string()),
                Value::String("--disable-gpu".to_string()),
                Value::String("--no-sandbox".to_string()),
                Value::String("--disable-dev-shm-usage".to_string()),
                Value::String("--window-size=1920,1080".to_string()),
            ]),
        );

        if let Some(binary) = chrome_binary {
            chrome_options.insert("binary".to_string(), Value::String(binary.to_string()));
        }

        caps.insert(
            "goog:chromeOptions".to_string(),
            Value::Object(chrome_options),
        );

        // Use a timeout for the connection attempt to avoid hanging indefinitely
        let mut builder = ClientBuilder::native();
        let connect_future = builder.capabilities(caps).connect(&url);

        let client = tokio::time::timeout(Duration::from_secs(30), connect_future)
            .await
            .context("Connection to ChromeDriver timed out after 30 seconds")?
            .context("Failed to connect to ChromeDriver")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebDriverController for ChromeDriver {
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
