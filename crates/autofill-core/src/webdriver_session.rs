//! Browser sessions used to fill the target form.
//!
//! [`WebDriverSession`] unifies Safari and Chrome behind
//! [`WebDriverController`]. [`WebDriverLauncher`] starts the matching driver
//! process and hands back a [`FormBrowser`] that owns both the session and
//! the process.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use autofill_computer_control::{
    wait_for_document_ready, ChromeDriver, ElementLocator, SafariDriver, WebDriverController,
    WebElement,
};
use autofill_config::{WebDriverBrowser, WebDriverConfig};
use serde_json::Value;
use tokio::process::Child;
use tracing::{debug, warn};

/// Unified WebDriver session that can hold either Safari or Chrome driver.
pub enum WebDriverSession {
    Safari(SafariDriver),
    Chrome(ChromeDriver),
}

#[async_trait]
impl WebDriverController for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        match self {
            WebDriverSession::Safari(driver) => driver.navigate(url).await,
            WebDriverSession::Chrome(driver) => driver.navigate(url).await,
        }
    }

    async fn find_element(&mut self, locator: &ElementLocator) -> Result<WebElement> {
        match self {
            WebDriverSession::Safari(driver) => driver.find_element(locator).await,
            WebDriverSession::Chrome(driver) => driver.find_element(locator).await,
        }
    }

    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        match self {
            WebDriverSession::Safari(driver) => driver.execute_script(script, args).await,
            WebDriverSession::Chrome(driver) => driver.execute_script(script, args).await,
        }
    }

    async fn quit(self) -> Result<()> {
        match self {
            WebDriverSession::Safari(driver) => driver.quit().await,
            WebDriverSession::Chrome(driver) => driver.quit().await,
        }
    }
}

/// A browser window showing the form.
#[async_trait]
pub trait FormBrowser: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Block until the page reports it has finished loading.
    async fn wait_until_ready(&mut self, timeout: Duration, poll_interval: Duration) -> Result<()>;

    /// Set the field whose id (or, failing that, name) is `key`.
    async fn fill_field(&mut self, key: &str, value: &str) -> Result<()>;

    async fn quit(&mut self) -> Result<()>;
}

#[async_trait]
pub trait FormBrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn FormBrowser>>;
}

/// Look an element up by id, then by name.
pub async fn locate_field<D>(driver: &mut D, key: &str) -> Result<WebElement>
where
    D: WebDriverController + ?Sized,
{
    match driver.find_element(&ElementLocator::Id(key.to_string())).await {
        Ok(element) => Ok(element),
        Err(id_err) => {
            debug!("No element with id '{}' ({}), trying name", key, id_err);
            driver
                .find_element(&ElementLocator::Name(key.to_string()))
                .await
                .with_context(|| format!("No form field with id or name '{}'", key))
        }
    }
}

/// A live WebDriver session plus the driver process we started for it.
pub struct WebDriverFormBrowser {
    session: Option<WebDriverSession>,
    driver_process: Option<Child>,
}

#[async_trait]
impl FormBrowser for WebDriverFormBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.session_mut()?.navigate(url).await
    }

    async fn wait_until_ready(&mut self, timeout: Duration, poll_interval: Duration) -> Result<()> {
        wait_for_document_ready(self.session_mut()?, timeout, poll_interval).await
    }

    async fn fill_field(&mut self, key: &str, value: &str) -> Result<()> {
        let mut element = locate_field(self.session_mut()?, key).await?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let is_chrome = matches!(session, WebDriverSession::Chrome(_));
        let result = session.quit().await;

        // chromedriver stays up for reuse by the next call; safaridriver does not
        match self.driver_process.take() {
            Some(_) if is_chrome => debug!("Keeping chromedriver running for reuse"),
            Some(mut process) => {
                if let Err(e) = process.kill().await {
                    warn!("Failed to kill driver process: {}", e);
                } else {
                    debug!("Driver process terminated");
                }
            }
            None => {}
        }

        result
    }
}

impl WebDriverFormBrowser {
    fn session_mut(&mut self) -> Result<&mut WebDriverSession> {
        self.session
            .as_mut()
            .context("WebDriver session has already been closed")
    }
}

/// Check if chromedriver is already running on the given port.
async fn check_chromedriver_running(port: u16) -> bool {
    let url = format!("http://localhost:{}/status", port);
    match reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_millis(500))
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Starts driver processes and connects to them.
pub struct WebDriverLauncher {
    config: WebDriverConfig,
}

impl WebDriverLauncher {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }

    async fn start_safari(&self) -> Result<WebDriverFormBrowser> {
        let port = self.config.safari_port;

        let mut process = tokio::process::Command::new("safaridriver")
            .arg("--port")
            .arg(port.to_string())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .context("Failed to start safaridriver. Make sure safaridriver is installed")?;

        // Wait for safaridriver to start up
        tokio::time::sleep(Duration::from_millis(1000)).await;

        match SafariDriver::with_port(port).await {
            Ok(driver) => Ok(WebDriverFormBrowser {
                session: Some(WebDriverSession::Safari(driver)),
                driver_process: Some(process),
            }),
            Err(e) => {
                let _ = process.kill().await;
                Err(e.context(format!(
                    "Failed to connect to SafariDriver on port {}. \
                     Enable Remote Automation with `safaridriver --enable` \
                     or Safari → Develop → Allow Remote Automation",
                    port
                )))
            }
        }
    }

    async fn connect_chrome(&self) -> Result<ChromeDriver> {
        ChromeDriver::with_port_headless_and_binary(
            self.config.chrome_port,
            self.config.chrome_binary.as_deref(),
        )
        .await
    }

    async fn start_chrome(&self) -> Result<WebDriverFormBrowser> {
        let port = self.config.chrome_port;

        if check_chromedriver_running(port).await {
            match self.connect_chrome().await {
                Ok(driver) => {
                    debug!("Reusing chromedriver already running on port {}", port);
                    return Ok(WebDriverFormBrowser {
                        session: Some(WebDriverSession::Chrome(driver)),
                        driver_process: None,
                    });
                }
                Err(e) => debug!("Existing chromedriver refused a session: {}", e),
            }
        }

        let chromedriver_cmd = self
            .config
            .chromedriver_binary
            .as_deref()
            .unwrap_or("chromedriver");

        let mut process = tokio::process::Command::new(chromedriver_cmd)
            .arg(format!("--port={}", port))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to start {}. Make sure chromedriver is installed and in your PATH",
                    chromedriver_cmd
                )
            })?;

        // 200ms between attempts, ~2s total
        let max_retries = 10;
        let mut last_error = None;

        for _ in 0..max_retries {
            tokio::time::sleep(Duration::from_millis(200)).await;

            match self.connect_chrome().await {
                Ok(driver) => {
                    return Ok(WebDriverFormBrowser {
                        session: Some(WebDriverSession::Chrome(driver)),
                        driver_process: Some(process),
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        let _ = process.kill().await;
        let error = last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error"));
        Err(error.context(format!(
            "Failed to connect to ChromeDriver on port {} after {} attempts",
            port, max_retries
        )))
    }
}

#[async_trait]
impl FormBrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn FormBrowser>> {
        let browser = match self.config.browser {
            WebDriverBrowser::Safari => self.start_safari().await?,
            WebDriverBrowser::ChromeHeadless => self.start_chrome().await?,
        };
        Ok(Box::new(browser))
    }
}
