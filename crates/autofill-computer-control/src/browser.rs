//! Opening pages in the user's own browser (no automation session).

use anyhow::{Context, Result};
use async_trait::async_trait;

#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<()>;
}

/// Hands URLs to the operating system's default browser.
pub struct SystemBrowser;

#[async_trait]
impl UrlOpener for SystemBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            webbrowser::open(&url).with_context(|| format!("Failed to open {} in the default browser", url))
        })
        .await
        .context("Browser opener task panicked")??;
        Ok(())
    }
}
