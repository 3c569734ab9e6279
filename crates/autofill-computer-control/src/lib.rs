pub mod browser;
pub mod ocr;
pub mod platform;
pub mod webdriver;

// Re-export commonly used types for convenience
pub use browser::{SystemBrowser, UrlOpener};
pub use ocr::{OCREngine, TesseractOCR};
pub use webdriver::{
    chrome::ChromeDriver, safari::SafariDriver, wait_for_document_ready, ElementLocator,
    WebDriverController, WebElement,
};

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ComputerController: Send + Sync {
    /// Capture the whole visible screen to a PNG at `path`
    async fn take_screenshot(&self, path: &str) -> Result<()>;
}

// Platform-specific constructor
pub fn create_controller() -> Result<Box<dyn ComputerController>> {
    #[cfg(target_os = "macos")]
    return Ok(Box::new(platform::macos::MacOSController::new()?));

    #[cfg(target_os = "linux")]
    return Ok(Box::new(platform::linux::LinuxController::new()?));

    #[cfg(target_os = "windows")]
    return Ok(Box::new(platform::windows::WindowsController::new()?));

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    anyhow::bail!("Unsupported platform")
}

/// Expand `~` and make sure the parent directory exists.
pub(crate) fn prepare_output_path(path: &str) -> Result<String> {
    let expanded = shellexpand::tilde(path).to_string();
    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(expanded)
}
