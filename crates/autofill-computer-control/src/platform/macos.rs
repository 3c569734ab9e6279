use crate::{prepare_output_path, ComputerController};
use anyhow::{Context, Result};
use async_trait::async_trait;

pub struct MacOSController;

impl MacOSController {
    pub fn new() -> Result<Self> {
        tracing::debug!("Initialized macOS controller (screencapture)");
        Ok(Self)
    }
}

#[async_trait]
impl ComputerController for MacOSController {
    async fn take_screenshot(&self, path: &str) -> Result<()> {
        let final_path = prepare_output_path(path)?;

        let output = tokio::process::Command::new("screencapture")
            .arg("-x") // No sound
            .arg(&final_path)
            .output()
            .await
            .context("Failed to run screencapture")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "screencapture failed: {}\n\nGrant Screen Recording permission to your terminal in \
                System Settings → Privacy & Security.",
                stderr.trim()
            );
        }

        if !std::path::Path::new(&final_path).exists() {
            anyhow::bail!("screencapture reported success but wrote no file at {}", final_path);
        }

        tracing::debug!("Captured screen to {}", final_path);
        Ok(())
    }
}
