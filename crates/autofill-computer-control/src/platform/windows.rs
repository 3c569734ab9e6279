use crate::ComputerController;
use anyhow::Result;
use async_trait::async_trait;

pub struct WindowsController;

impl WindowsController {
    pub fn new() -> Result<Self> {
        tracing::warn!("Windows screen capture not implemented");
        Ok(Self)
    }
}

#[async_trait]
impl ComputerController for WindowsController {
    async fn take_screenshot(&self, _path: &str) -> Result<()> {
        anyhow::bail!("Windows screenshot implementation not yet available")
    }
}
