use anyhow::Result;
use async_trait::async_trait;

/// OCR engine trait for text recognition
#[async_trait]
pub trait OCREngine: Send + Sync {
    /// Extract the plain text found in an image file
    async fn extract_text(&self, path: &str) -> Result<String>;

    /// Get the name of the OCR engine
    fn name(&self) -> &str;
}

pub mod tesseract;

pub use tesseract::TesseractOCR;
