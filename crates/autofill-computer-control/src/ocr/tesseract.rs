use super::OCREngine;
use anyhow::Result;
use async_trait::async_trait;

const INSTALL_HINT: &str = "To install tesseract:\n  macOS:   brew install tesseract\n  \
    Linux:   sudo apt-get install tesseract-ocr (Ubuntu/Debian)\n           \
    sudo yum install tesseract (RHEL/CentOS)\n  \
    Windows: Download from https://github.com/UB-Mannheim/tesseract/wiki";

/// Tesseract OCR engine driven through its command line
pub struct TesseractOCR {
    binary: String,
}

impl TesseractOCR {
    pub fn new() -> Self {
        Self::with_binary("tesseract")
    }

    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for TesseractOCR {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OCREngine for TesseractOCR {
    async fn extract_text(&self, path: &str) -> Result<String> {
        let output = tokio::process::Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .output()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to run {}: {}\n\n{}",
                    self.binary,
                    e,
                    INSTALL_HINT
                )
            })?;

        if !output.status.success() {
            anyhow::bail!(
                "Tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let text = normalize_ocr_text(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!("Tesseract extracted {} characters from {}", text.len(), path);
        Ok(text)
    }

    fn name(&self) -> &str {
        "Tesseract OCR"
    }
}

/// Trim trailing whitespace and collapse runs of blank lines.
pub fn normalize_ocr_text(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
