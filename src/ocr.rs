// src/ocr.rs

use image::{DynamicImage, ImageFormat, RgbImage};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to stage image for OCR: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode image for OCR: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to run tesseract (is it installed? path='{path}'): {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },
    #[error("tesseract exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },
}

/// Turns a decoded bitmap into text. Implementations report whatever the
/// engine recognizes; no confidence filtering happens here.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<String, OcrError>;
}

/// OCR through the `tesseract` command-line binary.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub binary: String,
    pub language: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &RgbImage) -> Result<String, OcrError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("ocr_input.png");
        DynamicImage::ImageRgb8(image.clone()).save_with_format(&input, ImageFormat::Png)?;

        debug!(
            width = image.width(),
            height = image.height(),
            lang = %self.language,
            "Running tesseract"
        );

        // tesseract input.png stdout -l eng
        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|source| OcrError::Spawn {
                path: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        info!(chars = text.chars().count(), "OCR complete");
        Ok(text)
    }
}
