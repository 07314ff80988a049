// src/document.rs

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// What the uploader declared the bytes to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpg,
    Png,
    /// HEIC and HEIF photos.
    Heic,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "heic" | "heif" => Some(Self::Heic),
            _ => None,
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// An uploaded bill. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    kind: DocumentKind,
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }

    /// Read a file, inferring the kind from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let kind = DocumentKind::from_extension(ext).ok_or_else(|| {
            format!(
                "Unsupported file type '{}': expected pdf, jpg, jpeg, png, heic or heif",
                path.display()
            )
        })?;
        Ok(Self::new(fs::read(path)?, kind))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// SHA-256 of the raw bytes, used to correlate log lines of one run.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}
