//! Asset conversion: raster logos through the `image` crate, fonts through
//! FontForge, and the [`AssetConverter`] that caches renditions in storage.

mod converter;
mod font;
mod logo;

pub use converter::{AssetConverter, FileRequest, ServedFile, MAX_RENDITION_SIZE, MIN_RENDITION_SIZE};
pub use font::{FontConverter, FontFormat};
pub use logo::{solid_swatch_png, LogoConverter, LogoFormat, LogoOptions};

use brandkit_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    UnsupportedSource(String),

    #[error("Failed to decode source file: {0}")]
    Decode(String),

    #[error("Failed to encode output: {0}")]
    Encode(String),

    #[error("FontForge failed: {0}")]
    FontForge(String),

    #[error("Conversion timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::UnsupportedFormat(msg) => AppError::InvalidInput(msg),
            ConversionError::UnsupportedSource(msg) => AppError::UnsupportedMediaType(msg),
            ConversionError::Io(e) => AppError::Internal(format!("Conversion IO error: {}", e)),
            other => AppError::Conversion(other.to_string()),
        }
    }
}
