//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the black box the pipelines delegate pixel
//! work to: decode, HEIC decode, resize and encode. Everything around it
//! (resize planning, EXIF relocation, format choice) lives outside so it can
//! be tested with a mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::format::{OutputFormat, SourceFormat};
use super::params::EncodeOptions;
use image::DynamicImage;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decoded pixels plus the format the bytes were recognised as.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: SourceFormat,
}

/// Trait for image codec backends.
///
/// Implementations must be `Sync`; each call owns its pixels, nothing is
/// shared between calls.
pub trait ImageBackend: Sync {
    /// Decode JPEG, PNG or GIF bytes, reporting the detected format.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Decode the primary image of a HEIC file.
    fn decode_heic(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resize to exactly `width`×`height` (Lanczos3).
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Encode a complete image stream of `format` into `writer`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        options: &EncodeOptions,
        writer: &mut dyn Write,
    ) -> Result<(), BackendError>;
}
