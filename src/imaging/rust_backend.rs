//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image::ImageReader` with format sniffing |
//! | Decode (HEIC) | `libheif-rs` (only with the `heif` feature) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (compression effort) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (defaults) |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::format::{OutputFormat, SourceFormat};
use super::params::{EncodeOptions, PngLevel};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::io::{Cursor, Write};

/// Codec backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn source_format(format: Option<ImageFormat>) -> SourceFormat {
    match format {
        Some(ImageFormat::Jpeg) => SourceFormat::Jpeg,
        Some(ImageFormat::Png) => SourceFormat::Png,
        Some(ImageFormat::Gif) => SourceFormat::Gif,
        _ => SourceFormat::Other,
    }
}

fn png_compression(level: PngLevel) -> CompressionType {
    match level {
        PngLevel::Default => CompressionType::Default,
        // The encoder has no stored mode; its fastest setting is the closest
        PngLevel::NoCompression | PngLevel::BestSpeed => CompressionType::Fast,
        PngLevel::BestCompression => CompressionType::Best,
    }
}

/// JPEG has no alpha or 16-bit support; flatten anything else to RGB8.
fn jpeg_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

fn encode_failed(format: OutputFormat, e: image::ImageError) -> BackendError {
    match e {
        image::ImageError::IoError(io) => BackendError::Io(io),
        other => BackendError::Encode(format!("{format} encode failed: {other}")),
    }
}

#[cfg(feature = "heif")]
fn decode_heic_pixels(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let failed = |e: libheif_rs::HeifError| BackendError::Decode(format!("HEIC: {e}"));

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(failed)?;
    let handle = ctx.primary_image_handle().map_err(failed)?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(failed)?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| BackendError::Decode("HEIC: no interleaved RGB plane".into()))?;

    // Rows may be padded; copy out the visible width only
    let row_bytes = plane.width as usize * 3;
    let mut rgb = Vec::with_capacity(row_bytes * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        let visible = row
            .get(..row_bytes)
            .ok_or_else(|| BackendError::Decode("HEIC: short pixel row".into()))?;
        rgb.extend_from_slice(visible);
    }

    image::RgbImage::from_raw(plane.width, plane.height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("HEIC: pixel buffer size mismatch".into()))
}

#[cfg(not(feature = "heif"))]
fn decode_heic_pixels(_bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    Err(BackendError::Unsupported(
        "HEIC decoding requires building with the `heif` feature".into(),
    ))
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = source_format(reader.format());
        let image = reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(DecodedImage { image, format })
    }

    fn decode_heic(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        decode_heic_pixels(bytes)
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        options: &EncodeOptions,
        writer: &mut dyn Write,
    ) -> Result<(), BackendError> {
        match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(writer, options.quality.value() as u8);
                jpeg_compatible(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))
            }
            OutputFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    writer,
                    png_compression(options.png_level),
                    PngFilter::Adaptive,
                );
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))
            }
            OutputFormat::Gif => {
                let mut encoder = GifEncoder::new(writer);
                encoder
                    .encode_frame(image::Frame::new(image.to_rgba8()))
                    .map_err(|e| encode_failed(format, e))
            }
        }
    }
}
