//! High-level image operations.
//!
//! These functions combine the backend with the EXIF relocator and the
//! filesystem. Both pipelines write their output through here.

use super::backend::{BackendError, ImageBackend};
use super::exif::{ExifSegment, inject_exif};
use super::format::OutputFormat;
use super::params::EncodeOptions;
use image::DynamicImage;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Create the directory an output file will live in, if it is missing.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Encode `image` as `format` into a new file at `path`.
///
/// JPEG output goes through [`inject_exif`], so a given `exif` segment becomes
/// the first segment of the file. Other formats ignore `exif`. On failure the
/// partially written file is removed.
pub fn write_image_file(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: OutputFormat,
    options: &EncodeOptions,
    exif: Option<&ExifSegment>,
    path: &Path,
) -> Result<()> {
    let result = encode_to(backend, image, format, options, exif, path);
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn encode_to(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: OutputFormat,
    options: &EncodeOptions,
    exif: Option<&ExifSegment>,
    path: &Path,
) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);

    let mut writer = match format {
        OutputFormat::Jpeg => inject_exif(writer, exif, |w| {
            backend.encode(image, format, options, w)
        })?,
        OutputFormat::Png | OutputFormat::Gif => {
            let mut writer = writer;
            backend.encode(image, format, options, &mut writer)?;
            writer
        }
    };
    writer.flush()?;
    Ok(())
}
