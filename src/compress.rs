//! Recompression pipeline for JPEG, PNG and GIF.
//!
//! ```text
//! stat → read → decode → resolve format → plan resize → mkdir
//!      → extract EXIF (JPEG source) → resize → encode → stat → ratio
//! ```
//!
//! Output format priority is explicit option, then the output extension,
//! then the source format. JPEG output carries the source's APP1 segment
//! forward when there is one. Missing EXIF is never an error.

use crate::imaging::{
    BackendError, Dimensions, EncodeOptions, ImageBackend, OutputFormat, PlanError, PngLevel,
    Quality, ResizeRequest, SourceFormat, compression_ratio, ensure_parent_dir, extract_exif,
    plan_resize, resolve_output_format, write_image_file,
};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    InvalidImage(#[from] PlanError),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<BackendError> for CompressError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Io(io) => Self::Io(io),
            BackendError::Unsupported(what) => Self::UnsupportedFormat(what),
            BackendError::Decode(reason) | BackendError::Encode(reason) => Self::Encode(reason),
        }
    }
}

/// Options for one compression run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    /// JPEG quality (1-100).
    pub quality: Quality,
    /// PNG compression effort.
    pub png_level: PngLevel,
    /// Scale factor; only values in `(0, 1)` take effect.
    pub scale: Option<f64>,
    /// Maximum width in pixels, 0 for no limit.
    pub max_width: u32,
    /// Maximum height in pixels, 0 for no limit.
    pub max_height: u32,
    /// Output format override.
    pub format: Option<OutputFormat>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            png_level: PngLevel::Default,
            scale: None,
            max_width: 0,
            max_height: 0,
            format: None,
        }
    }
}

impl CompressOptions {
    pub fn resize_request(&self) -> ResizeRequest {
        ResizeRequest {
            scale: self.scale,
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            quality: self.quality,
            png_level: self.png_level,
        }
    }
}

/// Outcome of a successful compression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressResult {
    pub original_path: PathBuf,
    pub output_path: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    /// `100 × (1 − compressed/original)`; negative when the file grew.
    pub compression_ratio: f64,
    pub original_dimensions: Dimensions,
    pub compressed_dimensions: Dimensions,
    pub format: OutputFormat,
    pub exif_preserved: bool,
}

/// Extensions accepted as compression input.
const SUPPORTED_INPUT: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Whether `path` has an extension the compressor accepts (case-insensitive).
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_INPUT.contains(&e.to_ascii_lowercase().as_str()))
}

/// `<stem>_compressed.<ext>` next to the input.
///
/// `ext` is the override format's extension, or the input's own extension.
pub fn default_output_path(input: &Path, format: Option<OutputFormat>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = match format {
        Some(f) => Some(f.extension().to_string()),
        None => input.extension().map(|e| e.to_string_lossy().into_owned()),
    };
    let name = match ext {
        Some(ext) => format!("{stem}_compressed.{ext}"),
        None => format!("{stem}_compressed"),
    };
    input.with_file_name(name)
}

/// Recompress `input` into `output`.
pub fn compress(
    backend: &impl ImageBackend,
    input: &Path,
    output: &Path,
    options: &CompressOptions,
) -> Result<CompressResult, CompressError> {
    let original_size = match fs::metadata(input) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CompressError::NotFound(input.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let bytes = fs::read(input)?;
    let decoded = backend
        .decode(&bytes)
        .map_err(|e| CompressError::Decode {
            path: input.to_path_buf(),
            reason: e.to_string(),
        })?;
    if decoded.format.as_output().is_none() {
        return Err(CompressError::UnsupportedFormat(decoded.format.to_string()));
    }
    let original = Dimensions::of(&decoded.image);

    let format = resolve_output_format(options.format, output, decoded.format)
        .map_err(|u| CompressError::UnsupportedFormat(u.to_string()))?;
    let target = plan_resize(original, &options.resize_request())?;
    log::debug!(
        "{}: {} {} → {} {}",
        input.display(),
        decoded.format,
        original,
        format,
        target
    );

    ensure_parent_dir(output)?;

    let exif = if decoded.format == SourceFormat::Jpeg {
        extract_exif(&bytes)
    } else {
        None
    };
    match &exif {
        Some(segment) => log::debug!("carrying {} bytes of EXIF", segment.len()),
        None => log::debug!("no EXIF to carry"),
    }

    let image = if target != original {
        backend.resize(&decoded.image, target.width, target.height)
    } else {
        decoded.image
    };
    let compressed = Dimensions::of(&image);

    write_image_file(
        backend,
        &image,
        format,
        &options.encode_options(),
        exif.as_ref(),
        output,
    )?;

    let compressed_size = fs::metadata(output)?.len();

    Ok(CompressResult {
        original_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        original_size,
        compressed_size,
        compression_ratio: compression_ratio(original_size, compressed_size),
        original_dimensions: original,
        compressed_dimensions: compressed,
        format,
        exif_preserved: exif.is_some() && format == OutputFormat::Jpeg,
    })
}
