//! HEIC → JPEG conversion.
//!
//! ```text
//! read → extract EXIF (HEIC item) → decode HEIC → fit to bounds → mkdir → encode JPEG + EXIF
//! ```
//!
//! Optional `max_width`/`max_height` shrink the photo to fit inside that box,
//! keeping its aspect ratio. Smaller photos are never enlarged.
//!
//! The EXIF item is pulled straight from the HEIC container and spliced into
//! the JPEG by the EXIF relocator, which keeps orientation and capture data.
//! A file without usable EXIF still converts; the JPEG then keeps the
//! encoder's own header untouched.
//!
//! Extension checks are the caller's job; see [`check_extensions`].

use crate::imaging::{
    BackendError, Dimensions, EncodeOptions, ImageBackend, OutputFormat, Quality,
    compression_ratio, ensure_parent_dir, extract_heic_exif, fit_within, write_image_file,
};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Input is not a HEIC file: {0}")]
    NotHeic(PathBuf),
    #[error("Output is not a JPG file: {0}")]
    NotJpeg(PathBuf),
    #[error("Failed to decode HEIC image: {0}")]
    Decode(String),
    #[error("Failed to encode JPG: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<BackendError> for ConvertError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Io(io) => Self::Io(io),
            other => Self::Encode(other.to_string()),
        }
    }
}

/// Quality the conversion uses when none is configured.
pub const DEFAULT_CONVERT_QUALITY: u32 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub quality: Quality,
    /// Maximum width in pixels, 0 for no limit.
    pub max_width: u32,
    /// Maximum height in pixels, 0 for no limit.
    pub max_height: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            quality: Quality::new(DEFAULT_CONVERT_QUALITY),
            max_width: 0,
            max_height: 0,
        }
    }
}

/// Milliseconds spent per stage. `encode_ms` includes any resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConversionTimings {
    pub decode_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub original_size: u64,
    pub converted_size: u64,
    pub compression_ratio: f64,
    pub original_dimensions: Dimensions,
    /// Dimensions of the written JPEG.
    pub dimensions: Dimensions,
    pub exif_preserved: bool,
    pub timings: ConversionTimings,
}

/// Input must end in `.heic`/`.HEIC`, output in `.jpg`/`.jpeg`/`.JPG`/`.JPEG`.
pub fn check_extensions(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let ext = |p: &Path| p.extension().and_then(|e| e.to_str()).map(str::to_owned);

    if !matches!(ext(input).as_deref(), Some("heic" | "HEIC")) {
        return Err(ConvertError::NotHeic(input.to_path_buf()));
    }
    if !matches!(
        ext(output).as_deref(),
        Some("jpg" | "jpeg" | "JPG" | "JPEG")
    ) {
        return Err(ConvertError::NotJpeg(output.to_path_buf()));
    }
    Ok(())
}

fn millis(since: Instant) -> u64 {
    since.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

/// Convert a HEIC file to a JPEG, carrying its EXIF block across.
pub fn convert_heic_to_jpg(
    backend: &impl ImageBackend,
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionResult, ConvertError> {
    let started = Instant::now();

    let bytes = fs::read(input).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConvertError::NotFound(input.to_path_buf()),
        _ => ConvertError::Io(e),
    })?;

    let exif = match extract_heic_exif(&bytes) {
        Ok(segment) => {
            log::debug!("{}: {} bytes of EXIF", input.display(), segment.len());
            Some(segment)
        }
        Err(e) => {
            log::warn!("Could not extract EXIF from {}: {e}", input.display());
            None
        }
    };

    let decode_started = Instant::now();
    let image = backend
        .decode_heic(&bytes)
        .map_err(|e| ConvertError::Decode(e.to_string()))?;
    let decode_ms = millis(decode_started);

    let original = Dimensions::of(&image);
    let target = fit_within(original, options.max_width, options.max_height)
        .map_err(|e| ConvertError::Decode(e.to_string()))?;

    ensure_parent_dir(output)?;

    let encode_started = Instant::now();
    let image = if target != original {
        log::debug!("{}: resizing {original} → {target}", input.display());
        backend.resize(&image, target.width, target.height)
    } else {
        image
    };
    let encode_options = EncodeOptions {
        quality: options.quality,
        ..EncodeOptions::default()
    };
    write_image_file(
        backend,
        &image,
        OutputFormat::Jpeg,
        &encode_options,
        exif.as_ref(),
        output,
    )?;
    let encode_ms = millis(encode_started);

    let original_size = bytes.len() as u64;
    let converted_size = fs::metadata(output)?.len();

    Ok(ConversionResult {
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        original_size,
        converted_size,
        compression_ratio: compression_ratio(original_size, converted_size),
        original_dimensions: original,
        dimensions: Dimensions::of(&image),
        exif_preserved: exif.is_some(),
        timings: ConversionTimings {
            decode_ms,
            encode_ms,
            total_ms: millis(started),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{FAKE_JPEG, MockBackend, RecordedOp};
    use crate::imaging::heif_exif::tests::heic_with_exif_item;
    use tempfile::TempDir;

    fn exif_item(tiff: &[u8]) -> Vec<u8> {
        let mut item = 6u32.to_be_bytes().to_vec();
        item.extend_from_slice(b"Exif\0\0");
        item.extend_from_slice(tiff);
        item
    }

    // =========================================================================
    // check_extensions
    // =========================================================================

    #[test]
    fn accepts_listed_extensions() {
        for out in ["a.jpg", "a.jpeg", "a.JPG", "a.JPEG"] {
            assert!(check_extensions(Path::new("x.heic"), Path::new(out)).is_ok());
        }
        assert!(check_extensions(Path::new("x.HEIC"), Path::new("a.jpg")).is_ok());
    }

    #[test]
    fn rejects_other_extensions() {
        assert!(matches!(
            check_extensions(Path::new("x.png"), Path::new("a.jpg")),
            Err(ConvertError::NotHeic(_))
        ));
        assert!(matches!(
            check_extensions(Path::new("x.Heic"), Path::new("a.jpg")),
            Err(ConvertError::NotHeic(_))
        ));
        assert!(matches!(
            check_extensions(Path::new("x.heic"), Path::new("a.png")),
            Err(ConvertError::NotJpeg(_))
        ));
        assert!(matches!(
            check_extensions(Path::new("x.heic"), Path::new("a")),
            Err(ConvertError::NotJpeg(_))
        ));
    }

    // =========================================================================
    // pipeline
    // =========================================================================

    #[test]
    fn exif_from_heic_is_spliced_into_jpeg() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("IMG_0001.HEIC");
        fs::write(&input, heic_with_exif_item(&exif_item(b"MM\0*\0\0\0\x08"), false)).unwrap();
        let output = tmp.path().join("out/IMG_0001.jpg");
        let backend = MockBackend::new();

        let result =
            convert_heic_to_jpg(&backend, &input, &output, &ConvertOptions::default()).unwrap();

        assert!(result.exif_preserved);
        let written = fs::read(&output).unwrap();
        let payload = b"Exif\0\0MM\0*\0\0\0\x08";
        assert_eq!(&written[..4], &[0xFF, 0xD8, 0xFF, 0xE1]);
        assert_eq!(
            u16::from_be_bytes([written[4], written[5]]) as usize,
            payload.len() + 2
        );
        assert_eq!(&written[6..6 + payload.len()], payload);
        assert_eq!(&written[6 + payload.len()..], &FAKE_JPEG[2..]);
    }

    #[test]
    fn heic_without_exif_keeps_encoder_soi() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("plain.heic");
        fs::write(&input, b"\0\0\0\x10ftypheic\0\0\0\0").unwrap();
        let output = tmp.path().join("plain.jpg");
        let backend = MockBackend::new();

        let result =
            convert_heic_to_jpg(&backend, &input, &output, &ConvertOptions::default()).unwrap();

        assert!(!result.exif_preserved);
        assert_eq!(fs::read(&output).unwrap(), FAKE_JPEG);
        assert_eq!(result.dimensions.to_string(), "4x3");
    }

    #[test]
    fn default_quality_reaches_encoder() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("q.heic");
        fs::write(&input, b"").unwrap();
        let backend = MockBackend::new();

        convert_heic_to_jpg(
            &backend,
            &input,
            &tmp.path().join("q.jpg"),
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::DecodeHeic,
                RecordedOp::Encode {
                    format: OutputFormat::Jpeg,
                    width: 4,
                    height: 3,
                    quality: 75,
                },
            ]
        );
    }

    #[test]
    fn missing_input_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("o.jpg");
        let err = convert_heic_to_jpg(
            &MockBackend::new(),
            &tmp.path().join("missing.heic"),
            &output,
            &ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
        assert!(!output.exists());
    }

    #[test]
    fn decode_failure_creates_no_output() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("broken.heic");
        fs::write(&input, b"broken").unwrap();
        let output = tmp.path().join("deep/broken.jpg");
        let backend = MockBackend {
            fail_heic: true,
            ..MockBackend::default()
        };

        let err =
            convert_heic_to_jpg(&backend, &input, &output, &ConvertOptions::default()).unwrap_err();

        assert!(matches!(err, ConvertError::Decode(_)));
        assert!(!tmp.path().join("deep").exists());
    }

    #[test]
    fn oversized_exif_is_dropped_and_conversion_succeeds() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("huge_exif.heic");
        let tiff = vec![0u8; 70_000];
        fs::write(&input, heic_with_exif_item(&exif_item(&tiff), false)).unwrap();
        let output = tmp.path().join("huge_exif.jpg");

        let result = convert_heic_to_jpg(
            &MockBackend::new(),
            &input,
            &output,
            &ConvertOptions::default(),
        )
        .unwrap();

        assert!(!result.exif_preserved);
        assert_eq!(fs::read(&output).unwrap(), FAKE_JPEG);
    }

    // =========================================================================
    // bounds
    // =========================================================================

    #[test]
    fn photo_larger_than_bounds_is_shrunk() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("big.heic");
        fs::write(&input, b"").unwrap();
        let backend = MockBackend::new();
        let options = ConvertOptions {
            max_width: 3,
            ..ConvertOptions::default()
        };

        // Mock HEIC is 4x3; 3/4 of that rounds to 3x2
        let result =
            convert_heic_to_jpg(&backend, &input, &tmp.path().join("big.jpg"), &options).unwrap();

        assert_eq!(result.original_dimensions.to_string(), "4x3");
        assert_eq!(result.dimensions.to_string(), "3x2");
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::DecodeHeic,
                RecordedOp::Resize {
                    width: 3,
                    height: 2,
                },
                RecordedOp::Encode {
                    format: OutputFormat::Jpeg,
                    width: 3,
                    height: 2,
                    quality: 75,
                },
            ]
        );
    }

    #[test]
    fn photo_within_bounds_is_not_resized() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("small.heic");
        fs::write(&input, b"").unwrap();
        let backend = MockBackend::new();
        let options = ConvertOptions {
            max_width: 10,
            max_height: 10,
            ..ConvertOptions::default()
        };

        let result =
            convert_heic_to_jpg(&backend, &input, &tmp.path().join("small.jpg"), &options)
                .unwrap();

        assert_eq!(result.dimensions, result.original_dimensions);
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Resize { .. }))
        );
    }
}
