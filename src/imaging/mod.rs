//! Image processing: codec backend plus the pure logic around it.
//!
//! | Concern | Where |
//! |---|---|
//! | **Decode / resize / encode** | [`ImageBackend`] trait, [`RustBackend`] (`image` crate) |
//! | **Output geometry** | [`plan_resize`] (pure arithmetic) |
//! | **JPEG EXIF relocation** | [`extract_exif`], [`inject_exif`], [`SkipWriter`] |
//! | **HEIC EXIF** | [`extract_heic_exif`] (minimal ISO-BMFF reader) |
//! | **Format dispatch** | [`SourceFormat`], [`OutputFormat`], [`resolve_output_format`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Encoder knobs
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Metadata**: byte-level EXIF extraction and splicing
//! - **Operations**: Backend + EXIF + filesystem, shared by both pipelines

pub mod backend;
mod calculations;
pub mod exif;
mod format;
pub(crate) mod heif_exif;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, Dimensions, ImageBackend};
pub use calculations::{PlanError, ResizeRequest, compression_ratio, fit_within, plan_resize};
pub use exif::{ExifSegment, SkipWriter, extract_exif, inject_exif};
pub use format::{OutputFormat, SourceFormat, Unresolved, resolve_output_format};
pub use heif_exif::{HeifExifError, extract_heic_exif};
pub use operations::{ensure_parent_dir, write_image_file};
pub use params::{EncodeOptions, PngLevel, Quality};
pub use rust_backend::RustBackend;
