//! # picpress
//!
//! A small image tool with two jobs: convert HEIC photos to JPEG, and
//! recompress JPEG/PNG/GIF files with optional downscaling. In both cases a
//! JPEG output keeps the source's EXIF block, so orientation and capture data
//! survive the trip.
//!
//! # Architecture: Two Pipelines Over One Backend
//!
//! ```text
//! heic2jpg   .heic  →  HEIC EXIF item + decoded pixels  →  JPEG (+ APP1)
//! compress   image  →  plan size → resize → encode       →  JPEG (+ APP1) | PNG | GIF
//! ```
//!
//! Both pipelines drive an [`imaging::ImageBackend`] for pixel work and share
//! the EXIF relocator for writing JPEGs. Everything that is not codec work
//! (format resolution, resize planning, EXIF byte handling) is plain
//! functions over values, so it is unit tested without encoding images.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`compress`] | Recompression pipeline: decode, plan, resize, encode, report |
//! | [`convert`] | HEIC → JPEG pipeline with EXIF carry-over and stage timings |
//! | [`imaging`] | Backend trait, codecs, resize planner, EXIF relocator, format dispatch |
//! | [`config`] | Optional TOML defaults for both commands |
//! | [`output`] | `success_`/`error_` line protocol and report formatting |
//!
//! # Design Decisions
//!
//! ## Byte-Level EXIF Relocation
//!
//! The encoders know nothing about metadata. Instead the original APP1
//! segment is copied byte for byte: it is written right after a fresh SOI,
//! and the encoder's own SOI is swallowed by a skip-writer. No EXIF parsing
//! or re-serialization happens, so vendor tags and maker notes are kept
//! exactly.
//!
//! ## HEIC Metadata Without a Decoder
//!
//! The EXIF item is located by walking the ISO-BMFF boxes directly
//! (`meta` → `iinf` → `iloc`). Pixel decoding goes through the default
//! `heif` feature (system libheif); metadata extraction works without it.
//!
//! ## Status on Stdout, Logs on Stderr
//!
//! The binary always exits 0 and reports through a `success_`/`error_`
//! prefix on the first stdout line, which is what the scripts wrapping it
//! parse. Diagnostics go through `log` to stderr and never mix in.

pub mod compress;
pub mod config;
pub mod convert;
pub mod imaging;
pub mod output;
