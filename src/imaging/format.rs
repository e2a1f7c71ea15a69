//! Image format tags and output-format resolution.
//!
//! Two enums keep the dispatch explicit: [`SourceFormat`] is what a decoder
//! recognised (HEIC can only ever be a source), [`OutputFormat`] is what the
//! encoders can produce. [`resolve_output_format`] applies the fixed priority
//! order: explicit option, then output extension, then source format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Format of a decoded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Heic,
    /// Decodable by the backend but not something we re-encode.
    Other,
}

impl SourceFormat {
    /// Classify a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "heic" => Some(Self::Heic),
            _ => None,
        }
    }

    /// The output format that re-encodes this source as-is, if any.
    pub fn as_output(self) -> Option<OutputFormat> {
        match self {
            Self::Jpeg => Some(OutputFormat::Jpeg),
            Self::Png => Some(OutputFormat::Png),
            Self::Gif => Some(OutputFormat::Gif),
            Self::Heic | Self::Other => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Heic => "heic",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format an encoder can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[value(name = "jpg", alias = "jpeg")]
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    /// Parse an extension or format name (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Why no output format could be chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// The output path has an extension no encoder handles.
    Extension(String),
    /// No extension and the source cannot be re-encoded in kind.
    Source(SourceFormat),
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(ext) => write!(f, "{ext}"),
            Self::Source(src) => write!(f, "{src}"),
        }
    }
}

/// Pick the output format: explicit option > output extension > source.
pub fn resolve_output_format(
    explicit: Option<OutputFormat>,
    output: &Path,
    source: SourceFormat,
) -> Result<OutputFormat, Unresolved> {
    if let Some(format) = explicit {
        return Ok(format);
    }

    match output.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => {
            OutputFormat::from_extension(ext).ok_or_else(|| Unresolved::Extension(ext.to_string()))
        }
        _ => source.as_output().ok_or(Unresolved::Source(source)),
    }
}
