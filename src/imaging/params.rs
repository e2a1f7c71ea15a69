//! Parameter types for encode operations.
//!
//! These describe *how hard* to compress, not *where* the bytes go. They are
//! the interface between the pipelines (which decide what to encode) and the
//! [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG quality (1-100, default 85). Clamped on construction.
//! - [`PngLevel`]: PNG deflate effort, accepting names or numeric levels.
//! - [`EncodeOptions`]: the pair of the above handed to an encoder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// PNG compression effort.
///
/// Numeric levels follow the convention of the tool this replaces:
/// `0` is the default, `-1` no compression, `-2` best speed and `-3` best
/// compression. Zlib-style levels `1..=9` are bucketed into the three
/// efforts the encoder offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PngLevel {
    #[default]
    Default,
    NoCompression,
    BestSpeed,
    BestCompression,
}

impl PngLevel {
    /// Map a numeric level to an effort. Unknown numbers fall back to default.
    pub fn from_level(level: i32) -> Self {
        match level {
            -1 => Self::NoCompression,
            -2 | 1..=3 => Self::BestSpeed,
            -3 | 7..=9 => Self::BestCompression,
            _ => Self::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::NoCompression => "none",
            Self::BestSpeed => "best-speed",
            Self::BestCompression => "best-compression",
        }
    }
}

impl fmt::Display for PngLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PngLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<i32>() {
            return Ok(Self::from_level(level));
        }
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "none" | "no-compression" => Ok(Self::NoCompression),
            "fast" | "best-speed" => Ok(Self::BestSpeed),
            "best" | "best-compression" => Ok(Self::BestCompression),
            other => Err(format!(
                "invalid PNG level '{other}' (expected default, none, best-speed, best-compression or -3..9)"
            )),
        }
    }
}

impl TryFrom<String> for PngLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PngLevel> for String {
    fn from(level: PngLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Knobs handed to the encoder. GIF ignores both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    pub quality: Quality,
    pub png_level: PngLevel,
}
