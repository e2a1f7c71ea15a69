//! Tool configuration.
//!
//! An optional TOML file supplies defaults for both commands. Flags given on
//! the command line always win over values from the file.
//!
//! ```toml
//! [compress]
//! quality = 85             # JPEG quality (1-100)
//! png_level = "default"    # default | none | best-speed | best-compression
//! scale = 1.0              # only (0, 1) shrinks the image
//! max_width = 0            # 0 = no limit
//! max_height = 0           # 0 = no limit
//! # format = "jpg"         # force jpg | png | gif
//!
//! [convert]
//! quality = 75             # JPEG quality for HEIC conversion
//! max_width = 0            # fit inside this box, never enlarge
//! max_height = 0
//! ```
//!
//! Config files are sparse: every key is optional. Unknown keys are rejected
//! to catch typos early.

use crate::compress::CompressOptions;
use crate::convert::{ConvertOptions, DEFAULT_CONVERT_QUALITY};
use crate::imaging::{OutputFormat, PngLevel, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub compress: CompressConfig,
    pub convert: ConvertConfig,
}

/// Defaults for `compress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressConfig {
    pub quality: u32,
    pub png_level: PngLevel,
    pub scale: f64,
    pub max_width: u32,
    pub max_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            png_level: PngLevel::Default,
            scale: 1.0,
            max_width: 0,
            max_height: 0,
            format: None,
        }
    }
}

impl CompressConfig {
    pub fn to_options(&self) -> CompressOptions {
        CompressOptions {
            quality: Quality::new(self.quality),
            png_level: self.png_level,
            scale: Some(self.scale),
            max_width: self.max_width,
            max_height: self.max_height,
            format: self.format,
        }
    }
}

/// Defaults for `heic2jpg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub quality: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_CONVERT_QUALITY,
            max_width: 0,
            max_height: 0,
        }
    }
}

impl ConvertConfig {
    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions {
            quality: Quality::new(self.quality),
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }
}

fn check_quality(key: &str, value: u32) -> Result<(), ConfigError> {
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Validation(format!("{key} must be 1-100")));
    }
    Ok(())
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quality("compress.quality", self.compress.quality)?;
        check_quality("convert.quality", self.convert.quality)?;
        if !self.compress.scale.is_finite() {
            return Err(ConfigError::Validation(
                "compress.scale must be a finite number".into(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<ToolConfig, ConfigError> {
    let config: ToolConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, or the stock defaults when none is given.
///
/// A path that was given but cannot be read is an error.
pub fn load_config(path: Option<&Path>) -> Result<ToolConfig, ConfigError> {
    match path {
        Some(path) => {
            log::debug!("Loading config from {}", path.display());
            parse_config(&fs::read_to_string(path)?)
        }
        None => Ok(ToolConfig::default()),
    }
}

/// Returns a fully-commented stock config file with every key.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# picpress configuration
# ======================
# Pass with: picpress --config picpress.toml <command> ...
# All settings are optional. Values shown below are the defaults.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# compress: JPEG / PNG / GIF recompression
# ---------------------------------------------------------------------------
[compress]
# JPEG quality (1 = smallest, 100 = best).
quality = 85

# PNG compression effort: "default", "none", "best-speed" or
# "best-compression". Numeric levels are accepted as strings too:
# "0" default, "-1" none, "-2" best speed, "-3" best compression.
png_level = "default"

# Scale factor. Only values between 0 and 1 shrink the image; when it
# applies, max_width and max_height are ignored.
scale = 1.0

# Bounding box in pixels; 0 leaves that axis unconstrained. With only one
# set, the other follows the aspect ratio. With both set and the image
# larger, the output is exactly max_width x max_height.
max_width = 0
max_height = 0

# Force an output format: "jpg", "png" or "gif".
# By default the output path's extension decides, then the source format.
# format = "jpg"

# ---------------------------------------------------------------------------
# heic2jpg: HEIC to JPEG conversion
# ---------------------------------------------------------------------------
[convert]
# JPEG quality for converted files.
quality = 75

# Bounding box in pixels; 0 leaves that axis unconstrained. The photo is
# shrunk to fit inside the box with its aspect ratio kept. Photos already
# inside the box are never enlarged.
max_width = 0
max_height = 0
"##
}
