//! CLI output formatting.
//!
//! Everything on stdout is a line protocol that wrapper scripts parse: the
//! first line starts with `success_` or `error_`, followed by an optional
//! human-readable report. Labels keep the wording existing wrappers match on.
//!
//! ## Compress
//!
//! ```text
//! success_压缩成功
//! 原始文件: photo.jpg
//! 输出文件: photo_compressed.jpg
//! 原始大小: 2.41 MB (4032x3024)
//! 压缩大小: 512.30 KB (2016x1512)
//! 压缩率: 79.24%
//! ```
//!
//! With `--json` the report is `success_` immediately followed by the result
//! serialized as a single JSON object.
//!
//! ## Convert
//!
//! ```text
//! success_转换成功
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::compress::CompressResult;
use crate::convert::ConversionResult;
use std::fmt::Display;

pub const SUCCESS_PREFIX: &str = "success_";
pub const ERROR_PREFIX: &str = "error_";

pub const COMPRESS_OK: &str = "压缩成功";
pub const CONVERT_OK: &str = "转换成功";

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Human-readable size with two decimals at 1024 scaling; plain bytes below 1 KB.
pub fn format_file_size(size: u64) -> String {
    let scaled = |unit: u64| size as f64 / unit as f64;
    match size {
        s if s >= GB => format!("{:.2} GB", scaled(GB)),
        s if s >= MB => format!("{:.2} MB", scaled(MB)),
        s if s >= KB => format!("{:.2} KB", scaled(KB)),
        s => format!("{s} B"),
    }
}

pub fn format_error(message: impl Display) -> String {
    format!("{ERROR_PREFIX}{message}")
}

pub fn format_compress_report(result: &CompressResult) -> Vec<String> {
    vec![
        format!("{SUCCESS_PREFIX}{COMPRESS_OK}"),
        format!("原始文件: {}", result.original_path.display()),
        format!("输出文件: {}", result.output_path.display()),
        format!(
            "原始大小: {} ({})",
            format_file_size(result.original_size),
            result.original_dimensions
        ),
        format!(
            "压缩大小: {} ({})",
            format_file_size(result.compressed_size),
            result.compressed_dimensions
        ),
        format!("压缩率: {:.2}%", result.compression_ratio),
    ]
}

/// `success_` plus the compact JSON result on one line.
pub fn format_compress_json(result: &CompressResult) -> Result<String, serde_json::Error> {
    Ok(format!("{SUCCESS_PREFIX}{}", serde_json::to_string(result)?))
}

pub fn format_convert_report(_result: &ConversionResult) -> Vec<String> {
    vec![format!("{SUCCESS_PREFIX}{CONVERT_OK}")]
}

pub fn usage_lines() -> Vec<&'static str> {
    vec![
        "使用方法:",
        "  picpress heic2jpg [-q int] [-width int] [-height int] <输入文件.heic> <输出文件.jpg>",
        "  picpress compress [选项] <输入文件>",
        "  picpress <文件>                 按扩展名自动选择 heic2jpg 或 compress",
        "  picpress gen-config             输出带注释的默认配置文件",
        "",
        "转换选项:",
        "  -q int",
        "        JPEG 质量 (1-100) (默认 75)",
        "  -width int / -height int",
        "        等比缩小到此范围内, 不放大 (默认 0，不限制)",
        "",
        "压缩选项:",
        "  -q int",
        "        JPEG 质量 (1-100) (默认 85)",
        "  -pnglevel level",
        "        PNG 压缩级别 (0 默认, -1 不压缩, -2 最快, -3 最佳) (默认 0)",
        "  -scale float",
        "        缩放比例 (0-1) (默认 1.0)",
        "  -width int",
        "        最大宽度 (像素) (默认 0，不限制)",
        "  -height int",
        "        最大高度 (像素) (默认 0，不限制)",
        "  -format string",
        "        输出格式 (jpg, png, gif), 默认与输入格式相同",
        "  -o string",
        "        输出文件路径, 默认为 [原文件名]_compressed.[格式]",
        "  --json",
        "        以 JSON 输出压缩结果",
        "",
        "全局选项:",
        "  --config <file>   从 TOML 文件读取默认值",
        "  -v, --verbose     输出调试日志到 stderr",
    ]
}

fn print_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}

pub fn print_error(message: impl Display) {
    println!("{}", format_error(message));
}

pub fn print_usage() {
    print_lines(&usage_lines());
}

pub fn print_compress_report(result: &CompressResult, json: bool) {
    if !json {
        print_lines(&format_compress_report(result));
        return;
    }
    match format_compress_json(result) {
        Ok(line) => println!("{line}"),
        Err(e) => print_error(e),
    }
}

pub fn print_convert_report(result: &ConversionResult) {
    print_lines(&format_convert_report(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionTimings;
    use crate::imaging::{Dimensions, OutputFormat};
    use std::path::PathBuf;

    fn compress_result() -> CompressResult {
        CompressResult {
            original_path: PathBuf::from("photo.jpg"),
            output_path: PathBuf::from("photo_compressed.jpg"),
            original_size: 2_097_152,
            compressed_size: 524_288,
            compression_ratio: 75.0,
            original_dimensions: Dimensions {
                width: 2000,
                height: 1000,
            },
            compressed_dimensions: Dimensions {
                width: 1000,
                height: 500,
            },
            format: OutputFormat::Jpeg,
            exif_preserved: true,
        }
    }

    // =========================================================================
    // format_file_size
    // =========================================================================

    #[test]
    fn file_size_bytes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
    }

    #[test]
    fn file_size_scaled_units() {
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * MB), "5.00 MB");
        assert_eq!(format_file_size(3 * GB / 2), "1.50 GB");
    }

    // =========================================================================
    // Reports
    // =========================================================================

    #[test]
    fn compress_report_lines() {
        let lines = format_compress_report(&compress_result());
        assert_eq!(
            lines,
            vec![
                "success_压缩成功",
                "原始文件: photo.jpg",
                "输出文件: photo_compressed.jpg",
                "原始大小: 2.00 MB (2000x1000)",
                "压缩大小: 512.00 KB (1000x500)",
                "压缩率: 75.00%",
            ]
        );
    }

    #[test]
    fn negative_ratio_is_printed_as_is() {
        let mut result = compress_result();
        result.compression_ratio = -12.5;
        let lines = format_compress_report(&result);
        assert_eq!(lines[5], "压缩率: -12.50%");
    }

    #[test]
    fn compress_json_is_single_prefixed_line() {
        let line = format_compress_json(&compress_result()).unwrap();
        let json = line.strip_prefix("success_").unwrap();
        assert!(!json.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["format"], "jpg");
        assert_eq!(value["compressed_dimensions"]["width"], 1000);
        assert_eq!(value["exif_preserved"], true);
    }

    #[test]
    fn convert_report_is_success_token() {
        let result = ConversionResult {
            input_path: PathBuf::from("a.heic"),
            output_path: PathBuf::from("a.jpg"),
            original_size: 10,
            converted_size: 20,
            compression_ratio: -100.0,
            original_dimensions: Dimensions {
                width: 4,
                height: 3,
            },
            dimensions: Dimensions {
                width: 4,
                height: 3,
            },
            exif_preserved: false,
            timings: ConversionTimings::default(),
        };
        assert_eq!(format_convert_report(&result), vec!["success_转换成功"]);
    }

    #[test]
    fn error_prefix() {
        assert_eq!(format_error("输入文件不存在"), "error_输入文件不存在");
    }

    #[test]
    fn usage_mentions_both_commands() {
        let usage = usage_lines().join("\n");
        assert!(usage.contains("heic2jpg"));
        assert!(usage.contains("compress"));
        assert!(usage.contains("-pnglevel"));
    }
}
