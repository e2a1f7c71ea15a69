use clap::{Parser, Subcommand};
use picpress::compress::{self, CompressResult};
use picpress::config::{self, ToolConfig};
use picpress::convert::{self, ConversionResult, ConvertError};
use picpress::imaging::{OutputFormat, PngLevel, Quality, RustBackend};
use picpress::output;
use std::error::Error;
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "picpress")]
#[command(about = "HEIC to JPEG conversion and JPEG/PNG/GIF compression")]
#[command(long_about = "\
HEIC to JPEG conversion and JPEG/PNG/GIF compression

Every run prints a single status line first: `success_...` or `error_...`.
The exit code is always 0, so wrapper scripts only need to read stdout.
Logs go to stderr.

EXIF metadata (orientation, capture data) is carried over whenever the
output is a JPEG: from the HEIC container for heic2jpg, and from the
original file when compressing a JPEG.

Run 'picpress gen-config' to generate a documented config file.")]
#[command(version = version_string())]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// TOML file with default settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a HEIC photo to JPEG, keeping its EXIF data
    Heic2jpg(Heic2jpgArgs),
    /// Recompress and optionally shrink a JPEG, PNG or GIF
    Compress(CompressArgs),
    /// Print usage
    Help,
    /// Print a stock config file with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct Heic2jpgArgs {
    /// JPEG quality (1-100) [default: 75]
    #[arg(short = 'q')]
    quality: Option<u32>,

    /// Maximum width in pixels; larger photos are shrunk to fit (0 = no limit)
    #[arg(long, allow_negative_numbers = true)]
    width: Option<u32>,

    /// Maximum height in pixels; larger photos are shrunk to fit (0 = no limit)
    #[arg(long, allow_negative_numbers = true)]
    height: Option<u32>,

    /// Input .heic file
    input: Option<PathBuf>,

    /// Output .jpg file
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CompressArgs {
    /// JPEG quality (1-100) [default: 85]
    #[arg(short = 'q')]
    quality: Option<u32>,

    /// PNG compression level: 0 default, -1 none, -2 best speed, -3 best compression
    #[arg(long, allow_hyphen_values = true)]
    pnglevel: Option<PngLevel>,

    /// Scale factor; only values between 0 and 1 shrink the image
    #[arg(long, allow_negative_numbers = true)]
    scale: Option<f64>,

    /// Maximum width in pixels (0 = no limit)
    #[arg(long, allow_negative_numbers = true)]
    width: Option<u32>,

    /// Maximum height in pixels (0 = no limit)
    #[arg(long, allow_negative_numbers = true)]
    height: Option<u32>,

    /// Output format [default: same as input]
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output path [default: <name>_compressed.<format>]
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Print the result as JSON after the success token
    #[arg(long)]
    json: bool,

    /// Input image
    input: Option<PathBuf>,
}

const SUBCOMMANDS: &[&str] = &["heic2jpg", "compress", "help", "gen-config"];

/// Long flags also accepted with a single dash (`-scale 0.5`).
const SINGLE_DASH_LONG: &[&str] = &[
    "pnglevel", "scale", "width", "height", "format", "json", "config", "verbose",
];

/// What to do with the raw argument list.
#[derive(Debug, PartialEq)]
enum Route {
    Parse(Vec<String>),
    Usage,
    Reject(&'static str),
}

/// `-pnglevel 3` → `--pnglevel 3`; `-scale=0.5` → `--scale=0.5`.
fn normalize_flag(arg: String) -> String {
    let Some(rest) = arg.strip_prefix('-') else {
        return arg;
    };
    if rest.starts_with('-') {
        return arg;
    }
    let name = rest.split('=').next().unwrap_or(rest);
    if SINGLE_DASH_LONG.contains(&name) {
        format!("-{arg}")
    } else {
        arg
    }
}

/// Index of the first positional argument, skipping global flags.
fn first_positional(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--config" {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}

/// Normalize flags and turn `picpress <file> ...` into an explicit command.
fn route(args: Vec<String>) -> Route {
    let args: Vec<String> = args.into_iter().map(normalize_flag).collect();
    if args.len() < 2 {
        return Route::Usage;
    }

    let Some(pos) = first_positional(&args) else {
        return Route::Parse(args);
    };
    let first = args[pos].as_str();
    if SUBCOMMANDS.contains(&first) {
        return Route::Parse(args);
    }

    let path = Path::new(first);
    if !path.exists() {
        return Route::Reject("未知命令或文件不存在");
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let command = match ext.as_str() {
        "heic" => "heic2jpg",
        "jpg" | "jpeg" | "png" | "gif" => "compress",
        _ => return Route::Reject("不支持的文件格式"),
    };

    let mut args = args;
    args.insert(pos, command.to_string());
    Route::Parse(args)
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();
}

/// First line of a clap error without its `error: ` lead.
fn clap_message(e: &clap::Error) -> String {
    let rendered = e.render().to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

fn main() {
    let args = match route(std::env::args().collect()) {
        Route::Parse(args) => args,
        Route::Usage => {
            output::print_usage();
            return;
        }
        Route::Reject(message) => {
            output::print_error(message);
            output::print_usage();
            return;
        }
    };

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = e.print();
                }
                _ => output::print_error(clap_message(&e)),
            }
            return;
        }
    };

    init_logging(cli.verbose);

    let tool_config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            output::print_error(e);
            return;
        }
    };

    match cli.command {
        None | Some(Command::Help) => output::print_usage(),
        Some(Command::GenConfig) => print!("{}", config::stock_config_toml()),
        Some(Command::Heic2jpg(args)) => match run_heic2jpg(args, &tool_config) {
            Ok(result) => {
                log::debug!(
                    "{} -> {}: {} -> {} bytes, {} (decode {} ms, encode {} ms, total {} ms)",
                    result.input_path.display(),
                    result.output_path.display(),
                    result.original_size,
                    result.converted_size,
                    result.dimensions,
                    result.timings.decode_ms,
                    result.timings.encode_ms,
                    result.timings.total_ms,
                );
                output::print_convert_report(&result);
            }
            Err(e) => output::print_error(e),
        },
        Some(Command::Compress(args)) => {
            let json = args.json;
            match run_compress(args, &tool_config) {
                Ok(result) => output::print_compress_report(&result, json),
                Err(e) => output::print_error(e),
            }
        }
    }
}

fn run_heic2jpg(
    args: Heic2jpgArgs,
    tool_config: &ToolConfig,
) -> Result<ConversionResult, Box<dyn Error>> {
    let (Some(input), Some(output)) = (args.input, args.output) else {
        return Err("参数不足，用法: heic2jpg <输入文件.heic> <输出文件.jpg>".into());
    };
    if !input.exists() {
        return Err("输入文件不存在".into());
    }
    match convert::check_extensions(&input, &output) {
        Err(ConvertError::NotHeic(_)) => return Err("输入文件不是 HEIC 格式".into()),
        Err(ConvertError::NotJpeg(_)) => return Err("输出文件不是 JPG 格式".into()),
        other => other?,
    }

    let mut options = tool_config.convert.to_options();
    if let Some(q) = args.quality {
        options.quality = Quality::new(q);
    }
    if let Some(width) = args.width {
        options.max_width = width;
    }
    if let Some(height) = args.height {
        options.max_height = height;
    }

    Ok(convert::convert_heic_to_jpg(
        &RustBackend::new(),
        &input,
        &output,
        &options,
    )?)
}

fn run_compress(
    args: CompressArgs,
    tool_config: &ToolConfig,
) -> Result<CompressResult, Box<dyn Error>> {
    let Some(input) = args.input else {
        return Err("参数不足，用法: compress [选项] <输入文件>".into());
    };
    if !input.exists() {
        return Err("输入文件不存在".into());
    }
    if !compress::is_supported_input(&input) {
        return Err("不支持的输入文件格式，支持的格式: jpg, jpeg, png, gif".into());
    }

    let mut options = tool_config.compress.to_options();
    if let Some(q) = args.quality {
        options.quality = Quality::new(q);
    }
    if let Some(level) = args.pnglevel {
        options.png_level = level;
    }
    if let Some(scale) = args.scale {
        options.scale = Some(scale);
    }
    if let Some(width) = args.width {
        options.max_width = width;
    }
    if let Some(height) = args.height {
        options.max_height = height;
    }
    if args.format.is_some() {
        options.format = args.format;
    }

    let output = args
        .output
        .unwrap_or_else(|| compress::default_output_path(&input, options.format));

    Ok(compress::compress(
        &RustBackend::new(),
        &input,
        &output,
        &options,
    )?)
}
