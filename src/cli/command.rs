use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    about      = "Tools for inspecting and extracting LRW stream-probe packet captures",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat stream diagnostics as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract the per-stream contents of an LRW capture into audio and raw files.
    Extract(ExtractArgs),

    /// Print per-stream capture information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Input LRW capture (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Base path for output files (defaults to the input path minus its extension).
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Declared sample rate for one stream, as ID:HZ (repeatable; 0 means unknown).
    #[arg(long = "sample-rate", value_name = "ID:HZ", value_parser = parse_rate_spec)]
    pub sample_rates: Vec<(u8, u32)>,

    /// Capture words are stored byte-swapped (little-endian as written).
    #[arg(long)]
    pub byte_swap: bool,

    /// Also write a human-readable packet-header log.
    #[arg(long)]
    pub headers: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input LRW capture (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Capture words are stored byte-swapped (little-endian as written).
    #[arg(long)]
    pub byte_swap: bool,
}

fn parse_rate_spec(spec: &str) -> Result<(u8, u32), String> {
    let (id, rate) = spec
        .split_once(':')
        .ok_or_else(|| format!("expected ID:HZ, got {spec:?}"))?;

    let id = id
        .trim()
        .parse::<u8>()
        .map_err(|e| format!("invalid stream id {id:?}: {e}"))?;
    let rate = rate
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid sample rate {rate:?}: {e}"))?;

    Ok((id, rate))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_specs_parse() {
        assert_eq!(parse_rate_spec("0:16000").unwrap(), (0, 16000));
        assert_eq!(parse_rate_spec("1:0").unwrap(), (1, 0));

        assert!(parse_rate_spec("16000").is_err());
        assert!(parse_rate_spec("x:16000").is_err());
        assert!(parse_rate_spec("0:loud").is_err());
    }
}
