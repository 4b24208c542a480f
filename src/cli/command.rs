use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

use difraw::structs::detector::DetectorId;

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (difraw ", env!("DIFRAW_VERSION"),
        ", built ", env!("BUILD_TIMESTAMP"), ")"
    ),
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting and replaying SDHCAL DIF raw buffer dumps",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Promote structural anomalies to hard failures.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a raw dump through the buffer loop and report statistics.
    Scan(ScanArgs),

    /// Print the structure of the first DIF buffer in a dump.
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Input raw dump (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Detectors to decode; buffers from any other module are skipped.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Detector::Hcal, Detector::Ecal, Detector::Beam]
    )]
    pub detector: Vec<Detector>,

    /// Stop after this many events (0 = process everything).
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub events: u64,

    /// Report rendering.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input raw dump.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
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

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ReportFormat {
    /// Human-readable text report.
    Text,
    /// YAML document suitable for further processing.
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum Detector {
    /// Semi-digital HCAL modules.
    Hcal,
    /// Silicon ECAL modules.
    Ecal,
    /// Beam instrumentation modules.
    Beam,
}

impl Detector {
    pub fn to_detector_id(self) -> DetectorId {
        match self {
            Detector::Hcal => DetectorId::Hcal,
            Detector::Ecal => DetectorId::Ecal,
            Detector::Beam => DetectorId::Beam,
        }
    }
}
