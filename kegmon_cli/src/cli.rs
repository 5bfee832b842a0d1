//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Console level used unless `--log-level` or `[logging] level` says otherwise.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(name = "kegmon", version, about = "Keg level monitor")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/kegmon.toml")]
    pub config: PathBuf,

    /// Print events and summaries as JSON lines; logs go to stderr as JSON too
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded CSV trace (timestamp_ms,channel,weight_kg) through the detector
    Replay {
        /// Trace file; an empty weight_kg cell is a failed read
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
    },
    /// Run the sampler thread against simulated kegs and print events as they arrive
    Simulate {
        /// Simulated duration in seconds
        #[arg(long, default_value_t = 120)]
        seconds: u64,
        /// Time compression factor (e.g. 60 runs a minute per real second)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Load and validate the config, then build the detector
    SelfCheck,
}
