// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `webcli`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "webcli",
    version,
    about = "Launch sub-commands as supervised runs and stream their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Webcli.toml` in the current working directory if present,
    /// built-in defaults otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WEBCLI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Start a job as a supervised run and print its output as event-stream
    /// records until it ends.
    Launch(LaunchArgs),

    /// List the jobs that can be launched, with their fields.
    Commands,

    /// Jobs that can be launched.
    #[command(subcommand)]
    Jobs(JobCommand),
}

#[derive(Debug, Clone, Args)]
pub struct LaunchArgs {
    /// Slash-qualified job path, e.g. `jobs/tick`.
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Field value; repeat for several fields or for multi-value fields.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Cancel the run after this long (e.g. `2s`, `500ms`).
    #[arg(long, value_name = "DURATION")]
    pub cancel_after: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum JobCommand {
    /// Print a numbered tick at a fixed interval.
    Tick {
        /// Number of ticks to print.
        #[arg(long, default_value_t = 5)]
        count: u32,

        /// Pause between ticks (e.g. `1s`, `250ms`).
        #[arg(long, default_value = "1s")]
        interval: String,

        /// Print ticks in upper case.
        #[arg(
            long,
            action = ArgAction::Set,
            default_value_t = false,
            num_args = 0..=1,
            default_missing_value = "true"
        )]
        shout: bool,
    },

    /// Print each text on its own line.
    Echo {
        /// Text to print; repeat for several lines.
        #[arg(long, action = ArgAction::Append)]
        text: Vec<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
