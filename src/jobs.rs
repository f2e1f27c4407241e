// src/jobs.rs

//! Demo jobs launched by re-invoking the binary (`webcli jobs ...`).
//!
//! They write to stdout like any other command-line tool; the supervising
//! run captures that output.

use std::io::Write;

use anyhow::{Result, anyhow};
use clap::CommandFactory;
use tokio::time::sleep;

use crate::cli::{CliArgs, JobCommand};
use crate::command::{CommandNode, from_clap};
use crate::config::parse_duration;

/// Execute a demo job in the current process.
pub async fn run_job(job: JobCommand) -> Result<()> {
    match job {
        JobCommand::Tick {
            count,
            interval,
            shout,
        } => {
            let interval = parse_duration(&interval).map_err(|e| anyhow!("--interval: {e}"))?;
            for i in 0..count {
                let line = format!("tick {i}");
                let line = if shout { line.to_uppercase() } else { line };
                print_line(&line)?;
                if i + 1 < count {
                    sleep(interval).await;
                }
            }
            Ok(())
        }
        JobCommand::Echo { text } => {
            for line in text {
                print_line(&line)?;
            }
            Ok(())
        }
    }
}

/// The launchable job tree, derived from the CLI definition.
pub fn job_tree() -> Result<CommandNode> {
    let cli = CliArgs::command();
    let jobs = cli
        .find_subcommand("jobs")
        .ok_or_else(|| anyhow!("CLI has no `jobs` sub-command"))?;
    Ok(from_clap(jobs))
}

/// Print and flush right away so a supervising run sees each line promptly.
fn print_line(line: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
