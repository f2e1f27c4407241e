// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod launcher;
pub mod logging;
pub mod registry;
pub mod run;
pub mod stream;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::cli::{CliArgs, CliCommand, LaunchArgs};
use crate::command::{CommandEntry, encode_args, flatten, parse_assignment};
use crate::config::{ConfigFile, load_or_default, parse_duration};
use crate::registry::Registry;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        CliCommand::Jobs(job) => jobs::run_job(job).await,
        CliCommand::Commands => {
            print_commands(&job_catalog()?);
            Ok(())
        }
        CliCommand::Launch(launch) => {
            let cfg = load_or_default(args.config.as_deref().map(Path::new))
                .context("loading configuration")?;
            launch_and_stream(cfg, launch).await
        }
    }
}

/// Start one run through a registry and copy its event stream to stdout.
///
/// This wires together:
/// - argument encoding for the selected job
/// - the registry / run / launcher stack
/// - optional timed cancellation
/// - Ctrl-C → registry shutdown
async fn launch_and_stream(cfg: ConfigFile, launch: LaunchArgs) -> Result<()> {
    let catalog = job_catalog()?;
    let entry = catalog
        .iter()
        .find(|e| e.path == launch.path)
        .ok_or_else(|| {
            anyhow!(
                "unknown job '{}'; run `webcli commands` to list jobs",
                launch.path
            )
        })?;

    let values = launch
        .set
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<errors::Result<Vec<_>>>()?;
    let argv = encode_args(entry, &values)?;

    let shutdown_timeout = cfg.supervisor.shutdown_timeout;
    let registry = Arc::new(Registry::from_config(&cfg));
    let id = registry.start(argv)?;
    let mut stream = registry.stream(&id)?;

    if let Some(ref raw) = launch.cancel_after {
        let delay = parse_duration(raw).map_err(|e| anyhow!("--cancel-after: {e}"))?;
        let registry = Arc::clone(&registry);
        let id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = registry.cancel(&id) {
                warn!(run_id = %id, error = %e, "timed cancellation failed");
            }
        });
    }

    // Ctrl-C → cancel every run and wait for them to wind down.
    {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            registry.shutdown(shutdown_timeout).await;
        });
    }

    let mut stdout = tokio::io::stdout();
    while let Some(event) = stream.next().await {
        stdout.write_all(event.encode().as_bytes()).await?;
        stdout.flush().await?;
    }

    if let Some(run) = registry.get(&id) {
        let status = run.wait().await;
        info!(run_id = %id, %status, log_bytes = run.logs().len(), "launch finished");
    }
    Ok(())
}

fn job_catalog() -> Result<Vec<CommandEntry>> {
    Ok(flatten(&[jobs::job_tree()?]))
}

fn print_commands(entries: &[CommandEntry]) {
    println!("jobs ({}):", entries.len());
    for entry in entries {
        println!("  - {}", entry.path);
        if !entry.description.is_empty() {
            println!("      {}", entry.description.replace('\n', "\n      "));
        }
        for field in &entry.fields {
            let multiple = if field.multiple { ", multiple" } else { "" };
            println!(
                "      --{} ({:?}{multiple}) default={:?}  {}",
                field.name, field.kind, field.default, field.description
            );
        }
    }
}
