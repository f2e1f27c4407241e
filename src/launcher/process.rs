// src/launcher/process.rs

//! Launch runs as real OS processes.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LauncherSection;
use crate::errors::{Result, WebcliError};

use super::{CombinedOutput, InputStream, Launched, Launcher};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Program {
    /// Re-invoke the executable of the running process.
    CurrentExe,
    Path(PathBuf),
}

/// Spawns each run as a child process with piped stdio.
///
/// By default the child is the current executable, so a binary can offer its
/// own sub-commands as launchable jobs.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: Program,
}

impl ProcessLauncher {
    /// Launch runs by re-invoking the current executable.
    pub fn current_exe() -> Self {
        Self {
            program: Program::CurrentExe,
        }
    }

    /// Launch runs with an explicit program.
    pub fn program(path: impl Into<PathBuf>) -> Self {
        Self {
            program: Program::Path(path.into()),
        }
    }

    pub fn from_config(section: &LauncherSection) -> Self {
        match &section.program {
            Some(path) => Self::program(path.clone()),
            None => Self::current_exe(),
        }
    }

    /// Resolve the program path. The current executable is looked up on every
    /// launch.
    fn resolve(&self) -> Result<PathBuf> {
        match &self.program {
            Program::CurrentExe => std::env::current_exe()
                .map_err(|e| WebcliError::launch("resolving current executable", e)),
            Program::Path(path) => Ok(path.clone()),
        }
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::current_exe()
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, args: &[String], cancel: CancellationToken) -> Result<Launched> {
        if args.is_empty() {
            return Err(WebcliError::InvalidArguments(
                "no command provided".to_string(),
            ));
        }

        let program = self.resolve()?;

        let mut cmd = Command::new(&program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| WebcliError::launch(format!("spawning {}", program.display()), e))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                return Err(WebcliError::launch(
                    format!("capturing output of {}", program.display()),
                    std::io::Error::other("stdout/stderr pipes were not created"),
                ));
            }
        };
        let input = child.stdin.take().map(|stdin| Box::new(stdin) as InputStream);

        info!(
            program = %program.display(),
            pid = child.id(),
            ?args,
            "launched child process"
        );

        let output = CombinedOutput::merge(stdout, stderr);
        spawn_reaper(child, program.display().to_string(), cancel);

        Ok(Launched {
            output: Box::new(output),
            input,
        })
    }
}

/// Own the child until it exits, killing it if `cancel` fires first.
fn spawn_reaper(mut child: Child, program: String, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            status_res = child.wait() => {
                match status_res {
                    Ok(status) => info!(
                        program = %program,
                        exit_code = status.code().unwrap_or(-1),
                        success = status.success(),
                        "child process exited"
                    ),
                    Err(e) => warn!(
                        program = %program,
                        error = %e,
                        "failed to wait for child process"
                    ),
                }
            }

            _ = cancel.cancelled() => {
                info!(program = %program, "cancellation requested; killing child process");
                if let Err(e) = child.kill().await {
                    // Usually means it already exited on its own.
                    debug!(
                        program = %program,
                        error = %e,
                        "failed to kill child process on cancellation"
                    );
                }
            }
        }
    });
}
