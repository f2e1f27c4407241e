// src/launcher/mod.rs

//! Process launching layer.
//!
//! A [`Launcher`] turns an argument vector into a live child process and
//! hands back its combined output (stdout + stderr) and its stdin.
//!
//! - [`process`] holds [`ProcessLauncher`], the production implementation
//!   built on `tokio::process::Command`.
//! - [`combined`] provides [`CombinedOutput`], a single `AsyncRead` fed from
//!   several pipes.
//!
//! Tests can provide their own `Launcher` that doesn't spawn real processes.

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::errors::Result;

pub mod combined;
pub mod process;

pub use combined::{ChunkSender, CombinedOutput};
pub use process::ProcessLauncher;

/// Readable side of a launched process: stdout and stderr interleaved.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Writable side of a launched process (its stdin).
pub type InputStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Handles to a freshly launched process.
///
/// The output must be drained by the caller, otherwise the child eventually
/// blocks writing to a full pipe.
pub struct Launched {
    pub output: OutputStream,
    pub input: Option<InputStream>,
}

impl fmt::Debug for Launched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Launched")
            .field("has_input", &self.input.is_some())
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how a run's process is started.
pub trait Launcher: Send + Sync + fmt::Debug {
    /// Start a process for `args`.
    ///
    /// Cancelling `cancel` must terminate the process. Fails with
    /// `InvalidArguments` for an empty vector and `Launch` when the process
    /// cannot be created.
    fn launch(&self, args: &[String], cancel: CancellationToken) -> Result<Launched>;
}
