use std::fmt;

use serde::Serialize;

/// Identifier of a run, unique for the lifetime of a registry.
pub type RunId = String;

/// Opaque identity of a live consumer of a run's output.
pub type SubscriberId = String;

/// Lifecycle state of a run.
///
/// `Running` covers the implicit "starting" phase before the first read.
/// The other three are terminal: a run reaches exactly one of them, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
