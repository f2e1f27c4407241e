// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [supervisor]
/// grace_period = "500ms"
/// read_chunk_size = 1024
/// line_break = "<br>"
/// shutdown_timeout = "5s"
///
/// [launcher]
/// program = "/usr/local/bin/mytool"
/// ```
///
/// All sections are optional and have defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: RawSupervisorSection,

    #[serde(default)]
    pub launcher: LauncherSection,
}

/// `[supervisor]` section, durations still as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSupervisorSection {
    /// How long a new run waits for its first subscriber before it starts
    /// draining output anyway.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    /// Upper bound on the bytes read from the child per chunk.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Token substituted for line breaks in the log and live chunks.
    #[serde(default = "default_line_break")]
    pub line_break: String,

    /// How long shutdown waits for active runs to wind down.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: String,
}

fn default_grace_period() -> String {
    "500ms".to_string()
}

fn default_read_chunk_size() -> usize {
    1024
}

fn default_line_break() -> String {
    "<br>".to_string()
}

fn default_shutdown_timeout() -> String {
    "5s".to_string()
}

impl Default for RawSupervisorSection {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            read_chunk_size: default_read_chunk_size(),
            line_break: default_line_break(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// `[launcher]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LauncherSection {
    /// Program to launch runs with. `None` re-invokes the current executable.
    #[serde(default)]
    pub program: Option<PathBuf>,
}

/// Validated supervisor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub grace_period: Duration,
    pub read_chunk_size: usize,
    pub line_break: String,
    pub shutdown_timeout: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(500),
            read_chunk_size: default_read_chunk_size(),
            line_break: default_line_break(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Validated configuration. Build it from a [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub supervisor: SupervisorSettings,
    pub launcher: LauncherSection,
}
