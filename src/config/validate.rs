// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, RawSupervisorSection, SupervisorSettings};
use crate::errors::{Result, WebcliError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WebcliError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let supervisor = validate_supervisor(&raw.supervisor)?;
        validate_launcher(&raw)?;
        Ok(ConfigFile {
            supervisor,
            launcher: raw.launcher,
        })
    }
}

fn validate_supervisor(raw: &RawSupervisorSection) -> Result<SupervisorSettings> {
    let grace_period = duration_field("grace_period", &raw.grace_period)?;

    let shutdown_timeout = duration_field("shutdown_timeout", &raw.shutdown_timeout)?;
    if shutdown_timeout.is_zero() {
        return Err(WebcliError::ConfigError(
            "[supervisor].shutdown_timeout must be greater than zero".to_string(),
        ));
    }

    if raw.read_chunk_size == 0 {
        return Err(WebcliError::ConfigError(
            "[supervisor].read_chunk_size must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(SupervisorSettings {
        grace_period,
        read_chunk_size: raw.read_chunk_size,
        line_break: raw.line_break.clone(),
        shutdown_timeout,
    })
}

fn validate_launcher(raw: &RawConfigFile) -> Result<()> {
    if let Some(program) = &raw.launcher.program {
        if program.as_os_str().is_empty() {
            return Err(WebcliError::ConfigError(
                "[launcher].program must not be empty; omit it to use the current executable"
                    .to_string(),
            ));
        }
    }
    Ok(())
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| WebcliError::ConfigError(format!("[supervisor].{name}: {e}")))
}
