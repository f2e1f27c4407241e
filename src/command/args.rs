// src/command/args.rs

//! Encode submitted field values as a run's argument vector.
//!
//! The vector is `[path, --name=value, ...]`:
//! - boolean fields turn form checkbox values `on`/`off` into `true`/`false`;
//! - multi-value fields contribute one `--name=value` per value;
//! - single-value fields use the first submitted value.

use crate::errors::{Result, WebcliError};

use super::{CommandEntry, FieldKind};

/// Build the argument vector for `entry` from `(name, value)` pairs.
///
/// Pairs may repeat a name. Output follows the entry's field order; fields
/// with no submitted value are omitted so the command's own default applies.
pub fn encode_args(entry: &CommandEntry, values: &[(String, String)]) -> Result<Vec<String>> {
    if let Some((unknown, _)) = values.iter().find(|(name, _)| entry.field(name).is_none()) {
        return Err(WebcliError::InvalidArguments(format!(
            "command '{}' has no field named '{}'",
            entry.path, unknown
        )));
    }

    let mut args = vec![entry.path.clone()];
    for field in &entry.fields {
        let mut submitted = values
            .iter()
            .filter(|(name, _)| *name == field.name)
            .map(|(_, value)| value.as_str());

        if field.multiple {
            for value in submitted.filter(|v| !v.is_empty()) {
                args.push(flag(&field.name, value));
            }
        } else if let Some(value) = submitted.next() {
            let value = match field.kind {
                FieldKind::Boolean => checkbox_value(value),
                _ => value,
            };
            args.push(flag(&field.name, value));
        }
    }
    Ok(args)
}

/// Split a `NAME=VALUE` assignment.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(WebcliError::InvalidArguments(format!(
            "expected NAME=VALUE, got '{raw}'"
        ))),
    }
}

fn checkbox_value(value: &str) -> &str {
    match value {
        "on" => "true",
        "off" => "false",
        other => other,
    }
}

fn flag(name: &str, value: &str) -> String {
    format!("--{name}={value}")
}
