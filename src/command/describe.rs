// src/command/describe.rs

//! Build a [`CommandNode`] tree from a `clap` command.

use clap::{Arg, ArgAction, Command};

use super::{CommandNode, Field, FieldKind};

/// Describe `cmd` and its visible sub-commands.
///
/// Field kinds are inferred from each argument's default value: `true` /
/// `false` (or a flag action) means boolean, a numeric default means number,
/// anything else is text. Append actions accept multiple values. Hidden
/// items, positionals, and help/version flags are skipped.
pub fn from_clap(cmd: &Command) -> CommandNode {
    let fields = cmd
        .get_arguments()
        .filter(|arg| is_field(arg))
        .map(field_from_arg)
        .collect();

    let children = cmd
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set() && sub.get_name() != "help")
        .map(from_clap)
        .collect();

    CommandNode {
        name: cmd.get_name().to_string(),
        description: description(cmd),
        fields,
        children,
    }
}

fn is_field(arg: &Arg) -> bool {
    !arg.is_positional()
        && !arg.is_hide_set()
        && arg.get_long().is_some()
        && !matches!(
            arg.get_action(),
            ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version
        )
}

fn field_from_arg(arg: &Arg) -> Field {
    let name = arg.get_long().unwrap_or(arg.get_id().as_str());
    let default = arg
        .get_default_values()
        .iter()
        .map(|v| v.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(",");

    let kind = if matches!(arg.get_action(), ArgAction::SetTrue | ArgAction::SetFalse)
        || default == "true"
        || default == "false"
    {
        FieldKind::Boolean
    } else if !default.is_empty() && default.parse::<f64>().is_ok() {
        FieldKind::Number
    } else {
        FieldKind::Text
    };

    let mut field = Field::new(name, kind)
        .with_default(default)
        .with_description(arg.get_help().map(|h| h.to_string()).unwrap_or_default());
    if matches!(arg.get_action(), ArgAction::Append) {
        field = field.multiple();
    }
    field
}

fn description(cmd: &Command) -> String {
    let about = cmd.get_about().map(|s| s.to_string()).unwrap_or_default();
    let long = cmd.get_long_about().map(|s| s.to_string()).unwrap_or_default();
    if long.is_empty() || long == about {
        about
    } else if about.is_empty() {
        long
    } else {
        format!("{about}\n{long}")
    }
}
