// src/command/mod.rs

//! Generic description of the commands a control panel can launch.
//!
//! - This module defines the command tree and flattens it into
//!   slash-qualified [`CommandEntry`]s.
//! - [`args`] encodes submitted field values into the argument vector a run
//!   is started with.
//! - [`describe`] builds the tree from a `clap` command.

use serde::Serialize;

pub mod args;
pub mod describe;

pub use args::{encode_args, parse_assignment};
pub use describe::from_clap;

/// Value type of a field, as far as a form is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
}

/// One flag of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub default: String,
    pub description: String,
    pub kind: FieldKind,
    /// Accepts several values (`--name=a --name=b`).
    pub multiple: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            default: String::new(),
            description: String::new(),
            kind,
            multiple: false,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }
}

/// A node of the command tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandNode {
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub children: Vec<CommandNode>,
}

/// A launchable command with its full path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEntry {
    /// Slash-qualified path, e.g. `jobs/tick`.
    pub path: String,
    pub description: String,
    pub fields: Vec<Field>,
}

impl CommandEntry {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Flatten a forest of commands into launchable entries, parents first.
///
/// A node without fields but with children only groups other commands and is
/// left out; a leaf without fields is still launchable.
pub fn flatten(nodes: &[CommandNode]) -> Vec<CommandEntry> {
    let mut out = Vec::new();
    flatten_into(nodes, "", &mut out);
    out
}

fn flatten_into(nodes: &[CommandNode], parent: &str, out: &mut Vec<CommandEntry>) {
    for node in nodes {
        let path = if parent.is_empty() {
            node.name.clone()
        } else {
            format!("{parent}/{}", node.name)
        };

        let is_group = node.fields.is_empty() && !node.children.is_empty();
        if !is_group {
            out.push(CommandEntry {
                path: path.clone(),
                description: node.description.clone(),
                fields: node.fields.clone(),
            });
        }

        flatten_into(&node.children, &path, out);
    }
}
