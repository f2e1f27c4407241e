// src/config/mod.rs

//! Configuration loading and validation for webcli.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into typed settings (`validate.rs`).
//! - Parse human-readable durations (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, LauncherSection, RawConfigFile, RawSupervisorSection, SupervisorSettings};
