//! Configuration loading, CLI/env overrides and validation.
//!
//! A deployment can be driven entirely by environment variables (every
//! section has defaults) or by a json/yaml/toml file with env and CLI flags
//! layered on top.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config, load_config_or_default};
pub use types::*;
pub use validate::validate_config;

#[cfg(test)]
mod tests;
