//! CLI support for bindex
//!
//! Provides programmatic access to the `bindex` subcommands so they can be
//! embedded in other tools.

mod check;
mod convert;
mod eval;
mod filters;
mod inspect;

pub use check::{CheckOptions, CheckReport, execute_check};
pub use convert::{json_to_value, value_to_json};
pub use eval::{EvalOptions, EvalResult, execute_eval};
pub use filters::demo_filters;
pub use inspect::{render_ast, render_tokens};

use std::io;
use std::path::Path;

use crate::{ConfigError, Engine, EngineConfig};

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Lexer or parser error
    Parse(crate::ParseError),
    /// Evaluation error
    Eval(crate::EvalError),
    /// Configuration file error
    Config(ConfigError),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Eval(e) => write!(f, "Evaluation error: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Parse(e)
    }
}

impl From<crate::EvalError> for CliError {
    fn from(e: crate::EvalError) -> Self {
        CliError::Eval(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Builds the engine the CLI evaluates with: the optional config file plus the demo
/// filters.
pub fn engine_for(config: Option<&Path>) -> Result<Engine, CliError> {
    let config = match config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    Ok(Engine::from_config(&config)?.with_filters(demo_filters()))
}
