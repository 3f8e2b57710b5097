//! Engine configuration loaded from JSON.
//!
//! ```json
//! {
//!   "extra_denylist": ["password"],
//!   "literals": { "yes": true, "no": false },
//!   "cache": true
//! }
//! ```
//!
//! Every field is optional.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::{ast::Literal, sandbox::Sandbox};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Literal '{name}' must be a JSON scalar (null, boolean, number or string)")]
    InvalidLiteral { name: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Replaces the default denylist when present
    pub denylist: Option<Vec<String>>,

    /// Added on top of the (default or replaced) denylist
    pub extra_denylist: Vec<String>,

    /// Extra keywords for the parser's literal table
    pub literals: HashMap<String, serde_json::Value>,

    /// Share compilations between parses of the same source
    pub cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            denylist: None,
            extra_denylist: Vec::new(),
            literals: HashMap::new(),
            cache: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn sandbox(&self) -> Sandbox {
        let mut sandbox = match &self.denylist {
            Some(names) => Sandbox::new(names.iter().cloned()),
            None => Sandbox::default(),
        };
        for name in &self.extra_denylist {
            sandbox.deny(name.clone());
        }
        sandbox
    }

    /// The configured keywords as parser literals
    pub fn literal_table(&self) -> Result<HashMap<String, Literal>, ConfigError> {
        self.literals
            .iter()
            .map(|(name, value)| {
                let literal = match value {
                    serde_json::Value::Null => Literal::Null,
                    serde_json::Value::Bool(b) => Literal::Boolean(*b),
                    serde_json::Value::Number(n) => match n.as_i64() {
                        Some(i) => Literal::Integer(i),
                        None => Literal::Float(n.as_f64().unwrap_or(f64::NAN)),
                    },
                    serde_json::Value::String(s) => Literal::String(s.clone()),
                    serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                        return Err(ConfigError::InvalidLiteral { name: name.clone() });
                    }
                };
                Ok((name.clone(), literal))
            })
            .collect()
    }
}
