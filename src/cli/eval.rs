//! Evaluate or assign an expression against JSON input

use std::path::PathBuf;

use super::{CliError, engine_for, json_to_value, value_to_json};
use crate::Value;

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON scope; an empty object when absent
    pub scope: Option<String>,
    /// JSON locals object
    pub locals: Option<String>,
    /// JSON value to assign through the expression instead of reading it
    pub assign: Option<String>,
    /// Engine configuration file
    pub config: Option<PathBuf>,
}

/// Result of an eval operation
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// The expression's value and whether it has settled
    Value {
        value: serde_json::Value,
        settled: bool,
    },
    /// The scope after an assignment
    Assigned { scope: serde_json::Value },
}

fn parse_json(text: Option<&str>) -> Result<Option<Value>, CliError> {
    text.map(|t| -> Result<Value, CliError> { Ok(json_to_value(serde_json::from_str(t)?)) })
        .transpose()
}

/// Execute an eval operation
pub fn execute_eval(options: &EvalOptions) -> Result<EvalResult, CliError> {
    let engine = engine_for(options.config.as_deref())?;
    let expression = engine.parse(&options.expression)?;

    let scope = parse_json(options.scope.as_deref())?
        .unwrap_or_else(|| Value::object::<String, _>([]));
    let locals = parse_json(options.locals.as_deref())?;

    match parse_json(options.assign.as_deref())? {
        Some(value) => {
            expression.assign(&scope, value, locals.as_ref())?;
            Ok(EvalResult::Assigned {
                scope: value_to_json(&scope),
            })
        }
        None => {
            let observation = expression.watch(&scope, locals.as_ref())?;
            Ok(EvalResult::Value {
                value: value_to_json(&observation.value),
                settled: observation.settled,
            })
        }
    }
}
