//! Filters available to expressions run from the command line

use regex::Regex;

use super::value_to_json;
use crate::{EvalError, FilterRegistry, Value};

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::as_string).unwrap_or_default()
}

/// `uppercase`, `lowercase`, `json`, `default:fallback` and
/// `replace:pattern:replacement`
pub fn demo_filters() -> FilterRegistry {
    let mut filters = FilterRegistry::new();

    filters
        .register("uppercase", |input, _| {
            Ok(Value::String(input.as_string().to_uppercase()))
        })
        .register("lowercase", |input, _| {
            Ok(Value::String(input.as_string().to_lowercase()))
        })
        .register("json", |input, _| {
            serde_json::to_string(&value_to_json(input))
                .map(Value::String)
                .map_err(|e| EvalError::host(e.to_string()))
        })
        .register("default", |input, args| {
            let missing = input.is_nullish() || input.as_str() == Some("");
            Ok(if missing {
                args.first().cloned().unwrap_or_default()
            } else {
                input.clone()
            })
        })
        .register("replace", |input, args| {
            let pattern = Regex::new(&string_arg(args, 0))
                .map_err(|e| EvalError::host(format!("replace: {}", e)))?;
            let haystack = input.as_string();
            let replacement = string_arg(args, 1);
            Ok(Value::String(
                pattern.replace_all(&haystack, replacement.as_str()).into_owned(),
            ))
        });

    filters
}
