//! JSON <-> expression Value conversion utilities

use crate::Value;

/// Convert serde_json::Value to an expression Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::array(arr.into_iter().map(json_to_value)),
        serde_json::Value::Object(obj) => {
            Value::object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))))
        }
    }
}

/// Convert an expression Value to serde_json::Value
///
/// `undefined` and functions have no JSON form and become `null`, as do NaN and the
/// infinities. A container nested inside itself is written as `null` where it recurs.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    to_json(v, &mut Vec::new())
}

fn to_json(v: &Value, seen: &mut Vec<usize>) -> serde_json::Value {
    match v {
        Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => {
            if seen.contains(&arr.addr()) {
                return serde_json::Value::Null;
            }
            seen.push(arr.addr());
            let items = arr.to_vec().iter().map(|item| to_json(item, seen)).collect();
            seen.pop();
            serde_json::Value::Array(items)
        }
        Value::Object(obj) => {
            if seen.contains(&obj.addr()) {
                return serde_json::Value::Null;
            }
            seen.push(obj.addr());
            let entries = obj
                .entries()
                .into_iter()
                .map(|(k, v)| (k, to_json(&v, seen)))
                .collect();
            seen.pop();
            serde_json::Value::Object(entries)
        }
    }
}
