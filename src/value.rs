use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{ast::Literal, interpreter::EvalError};

/// Largest length an array may be grown to by an index or `length` write.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

thread_local! {
    // Containers currently being formatted by `Debug` on this thread.
    static FORMATTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Formats a container once per nesting path; a container reached again through
/// itself prints as `circular`.
fn debug_guarded(
    addr: usize,
    f: &mut fmt::Formatter<'_>,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if FORMATTING.with(|stack| stack.borrow().contains(&addr)) {
        return f.write_str("circular");
    }
    FORMATTING.with(|stack| stack.borrow_mut().push(addr));
    let result = body(f);
    FORMATTING.with(|stack| stack.borrow_mut().pop());
    result
}

/// Signature of host-provided callables: `(this, arguments) -> result`.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A runtime value read from or written to a scope.
///
/// Scalars are plain data. Arrays and objects are shared handles: cloning the value
/// clones the handle, so an assignment through one handle is visible through every
/// other. This is what lets `a.b = 1` mutate the object a scope already holds.
///
/// # Type Preservation
///
/// Integers and floats are kept apart:
/// - Integer arithmetic stays integral while the result is exact
/// - Mixed integer/float arithmetic collapses whole results back to integers
/// - Both are the same "number" type for equality and comparison
///
/// # Examples
///
/// ```
/// use bindex::Value;
///
/// let user = Value::object([("name", Value::from("Ada"))]);
/// let alias = user.clone();
/// alias.set_member("age", Value::Integer(36)).unwrap();
///
/// assert_eq!(user.get_member("age"), Value::Integer(36));
/// assert_eq!(user.get_member("missing"), Value::Undefined);
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; the result of reading anything missing
    #[default]
    Undefined,

    /// JSON null
    Null,

    /// true/false
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Shared array handle
    Array(Array),

    /// Shared object handle
    Object(Object),

    /// Host callable
    Function(Function),
}

/// Shared, mutable string-keyed map.
#[derive(Clone, Default)]
pub struct Object(Arc<RwLock<HashMap<String, Value>>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.write().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Snapshot of the entries; later writes are not reflected
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// True when both handles point at the same object
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let map = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Object(Arc::new(RwLock::new(map)))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_guarded(self.addr(), f, |f| f.debug_map().entries(self.entries()).finish())
    }
}

/// Shared, mutable array.
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    /// Writes `value` at `index`, padding any gap with `undefined`.
    ///
    /// Fails when the array would grow past [`MAX_ARRAY_LENGTH`].
    pub fn set(&self, index: usize, value: Value) -> Result<(), EvalError> {
        let mut items = self.0.write();
        if index >= items.len() {
            check_length(index.saturating_add(1))?;
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }

    /// Truncates or pads with `undefined` to exactly `len` elements
    pub fn resize(&self, len: usize) -> Result<(), EvalError> {
        check_length(len)?;
        self.0.write().resize(len, Value::Undefined);
        Ok(())
    }

    /// Snapshot of the elements; later writes are not reflected
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

fn check_length(len: usize) -> Result<(), EvalError> {
    if len > MAX_ARRAY_LENGTH {
        return Err(EvalError::TypeError(format!("Invalid array length: {}", len)));
    }
    Ok(())
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Array(Arc::new(RwLock::new(items)))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_guarded(self.addr(), f, |f| f.debug_list().entries(self.to_vec()).finish())
    }
}

/// Host callable invoked by call expressions.
#[derive(Clone)]
pub struct Function(Arc<NativeFn>);

impl Function {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function(Arc::new(func))
    }

    /// Invokes the function with `this` as its receiver
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(this, args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

impl Value {
    /// Builds a fresh object value
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(entries.into_iter().collect())
    }

    /// Builds a fresh array value
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(items.into_iter().collect())
    }

    /// Wraps a host closure as a callable value
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Value::Function(Function::new(func))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for `undefined` and `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// True for the types `+` concatenates instead of adding
    pub fn is_stringish(&self) -> bool {
        matches!(
            self,
            Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
        )
    }

    /// Check if the value is truthy (for conditions and logical operators)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Undefined | Null => false,
            Boolean(b) => *b,
            Integer(n) => *n != 0,
            Float(n) => *n != 0.0 && !n.is_nan(),
            String(s) => !s.is_empty(),
            Array(_) | Object(_) | Function(_) => true,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer, only when the number is whole
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Get as string (concatenation and property keys)
    pub fn as_string(&self) -> String {
        self.join_string(&mut Vec::new())
    }

    // `seen` holds the arrays being joined; one reached again joins as empty.
    fn join_string(&self, seen: &mut Vec<usize>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => {
                if seen.contains(&items.addr()) {
                    return String::new();
                }
                seen.push(items.addr());
                let joined = items
                    .to_vec()
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.join_string(seen)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                seen.pop();
                joined
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "function".to_string(),
        }
    }

    /// Numeric coercion; always returns `Integer` or `Float`
    pub fn to_number(&self) -> Value {
        match self {
            Value::Undefined => Value::Float(f64::NAN),
            Value::Null => Value::Integer(0),
            Value::Boolean(b) => Value::Integer(i64::from(*b)),
            Value::Integer(_) | Value::Float(_) => self.clone(),
            Value::String(s) => parse_numeric_string(s),
            Value::Array(_) => parse_numeric_string(&self.as_string()),
            Value::Object(_) | Value::Function(_) => Value::Float(f64::NAN),
        }
    }

    /// Converts a computed member key into a property name
    pub fn to_property_key(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.as_string(),
        }
    }

    /// True when this is an object that holds `key` itself
    pub fn has_own(&self, key: &str) -> bool {
        match self {
            Value::Object(obj) => obj.contains_key(key),
            _ => false,
        }
    }

    /// Reads a property; anything missing reads as `undefined`.
    ///
    /// Arrays and strings expose `length` and integer indices.
    pub fn get_member(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key).unwrap_or_default(),
            Value::Array(items) => {
                if key == "length" {
                    Value::Integer(items.len() as i64)
                } else {
                    array_index(key)
                        .and_then(|index| items.get(index))
                        .unwrap_or_default()
                }
            }
            Value::String(s) => {
                if key == "length" {
                    Value::Integer(s.chars().count() as i64)
                } else {
                    array_index(key)
                        .and_then(|index| s.chars().nth(index))
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or_default()
                }
            }
            _ => Value::Undefined,
        }
    }

    /// Writes a property on an object or an index (or `length`) on an array.
    pub fn set_member(&self, key: &str, value: Value) -> Result<(), EvalError> {
        match self {
            Value::Object(obj) => {
                obj.insert(key, value);
                Ok(())
            }
            Value::Array(items) => {
                if key == "length" {
                    let len = value
                        .to_number()
                        .as_int()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| {
                            EvalError::TypeError(format!(
                                "Invalid array length: {}",
                                value.as_string()
                            ))
                        })?;
                    items.resize(len)
                } else if let Some(index) = array_index(key) {
                    items.set(index, value)
                } else {
                    Err(EvalError::TypeError(format!(
                        "Cannot set property '{}' on array; use an integer index instead",
                        key
                    )))
                }
            }
            other => Err(EvalError::TypeError(format!(
                "Cannot set property '{}' on {}",
                key,
                other.type_name()
            ))),
        }
    }
}

/// Parses a canonical non-negative integer key such as `"3"` (but not `"03"`).
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index.to_string() == key).then_some(index)
}

fn parse_numeric_string(s: &str) -> Value {
    let trimmed = s.trim();
    match trimmed {
        "" => return Value::Integer(0),
        "Infinity" | "+Infinity" => return Value::Float(f64::INFINITY),
        "-Infinity" => return Value::Float(f64::NEG_INFINITY),
        _ => {}
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Integer(n);
    }

    let numeric_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    match trimmed.parse::<f64>() {
        Ok(n) if numeric_chars => Value::Float(n),
        _ => Value::Float(f64::NAN),
    }
}

/// Formats a float the way it is shown when concatenated into a string.
pub(crate) fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    /// Structural equality, used by tests and host code.
    ///
    /// Integers and floats compare by numeric value. Expression-level `==` and `===`
    /// live in [`crate::ops`].
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, &mut Vec::new())
    }
}

/// `pairs` holds the container pairs under comparison. A pair reached again is
/// treated as equal, so cyclic values compare without recursing forever.
fn structural_eq(a: &Value, b: &Value, pairs: &mut Vec<(usize, usize)>) -> bool {
    use Value::*;
    match (a, b) {
        (Undefined, Undefined) | (Null, Null) => true,
        (Boolean(x), Boolean(y)) => x == y,
        (String(x), String(y)) => x == y,
        (Integer(x), Integer(y)) => x == y,
        (Integer(_) | Float(_), Integer(_) | Float(_)) => a.as_float() == b.as_float(),
        (Array(x), Array(y)) => {
            if x.ptr_eq(y) {
                return true;
            }
            let (xs, ys) = (x.to_vec(), y.to_vec());
            xs.len() == ys.len()
                && within_pair(pairs, (x.addr(), y.addr()), |pairs| {
                    xs.iter().zip(&ys).all(|(l, r)| structural_eq(l, r, pairs))
                })
        }
        (Object(x), Object(y)) => {
            if x.ptr_eq(y) {
                return true;
            }
            let (xs, ys) = (x.entries(), y.entries());
            xs.len() == ys.len()
                && within_pair(pairs, (x.addr(), y.addr()), |pairs| {
                    xs.iter().all(|(key, l)| {
                        ys.iter()
                            .find(|(k, _)| k == key)
                            .is_some_and(|(_, r)| structural_eq(l, r, pairs))
                    })
                })
        }
        (Function(x), Function(y)) => x.ptr_eq(y),
        _ => false,
    }
}

fn within_pair(
    pairs: &mut Vec<(usize, usize)>,
    pair: (usize, usize),
    compare: impl FnOnce(&mut Vec<(usize, usize)>) -> bool,
) -> bool {
    if pairs.contains(&pair) {
        return true;
    }
    pairs.push(pair);
    let equal = compare(pairs);
    pairs.pop();
    equal
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from(items))
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}
