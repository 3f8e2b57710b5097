use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{interpreter::EvalError, value::Value};

/// Signature of a filter: `(input, arguments) -> result`.
pub type FilterFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A named transformation applied with `input | name:arg1:arg2`.
///
/// A filter is assumed to depend only on its input and arguments. One that reads
/// external state must be registered as *stateful*, which keeps expressions using it
/// from being classified as constant.
#[derive(Clone)]
pub struct Filter {
    func: Arc<FilterFn>,
    stateful: bool,
}

impl Filter {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Filter {
            func: Arc::new(func),
            stateful: false,
        }
    }

    pub fn stateful<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Filter {
            func: Arc::new(func),
            stateful: true,
        }
    }

    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    pub fn apply(&self, input: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(input, args)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("stateful", &self.stateful)
            .finish_non_exhaustive()
    }
}

/// Host-side lookup of filters by name, consulted once per filter node at compile time.
pub trait FilterResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Filter>;
}

impl<F> FilterResolver for F
where
    F: Fn(&str) -> Option<Filter> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<Filter> {
        self(name)
    }
}

/// Resolver that knows no filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilters;

impl FilterResolver for NoFilters {
    fn resolve(&self, _name: &str) -> Option<Filter> {
        None
    }
}

/// Name-to-filter table.
///
/// # Examples
///
/// ```
/// use bindex::{FilterRegistry, FilterResolver, Value};
///
/// let mut filters = FilterRegistry::new();
/// filters.register("double", |input, _args| {
///     Ok(Value::Integer(input.as_int().unwrap_or(0) * 2))
/// });
///
/// assert!(filters.resolve("double").is_some());
/// assert!(filters.resolve("triple").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, filter: Filter) -> &mut Self {
        self.filters.insert(name.into(), filter);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.insert(name, Filter::new(func))
    }

    pub fn register_stateful<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.insert(name, Filter::stateful(func))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FilterResolver for FilterRegistry {
    fn resolve(&self, name: &str) -> Option<Filter> {
        self.filters.get(name).cloned()
    }
}
