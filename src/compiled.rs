use std::fmt;
use std::sync::Arc;

use crate::{
    interpreter::{CompiledProgram, Context, EvalError, Purity},
    value::Value,
};

/// Result of [`CompiledExpression::watch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub value: Value,
    /// True once re-evaluating can no longer be expected to change the outcome
    pub settled: bool,
}

struct Inner {
    source: String,
    program: CompiledProgram,
    one_time: bool,
    literal: bool,
    literal_shape: bool,
}

/// A parsed and compiled expression, ready to be evaluated any number of times.
///
/// Cloning is cheap and clones share the compiled closures, which is how the
/// expression cache hands the same compilation to every caller.
///
/// # Examples
///
/// ```
/// use bindex::{Engine, Value};
///
/// let engine = Engine::new();
/// let greeting = engine.parse("'Hello, ' + user.name").unwrap();
///
/// let scope = Value::object([("user", Value::object([("name", Value::from("Ada"))]))]);
/// assert_eq!(greeting.evaluate(&scope, None).unwrap(), Value::from("Hello, Ada"));
/// assert!(!greeting.is_constant());
/// ```
#[derive(Clone)]
pub struct CompiledExpression {
    inner: Arc<Inner>,
}

impl CompiledExpression {
    pub(crate) fn new(
        source: &str,
        program: CompiledProgram,
        one_time: bool,
        literal: bool,
        literal_shape: bool,
    ) -> Self {
        CompiledExpression {
            inner: Arc::new(Inner {
                source: source.to_string(),
                program,
                one_time,
                literal,
                literal_shape,
            }),
        }
    }

    /// Source text exactly as it was given, including any `::` prefix
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn evaluate(&self, scope: &Value, locals: Option<&Value>) -> Result<Value, EvalError> {
        self.evaluate_in(&Context { scope, locals })
    }

    pub fn evaluate_in(&self, ctx: &Context<'_>) -> Result<Value, EvalError> {
        self.inner.program.evaluate(ctx)
    }

    /// Writes `value` through the expression and returns it.
    ///
    /// Fails with [`EvalError::NotAssignable`] when [`is_assignable`](Self::is_assignable)
    /// is false.
    pub fn assign(
        &self,
        scope: &Value,
        value: Value,
        locals: Option<&Value>,
    ) -> Result<Value, EvalError> {
        match &self.inner.program.assign {
            Some(assign) => assign(&Context { scope, locals }, value),
            None => Err(EvalError::NotAssignable(self.inner.source.clone())),
        }
    }

    /// Evaluates and reports whether the result has settled.
    ///
    /// One-time expressions settle once their value is defined (for array and object
    /// literals, once every element is defined). Other expressions are settled exactly
    /// when they are constant.
    pub fn watch(&self, scope: &Value, locals: Option<&Value>) -> Result<Observation, EvalError> {
        let value = self.evaluate(scope, locals)?;
        let settled = self.is_settled(&value);
        Ok(Observation { value, settled })
    }

    pub fn is_settled(&self, value: &Value) -> bool {
        if !self.inner.one_time {
            return self.is_constant();
        }
        if !self.inner.literal_shape {
            return !value.is_undefined();
        }
        match value {
            Value::Array(items) => items.to_vec().iter().all(|v| !v.is_undefined()),
            Value::Object(object) => object.entries().iter().all(|(_, v)| !v.is_undefined()),
            other => !other.is_undefined(),
        }
    }

    pub fn purity(&self) -> Purity {
        self.inner.program.purity
    }

    /// Every node is absolute, so the value can never change
    pub fn is_constant(&self) -> bool {
        self.purity().is_absolute()
    }

    /// A literal, array literal or object literal that is also constant
    pub fn is_literal(&self) -> bool {
        self.inner.literal && self.is_constant()
    }

    pub fn is_assignable(&self) -> bool {
        self.inner.program.is_assignable()
    }

    pub fn is_one_time(&self) -> bool {
        self.inner.one_time
    }

    /// True when both handles share one compilation
    pub fn ptr_eq(&self, other: &CompiledExpression) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.inner.source)
            .field("purity", &self.purity())
            .field("assignable", &self.is_assignable())
            .field("one_time", &self.inner.one_time)
            .finish()
    }
}
