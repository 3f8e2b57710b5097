//! Entry point: source text in, [`CompiledExpression`] out.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::{
    ast::Literal,
    cache::ExpressionCache,
    compiled::CompiledExpression,
    config::{ConfigError, EngineConfig},
    filters::{FilterResolver, NoFilters},
    interpreter::Interpreter,
    lvalue::{is_literal, is_literal_shape},
    parser::{ParseError, Parser, default_literals},
    sandbox::Sandbox,
};

/// Prefix marking a one-time expression
const ONE_TIME_PREFIX: &str = "::";

/// Parses and compiles expressions under one configuration.
///
/// The sandbox, filter resolver and literal table are fixed into every compiled
/// expression. Changing any of them clears the cache.
///
/// # Examples
///
/// ```
/// use bindex::{Engine, FilterRegistry, Value};
///
/// let mut filters = FilterRegistry::new();
/// filters.register("shout", |input, _| Ok(Value::from(input.as_string().to_uppercase())));
///
/// let engine = Engine::new().with_filters(filters);
/// let expr = engine.parse("name | shout").unwrap();
///
/// let scope = Value::object([("name", Value::from("ada"))]);
/// assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::from("ADA"));
/// ```
pub struct Engine {
    sandbox: Arc<Sandbox>,
    filters: Arc<dyn FilterResolver>,
    literals: HashMap<String, Literal>,
    cache: Option<ExpressionCache>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine {
            sandbox: Arc::new(Sandbox::default()),
            filters: Arc::new(NoFilters),
            literals: default_literals(),
            cache: Some(ExpressionCache::new()),
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut engine = Engine::new().with_sandbox(config.sandbox());
        engine.literals.extend(config.literal_table()?);
        if !config.cache {
            engine = engine.without_cache();
        }
        Ok(engine)
    }

    pub fn with_filters(mut self, filters: impl FilterResolver + 'static) -> Self {
        self.filters = Arc::new(filters);
        self.invalidate();
        self
    }

    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = Arc::new(sandbox);
        self.invalidate();
        self
    }

    /// Adds a keyword to the literal table, e.g. `yes -> true`
    pub fn with_literal(mut self, name: impl Into<String>, literal: Literal) -> Self {
        self.literals.insert(name.into(), literal);
        self.invalidate();
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn cache(&self) -> Option<&ExpressionCache> {
        self.cache.as_ref()
    }

    fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Returns the compilation of `source`, shared with earlier parses of the exact
    /// same text when caching is enabled.
    pub fn parse(&self, source: &str) -> Result<CompiledExpression, ParseError> {
        match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(source, || self.compile(source)),
            None => self.compile(source),
        }
    }

    /// Compiles `source` without consulting or filling the cache.
    pub fn compile(&self, source: &str) -> Result<CompiledExpression, ParseError> {
        let (one_time, body) = match source.trim_start().strip_prefix(ONE_TIME_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, source),
        };

        let program = Parser::from_source(body)?
            .with_literals(&self.literals)
            .parse_program()?;
        let compiled =
            Interpreter::new(Arc::clone(&self.sandbox), self.filters.as_ref()).compile(&program);

        let expression = CompiledExpression::new(
            source,
            compiled,
            one_time,
            is_literal(&program),
            is_literal_shape(&program),
        );
        tracing::debug!(
            source,
            purity = ?expression.purity(),
            assignable = expression.is_assignable(),
            literal = expression.is_literal(),
            one_time,
            "compiled expression"
        );
        Ok(expression)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("sandbox", &self.sandbox)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

static DEFAULT_ENGINE: LazyLock<Engine> = LazyLock::new(Engine::new);

/// Parses with the process-wide default engine: default sandbox, no filters, and a
/// shared cache.
pub fn parse(source: &str) -> Result<CompiledExpression, ParseError> {
    DEFAULT_ENGINE.parse(source)
}
