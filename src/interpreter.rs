//! Turns a parsed [`Program`] into a tree of closures.
//!
//! Each expression node compiles once into a boxed closure over the evaluation
//! [`Context`]; evaluating an expression never looks at the syntax tree again. While
//! compiling, every node also reports its [`Purity`], which is how constant
//! expressions are recognised.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    ast::{Expr, LogicalOp, Program, PropertyKey},
    filters::FilterResolver,
    lvalue::is_assignable,
    ops,
    sandbox::Sandbox,
    value::{Array, Object, Value},
};

/// Errors that can occur while evaluating or assigning a compiled expression.
///
/// Errors never invalidate the compiled expression; it may be evaluated again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Invalid operation for the given type (calling a non-function, writing a
    /// property on a primitive)
    #[error("Type error: {0}")]
    TypeError(String),

    /// A denylisted member was referenced
    #[error("Security error: referencing '{member}' is disallowed in expressions")]
    Security { member: String },

    /// A filter name the resolver did not know at compile time
    #[error("Unknown filter: '{0}'")]
    UnknownFilter(String),

    /// `assign` on an expression that has no assignable target
    #[error("Expression '{0}' is not assignable")]
    NotAssignable(String),

    /// Raised by a host function or filter
    #[error("{0}")]
    Host(String),
}

impl EvalError {
    pub fn host(message: impl Into<String>) -> Self {
        EvalError::Host(message.into())
    }
}

/// What an evaluation may read: the scope plus optional locals.
///
/// Identifiers resolve against the locals first, but only when the locals object owns
/// the name; otherwise they resolve against the scope.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub scope: &'a Value,
    pub locals: Option<&'a Value>,
}

impl<'a> Context<'a> {
    pub fn new(scope: &'a Value) -> Self {
        Context {
            scope,
            locals: None,
        }
    }

    /// Create a new context with a locals object
    pub fn with_locals(&self, locals: &'a Value) -> Self {
        Context {
            scope: self.scope,
            locals: Some(locals),
        }
    }

    /// The object an identifier reads from and writes to
    fn owner(&self, name: &str) -> &'a Value {
        match self.locals {
            Some(locals) if locals.has_own(name) => locals,
            _ => self.scope,
        }
    }
}

/// Whether a node's value can change between evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purity {
    /// Depends on nothing that can change
    Absolute,
    /// Reads the scope, the locals or a stateful host
    Relative,
}

impl Purity {
    pub fn is_absolute(self) -> bool {
        self == Purity::Absolute
    }

    pub fn and(self, other: Purity) -> Purity {
        if self.is_absolute() && other.is_absolute() {
            Purity::Absolute
        } else {
            Purity::Relative
        }
    }

    fn all(purities: impl IntoIterator<Item = Purity>) -> Purity {
        purities.into_iter().fold(Purity::Absolute, Purity::and)
    }
}

pub(crate) type EvalFn = Box<dyn Fn(&Context<'_>) -> Result<Value, EvalError> + Send + Sync>;
pub(crate) type AssignFn =
    Box<dyn Fn(&Context<'_>, Value) -> Result<Value, EvalError> + Send + Sync>;
/// Resolves a callee to `(this, function)`
type CalleeFn = Box<dyn Fn(&Context<'_>) -> Result<(Value, Value), EvalError> + Send + Sync>;

fn eval_fn<F>(f: F) -> EvalFn
where
    F: Fn(&Context<'_>) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    Box::new(f)
}

fn assign_fn<F>(f: F) -> AssignFn
where
    F: Fn(&Context<'_>, Value) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    Box::new(f)
}

fn callee_fn<F>(f: F) -> CalleeFn
where
    F: Fn(&Context<'_>) -> Result<(Value, Value), EvalError> + Send + Sync + 'static,
{
    Box::new(f)
}

/// A compiled expression node.
pub(crate) struct Node {
    pub eval: EvalFn,
    pub purity: Purity,
}

impl Node {
    fn new<F>(eval: F, purity: Purity) -> Self
    where
        F: Fn(&Context<'_>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Node {
            eval: eval_fn(eval),
            purity,
        }
    }
}

/// Compiled member key.
enum Key {
    /// `a.name`, checked against the sandbox before the object is evaluated
    Named(String),
    /// `a[expr]`, checked once evaluated
    Computed(EvalFn),
}

impl Key {
    fn check_named(&self, sandbox: &Sandbox) -> Result<(), EvalError> {
        match self {
            Key::Named(name) => sandbox.check(name),
            Key::Computed(_) => Ok(()),
        }
    }

    fn resolve(&self, ctx: &Context<'_>, sandbox: &Sandbox) -> Result<String, EvalError> {
        match self {
            Key::Named(name) => Ok(name.clone()),
            Key::Computed(eval) => {
                let key = eval(ctx)?.to_property_key();
                sandbox.check(&key)?;
                Ok(key)
            }
        }
    }
}

/// Reads `name` from `target`; in create mode a nullish slot is filled with `{}`.
fn read_slot(target: &Value, name: &str, create: bool) -> Result<Value, EvalError> {
    let value = target.get_member(name);
    if create && value.is_nullish() {
        let fresh = Value::Object(Object::new());
        target.set_member(name, fresh.clone())?;
        return Ok(fresh);
    }
    Ok(value)
}

/// Short label for error messages, e.g. `user.greet`
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::This => "this".to_string(),
        Expr::Locals => "$locals".to_string(),
        Expr::Member {
            object,
            property,
            computed: false,
        } => match property.as_ref() {
            Expr::Identifier(name) => format!("{}.{}", describe(object), name),
            _ => format!("{}[...]", describe(object)),
        },
        Expr::Member { object, .. } => format!("{}[...]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

/// The result of compiling a whole program.
pub struct CompiledProgram {
    pub(crate) eval: EvalFn,
    /// Present when the program is a single assignable expression
    pub(crate) assign: Option<AssignFn>,
    pub purity: Purity,
}

impl CompiledProgram {
    pub fn evaluate(&self, ctx: &Context<'_>) -> Result<Value, EvalError> {
        (self.eval)(ctx)
    }

    pub fn is_assignable(&self) -> bool {
        self.assign.is_some()
    }
}

/// Compiles syntax trees into closures under one sandbox and filter resolver.
pub struct Interpreter<'a> {
    sandbox: Arc<Sandbox>,
    filters: &'a dyn FilterResolver,
}

impl<'a> Interpreter<'a> {
    pub fn new(sandbox: Arc<Sandbox>, filters: &'a dyn FilterResolver) -> Self {
        Interpreter { sandbox, filters }
    }

    /// Compiles every statement; the program evaluates to its last statement's value.
    pub fn compile(&self, program: &Program) -> CompiledProgram {
        match program.body.as_slice() {
            [] => CompiledProgram {
                eval: eval_fn(|_| Ok(Value::Undefined)),
                assign: None,
                purity: Purity::Absolute,
            },
            [statement] => self.compile_expression(statement.expression(), false),
            statements => {
                let nodes: Vec<Node> = statements
                    .iter()
                    .map(|s| self.recurse(s.expression(), false))
                    .collect();
                let purity = Purity::all(nodes.iter().map(|n| n.purity));
                let evals: Vec<EvalFn> = nodes.into_iter().map(|n| n.eval).collect();
                CompiledProgram {
                    eval: eval_fn(move |ctx| {
                        let mut last = Value::Undefined;
                        for eval in &evals {
                            last = eval(ctx)?;
                        }
                        Ok(last)
                    }),
                    assign: None,
                    purity,
                }
            }
        }
    }

    /// Compiles one expression. With `create`, identifiers and members fill nullish
    /// slots with empty objects as they are read.
    pub fn compile_expression(&self, expr: &Expr, create: bool) -> CompiledProgram {
        let node = self.recurse(expr, create);
        CompiledProgram {
            eval: node.eval,
            assign: self.assign_target(expr),
            purity: node.purity,
        }
    }

    pub(crate) fn recurse(&self, expr: &Expr, create: bool) -> Node {
        match expr {
            Expr::Literal(literal) => {
                let literal = literal.clone();
                Node::new(move |_| Ok(Value::from(&literal)), Purity::Absolute)
            }

            Expr::Identifier(name) => {
                let name = name.clone();
                let sandbox = Arc::clone(&self.sandbox);
                Node::new(
                    move |ctx| {
                        sandbox.check(&name)?;
                        read_slot(ctx.owner(&name), &name, create)
                    },
                    Purity::Relative,
                )
            }

            Expr::This => Node::new(|ctx| Ok(ctx.scope.clone()), Purity::Relative),

            Expr::Locals => Node::new(
                |ctx| Ok(ctx.locals.cloned().unwrap_or_default()),
                Purity::Relative,
            ),

            Expr::Member {
                object,
                property,
                computed,
            } => {
                let object = self.recurse(object, create).eval;
                let key = self.key(property, *computed);
                let sandbox = Arc::clone(&self.sandbox);
                Node::new(
                    move |ctx| {
                        key.check_named(&sandbox)?;
                        let target = object(ctx)?;
                        if target.is_nullish() {
                            return Ok(Value::Undefined);
                        }
                        let name = key.resolve(ctx, &sandbox)?;
                        read_slot(&target, &name, create)
                    },
                    Purity::Relative,
                )
            }

            Expr::Unary { op, operand } => {
                let operand = self.recurse(operand, false);
                let apply = ops::unary_fn(*op);
                let eval = operand.eval;
                Node::new(move |ctx| Ok(apply(&eval(ctx)?)), operand.purity)
            }

            Expr::Binary { op, left, right } => {
                let left = self.recurse(left, false);
                let right = self.recurse(right, false);
                let purity = left.purity.and(right.purity);
                let apply = ops::binary_fn(*op);
                let (left, right) = (left.eval, right.eval);
                Node::new(
                    move |ctx| {
                        let a = left(ctx)?;
                        let b = right(ctx)?;
                        Ok(apply(&a, &b))
                    },
                    purity,
                )
            }

            Expr::Logical { op, left, right } => {
                let left = self.recurse(left, false);
                let right = self.recurse(right, false);
                let purity = left.purity.and(right.purity);
                let (left, right) = (left.eval, right.eval);
                match op {
                    LogicalOp::And => Node::new(
                        move |ctx| {
                            let value = left(ctx)?;
                            if value.is_truthy() { right(ctx) } else { Ok(value) }
                        },
                        purity,
                    ),
                    LogicalOp::Or => Node::new(
                        move |ctx| {
                            let value = left(ctx)?;
                            if value.is_truthy() { Ok(value) } else { right(ctx) }
                        },
                        purity,
                    ),
                }
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.recurse(test, false);
                let consequent = self.recurse(consequent, false);
                let alternate = self.recurse(alternate, false);
                let purity = test.purity.and(consequent.purity).and(alternate.purity);
                let (test, consequent, alternate) = (test.eval, consequent.eval, alternate.eval);
                Node::new(
                    move |ctx| {
                        if test(ctx)?.is_truthy() {
                            consequent(ctx)
                        } else {
                            alternate(ctx)
                        }
                    },
                    purity,
                )
            }

            Expr::Array(elements) => {
                let (evals, purity) = self.recurse_all(elements);
                Node::new(
                    move |ctx| {
                        let mut items = Vec::with_capacity(evals.len());
                        for eval in &evals {
                            items.push(eval(ctx)?);
                        }
                        Ok(Value::Array(Array::from(items)))
                    },
                    purity,
                )
            }

            Expr::Object(properties) => {
                let mut purity = Purity::Absolute;
                let mut entries = Vec::with_capacity(properties.len());
                for property in properties {
                    let key = match &property.key {
                        PropertyKey::Named(name) => Key::Named(name.clone()),
                        PropertyKey::Computed(expr) => {
                            let node = self.recurse(expr, false);
                            purity = purity.and(node.purity);
                            Key::Computed(node.eval)
                        }
                    };
                    let value = self.recurse(&property.value, false);
                    purity = purity.and(value.purity);
                    entries.push((key, value.eval));
                }
                Node::new(
                    move |ctx| {
                        let object = Object::new();
                        for (key, value) in &entries {
                            let name = match key {
                                Key::Named(name) => name.clone(),
                                Key::Computed(eval) => eval(ctx)?.to_property_key(),
                            };
                            object.insert(name, value(ctx)?);
                        }
                        Ok(Value::Object(object))
                    },
                    purity,
                )
            }

            Expr::Assignment { target, value } => {
                let value = self.recurse(value, false).eval;
                match self.assign_target(target) {
                    Some(assign) => Node::new(
                        move |ctx| {
                            let value = value(ctx)?;
                            assign(ctx, value)
                        },
                        Purity::Relative,
                    ),
                    None => {
                        let label = describe(target);
                        Node::new(
                            move |_| Err(EvalError::NotAssignable(label.clone())),
                            Purity::Relative,
                        )
                    }
                }
            }

            Expr::Call { callee, arguments } => {
                let label = describe(callee);
                let (resolve, callee_purity) = self.callee(callee);
                let (args, args_purity) = self.recurse_all(arguments);
                Node::new(
                    move |ctx| {
                        let (this, function) = match resolve(ctx)? {
                            (_, callee) if callee.is_nullish() => return Ok(Value::Undefined),
                            (this, Value::Function(function)) => (this, function),
                            (_, other) => {
                                return Err(EvalError::TypeError(format!(
                                    "'{}' is not a function (got {})",
                                    label,
                                    other.type_name()
                                )));
                            }
                        };
                        let mut values = Vec::with_capacity(args.len());
                        for arg in &args {
                            values.push(arg(ctx)?);
                        }
                        function.call(&this, &values)
                    },
                    callee_purity.and(args_purity),
                )
            }

            Expr::Filter {
                name,
                input,
                arguments,
            } => {
                let input = self.recurse(input, false);
                let (args, args_purity) = self.recurse_all(arguments);
                let inputs_purity = input.purity.and(args_purity);
                let input = input.eval;

                let Some(filter) = self.filters.resolve(name) else {
                    tracing::debug!(filter = %name, "filter is not registered");
                    let name = name.clone();
                    return Node::new(
                        move |_| Err(EvalError::UnknownFilter(name.clone())),
                        Purity::Relative,
                    );
                };

                let purity = if filter.is_stateful() {
                    Purity::Relative
                } else {
                    inputs_purity
                };
                Node::new(
                    move |ctx| {
                        let value = input(ctx)?;
                        let mut values = Vec::with_capacity(args.len());
                        for arg in &args {
                            values.push(arg(ctx)?);
                        }
                        filter.apply(&value, &values)
                    },
                    purity,
                )
            }
        }
    }

    fn recurse_all(&self, exprs: &[Expr]) -> (Vec<EvalFn>, Purity) {
        let nodes: Vec<Node> = exprs.iter().map(|e| self.recurse(e, false)).collect();
        let purity = Purity::all(nodes.iter().map(|n| n.purity));
        (nodes.into_iter().map(|n| n.eval).collect(), purity)
    }

    fn key(&self, property: &Expr, computed: bool) -> Key {
        match property {
            Expr::Identifier(name) if !computed => Key::Named(name.clone()),
            other => Key::Computed(self.recurse(other, false).eval),
        }
    }

    /// Compiles a callee so that calls through member access receive the owning
    /// object as `this`.
    fn callee(&self, expr: &Expr) -> (CalleeFn, Purity) {
        match expr {
            Expr::Member {
                object,
                property,
                computed,
            } => {
                let object = self.recurse(object, false).eval;
                let key = self.key(property, *computed);
                let sandbox = Arc::clone(&self.sandbox);
                let resolve = callee_fn(move |ctx| {
                    key.check_named(&sandbox)?;
                    let this = object(ctx)?;
                    if this.is_nullish() {
                        return Ok((Value::Undefined, Value::Undefined));
                    }
                    let name = key.resolve(ctx, &sandbox)?;
                    let function = this.get_member(&name);
                    Ok((this, function))
                });
                (resolve, Purity::Relative)
            }
            _ => {
                let node = self.recurse(expr, false);
                let eval = node.eval;
                (
                    callee_fn(move |ctx| Ok((Value::Undefined, eval(ctx)?))),
                    node.purity,
                )
            }
        }
    }

    /// Builds the writer for an assignable expression; `None` for anything else.
    ///
    /// The object side of a member target is compiled in create mode so missing
    /// intermediate objects appear on the way; the final slot is written, not created.
    fn assign_target(&self, expr: &Expr) -> Option<AssignFn> {
        if !is_assignable(expr) {
            return None;
        }

        let sandbox = Arc::clone(&self.sandbox);
        match expr {
            Expr::Identifier(name) => {
                let name = name.clone();
                Some(assign_fn(move |ctx, value| {
                    sandbox.check(&name)?;
                    ctx.owner(&name).set_member(&name, value.clone())?;
                    Ok(value)
                }))
            }
            Expr::Member {
                object,
                property,
                computed,
            } => {
                let object = self.recurse(object, true).eval;
                let key = self.key(property, *computed);
                Some(assign_fn(move |ctx, value| {
                    key.check_named(&sandbox)?;
                    let target = object(ctx)?;
                    let name = key.resolve(ctx, &sandbox)?;
                    target.set_member(&name, value.clone())?;
                    Ok(value)
                }))
            }
            _ => None,
        }
    }
}
