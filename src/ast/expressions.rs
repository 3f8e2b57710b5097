use crate::ast::{BinOp, LogicalOp, UnaryOp};

/// Literal constant carried by tokens and literal nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The `undefined` keyword
    Undefined,

    /// The `null` keyword
    Null,

    /// `true` / `false`
    Boolean(bool),

    /// Literal integer
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Integer(i64),

    /// Literal floating point number
    ///
    /// # Example
    /// ```text
    /// 42.5
    /// 1e3
    /// ```
    Float(f64),

    /// String literal
    String(String),
}

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Every child is fully formed once parsing succeeds; the tree is discarded after
/// the interpreter has turned it into closures.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    Literal(Literal),

    /// Variable reference resolved against locals, then scope
    ///
    /// # Example
    /// ```text
    /// user
    /// ```
    Identifier(String),

    /// `this`, the scope itself
    This,

    /// `$locals`, the locals object itself
    Locals,

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [a, b, 3]
    /// ```
    Array(Vec<Expr>),

    /// Object literal
    ///
    /// # Example
    /// ```text
    /// {name: user.name, "total": 3, [key]: value}
    /// ```
    Object(Vec<Property>),

    /// Prefix unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Arithmetic, relational or equality operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Short-circuiting `&&` / `||`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Ternary conditional
    ///
    /// # Example
    /// ```text
    /// ready ? "go" : "wait"
    /// ```
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// Assignment to an assignable target
    ///
    /// # Example
    /// ```text
    /// user.name = "Ada"
    /// ```
    Assignment { target: Box<Expr>, value: Box<Expr> },

    /// Member access
    ///
    /// For `a.b` the property is `Identifier("b")` and `computed` is false;
    /// for `a[b]` the property is an arbitrary expression and `computed` is true.
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },

    /// Function call
    ///
    /// # Examples
    /// ```text
    /// format(date)
    /// user.greet("hi")
    /// ```
    Call { callee: Box<Expr>, arguments: Vec<Expr> },

    /// Filter application
    ///
    /// # Example
    /// ```text
    /// amount | currency:"EUR":2
    /// ```
    Filter {
        name: String,
        input: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

/// Object literal key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier, string or number key, stored as its property name
    Named(String),
    /// `[expr]` key evaluated at runtime
    Computed(Expr),
}

/// One `key: value` entry of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
}

impl Expr {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// Non-computed member access `object.name`
    pub fn member(object: Expr, name: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(Expr::Identifier(name.into())),
            computed: false,
        }
    }

    /// Computed member access `object[property]`
    pub fn index(object: Expr, property: Expr) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(property),
            computed: true,
        }
    }
}
