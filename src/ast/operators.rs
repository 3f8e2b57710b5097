/// Binary operators.
///
/// Loose and strict equality are distinct operators and compile to distinct closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Equality
    /// Loose equal (`==`)
    Equal,
    /// Loose not equal (`!=`)
    NotEqual,
    /// Strict equal (`===`)
    StrictEqual,
    /// Strict not equal (`!==`)
    StrictNotEqual,

    // Relational
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::StrictEqual => "===",
            BinOp::StrictNotEqual => "!==",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
        }
    }
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND (`&&`)
    And,
    /// Logical OR (`||`)
    Or,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric coercion (`+`)
    Plus,
    /// Numeric negation (`-`)
    Minus,
    /// Boolean negation (`!`)
    Not,
}
