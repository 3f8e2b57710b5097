use crate::ast::Expr;

/// Top-level statement.
///
/// Only expression statements exist; the language has no declarations or loops.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A filter chain evaluated for its value
    ///
    /// # Example
    /// ```text
    /// items.length | number
    /// ```
    Expression(Expr),
}

impl Statement {
    pub fn expression(&self) -> &Expr {
        match self {
            Statement::Expression(expr) => expr,
        }
    }
}

/// Complete parsed source.
///
/// Statements are separated by `;`; the program evaluates to the value of its last
/// statement, or `undefined` when empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Statement>,
}

impl Program {
    /// The expression of the only statement, if there is exactly one
    pub fn single(&self) -> Option<&Expr> {
        match self.body.as_slice() {
            [stmt] => Some(stmt.expression()),
            _ => None,
        }
    }
}
