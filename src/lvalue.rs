//! Static checks over parsed expressions: which ones can be written to, and which
//! ones are literals.

use crate::ast::{Expr, Program, PropertyKey};

/// True when `expr` names a writable location.
///
/// # Examples
/// ```text
/// user              → assignable
/// user.name         → assignable
/// this.items[0].id  → assignable
/// items[0]          → assignable
/// getUser().name    → not assignable (rooted in a call)
/// (a + b).c         → not assignable
/// 42                → not assignable
/// ```
pub fn is_assignable(expr: &Expr) -> bool {
    match expr {
        Expr::Identifier(_) => true,
        Expr::Member { object, .. } => is_rooted_reference(object),
        _ => false,
    }
}

fn is_rooted_reference(expr: &Expr) -> bool {
    match expr {
        Expr::Identifier(_) | Expr::This | Expr::Locals => true,
        Expr::Member { object, .. } => is_rooted_reference(object),
        _ => false,
    }
}

/// True when the single top-level statement is a literal, array literal or object
/// literal, whatever its elements contain.
pub fn is_literal_shape(program: &Program) -> bool {
    matches!(
        program.single(),
        Some(Expr::Literal(_) | Expr::Array(_) | Expr::Object(_))
    )
}

/// True for a literal-shaped program that reads nothing from the scope.
///
/// ```text
/// [1, "a", {b: null}]  → literal
/// [1, user]            → not literal
/// ```
pub fn is_literal(program: &Program) -> bool {
    is_literal_shape(program) && program.single().is_some_and(|expr| !reads_state(expr))
}

/// Recursively check whether an expression touches the scope, the locals or a host
fn reads_state(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => false,
        Expr::Identifier(_)
        | Expr::This
        | Expr::Locals
        | Expr::Member { .. }
        | Expr::Call { .. }
        | Expr::Filter { .. }
        | Expr::Assignment { .. } => true,
        Expr::Array(items) => items.iter().any(reads_state),
        Expr::Object(properties) => properties.iter().any(|p| {
            matches!(&p.key, PropertyKey::Computed(key) if reads_state(key))
                || reads_state(&p.value)
        }),
        Expr::Unary { operand, .. } => reads_state(operand),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            reads_state(left) || reads_state(right)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => reads_state(test) || reads_state(consequent) || reads_state(alternate),
    }
}
