//! Operator semantics shared by the compiled closures.
//!
//! Arithmetic is forgiving: `undefined` operands are skipped by `+` and count as zero
//! for `-`, and nothing here ever fails. Integer results stay integral while exact.

use std::cmp::Ordering;

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    ast::{BinOp, UnaryOp},
    value::Value,
};

/// Signature of a compiled binary operator
pub type BinaryFn = fn(&Value, &Value) -> Value;

/// Signature of a compiled unary operator
pub type UnaryFn = fn(&Value) -> Value;

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Picks the implementation for `op` once, at compile time.
pub fn binary_fn(op: BinOp) -> BinaryFn {
    match op {
        BinOp::Add => add,
        BinOp::Subtract => subtract,
        BinOp::Multiply => |a, b| arithmetic(Arith::Mul, a, b),
        BinOp::Divide => |a, b| arithmetic(Arith::Div, a, b),
        BinOp::Modulo => |a, b| arithmetic(Arith::Rem, a, b),
        BinOp::Equal => |a, b| Value::Boolean(loose_equals(a, b)),
        BinOp::NotEqual => |a, b| Value::Boolean(!loose_equals(a, b)),
        BinOp::StrictEqual => |a, b| Value::Boolean(strict_equals(a, b)),
        BinOp::StrictNotEqual => |a, b| Value::Boolean(!strict_equals(a, b)),
        BinOp::LessThan => |a, b| Value::Boolean(compare(a, b) == Some(Ordering::Less)),
        BinOp::GreaterThan => |a, b| Value::Boolean(compare(a, b) == Some(Ordering::Greater)),
        BinOp::LessEqual => {
            |a, b| Value::Boolean(matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal)))
        }
        BinOp::GreaterEqual => {
            |a, b| Value::Boolean(matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal)))
        }
    }
}

pub fn unary_fn(op: UnaryOp) -> UnaryFn {
    match op {
        UnaryOp::Plus => unary_plus,
        UnaryOp::Minus => negate,
        UnaryOp::Not => |v| Value::Boolean(!v.is_truthy()),
    }
}

/// `+`: skips `undefined` operands, concatenates when either side is a string or a
/// container, otherwise adds numerically.
pub fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Undefined, Value::Undefined) => Value::Undefined,
        (Value::Undefined, other) | (other, Value::Undefined) => other.clone(),
        (a, b) if a.is_stringish() || b.is_stringish() => {
            Value::String(format!("{}{}", a.as_string(), b.as_string()))
        }
        (a, b) => arithmetic(Arith::Add, a, b),
    }
}

/// `-`: `undefined` counts as zero.
pub fn subtract(left: &Value, right: &Value) -> Value {
    arithmetic(Arith::Sub, &zero_if_undefined(left), &zero_if_undefined(right))
}

pub fn unary_plus(value: &Value) -> Value {
    zero_if_undefined(value).to_number()
}

pub fn negate(value: &Value) -> Value {
    match zero_if_undefined(value).to_number() {
        Value::Integer(n) => n
            .checked_neg()
            .map_or_else(|| Value::Float(-(n as f64)), Value::Integer),
        Value::Float(n) => Value::Float(-n),
        _ => Value::Float(f64::NAN),
    }
}

fn zero_if_undefined(value: &Value) -> Value {
    match value {
        Value::Undefined => Value::Integer(0),
        other => other.clone(),
    }
}

fn arithmetic(op: Arith, left: &Value, right: &Value) -> Value {
    match (left.to_number(), right.to_number()) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(op, a, b),
        (Value::Integer(a), Value::Float(b)) => decimal_op(op, Decimal::from_i64(a), a as f64, b),
        (Value::Float(a), Value::Integer(b)) => {
            let swapped = Decimal::from_f64(a).zip(Decimal::from_i64(b));
            match swapped {
                Some((ad, bd)) => decimal_result(op, ad, bd)
                    .unwrap_or_else(|| Value::Float(float_op(op, a, b as f64))),
                None => Value::Float(float_op(op, a, b as f64)),
            }
        }
        (a, b) => Value::Float(float_op(
            op,
            a.as_float().unwrap_or(f64::NAN),
            b.as_float().unwrap_or(f64::NAN),
        )),
    }
}

/// Exact integer arithmetic; overflow and inexact division fall back to floats.
fn integer_op(op: Arith, a: i64, b: i64) -> Value {
    let exact = match op {
        Arith::Add => a.checked_add(b),
        Arith::Sub => a.checked_sub(b),
        Arith::Mul => a.checked_mul(b),
        Arith::Div => {
            if b != 0 && a.checked_rem(b) == Some(0) {
                a.checked_div(b)
            } else {
                None
            }
        }
        Arith::Rem => {
            if b != 0 {
                a.checked_rem(b)
            } else {
                None
            }
        }
    };
    exact.map_or_else(|| Value::Float(float_op(op, a as f64, b as f64)), Value::Integer)
}

fn decimal_op(op: Arith, ad: Option<Decimal>, a: f64, b: f64) -> Value {
    ad.zip(Decimal::from_f64(b))
        .and_then(|(ad, bd)| decimal_result(op, ad, bd))
        .unwrap_or_else(|| Value::Float(float_op(op, a, b)))
}

/// Mixed integer/float arithmetic; whole results collapse back to integers
fn decimal_result(op: Arith, ad: Decimal, bd: Decimal) -> Option<Value> {
    let rd = match op {
        Arith::Add => ad.checked_add(bd),
        Arith::Sub => ad.checked_sub(bd),
        Arith::Mul => ad.checked_mul(bd),
        Arith::Div => ad.checked_div(bd),
        Arith::Rem => ad.checked_rem(bd),
    }?;

    if rd.is_integer()
        && let Some(r) = rd.to_i64()
    {
        return Some(Value::Integer(r));
    }
    rd.to_f64().map(Value::Float)
}

fn float_op(op: Arith, a: f64, b: f64) -> f64 {
    match op {
        Arith::Add => a + b,
        Arith::Sub => a - b,
        Arith::Mul => a * b,
        Arith::Div => a / b,
        Arith::Rem => a % b,
    }
}

/// Relational ordering: strings lexicographically, everything else numerically.
/// `None` when either side is NaN.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.to_number(), right.to_number()) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_float()?.partial_cmp(&b.as_float()?),
        },
    }
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        _ => matches!((a.as_float(), b.as_float()), (Some(x), Some(y)) if x == y),
    }
}

/// `===`: no coercion; containers and functions compare by identity.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Undefined, Undefined) | (Null, Null) => true,
        (Boolean(x), Boolean(y)) => x == y,
        (String(x), String(y)) => x == y,
        (Integer(_) | Float(_), Integer(_) | Float(_)) => numbers_equal(a, b),
        (Array(x), Array(y)) => x.ptr_eq(y),
        (Object(x), Object(y)) => x.ptr_eq(y),
        (Function(x), Function(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// `==`: `null == undefined`; booleans and strings coerce to numbers when compared
/// with numbers; containers compare by identity with each other and by their string
/// form with primitives.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Undefined | Null, Undefined | Null) => true,
        (Undefined | Null, _) | (_, Undefined | Null) => false,
        (Boolean(_), _) => loose_equals(&a.to_number(), b),
        (_, Boolean(_)) => loose_equals(a, &b.to_number()),
        (String(x), String(y)) => x == y,
        (Integer(_) | Float(_), String(_)) => numbers_equal(a, &b.to_number()),
        (String(_), Integer(_) | Float(_)) => numbers_equal(&a.to_number(), b),
        (Integer(_) | Float(_), Integer(_) | Float(_)) => numbers_equal(a, b),
        (Array(_) | Object(_) | Function(_), Array(_) | Object(_) | Function(_)) => {
            strict_equals(a, b)
        }
        (Array(_) | Object(_) | Function(_), _) => loose_equals(&String(a.as_string()), b),
        _ => loose_equals(a, &String(b.as_string())),
    }
}
