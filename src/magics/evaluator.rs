//! Evaluation of run-if conditions.
//!
//! Conditions are parsed by `nbvalx_syntax` into a closed expression grammar and evaluated here against a
//! [`Scope`] of bound tag/parameter values, with Python semantics: `and`/`or` short-circuit and return an
//! operand, comparisons chain, `bool` takes part in arithmetic as an integer.
//!
//! Integers are 64-bit. Results that Python would promote to arbitrary precision are reported as
//! `OverflowError` instead.

use std::cmp::Ordering;

use nbvalx_core::num;
use nbvalx_syntax::ast::{BinaryOp, CompareOp, Expr, Spanned, UnaryOp};

use super::value::{Num, Value};

/// Name resolution for condition evaluation.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// Errors raised while evaluating a parsed condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("NameError: name '{0}' is not defined")]
    Name(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("{}", nbvalx_core::ZERO_DIVISION_MSG)]
    ZeroDivision,
    #[error("{}", nbvalx_core::INT_OVERFLOW_MSG)]
    Overflow,
    #[error("MemoryError: repeated sequence is too long")]
    Memory,
}

/// Upper bound on the length (bytes for `str`, items otherwise) of a repeated sequence.
const MAX_REPEAT_LEN: usize = 1 << 24;

pub type EvalResult<T> = Result<T, EvalError>;

/// Evaluate `expr` to a value.
pub fn evaluate(expr: &Spanned<Expr>, scope: &dyn Scope) -> EvalResult<Value> {
    match &expr.node {
        Expr::Literal(lit) => Ok(Value::from(lit)),
        Expr::Name(name) => scope.lookup(name).ok_or_else(|| EvalError::Name(name.clone())),
        Expr::Tuple(items) => Ok(Value::Tuple(evaluate_all(items, scope)?)),
        Expr::List(items) => Ok(Value::List(evaluate_all(items, scope)?)),
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, scope)?;
            unary(*op, &value)
        }
        Expr::Binary(lhs, BinaryOp::And, rhs) => {
            let left = evaluate(lhs, scope)?;
            if left.truthy() { evaluate(rhs, scope) } else { Ok(left) }
        }
        Expr::Binary(lhs, BinaryOp::Or, rhs) => {
            let left = evaluate(lhs, scope)?;
            if left.truthy() { Ok(left) } else { evaluate(rhs, scope) }
        }
        Expr::Binary(lhs, op, rhs) => {
            let left = evaluate(lhs, scope)?;
            let right = evaluate(rhs, scope)?;
            binary(*op, &left, &right)
        }
        Expr::Compare(first, rest) => {
            let mut left = evaluate(first, scope)?;
            for (op, operand) in rest {
                let right = evaluate(operand, scope)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
    }
}

/// Evaluate `expr` and take its truth value.
pub fn evaluate_condition(expr: &Spanned<Expr>, scope: &dyn Scope) -> EvalResult<bool> {
    evaluate(expr, scope).map(|v| v.truthy())
}

fn evaluate_all(items: &[Spanned<Expr>], scope: &dyn Scope) -> EvalResult<Vec<Value>> {
    items.iter().map(|item| evaluate(item, scope)).collect()
}

// ============================================================================
// Operators
// ============================================================================

fn unary(op: UnaryOp, value: &Value) -> EvalResult<Value> {
    let symbol = match op {
        UnaryOp::Not => return Ok(Value::Bool(!value.truthy())),
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
    };
    match (op, value.as_num()) {
        (UnaryOp::Neg, Some(Num::Int(i))) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Some(Num::Float(x))) => Ok(Value::Float(-x)),
        (_, Some(Num::Int(i))) => Ok(Value::Int(i)),
        (_, Some(Num::Float(x))) => Ok(Value::Float(x)),
        (_, None) => Err(EvalError::Type(format!(
            "bad operand type for unary {symbol}: '{}'",
            value.type_name()
        ))),
    }
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if let (Some(a), Some(b)) = (left.as_num(), right.as_num()) {
        return arithmetic(op, a, b);
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple([a.as_slice(), b].concat())),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => Ok(Value::List([a.as_slice(), b].concat())),
        (BinaryOp::Mul, seq, count) | (BinaryOp::Mul, count, seq)
            if matches!(count, Value::Int(_) | Value::Bool(_))
                && matches!(seq, Value::Str(_) | Value::Tuple(_) | Value::List(_)) =>
        {
            let times = match count.as_num() {
                Some(Num::Int(n)) => usize::try_from(n).unwrap_or(0),
                _ => 0,
            };
            repeat(seq, times)
        }
        _ => Err(unsupported(op, left, right)),
    }
}

fn repeat(seq: &Value, times: usize) -> EvalResult<Value> {
    let len = match seq {
        Value::Str(s) => s.len(),
        Value::Tuple(items) | Value::List(items) => items.len(),
        _ => 0,
    };
    if len.checked_mul(times).is_none_or(|total| total > MAX_REPEAT_LEN) {
        return Err(EvalError::Memory);
    }
    match seq {
        Value::Str(s) => Ok(Value::Str(s.repeat(times))),
        Value::Tuple(items) => Ok(Value::Tuple(repeat_items(items, times))),
        Value::List(items) => Ok(Value::List(repeat_items(items, times))),
        other => Err(EvalError::Type(format!(
            "can't multiply sequence by non-int of type '{}'",
            other.type_name()
        ))),
    }
}

fn repeat_items(items: &[Value], times: usize) -> Vec<Value> {
    std::iter::repeat_n(items, times).flatten().cloned().collect()
}

fn arithmetic(op: BinaryOp, a: Num, b: Num) -> EvalResult<Value> {
    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => {
                return num::true_div(a as f64, b as f64)
                    .map(Value::Float)
                    .ok_or(EvalError::ZeroDivision);
            }
            BinaryOp::FloorDiv => {
                if b == 0 {
                    return Err(EvalError::ZeroDivision);
                }
                num::floor_div_i64(a, b)
            }
            BinaryOp::Mod => {
                if b == 0 {
                    return Err(EvalError::ZeroDivision);
                }
                num::mod_i64(a, b)
            }
            BinaryOp::Pow if b < 0 => return float_pow(a as f64, b as f64),
            BinaryOp::Pow => num::pow_i64(a, b),
            BinaryOp::And | BinaryOp::Or => return Err(lazy_operator(op)),
        };
        return result.map(Value::Int).ok_or(EvalError::Overflow);
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Sub => Some(a - b),
        BinaryOp::Mul => Some(a * b),
        BinaryOp::Div => num::true_div(a, b),
        BinaryOp::FloorDiv => num::floor_div_f64(a, b),
        BinaryOp::Mod => num::mod_f64(a, b),
        BinaryOp::Pow => return float_pow(a, b),
        BinaryOp::And | BinaryOp::Or => return Err(lazy_operator(op)),
    };
    result.map(Value::Float).ok_or(EvalError::ZeroDivision)
}

fn lazy_operator(op: BinaryOp) -> EvalError {
    EvalError::Type(format!("'{op}' must be evaluated lazily"))
}

fn float_pow(base: f64, exp: f64) -> EvalResult<Value> {
    if base == 0.0 && exp < 0.0 {
        return Err(EvalError::ZeroDivision);
    }
    if base < 0.0 && exp.fract() != 0.0 {
        return Err(EvalError::Type(
            "complex results are not supported in conditions".to_string(),
        ));
    }
    Ok(Value::Float(base.powf(exp)))
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> EvalResult<bool> {
    let ordered = |accept: fn(Ordering) -> bool| {
        left.py_cmp(right).map(accept).ok_or_else(|| {
            EvalError::Type(format!(
                "'{op}' not supported between instances of '{}' and '{}'",
                left.type_name(),
                right.type_name()
            ))
        })
    };
    match op {
        CompareOp::Eq => Ok(left.py_eq(right)),
        CompareOp::NotEq => Ok(!left.py_eq(right)),
        CompareOp::Lt => ordered(Ordering::is_lt),
        CompareOp::LtEq => ordered(Ordering::is_le),
        CompareOp::Gt => ordered(Ordering::is_gt),
        CompareOp::GtEq => ordered(Ordering::is_ge),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
        CompareOp::Is => Ok(identical(left, right)),
        CompareOp::IsNot => Ok(!identical(left, right)),
    }
}

fn contains(container: &Value, item: &Value) -> EvalResult<bool> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Str(_), other) => Err(EvalError::Type(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (Value::Tuple(items) | Value::List(items), _) => Ok(items.iter().any(|v| v.py_eq(item))),
        (other, _) => Err(EvalError::Type(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// `is`: singletons compare by value, as do the interned ints and strings a literal produces.
fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => false,
    }
}
