//! Operator semantics: null defaulting, numeric promotion, arithmetic and comparison

use std::cmp::Ordering;

use super::{InterpResult, Interpreter, RuntimeError, Value};
use crate::ast::{BinOp, Expr, Spanned, UnOp};

impl Interpreter {
    /// `a < b <= c`: each link reuses the previous right operand and the
    /// chain stops at the first link that is not true
    pub(crate) fn eval_chain(
        &mut self,
        operands: &[Spanned<Expr>],
        ops: &[BinOp],
    ) -> InterpResult<Value> {
        let Some(first) = operands.first() else {
            return Ok(Value::Bool(true));
        };
        let mut left = self.eval(first)?;
        for (op, operand) in ops.iter().zip(&operands[1..]) {
            let right = self.eval(operand)?;
            if binary_op(*op, left, right.clone())? != Value::Bool(true) {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }
}

/// Apply a binary operator to two evaluated operands
pub(crate) fn binary_op(op: BinOp, left: Value, right: Value) -> InterpResult<Value> {
    // null equality is decided before nulls are defaulted
    if matches!(op, BinOp::Eq | BinOp::Ne) && (left.is_null() || right.is_null()) {
        let same = left.is_null() && right.is_null();
        return Ok(Value::Bool(if op == BinOp::Eq { same } else { !same }));
    }
    let (left, right) = promote(left, right);
    match op {
        BinOp::And | BinOp::Or => match (&left, &right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(RuntimeError::type_mismatch(format!(
                "Operands must be of type boolean for '{op}'"
            ))),
        },
        BinOp::Add if left.is_number() && right.is_number() => arithmetic(op, left, right),
        BinOp::Add => match (left, right) {
            (Value::Str(mut a), Value::Str(b)) => {
                a.push_str(&b);
                Ok(Value::Str(a))
            }
            (a, b) => Ok(Value::Str(format!("{a}{b}"))),
        },
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow => {
            if left.is_number() && right.is_number() {
                arithmetic(op, left, right)
            } else {
                Err(RuntimeError::type_mismatch(format!(
                    "Operands must be numbers for '{op}'"
                )))
            }
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            compare(op, &left, &right).map(Value::Bool)
        }
    }
}

pub(crate) fn unary_op(op: UnOp, value: Value) -> InterpResult<Value> {
    match op {
        UnOp::Not => match value {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => Err(RuntimeError::type_mismatch(
                "Operand must be a boolean for unary '!'.",
            )),
        },
        UnOp::Neg | UnOp::Plus => {
            let negate = op == UnOp::Neg;
            Ok(match value {
                Value::Byte(b) if negate => Value::Int(-(b as i32)),
                Value::Int(n) if negate => Value::Int(n.wrapping_neg()),
                Value::Long(n) if negate => Value::Long(n.wrapping_neg()),
                Value::Float(x) if negate => Value::Float(-x),
                Value::Double(x) if negate => Value::Double(-x),
                v if v.is_number() => v,
                _ => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "Operand must be a number for unary '{op}'."
                    )))
                }
            })
        }
    }
}

/// Default a null operand to the other side's zero, stringify primitives
/// paired with a string and widen mixed numbers
fn promote(left: Value, right: Value) -> (Value, Value) {
    let (left, right) = match (left.is_null(), right.is_null()) {
        (true, false) => (right.data_type().zero(), right),
        (false, true) => {
            let zero = left.data_type().zero();
            (left, zero)
        }
        _ => (left, right),
    };
    match (&left, &right) {
        (Value::Str(_), other) if is_primitive(other) => (left, stringify(right)),
        (other, Value::Str(_)) if is_primitive(other) => (stringify(left), right),
        (a, b) if a.is_number() && b.is_number() => widen(left, right),
        _ => (left, right),
    }
}

fn is_primitive(v: &Value) -> bool {
    v.is_number() || matches!(v, Value::Bool(_) | Value::Date(_) | Value::DateTime(_))
}

fn stringify(v: Value) -> Value {
    match v {
        Value::Bool(b) => Value::from(if b { "Y" } else { "N" }),
        Value::Str(_) => v,
        other => Value::Str(other.to_string()),
    }
}

/// int < long < float < double; bytes count as int and long with float is double
fn rank(v: &Value) -> u8 {
    match v {
        Value::Long(_) => 2,
        Value::Float(_) => 3,
        Value::Double(_) => 4,
        _ => 1,
    }
}

fn to_rank(v: Value, rank: u8) -> Value {
    match rank {
        1 => Value::Int(v.as_i64().unwrap_or(0) as i32),
        2 => Value::Long(v.as_i64().unwrap_or(0)),
        3 => Value::Float(v.as_f64().unwrap_or(0.0) as f32),
        _ => Value::Double(v.as_f64().unwrap_or(0.0)),
    }
}

fn widen(left: Value, right: Value) -> (Value, Value) {
    let (a, b) = (rank(&left), rank(&right));
    let target = if (a == 2 && b == 3) || (a == 3 && b == 2) {
        4
    } else {
        a.max(b)
    };
    (to_rank(left, target), to_rank(right, target))
}

/// Both operands already share one numeric kind
fn arithmetic(op: BinOp, left: Value, right: Value) -> InterpResult<Value> {
    if op == BinOp::Pow {
        let base = left.as_f64().unwrap_or(0.0);
        let exp = right.as_f64().unwrap_or(0.0);
        return Ok(Value::Double(base.powf(exp)));
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(op, a as i64, b as i64).map(|n| Value::Int(n as i32)),
        (Value::Long(a), Value::Long(b)) => int_op(op, a, b).map(Value::Long),
        (Value::Float(a), Value::Float(b)) => {
            float_op(op, a as f64, b as f64).map(|x| Value::Float(x as f32))
        }
        (a, b) => float_op(op, a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0))
            .map(Value::Double),
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> InterpResult<i64> {
    Ok(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div if b == 0 => return Err(RuntimeError::division_by_zero()),
        BinOp::Div => a.wrapping_div(b),
        BinOp::Mod if b == 0 => return Err(RuntimeError::modulo_by_zero()),
        BinOp::Mod => a.wrapping_rem(b),
        _ => 0,
    })
}

fn float_op(op: BinOp, a: f64, b: f64) -> InterpResult<f64> {
    Ok(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div if b == 0.0 => return Err(RuntimeError::division_by_zero()),
        BinOp::Div => a / b,
        BinOp::Mod if b == 0.0 => return Err(RuntimeError::modulo_by_zero()),
        BinOp::Mod => a % b,
        _ => 0.0,
    })
}

fn compare(op: BinOp, left: &Value, right: &Value) -> InterpResult<bool> {
    let ord = match (left, right) {
        (a, b) if a.is_number() && b.is_number() => a.sort_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => (*a as u8).cmp(&(*b as u8)),
        (
            Value::Date(_) | Value::DateTime(_),
            Value::Date(_) | Value::DateTime(_),
        ) => left.sort_cmp(right),
        (a, b)
            if matches!(op, BinOp::Eq | BinOp::Ne)
                && std::mem::discriminant(a) == std::mem::discriminant(b) =>
        {
            let same = a == b;
            return Ok(if op == BinOp::Eq { same } else { !same });
        }
        _ => {
            return Err(RuntimeError::type_mismatch(format!(
                "Operands must be same type for '{op}'"
            )))
        }
    };
    Ok(match op {
        BinOp::Eq => ord == Ordering::Equal,
        BinOp::Ne => ord != Ordering::Equal,
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Le => ord != Ordering::Greater,
        BinOp::Gt => ord == Ordering::Greater,
        _ => ord != Ordering::Less,
    })
}
