//! `math.*` builtins

use super::{arg, BuiltinInfo, NativeModule};
use crate::interp::{InterpResult, RuntimeError, Value};
use crate::types::DataType;

pub(super) fn module() -> NativeModule {
    let one = |name: &str, ty: DataType, ret: DataType| {
        BuiltinInfo::new(name, Some(ret)).param("value", ty)
    };
    let two = |name: &str, ty: DataType| {
        BuiltinInfo::new(name, Some(ty)).param("a", ty).param("b", ty)
    };
    NativeModule::new("math")
        .function(one("math.abs", DataType::Any, DataType::Any), abs)
        .function(two("math.min", DataType::Any), min)
        .function(two("math.max", DataType::Any), max)
        .function(one("math.floor", DataType::Double, DataType::Double), floor)
        .function(one("math.ceil", DataType::Double, DataType::Double), ceil)
        .function(one("math.round", DataType::Double, DataType::Long), round)
        .function(one("math.sqrt", DataType::Double, DataType::Double), sqrt)
        .function(
            BuiltinInfo::new("math.pow", Some(DataType::Double))
                .param("base", DataType::Double)
                .param("exponent", DataType::Double),
            pow,
        )
}

fn number<'a>(args: &'a [Value], i: usize, func: &str) -> InterpResult<&'a Value> {
    let v = arg(args, i);
    if v.is_number() {
        Ok(v)
    } else {
        Err(RuntimeError::type_mismatch(format!(
            "{func}: expected a number but found {}",
            v.type_name()
        )))
    }
}

fn double(args: &[Value], i: usize, func: &str) -> InterpResult<f64> {
    Ok(number(args, i, func)?.as_f64().unwrap_or(0.0))
}

/// Keeps the argument's width
fn abs(args: &[Value]) -> InterpResult<Value> {
    Ok(match number(args, 0, "math.abs")? {
        Value::Byte(b) => Value::Byte(b.wrapping_abs()),
        Value::Int(n) => Value::Int(n.wrapping_abs()),
        Value::Long(n) => Value::Long(n.wrapping_abs()),
        Value::Float(x) => Value::Float(x.abs()),
        Value::Double(x) => Value::Double(x.abs()),
        other => other.clone(),
    })
}

fn pick(args: &[Value], func: &str, want_max: bool) -> InterpResult<Value> {
    let a = number(args, 0, func)?;
    let b = number(args, 1, func)?;
    let a_wins = match a.sort_cmp(b) {
        std::cmp::Ordering::Greater => want_max,
        _ => !want_max,
    };
    Ok(if a_wins { a.clone() } else { b.clone() })
}

fn min(args: &[Value]) -> InterpResult<Value> {
    pick(args, "math.min", false)
}

fn max(args: &[Value]) -> InterpResult<Value> {
    pick(args, "math.max", true)
}

fn floor(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Double(double(args, 0, "math.floor")?.floor()))
}

fn ceil(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Double(double(args, 0, "math.ceil")?.ceil()))
}

/// Half-up rounding to a long
fn round(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Long((double(args, 0, "math.round")? + 0.5).floor() as i64))
}

fn sqrt(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Double(double(args, 0, "math.sqrt")?.sqrt()))
}

fn pow(args: &[Value]) -> InterpResult<Value> {
    let base = double(args, 0, "math.pow")?;
    let exponent = double(args, 1, "math.pow")?;
    Ok(Value::Double(base.powf(exponent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abs_keeps_width() {
        assert_eq!(abs(&[Value::Int(-3)]).unwrap(), Value::Int(3));
        assert_eq!(abs(&[Value::Double(-1.5)]).unwrap(), Value::Double(1.5));
        assert!(abs(&[Value::from("x")]).is_err());
    }

    #[test]
    fn test_min_max_mixed() {
        assert_eq!(min(&[Value::Int(2), Value::Double(1.5)]).unwrap(), Value::Double(1.5));
        assert_eq!(max(&[Value::Int(2), Value::Long(9)]).unwrap(), Value::Long(9));
        assert_eq!(max(&[Value::Int(4), Value::Int(4)]).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(floor(&[Value::Double(2.7)]).unwrap(), Value::Double(2.0));
        assert_eq!(ceil(&[Value::Double(2.1)]).unwrap(), Value::Double(3.0));
        assert_eq!(round(&[Value::Double(2.5)]).unwrap(), Value::Long(3));
        assert_eq!(round(&[Value::Double(-2.5)]).unwrap(), Value::Long(-2));
    }

    #[test]
    fn test_sqrt_pow() {
        assert_eq!(sqrt(&[Value::Double(9.0)]).unwrap(), Value::Double(3.0));
        assert_eq!(pow(&[Value::Double(2.0), Value::Double(10.0)]).unwrap(), Value::Double(1024.0));
    }
}
