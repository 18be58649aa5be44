//! `array.*` builtins; mutate the array in place

use super::{arg, int_arg, BuiltinInfo, NativeModule};
use crate::arrays::ArrayDef;
use crate::interp::{InterpResult, RuntimeError, Shared, Value};
use crate::types::DataType;

pub(super) fn module() -> NativeModule {
    let a = |name: &str, ret: Option<DataType>| {
        BuiltinInfo::new(name, ret).param("array", DataType::Array)
    };
    NativeModule::new("array")
        .function(
            a("array.fill", None)
                .param("length", DataType::Int)
                .optional("value", DataType::Any),
            fill,
        )
        .function(a("array.sort", None).optional("ascending", DataType::Bool), sort)
        .function(a("array.expand", None).param("length", DataType::Int), expand)
        .function(
            a("array.add", None)
                .param("value", DataType::Any)
                .optional("index", DataType::Int),
            add,
        )
        .function(a("array.remove", Some(DataType::Any)).param("index", DataType::Int), remove)
        .function(a("array.asBitmap", Some(DataType::Array)), as_bitmap)
        .function(a("array.asByte", Some(DataType::Array)), as_byte)
        .function(a("array.asIntmap", Some(DataType::Array)), as_intmap)
        .function(a("array.asInt", Some(DataType::Array)), as_int)
}

fn array_arg<'a>(args: &'a [Value], func: &str) -> InterpResult<&'a Shared<ArrayDef>> {
    match arg(args, 0) {
        Value::Array(a) => Ok(a),
        Value::Null => Err(RuntimeError::null_access(format!(
            "{func}: array cannot be null"
        ))),
        other => Err(RuntimeError::type_mismatch(format!(
            "{func}: first argument must be an array, got: {}",
            other.type_name()
        ))),
    }
}

fn index_arg(args: &[Value], i: usize, func: &str) -> InterpResult<usize> {
    let n = int_arg(args, i)
        .ok_or_else(|| RuntimeError::type_mismatch(format!("{func}: index must be a number")))?;
    usize::try_from(n)
        .map_err(|_| RuntimeError::index_out_of_bounds(format!("{func}: negative index {n}")))
}

fn fill(args: &[Value]) -> InterpResult<Value> {
    let a = array_arg(args, "array.fill")?;
    let len = index_arg(args, 1, "array.fill")?;
    a.write().fill(len, arg(args, 2).clone())?;
    Ok(Value::Null)
}

fn sort(args: &[Value]) -> InterpResult<Value> {
    let a = array_arg(args, "array.sort")?;
    let ascending = arg(args, 1).as_bool().unwrap_or(true);
    a.write().sort(ascending)?;
    Ok(Value::Null)
}

fn expand(args: &[Value]) -> InterpResult<Value> {
    let a = array_arg(args, "array.expand")?;
    let len = index_arg(args, 1, "array.expand")?;
    a.write().expand(len)?;
    Ok(Value::Null)
}

/// Append, or insert when an index is given
fn add(args: &[Value]) -> InterpResult<Value> {
    let a = array_arg(args, "array.add")?;
    let value = arg(args, 1).clone();
    if arg(args, 2).is_null() {
        a.write().add(value)?;
    } else {
        let index = index_arg(args, 2, "array.add")?;
        a.write().insert(index, value)?;
    }
    Ok(Value::Null)
}

fn remove(args: &[Value]) -> InterpResult<Value> {
    let a = array_arg(args, "array.remove")?;
    let index = index_arg(args, 1, "array.remove")?;
    let removed = a.write().remove(index)?;
    Ok(removed)
}

/// Copy of `source` with a new element type and the same capacity discipline
fn retype(args: &[Value], func: &str, from: DataType, to: DataType) -> InterpResult<Value> {
    if arg(args, 0).is_null() {
        return Ok(Value::Null);
    }
    let a = array_arg(args, func)?;
    let source = a.read();
    if source.elem_type() != from {
        return Err(RuntimeError::type_mismatch(format!(
            "{func}: expected {} array (array.{}), got array.{}",
            from.type_name(),
            from.type_name(),
            source.elem_type().type_name()
        )));
    }
    let mut target = if source.is_fixed() {
        ArrayDef::fixed(to, source.len())
    } else {
        ArrayDef::dynamic(to, source.len())
    };
    for (i, v) in source.to_vec().into_iter().enumerate() {
        target.set(i, v)?;
    }
    Ok(Value::array(target))
}

fn as_bitmap(args: &[Value]) -> InterpResult<Value> {
    retype(args, "array.asBitmap", DataType::Byte, DataType::Bitmap)
}

fn as_byte(args: &[Value]) -> InterpResult<Value> {
    retype(args, "array.asByte", DataType::Bitmap, DataType::Byte)
}

fn as_intmap(args: &[Value]) -> InterpResult<Value> {
    retype(args, "array.asIntmap", DataType::Int, DataType::Intmap)
}

fn as_int(args: &[Value]) -> InterpResult<Value> {
    retype(args, "array.asInt", DataType::Intmap, DataType::Int)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    fn ints(items: &[i32]) -> Value {
        Value::array(ArrayDef::from_values(
            DataType::Int,
            items.iter().map(|n| Value::Int(*n)).collect(),
        ))
    }

    #[test]
    fn test_fill_and_expand() {
        let a = Value::array(ArrayDef::dynamic(DataType::Int, 0));
        fill(&[a.clone(), Value::Int(3), Value::Int(9)]).unwrap();
        assert_eq!(a.to_string(), "[9, 9, 9]");
        expand(&[a.clone(), Value::Int(5)]).unwrap();
        assert_eq!(a.to_string(), "[9, 9, 9, null, null]");
    }

    #[test]
    fn test_sort_defaults_ascending() {
        let a = ints(&[3, 1, 2]);
        sort(&[a.clone(), Value::Null]).unwrap();
        assert_eq!(a.to_string(), "[1, 2, 3]");
        sort(&[a.clone(), Value::Bool(false)]).unwrap();
        assert_eq!(a.to_string(), "[3, 2, 1]");
    }

    #[test]
    fn test_add_insert_remove() {
        let a = ints(&[1, 3]);
        add(&[a.clone(), Value::Int(2), Value::Int(1)]).unwrap();
        add(&[a.clone(), Value::Int(4), Value::Null]).unwrap();
        assert_eq!(a.to_string(), "[1, 2, 3, 4]");
        assert_eq!(remove(&[a.clone(), Value::Int(0)]).unwrap(), Value::Int(1));
        assert_eq!(a.to_string(), "[2, 3, 4]");
    }

    #[test]
    fn test_fixed_array_cannot_grow() {
        let a = Value::array(ArrayDef::fixed(DataType::Int, 2));
        let err = add(&[a.clone(), Value::Int(1), Value::Null]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
        let err = fill(&[a, Value::Int(3), Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapacityOverflow);
    }

    #[test]
    fn test_retype_round_trip() {
        let bytes = Value::array(ArrayDef::fixed(DataType::Byte, 2));
        let bitmaps = as_bitmap(&[bytes.clone()]).unwrap();
        let Value::Array(b) = &bitmaps else {
            panic!("expected array");
        };
        assert_eq!(b.read().elem_type(), DataType::Bitmap);
        assert!(b.read().is_fixed());

        let back = as_byte(&[bitmaps.clone()]).unwrap();
        let Value::Array(back) = &back else {
            panic!("expected array");
        };
        assert!(matches!(*back.read(), ArrayDef::FixedByte(_)));

        let err = as_int(&[bytes]).unwrap_err();
        assert_eq!(
            err.message,
            "array.asInt: expected intmap array (array.intmap), got array.byte"
        );
        assert_eq!(as_intmap(&[Value::Null]).unwrap(), Value::Null);
    }
}
