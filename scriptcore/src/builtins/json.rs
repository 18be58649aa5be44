//! `json.*` builtins
//!
//! JSON values are ordinary maps and arrays, so these functions mutate the
//! structure they are given. Paths look like `user.address[2].city`.

use super::{arg, str_arg, BuiltinInfo, NativeModule};
use crate::arrays::ArrayDef;
use crate::interp::{InterpResult, MapData, RuntimeError, Shared, Value};
use crate::types::DataType;

pub(super) fn module() -> NativeModule {
    let path = |name: &str, ret: DataType| {
        BuiltinInfo::new(name, Some(ret))
            .param("root", DataType::Json)
            .param("path", DataType::String)
    };
    NativeModule::new("json")
        .function(
            BuiltinInfo::new("json.jsonFromString", Some(DataType::Json)).param("json", DataType::String),
            from_string,
        )
        .function(
            BuiltinInfo::new("json.toString", Some(DataType::String)).param("json", DataType::Json),
            to_string,
        )
        .function(
            BuiltinInfo::new("json.isEmpty", Some(DataType::Bool)).param("value", DataType::Json),
            is_empty,
        )
        .function(path("json.get", DataType::Json), get)
        .function(path("json.getString", DataType::String).optional("default", DataType::String), get_string)
        .function(path("json.getInt", DataType::Int).optional("default", DataType::Int), get_int)
        .function(path("json.getLong", DataType::Long).optional("default", DataType::Long), get_long)
        .function(path("json.getDouble", DataType::Double).optional("default", DataType::Double), get_double)
        .function(path("json.getBool", DataType::Bool).optional("default", DataType::Bool), get_bool)
        .function(path("json.set", DataType::Json).param("value", DataType::Json), set)
        .function(path("json.remove", DataType::Json), remove)
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(i64),
}

fn parse_path(path: &str) -> Result<Vec<Segment>, String> {
    let chars: Vec<char> = path.chars().collect();
    let mut segments = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '.' => i += 1,
            '[' => {
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                let start = i;
                if i < chars.len() && chars[i] == '-' {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let index = digits
                    .parse::<i64>()
                    .map_err(|_| format!("Expected digit in array index at pos {start}"))?;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                if chars.get(i) != Some(&']') {
                    return Err(format!("Missing closing ']' for array index at pos {i}"));
                }
                i += 1;
                segments.push(Segment::Index(index));
            }
            _ => {
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                segments.push(Segment::Key(chars[start..i].iter().collect()));
            }
        }
    }
    Ok(segments)
}

/// Value at `path`, or null when anything along the way is missing
fn lookup(root: &Value, segments: &[Segment]) -> Value {
    let mut current = root.clone();
    for segment in segments {
        let next = match (segment, &current) {
            (Segment::Key(k), Value::Map(m)) => m.read().get(k).cloned().unwrap_or_default(),
            (Segment::Index(i), Value::Array(a)) => usize::try_from(*i)
                .ok()
                .and_then(|i| a.read().get(i).ok())
                .unwrap_or_default(),
            _ => return Value::Null,
        };
        current = next;
    }
    current
}

fn path_arg(args: &[Value], func: &str) -> InterpResult<Vec<Segment>> {
    parse_path(str_arg(args, 1).unwrap_or(""))
        .map_err(|msg| RuntimeError::conversion(format!("{func}: {msg}")))
}

fn from_string(args: &[Value]) -> InterpResult<Value> {
    let Some(text) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    serde_json::from_str::<serde_json::Value>(text)
        .map(|json| Value::from_json(&json))
        .map_err(|e| RuntimeError::conversion(format!("json.jsonFromString: invalid JSON: {e}")))
}

fn to_string(args: &[Value]) -> InterpResult<Value> {
    serde_json::to_string_pretty(&arg(args, 0).to_json())
        .map(Value::Str)
        .map_err(|e| RuntimeError::wrapped(format!("json.toString: {e}")))
}

/// Null and empty containers or strings are empty; so is any other scalar
fn is_empty(args: &[Value]) -> InterpResult<Value> {
    let empty = match arg(args, 0) {
        Value::Map(m) => m.read().is_empty(),
        Value::Array(a) => a.read().is_empty(),
        Value::Queue(q) => q.read().is_empty(),
        Value::Str(s) => s.is_empty(),
        _ => true,
    };
    Ok(Value::Bool(empty))
}

fn get(args: &[Value]) -> InterpResult<Value> {
    let segments = match parse_path(str_arg(args, 1).unwrap_or("")) {
        Ok(s) => s,
        Err(_) => return Ok(Value::Null),
    };
    Ok(lookup(arg(args, 0), &segments))
}

/// Typed getter: the converted value, or the default when missing or mistyped
fn typed(args: &[Value], pick: impl FnOnce(Value) -> Option<Value>) -> InterpResult<Value> {
    let found = get(args)?;
    Ok(pick(found).unwrap_or_else(|| arg(args, 2).clone()))
}

fn get_string(args: &[Value]) -> InterpResult<Value> {
    typed(args, |v| matches!(v, Value::Str(_)).then_some(v))
}

fn get_int(args: &[Value]) -> InterpResult<Value> {
    typed(args, |v| v.is_number().then(|| DataType::Int.convert(v).ok()).flatten())
}

fn get_long(args: &[Value]) -> InterpResult<Value> {
    typed(args, |v| v.is_number().then(|| DataType::Long.convert(v).ok()).flatten())
}

fn get_double(args: &[Value]) -> InterpResult<Value> {
    typed(args, |v| v.is_number().then(|| DataType::Double.convert(v).ok()).flatten())
}

fn get_bool(args: &[Value]) -> InterpResult<Value> {
    typed(args, |v| matches!(v, Value::Bool(_)).then_some(v))
}

fn empty_container(for_index: bool) -> Value {
    if for_index {
        Value::array(ArrayDef::dynamic(DataType::Any, 0))
    } else {
        Value::map(MapData::new())
    }
}

fn non_container(func: &str, segment: &Segment, at: &Value) -> RuntimeError {
    let what = match segment {
        Segment::Key(k) => format!("get key '{k}' on non-object"),
        Segment::Index(i) => format!("index [{i}] on non-array"),
    };
    RuntimeError::type_mismatch(format!("{func}: Tried to {what} ({})", at.type_name()))
}

fn slot(func: &str, i: i64) -> InterpResult<usize> {
    usize::try_from(i)
        .map_err(|_| RuntimeError::index_out_of_bounds(format!("{func}: Negative index {i}")))
}

/// Write into an array, padding with nulls up to `idx`
fn put_index(array: &Shared<ArrayDef>, idx: usize, value: Value) -> InterpResult<()> {
    let mut array = array.write();
    if idx >= array.len() {
        array.expand(idx + 1)?;
    }
    array.set(idx, value)?;
    Ok(())
}

/// Existing child at `segment`, created when missing
fn descend(current: &Value, segment: &Segment, for_index: bool) -> InterpResult<Value> {
    match (segment, current) {
        (Segment::Key(k), Value::Map(m)) => {
            let existing = m.read().get(k).cloned();
            match existing {
                Some(v) if !v.is_null() => Ok(v),
                _ => {
                    let child = empty_container(for_index);
                    m.write().insert(k.clone(), child.clone());
                    Ok(child)
                }
            }
        }
        (Segment::Index(i), Value::Array(a)) => {
            let idx = slot("json.set", *i)?;
            let existing = a.read().get(idx).ok();
            match existing {
                Some(v) if !v.is_null() => Ok(v),
                _ => {
                    let child = empty_container(for_index);
                    put_index(a, idx, child.clone())?;
                    Ok(child)
                }
            }
        }
        (segment, other) => Err(non_container("json.set", segment, other)),
    }
}

/// Set the value at `path`, creating missing parents; returns the root
fn set(args: &[Value]) -> InterpResult<Value> {
    let root = arg(args, 0).clone();
    let segments = path_arg(args, "json.set")?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(RuntimeError::invalid("json.set: path cannot be empty"));
    };
    let mut current = root.clone();
    for (i, segment) in parents.iter().enumerate() {
        let for_index = matches!(segments[i + 1], Segment::Index(_));
        current = descend(&current, segment, for_index)?;
    }
    let value = arg(args, 2).clone();
    match (last, &current) {
        (Segment::Key(k), Value::Map(m)) => {
            m.write().insert(k.clone(), value);
        }
        (Segment::Index(i), Value::Array(a)) => put_index(a, slot("json.set", *i)?, value)?,
        (segment, other) => return Err(non_container("json.set", segment, other)),
    }
    Ok(root)
}

/// Remove the key or element at `path`; a missing path is a no-op
fn remove(args: &[Value]) -> InterpResult<Value> {
    let root = arg(args, 0).clone();
    let segments = path_arg(args, "json.remove")?;
    let Some((last, parents)) = segments.split_last() else {
        return Ok(root);
    };
    match (last, lookup(&root, parents)) {
        (Segment::Key(k), Value::Map(m)) => {
            m.write().remove(k);
        }
        (Segment::Index(i), Value::Array(a)) => {
            if let Ok(idx) = usize::try_from(*i) {
                let len = a.read().len();
                if idx < len {
                    a.write().remove(idx)?;
                }
            }
        }
        _ => {}
    }
    Ok(root)
}
