//! Runtime values for the interpreter

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::{Mutex, RwLock};

use super::MapData;
use crate::arrays::{ArrayDef, QueueDef};
use crate::db::DbCursor;
use crate::types::DataType;

/// Container shared between bindings; copies of a value alias the same storage
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Open database cursor handle
#[derive(Clone)]
pub struct CursorRef(pub Arc<Mutex<Box<dyn DbCursor>>>);

impl CursorRef {
    pub fn new(cursor: Box<dyn DbCursor>) -> Self {
        CursorRef(Arc::new(Mutex::new(cursor)))
    }
}

impl fmt::Debug for CursorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CursorRef")
    }
}

/// Runtime value
///
/// Bitmaps and intmaps are plain `Byte` / `Int` values; their layout lives
/// on the variable binding. Records are maps checked against a schema.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Array(Shared<ArrayDef>),
    Queue(Shared<QueueDef>),
    Map(Shared<MapData>),
    Cursor(CursorRef),
}

impl Value {
    pub fn array(def: ArrayDef) -> Value {
        Value::Array(shared(def))
    }

    pub fn queue(def: QueueDef) -> Value {
        Value::Queue(shared(def))
    }

    pub fn map(data: MapData) -> Value {
        Value::Map(shared(data))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    /// Runtime type tag; null reports `Any`
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null | Value::Cursor(_) => DataType::Any,
            Value::Byte(_) => DataType::Byte,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Bool(_) => DataType::Bool,
            Value::Str(_) => DataType::String,
            Value::Date(_) | Value::DateTime(_) => DataType::Date,
            Value::Array(_) => DataType::Array,
            Value::Queue(_) => DataType::Queue,
            Value::Map(_) => DataType::Map,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Cursor(_) => "cursor",
            other => other.data_type().type_name(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(b) => Some(*b as i64),
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            Value::Float(x) => Some(*x as i64),
            Value::Double(x) => Some(*x as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(b) => Some(*b as f64),
            Value::Int(n) => Some(*n as f64),
            Value::Long(n) => Some(*n as f64),
            Value::Float(x) => Some(*x as f64),
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Total order used by sorting: nulls first, numbers numerically,
    /// then by kind for mixed pairs
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (a, b) if a.is_number() && b.is_number() => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Date(a), Value::DateTime(b)) => a.and_time(chrono::NaiveTime::MIN).cmp(b),
            (Value::DateTime(a), Value::Date(b)) => a.cmp(&b.and_time(chrono::NaiveTime::MIN)),
            (a, b) => a.type_name().cmp(b.type_name()),
        }
    }

    /// Build a value from parsed JSON; arrays become dynamic `any` arrays
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i))
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::array(ArrayDef::from_values(
                DataType::Any,
                items.iter().map(Value::from_json).collect(),
            )),
            serde_json::Value::Object(obj) => {
                let mut map = MapData::new();
                for (k, v) in obj {
                    map.insert(k.clone(), Value::from_json(v));
                }
                Value::map(map)
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null | Value::Cursor(_) => J::Null,
            Value::Byte(b) => J::from(*b),
            Value::Int(n) => J::from(*n),
            Value::Long(n) => J::from(*n),
            Value::Float(x) => J::from(*x as f64),
            Value::Double(x) => J::from(*x),
            Value::Bool(b) => J::Bool(*b),
            Value::Str(s) => J::String(s.clone()),
            Value::Date(_) | Value::DateTime(_) => J::String(self.to_string()),
            Value::Array(a) => J::Array(a.read().to_vec().iter().map(Value::to_json).collect()),
            Value::Queue(q) => J::Array(q.read().to_vec().iter().map(Value::to_json).collect()),
            Value::Map(m) => J::Object(
                m.read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

fn fmt_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x}")
    }
}

/// Element rendering inside containers: strings are quoted
struct Nested<'a>(&'a Value);

impl fmt::Display for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Str(s) => write!(f, "\"{s}\""),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Byte(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Double(x) => fmt_float(f, *x),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.read().to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Nested(v))?;
                }
                write!(f, "]")
            }
            Value::Queue(q) => {
                write!(f, "[")?;
                for (i, v) in q.read().to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Nested(v))?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{k}\": {}", Nested(v))?;
                }
                write!(f, "}}")
            }
            Value::Cursor(_) => write!(f, "<cursor>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Arc::ptr_eq(a, b) || a.read().to_vec() == b.read().to_vec()
            }
            (Value::Queue(a), Value::Queue(b)) => {
                Arc::ptr_eq(a, b) || a.read().to_vec() == b.read().to_vec()
            }
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Cursor(a), Value::Cursor(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Double(3.0).to_string(), "3.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_container_display_quotes_strings() {
        let arr = Value::array(ArrayDef::from_values(
            DataType::Any,
            vec![Value::Int(1), Value::from("a")],
        ));
        assert_eq!(arr.to_string(), "[1, \"a\"]");

        let mut m = MapData::new();
        m.insert("k".to_string(), Value::from("v"));
        m.insert("n".to_string(), Value::Int(2));
        assert_eq!(Value::map(m).to_string(), "{\"k\": \"v\", \"n\": 2}");
    }

    #[test]
    fn test_shared_aliasing() {
        let a = Value::array(ArrayDef::dynamic(DataType::Int, 1));
        let b = a.clone();
        if let Value::Array(inner) = &b {
            inner.write().set(0, Value::Int(9)).unwrap();
        }
        assert_eq!(a.to_string(), "[9]");
        assert_eq!(a, b);
    }

    #[test]
    fn test_json_bridge() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [true, "x"], "c": 1.5, "d": 10000000000}"#).unwrap();
        let v = Value::from_json(&json);
        let Value::Map(m) = &v else { panic!("not a map") };
        assert_eq!(m.read().get("a"), Some(&Value::Int(1)));
        assert_eq!(m.read().get("d"), Some(&Value::Long(10_000_000_000)));
        assert_eq!(v.to_json(), json);
    }

    #[test]
    fn test_sort_cmp() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(1)), Ordering::Less);
        assert_eq!(Value::Int(2).sort_cmp(&Value::Double(1.5)), Ordering::Greater);
        assert_eq!(Value::from("a").sort_cmp(&Value::from("b")), Ordering::Less);
    }
}
