//! Primitive and container type tags with their conversion rules

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::TypeError;
use crate::interp::Value;

/// Tag naming each value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Byte,
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
    Bool,
    Json,
    Array,
    Record,
    Map,
    Queue,
    Bitmap,
    Intmap,
    Any,
}

impl DataType {
    /// Parse a type keyword (case-insensitive)
    pub fn from_name(name: &str) -> Option<DataType> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "byte" => DataType::Byte,
            "int" | "integer" => DataType::Int,
            "long" => DataType::Long,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "string" => DataType::String,
            "date" => DataType::Date,
            "bool" | "boolean" => DataType::Bool,
            "json" => DataType::Json,
            "array" => DataType::Array,
            "record" => DataType::Record,
            "map" => DataType::Map,
            "queue" => DataType::Queue,
            "bitmap" => DataType::Bitmap,
            "intmap" => DataType::Intmap,
            "any" => DataType::Any,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical lowercase name used by `typeof`
    pub fn type_name(self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Bool => "bool",
            DataType::Json => "json",
            DataType::Array => "array",
            DataType::Record => "record",
            DataType::Map => "map",
            DataType::Queue => "queue",
            DataType::Bitmap => "bitmap",
            DataType::Intmap => "intmap",
            DataType::Any => "any",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Int | DataType::Long | DataType::Float | DataType::Double
        )
    }

    /// Value a null converts to
    pub fn zero(self) -> Value {
        match self {
            DataType::Byte => Value::Byte(0),
            DataType::Int => Value::Int(0),
            DataType::Long => Value::Long(0),
            DataType::Float => Value::Float(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::Bool => Value::Bool(false),
            DataType::String => Value::Str(String::new()),
            _ => Value::Null,
        }
    }

    /// Membership check; null belongs to every type
    pub fn is_data_type(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (DataType::Any, _) => true,
            (DataType::Byte, Value::Byte(_)) => true,
            (DataType::Int, Value::Int(_)) => true,
            (DataType::Long, Value::Long(_)) => true,
            (DataType::Float, Value::Float(_)) => true,
            (DataType::Double, Value::Double(_)) => true,
            (DataType::String, Value::Str(_)) => true,
            (DataType::Bool, Value::Bool(_)) => true,
            (DataType::Date, Value::Date(_) | Value::DateTime(_)) => true,
            (DataType::Array, Value::Array(_)) => true,
            (DataType::Queue, Value::Queue(_)) => true,
            (DataType::Record | DataType::Map, Value::Map(_)) => true,
            (DataType::Bitmap | DataType::Intmap, v) => v.is_number(),
            (DataType::Json, v) => matches!(
                v,
                Value::Map(_) | Value::Array(_) | Value::Str(_) | Value::Bool(_)
            ) || v.is_number(),
            _ => false,
        }
    }

    /// Declared-type compatibility: int/long and float/double are interchangeable
    pub fn accepts(self, value: &Value) -> bool {
        if self.is_data_type(value) {
            return true;
        }
        matches!(
            (self, value),
            (DataType::Int, Value::Long(_))
                | (DataType::Long, Value::Int(_))
                | (DataType::Float, Value::Double(_))
                | (DataType::Double, Value::Float(_))
        )
    }

    /// Coerce a value into this type
    pub fn convert(self, value: Value) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(self.zero());
        }
        match self {
            DataType::String => Ok(match value {
                Value::Str(_) => value,
                Value::Bool(b) => Value::Str(if b { "Y" } else { "N" }.to_string()),
                other => Value::Str(other.to_string()),
            }),
            DataType::Byte | DataType::Bitmap => to_byte(&value).map(Value::Byte),
            DataType::Int | DataType::Intmap => match value {
                Value::Int(_) => Ok(value),
                Value::Byte(b) => Ok(Value::Int(b as u8 as i32)),
                Value::Long(n) => Ok(Value::Int(n as i32)),
                Value::Float(x) => Ok(Value::Int(x as i32)),
                Value::Double(x) => Ok(Value::Int(x as i32)),
                Value::Str(ref s) => parse_number(s, self).map(Value::Int),
                other => Err(cannot_convert(&other, self)),
            },
            DataType::Long => match value {
                Value::Long(_) => Ok(value),
                Value::Byte(b) => Ok(Value::Long(b as u8 as i64)),
                Value::Int(n) => Ok(Value::Long(n as i64)),
                Value::Float(x) => Ok(Value::Long(x as i64)),
                Value::Double(x) => Ok(Value::Long(x as i64)),
                Value::Str(ref s) => parse_number(s, self).map(Value::Long),
                other => Err(cannot_convert(&other, self)),
            },
            DataType::Float => match value {
                Value::Float(_) => Ok(value),
                Value::Byte(b) => Ok(Value::Float(b as u8 as f32)),
                Value::Int(n) => Ok(Value::Float(n as f32)),
                Value::Long(n) => Ok(Value::Float(n as f32)),
                Value::Double(x) => Ok(Value::Float(x as f32)),
                Value::Str(ref s) => parse_number(s, self).map(Value::Float),
                other => Err(cannot_convert(&other, self)),
            },
            DataType::Double => match value {
                Value::Double(_) => Ok(value),
                Value::Byte(b) => Ok(Value::Double(b as u8 as f64)),
                Value::Int(n) => Ok(Value::Double(n as f64)),
                Value::Long(n) => Ok(Value::Double(n as f64)),
                Value::Float(x) => Ok(Value::Double(x as f64)),
                Value::Str(ref s) => parse_number(s, self).map(Value::Double),
                other => Err(cannot_convert(&other, self)),
            },
            DataType::Bool => match value {
                Value::Bool(_) => Ok(value),
                Value::Str(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "y" => Ok(Value::Bool(true)),
                    "false" | "n" => Ok(Value::Bool(false)),
                    _ => Err(cannot_convert(&value, self)),
                },
                other => Err(cannot_convert(&other, self)),
            },
            DataType::Date => match value {
                Value::Date(_) | Value::DateTime(_) => Ok(value),
                Value::Str(ref s) => parse_date(s).ok_or_else(|| cannot_convert(&value, self)),
                other => Err(cannot_convert(&other, self)),
            },
            DataType::Json | DataType::Array | DataType::Record | DataType::Map => match value {
                Value::Str(ref s) => {
                    let trimmed = s.trim();
                    let structured = (trimmed.starts_with('{') && trimmed.ends_with('}'))
                        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
                    if !structured {
                        return Ok(value);
                    }
                    serde_json::from_str::<serde_json::Value>(trimmed)
                        .map(|json| Value::from_json(&json))
                        .map_err(|e| TypeError::conversion(format!("Invalid JSON for {self}: {e}")))
                }
                other => Ok(other),
            },
            DataType::Queue | DataType::Any => Ok(value),
        }
    }
}

/// Parse the date literal forms `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and ISO `T`
pub fn parse_date(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Value::Date(d));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(Value::DateTime)
}

fn to_byte(value: &Value) -> Result<i8, TypeError> {
    match value {
        Value::Byte(b) => Ok(*b),
        Value::Int(n) => Ok((*n & 0xFF) as u8 as i8),
        Value::Long(n) => Ok((*n & 0xFF) as u8 as i8),
        Value::Float(x) => Ok(((*x as i64) & 0xFF) as u8 as i8),
        Value::Double(x) => Ok(((*x as i64) & 0xFF) as u8 as i8),
        Value::Str(s) => {
            let n: i64 = parse_number(s, DataType::Byte)?;
            if !(-128..=127).contains(&n) {
                return Err(TypeError::conversion(format!(
                    "Byte overflow: {n} not in [-128..127]"
                )));
            }
            Ok(n as i8)
        }
        other => Err(cannot_convert(other, DataType::Byte)),
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, ty: DataType) -> Result<T, TypeError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| TypeError::conversion(format!("Cannot convert '{text}' to {ty}")))
}

fn cannot_convert(value: &Value, ty: DataType) -> TypeError {
    TypeError::conversion(format!(
        "Cannot convert {} '{}' to {ty}",
        value.type_name(),
        value
    ))
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Byte => "BYTE",
            DataType::Int => "INTEGER",
            DataType::Long => "LONG",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::String => "STRING",
            DataType::Date => "DATE",
            DataType::Bool => "BOOL",
            DataType::Json => "JSON",
            DataType::Array => "ARRAY",
            DataType::Record => "RECORD",
            DataType::Map => "MAP",
            DataType::Queue => "QUEUE",
            DataType::Bitmap => "BITMAP",
            DataType::Intmap => "INTMAP",
            DataType::Any => "ANY",
        };
        write!(f, "{name}")
    }
}
