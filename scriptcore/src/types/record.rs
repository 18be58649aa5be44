//! Structural record schemas

use std::fmt;

use super::{DataType, TypeError};
use crate::interp::{MapData, Value};

/// Declared type of a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Simple(DataType),
    Record(RecordType),
}

impl FieldType {
    pub fn data_type(&self) -> DataType {
        match self {
            FieldType::Simple(dt) => *dt,
            FieldType::Record(_) => DataType::Record,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Simple(dt) => write!(f, "{}", dt.type_name()),
            FieldType::Record(rt) => write!(f, "{rt}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub ty: FieldType,
    /// Null is rejected by validation
    pub mandatory: bool,
    pub max_length: Option<usize>,
    pub default: Option<Value>,
}

impl RecordField {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        RecordField {
            name: name.into(),
            ty,
            mandatory: false,
            max_length: None,
            default: None,
        }
    }
}

/// Ordered field schema; names are unique ignoring case
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordType {
    fields: Vec<RecordField>,
}

impl RecordType {
    pub fn new() -> Self {
        RecordType { fields: Vec::new() }
    }

    pub fn add_field(&mut self, name: &str, ty: DataType) -> Result<(), TypeError> {
        self.push_field(RecordField::new(name, FieldType::Simple(ty)))
    }

    pub fn add_nested(&mut self, name: &str, ty: RecordType) -> Result<(), TypeError> {
        self.push_field(RecordField::new(name, FieldType::Record(ty)))
    }

    pub fn push_field(&mut self, field: RecordField) -> Result<(), TypeError> {
        if self.field(&field.name).is_some() {
            return Err(TypeError::structure(format!(
                "Duplicate field '{}' in record",
                field.name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    /// Derive a schema from a map's current contents
    pub fn infer(map: &MapData) -> RecordType {
        let mut rt = RecordType::new();
        for (key, value) in map.iter() {
            let ty = match value {
                Value::Map(inner) => FieldType::Record(RecordType::infer(&inner.read())),
                Value::Null => FieldType::Simple(DataType::String),
                other => FieldType::Simple(other.data_type()),
            };
            // keys of a map are already unique
            rt.fields.push(RecordField::new(key.clone(), ty));
        }
        rt
    }

    /// Coerce each declared field and fill defaults; undeclared keys are kept
    /// so validation can report them
    pub fn convert_value(&self, value: &Value) -> Result<Value, TypeError> {
        let Value::Map(shared) = value else {
            return Err(TypeError::conversion(format!(
                "Cannot convert {} to record",
                value.type_name()
            )));
        };
        let source = shared.read();
        let mut out = MapData::new();
        for field in &self.fields {
            let converted = match source.get_ci(&field.name) {
                Some(v) => match &field.ty {
                    FieldType::Simple(dt) => dt.convert(v.clone()).map_err(|e| {
                        TypeError::conversion(format!("Field '{}': {e}", field.name))
                    })?,
                    FieldType::Record(_) if v.is_null() => Value::Null,
                    FieldType::Record(rt) => rt.convert_value(v)?,
                },
                None => match &field.default {
                    Some(d) => d.clone(),
                    None => continue,
                },
            };
            out.insert(field.name.clone(), converted);
        }
        for (key, v) in source.iter() {
            if self.field(key).is_none() {
                out.insert(key.clone(), v.clone());
            }
        }
        Ok(Value::map(out))
    }

    /// Exact structural check: no missing, undeclared or mistyped fields
    pub fn validate_value(&self, value: &Value) -> Result<(), TypeError> {
        let Value::Map(shared) = value else {
            return Err(TypeError::structure(format!(
                "Expected a record but found {}",
                value.type_name()
            )));
        };
        let map = shared.read();
        for field in &self.fields {
            let Some(v) = map.get_ci(&field.name) else {
                if field.default.is_some() {
                    continue;
                }
                return Err(TypeError::structure(format!(
                    "Record field '{}' is missing",
                    field.name
                )));
            };
            if v.is_null() {
                if field.mandatory {
                    return Err(TypeError::structure(format!(
                        "Record field '{}' is mandatory",
                        field.name
                    )));
                }
                continue;
            }
            match &field.ty {
                FieldType::Record(rt) => rt.validate_value(v)?,
                FieldType::Simple(dt) if !dt.accepts(v) => {
                    return Err(TypeError::structure(format!(
                        "Record field '{}' expects {} but found {}",
                        field.name,
                        dt.type_name(),
                        v.type_name()
                    )));
                }
                FieldType::Simple(_) => {}
            }
            if let (Some(max), Value::Str(s)) = (field.max_length, v) {
                if s.chars().count() > max {
                    return Err(TypeError::structure(format!(
                        "Record field '{}' exceeds max length {max}",
                        field.name
                    )));
                }
            }
        }
        if let Some((key, _)) = map.iter().find(|(k, _)| self.field(k).is_none()) {
            return Err(TypeError::structure(format!(
                "Record has undeclared field '{key}'"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", field.name, field.ty)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> RecordType {
        let mut rt = RecordType::new();
        rt.add_field("name", DataType::String).unwrap();
        rt.add_field("age", DataType::Int).unwrap();
        rt
    }

    fn map_of(entries: &[(&str, Value)]) -> Value {
        let mut m = MapData::new();
        for (k, v) in entries {
            m.insert(k.to_string(), v.clone());
        }
        Value::map(m)
    }

    #[test]
    fn test_display() {
        let mut rt = person();
        let mut addr = RecordType::new();
        addr.add_field("city", DataType::String).unwrap();
        rt.add_nested("addr", addr).unwrap();
        assert_eq!(rt.to_string(), "record {name:string, age:int, addr:record {city:string}}");
    }

    #[test]
    fn test_duplicate_field_ignores_case() {
        let mut rt = person();
        assert!(rt.add_field("NAME", DataType::Int).is_err());
    }

    #[test]
    fn test_convert_then_validate() {
        let rt = person();
        let raw = map_of(&[("name", Value::from("ann")), ("age", Value::from("41"))]);
        let converted = rt.convert_value(&raw).unwrap();
        rt.validate_value(&converted).unwrap();
        let Value::Map(m) = &converted else { panic!("not a map") };
        assert_eq!(m.read().get_ci("AGE"), Some(&Value::Int(41)));
    }

    #[test]
    fn test_missing_and_extra_keys_fail() {
        let rt = person();
        let missing = map_of(&[("name", Value::from("ann"))]);
        let err = rt.validate_value(&missing).unwrap_err();
        assert_eq!(err.to_string(), "Record field 'age' is missing");

        let extra = map_of(&[
            ("name", Value::from("ann")),
            ("age", Value::Int(3)),
            ("pet", Value::from("cat")),
        ]);
        let err = rt.validate_value(&rt.convert_value(&extra).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Record has undeclared field 'pet'");
    }

    #[test]
    fn test_defaults_and_constraints() {
        let mut rt = RecordType::new();
        let mut code = RecordField::new("code", FieldType::Simple(DataType::String));
        code.mandatory = true;
        code.max_length = Some(3);
        rt.push_field(code).unwrap();
        let mut qty = RecordField::new("qty", FieldType::Simple(DataType::Int));
        qty.default = Some(Value::Int(1));
        rt.push_field(qty).unwrap();

        let ok = rt.convert_value(&map_of(&[("code", Value::from("abc"))])).unwrap();
        rt.validate_value(&ok).unwrap();

        let long = map_of(&[("code", Value::from("abcd"))]);
        assert!(rt.validate_value(&long).is_err());
        let null = map_of(&[("code", Value::Null)]);
        assert!(rt.validate_value(&null).is_err());
    }

    #[test]
    fn test_infer() {
        let inner = map_of(&[("z", Value::Bool(true))]);
        let m = map_of(&[("a", Value::Int(1)), ("b", Value::Null), ("c", inner)]);
        let Value::Map(shared) = &m else { panic!("not a map") };
        let rt = RecordType::infer(&shared.read());
        assert_eq!(rt.to_string(), "record {a:int, b:string, c:record {z:bool}}");
    }
}
