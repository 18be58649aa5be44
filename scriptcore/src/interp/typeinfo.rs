//! `typeof` descriptions and casts

use tracing::debug;

use super::eval::property_path;
use super::{
    fold, InterpResult, Interpreter, Layout, MapData, ResolvedType, RuntimeError, TypeMeta, Value,
};
use crate::ast::{Expr, Spanned, TypeRef};
use crate::types::{DataType, RecordType};

impl Interpreter {
    /// Canonical type description. Layout metadata on a variable binding
    /// expands records, bitmaps and arrays of records.
    pub(crate) fn eval_typeof(&mut self, expr: &Spanned<Expr>) -> InterpResult<String> {
        if let (Expr::Var(_), Some(path)) = (&expr.node, property_path(expr)) {
            if let Some(binding) = self.ctx.env.lookup(&fold(&path)) {
                return Ok(describe(&binding.value, binding.meta.as_ref()));
            }
        }
        let value = self.eval(expr)?;
        Ok(describe(&value, None))
    }

    /// `cast(T, value)`. Record, bitmap and intmap casts leave their layout
    /// pending for the next declaration or assignment.
    pub(crate) fn eval_cast(&mut self, target: &TypeRef, value: &Spanned<Expr>) -> InterpResult<Value> {
        let value = self.eval(value)?;
        let resolved = self.ctx.typedefs.resolve(target)?;
        let alias = resolved.alias.clone();
        let result = match &resolved.ty {
            ResolvedType::Bitmap(bt) => {
                let byte = DataType::Bitmap
                    .convert(value.clone())
                    .map_err(|e| cannot_cast(&value, DataType::Bitmap, e))?;
                self.set_pending(Layout::Bitmap(bt.clone()), alias);
                byte
            }
            ResolvedType::Intmap(it) => {
                let int = DataType::Intmap
                    .convert(value.clone())
                    .map_err(|e| cannot_cast(&value, DataType::Intmap, e))?;
                self.set_pending(Layout::Intmap(it.clone()), alias);
                int
            }
            ResolvedType::Record(rt) => {
                let map = object_for_record(value)?;
                let converted = rt
                    .convert_value(&map)
                    .and_then(|v| rt.validate_value(&v).map(|_| v))
                    .map_err(|e| RuntimeError::structural(format!("Cannot cast to record: {e}")))?;
                self.set_pending(Layout::Record(rt.clone()), alias);
                converted
            }
            ResolvedType::Simple(DataType::Record) => {
                let map = object_for_record(value)?;
                if let Value::Map(m) = &map {
                    let inferred = RecordType::infer(&m.read());
                    self.set_pending(Layout::Record(inferred), alias);
                }
                map
            }
            ResolvedType::SortedMap => {
                let Value::Map(m) = object_for_record(value)? else {
                    return Err(RuntimeError::conversion("Cannot cast value to sorted map"));
                };
                let mut sorted = MapData::sorted();
                for (k, v) in m.read().iter() {
                    sorted.insert(k.clone(), v.clone());
                }
                Value::map(sorted)
            }
            ResolvedType::Array(elem) => match DataType::Array
                .convert(value.clone())
                .map_err(|e| cannot_cast(&value, DataType::Array, e))?
            {
                Value::Array(a) => super::arrays::retype_array("cast", a, elem)?,
                Value::Null => Value::Null,
                other => {
                    return Err(cannot_cast(&other, DataType::Array, "not an array"));
                }
            },
            other => {
                let dt = other.data_type();
                let converted = dt.convert(value.clone()).map_err(|e| cannot_cast(&value, dt, e))?;
                if !dt.is_data_type(&converted) {
                    return Err(cannot_cast(&value, dt, format!("found {}", value.type_name())));
                }
                converted
            }
        };
        debug!(ty = %target, "cast");
        Ok(result)
    }

    fn set_pending(&mut self, layout: Layout, alias: Option<String>) {
        self.ctx.pending_meta = Some(TypeMeta { layout, alias });
    }
}

fn cannot_cast(value: &Value, dt: DataType, reason: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::conversion(format!("Cannot cast value '{value}' to type {dt}: {reason}"))
}

/// Only JSON objects (maps, or strings holding one) become records
fn object_for_record(value: Value) -> InterpResult<Value> {
    let value = match value {
        Value::Str(_) => DataType::Map.convert(value)?,
        other => other,
    };
    match value {
        Value::Map(_) => Ok(value),
        Value::Array(_) => Err(RuntimeError::conversion(
            "Cannot cast JSON array to record. Only JSON objects can be cast to record type.",
        )),
        other => Err(RuntimeError::conversion(format!(
            "Cannot cast {} to record. Only JSON objects can be cast to record type.",
            other.type_name()
        ))),
    }
}

/// Type description of a value with optional binding layout
pub(crate) fn describe(value: &Value, meta: Option<&TypeMeta>) -> String {
    match (value, meta.map(|m| &m.layout)) {
        (Value::Array(a), layout) => {
            let a = a.read();
            let size = if a.is_fixed() {
                a.len().to_string()
            } else {
                String::new()
            };
            match layout {
                Some(Layout::Record(rt)) => {
                    let body = rt.to_string();
                    let body = body.strip_prefix("record ").unwrap_or(&body);
                    format!("array.record[{size}] {body}")
                }
                _ => format!("array.{}[{size}]", a.elem_type().type_name()),
            }
        }
        (_, Some(Layout::Record(rt))) => rt.to_string(),
        (_, Some(Layout::Bitmap(bt))) => match meta.and_then(|m| m.alias.as_ref()) {
            Some(alias) => format!("bitmap {alias}"),
            None => bt.to_string(),
        },
        (_, Some(Layout::Intmap(it))) => match meta.and_then(|m| m.alias.as_ref()) {
            Some(alias) => format!("intmap {alias}"),
            None => it.to_string(),
        },
        (Value::Map(m), None) => {
            let fields = m
                .read()
                .iter()
                .map(|(k, v)| format!("{k}:{}", field_type_name(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("record {{{fields}}}")
        }
        (Value::Queue(q), None) => format!("queue.{}", q.read().elem_type().type_name()),
        (other, None) => other.type_name().to_string(),
    }
}

fn field_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "any",
        Value::Map(_) => "record",
        Value::Array(_) => "array",
        other => other.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::interp::{CaptureOutput, ErrorKind};
    use crate::types::BitmapType;

    fn output(stmts: Vec<Spanned<crate::ast::Stmt>>) -> Vec<String> {
        let out = CaptureOutput::new();
        let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
        interp.run(&program(stmts)).unwrap();
        out.lines()
    }

    fn failure(stmts: Vec<Spanned<crate::ast::Stmt>>) -> RuntimeError {
        let mut interp = Interpreter::new().with_output(Box::new(CaptureOutput::new()));
        interp.run(&program(stmts)).unwrap_err()
    }

    // ====================================================================
    // typeof
    // ====================================================================

    #[test]
    fn test_typeof_scalars() {
        let lines = output(vec![
            print(type_of(int(1))),
            print(type_of(string("s"))),
            print(type_of(null())),
            print(type_of(string("2024-01-02"))),
            print(type_of(queue(ty(DataType::Int)))),
        ]);
        assert_eq!(lines, vec!["int", "string", "null", "date", "queue.int"]);
    }

    #[test]
    fn test_typeof_arrays() {
        let lines = output(vec![
            let_("f", array_init(ty(DataType::Int), vec![Some(int(3))])),
            let_("d", array(vec![string("a")])),
            print(type_of(var("f"))),
            print(type_of(var("d"))),
        ]);
        assert_eq!(lines, vec!["array.int[3]", "array.string[]"]);
    }

    #[test]
    fn test_typeof_cast_record() {
        let lines = output(vec![
            let_("x", cast(ty(DataType::Record), map(vec![("a", int(1)), ("b", string("s"))]))),
            print(type_of(var("x"))),
            let_("raw", map(vec![("a", int(1)), ("n", null())])),
            print(type_of(var("raw"))),
        ]);
        assert_eq!(lines, vec!["record {a:int, b:string}", "record {a:int, n:any}"]);
    }

    #[test]
    fn test_typeof_array_of_records() {
        let row = record_ty(vec![("a", ty(DataType::Int))]);
        let lines = output(vec![
            let_("rows", array_init(row, vec![Some(int(2))])),
            print(type_of(var("rows"))),
        ]);
        assert_eq!(lines, vec!["array.record[2] {a:int}"]);
    }

    #[test]
    fn test_typeof_aliased_bitmap() {
        let lines = output(vec![
            typedef("flags", TypeRef::Bitmap(bits(vec![("on", 0, 0)]))),
            var_decl("f", Some(TypeRef::Alias("Flags".into())), Some(int(1))),
            print(type_of(var("f"))),
        ]);
        assert_eq!(lines, vec!["bitmap flags"]);
        let mut bt = BitmapType::new();
        bt.add_field("on", 0, 0).unwrap();
        let meta = TypeMeta::new(Layout::Bitmap(bt));
        assert_eq!(describe(&Value::Byte(1), Some(&meta)), "bitmap {on: 0}");
    }

    // ====================================================================
    // cast
    // ====================================================================

    #[test]
    fn test_cast_errors() {
        let err = failure(vec![let_("x", cast(ty(DataType::Record), array(vec![int(1)])))]);
        assert_eq!(
            err.message,
            "Cannot cast JSON array to record. Only JSON objects can be cast to record type."
        );
        let err = failure(vec![let_("x", cast(ty(DataType::Record), int(1)))]);
        assert_eq!(
            err.message,
            "Cannot cast int to record. Only JSON objects can be cast to record type."
        );
        let err = failure(vec![let_("x", cast(ty(DataType::Int), string("abc")))]);
        assert_eq!(err.kind, ErrorKind::ConversionFailure);
        assert!(err.message.starts_with("Cannot cast value 'abc' to type INTEGER: "));
    }

    #[test]
    fn test_cast_json_string_to_record() {
        let lines = output(vec![
            let_("x", cast(ty(DataType::Record), string("{\"id\": 7}"))),
            print(type_of(var("x"))),
            print(var("x.id")),
        ]);
        assert_eq!(lines, vec!["record {id:int}", "7"]);
    }

    #[test]
    fn test_pending_meta_consumed_once() {
        let lines = output(vec![
            let_("b", cast(TypeRef::Bitmap(bits(vec![("lo", 0, 3)])), int(5))),
            let_("plain", int(5)),
            print(type_of(var("b"))),
            print(type_of(var("plain"))),
            print(var("b.lo")),
        ]);
        assert_eq!(lines, vec!["bitmap {lo: 0-3}", "int", "5"]);
    }

    #[test]
    fn test_cast_layout_does_not_outlive_statement() {
        let lines = output(vec![
            print(cast(TypeRef::Bitmap(bits(vec![("lo", 0, 3)])), int(5))),
            let_("y", int(5)),
            print(type_of(var("y"))),
            set("y", int(6)),
            print(var("y")),
        ]);
        assert_eq!(lines, vec!["5", "int", "6"]);
    }
}
