//! Assignment to variables, record fields, packed fields and screen slots

use tracing::{debug, trace};

use super::expr::{packed_raw, property_of};
use super::{fold, InterpResult, Interpreter, Layout, RuntimeError, Value};
use crate::ast::{Expr, Spanned};
use crate::types::{FieldType, RecordType};

impl Interpreter {
    /// `name = value` where `name` may be dotted
    pub(crate) fn assign_name(&mut self, name: &str, value_expr: &Spanned<Expr>) -> InterpResult<()> {
        let lower = fold(name);

        // an array literal fills an existing array in place
        if let Expr::ArrayLiteral(elems) = &value_expr.node {
            if let Some(binding) = self.ctx.env.lookup(&lower) {
                if let Value::Array(target) = binding.value.clone() {
                    if binding.is_const {
                        return Err(RuntimeError::constant_reassign(&lower));
                    }
                    let record = match binding.meta.as_ref().map(|m| &m.layout) {
                        Some(Layout::Record(rt)) => Some(rt.clone()),
                        _ => None,
                    };
                    self.ctx.pending_meta = None;
                    self.assign_literal(&target, elems)?;
                    if let Some(rt) = record {
                        conform_record(&rt, Value::Array(target), &lower)?;
                    }
                    return Ok(());
                }
            }
        }

        let value = self.eval(value_expr)?;
        if !self.ctx.env.contains(&lower) {
            if let Some((root, rest)) = name.split_once('.') {
                return self.assign_path(&fold(root), rest, value);
            }
        }

        if let Some(meta) = self.ctx.pending_meta.take() {
            self.ctx.env.assign(&lower, value)?;
            self.ctx.env.set_meta(&lower, Some(meta));
            return Ok(());
        }
        let value = match self.ctx.env.meta(&lower).map(|m| m.layout.clone()) {
            Some(Layout::Record(rt)) => conform_record(&rt, value, &lower)?,
            Some(Layout::Bitmap(_)) => crate::types::DataType::Bitmap.convert(value)?,
            Some(Layout::Intmap(_)) => crate::types::DataType::Intmap.convert(value)?,
            None => value,
        };
        trace!(var = %lower, value = %value, "assign");
        self.ctx.env.assign(&lower, value)
    }

    /// `root.rest = value` for a screen slot, a packed field or a record path
    fn assign_path(&mut self, root: &str, rest: &str, value: Value) -> InterpResult<()> {
        if self.ctx.screens.has_screen(root) {
            debug!(screen = root, var = rest, "screen write");
            let written = self.ctx.screens.write(root, rest, value)?;
            if !written {
                return Err(RuntimeError::unknown(format!(
                    "Screen '{root}' does not have a variable named '{rest}'."
                )));
            }
            return Ok(());
        }
        let Some(binding) = self.ctx.env.lookup(root).cloned() else {
            return Err(RuntimeError::undefined_variable(root));
        };

        if !rest.contains('.') {
            let packed = match binding.meta.as_ref().map(|m| &m.layout) {
                Some(Layout::Bitmap(bt)) => {
                    let raw = bt.set_field(packed_raw(&binding.value), rest, field_int(&value)?)?;
                    Some(Value::Byte(raw as u8 as i8))
                }
                Some(Layout::Intmap(it)) => {
                    let raw = it.set_field(packed_raw(&binding.value), rest, field_int(&value)?)?;
                    Some(Value::Int(raw as i32))
                }
                _ => None,
            };
            if let Some(packed) = packed {
                return self.ctx.env.assign(root, packed);
            }
        }

        let parts: Vec<&str> = rest.split('.').collect();
        let (last, walk) = match parts.split_last() {
            Some(split) => split,
            None => return Err(RuntimeError::invalid("Invalid assignment target.")),
        };
        let mut container = binding.value.clone();
        let mut schema = binding.meta.as_ref().and_then(|m| m.record()).cloned();
        for part in walk {
            container = property_of(&container, part)?;
            schema = schema.and_then(|rt| match rt.field(part).map(|f| &f.ty) {
                Some(FieldType::Record(nested)) => Some(nested.clone()),
                _ => None,
            });
        }
        let Value::Map(map) = container else {
            return Err(RuntimeError::type_mismatch(format!(
                "Cannot assign to field '{last}' of non-record variable '{root}'"
            )));
        };
        let (key, value) = match &schema {
            Some(rt) => {
                let field = rt.field(last).ok_or_else(|| {
                    RuntimeError::structural(format!(
                        "Record '{root}' does not have a field named '{last}'"
                    ))
                })?;
                let value = match &field.ty {
                    FieldType::Simple(dt) => dt.convert(value)?,
                    FieldType::Record(nested) => conform_record(nested, value, last)?,
                };
                (field.name.clone(), value)
            }
            None => {
                let key = map.read().key_ci(last).unwrap_or(last).to_string();
                (key, value)
            }
        };
        trace!(root, field = %key, "field assign");
        map.write().insert(key, value);
        Ok(())
    }

    /// `expr.field = value` where `expr` is not a plain variable path
    pub(crate) fn assign_property_of(
        &mut self,
        object: &Spanned<Expr>,
        name: &str,
        value: Value,
    ) -> InterpResult<()> {
        match self.eval(object)? {
            Value::Map(map) => {
                let key = map.read().key_ci(name).unwrap_or(name).to_string();
                map.write().insert(key, value);
                Ok(())
            }
            Value::Null => Err(RuntimeError::null_access(format!(
                "Cannot access property '{name}' of null"
            ))),
            other => Err(RuntimeError::type_mismatch(format!(
                "Cannot assign to field '{name}' of {}",
                other.type_name()
            ))),
        }
    }
}

fn field_int(value: &Value) -> InterpResult<i64> {
    value.as_i64().ok_or_else(|| {
        RuntimeError::type_mismatch(format!("Bit field value must be a number, but is = {value}"))
    })
}

/// Convert and validate a value (or each element of an array) against a record layout
pub(crate) fn conform_record(rt: &RecordType, value: Value, name: &str) -> InterpResult<Value> {
    match value {
        Value::Null => Ok(value),
        Value::Array(items) => {
            let len = items.read().len();
            for i in 0..len {
                let item = items.read().get(i)?;
                if item.is_null() {
                    continue;
                }
                let converted = rt
                    .convert_value(&item)
                    .and_then(|v| rt.validate_value(&v).map(|_| v))
                    .map_err(|e| {
                        RuntimeError::structural(format!(
                            "Array element {i} does not match record structure for '{name}': {e}"
                        ))
                    })?;
                items.write().set(i, converted)?;
            }
            Ok(Value::Array(items))
        }
        other => rt
            .convert_value(&other)
            .and_then(|v| rt.validate_value(&v).map(|_| v))
            .map_err(|e| {
                RuntimeError::structural(format!(
                    "Value does not match record structure for '{name}': {e}"
                ))
            }),
    }
}
