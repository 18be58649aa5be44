//! Expression evaluation and name resolution

use tracing::trace;

use super::eval::property_path;
use super::ops::{binary_op, unary_op};
use super::{
    fold, literal_value, InterpResult, Interpreter, Layout, MapData, RuntimeError, Value,
    STACK_GROW_SIZE, STACK_RED_ZONE,
};
use crate::arrays::QueueDef;
use crate::ast::{Expr, Spanned};

impl Interpreter {
    pub(crate) fn eval(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        let line = expr.line;
        let result = match &expr.node {
            Expr::Literal(lit) => Ok(literal_value(lit)),
            Expr::Var(name) => self.read_name(name),
            Expr::Binary { left, op, right } => {
                // both operands are always evaluated, `and` / `or` included
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                binary_op(*op, l, r)
            }
            Expr::Unary { op, expr } => {
                let v = self.eval(expr)?;
                unary_op(*op, v)
            }
            Expr::TypeOf(inner) => self.eval_typeof(inner).map(Value::Str),
            Expr::Chain { operands, ops } => self.eval_chain(operands, ops),
            Expr::Call { name, args } => self.eval_call(name, args, line),
            Expr::Index { target, indices } => self.eval_index(target, indices),
            Expr::Property { object, name } => match property_path(expr) {
                Some(path) => self.read_name(&path),
                None => {
                    let obj = self.eval(object)?;
                    property_of(&obj, name)
                }
            },
            Expr::ArrayLiteral(elems) => self.eval_array_literal(elems),
            Expr::ArrayInit { elem, dims, init } => {
                self.eval_array_init(elem, dims, init.as_deref())
            }
            Expr::QueueInit { elem } => {
                let resolved = self.ctx.typedefs.resolve(elem)?;
                Ok(Value::queue(QueueDef::new(resolved.ty.data_type())))
            }
            Expr::MapLiteral(entries) => {
                let mut map = MapData::new();
                for (key, value) in entries {
                    let v = self.eval(value)?;
                    map.insert(key.clone(), v);
                }
                Ok(Value::map(map))
            }
            Expr::Cast { target, value } => self.eval_cast(target, value),
            Expr::Length(inner) => match self.eval(inner)? {
                Value::Array(a) => Ok(Value::Int(a.read().len() as i32)),
                Value::Queue(q) => Ok(Value::Int(q.read().size() as i32)),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i32)),
                _ => Err(RuntimeError::type_mismatch(
                    "'.length' or '.size' can only be used on arrays and strings.",
                )),
            },
            Expr::CursorHasNext(target) => self.cursor_has_next(target, line),
            Expr::CursorNext(target) => self.cursor_next(target, line),
            Expr::Select { sql } => self.eval_select(sql, line),
        };
        result.map_err(|e| e.at_line(line))
    }

    /// Resolve a possibly dotted name.
    ///
    /// The full name wins; otherwise `screen.var` reads a screen slot and
    /// `var.field` walks record fields or extracts a bitmap / intmap field.
    pub(crate) fn read_name(&self, name: &str) -> InterpResult<Value> {
        let lower = fold(name);
        if let Some(binding) = self.ctx.env.lookup(&lower) {
            return Ok(binding.value.clone());
        }
        let Some((root, rest)) = lower.split_once('.') else {
            return Err(RuntimeError::undefined_variable(name));
        };
        if self.ctx.screens.has_screen(root) {
            trace!(screen = root, var = rest, "screen read");
            return self.ctx.screens.read(root, rest).ok_or_else(|| {
                RuntimeError::unknown(format!(
                    "Screen '{root}' does not have a variable named '{rest}'."
                ))
            });
        }
        let Some(binding) = self.ctx.env.lookup(root) else {
            return Err(RuntimeError::undefined_variable(name));
        };
        if !rest.contains('.') {
            match binding.meta.as_ref().map(|m| &m.layout) {
                Some(Layout::Bitmap(bt)) => {
                    let raw = packed_raw(&binding.value);
                    return Ok(Value::Int(bt.get_field(raw, rest)? as i32));
                }
                Some(Layout::Intmap(it)) => {
                    let raw = packed_raw(&binding.value);
                    let field = it.get_field(raw, rest)?;
                    return Ok(match i32::try_from(field) {
                        Ok(n) => Value::Int(n),
                        Err(_) => Value::Long(field as i64),
                    });
                }
                _ => {}
            }
        }
        let mut current = binding.value.clone();
        for part in rest.split('.') {
            current = property_of(&current, part)?;
        }
        Ok(current)
    }
}

/// Raw bits of a bitmap (unsigned byte) or intmap value
pub(crate) fn packed_raw(value: &Value) -> u32 {
    match value {
        Value::Byte(b) => *b as u8 as u32,
        Value::Int(n) => *n as u32,
        other => other.as_i64().unwrap_or(0) as u32,
    }
}

/// Field of a record / map value
pub(crate) fn property_of(value: &Value, name: &str) -> InterpResult<Value> {
    match value {
        Value::Map(m) => m.read().get_ci(name).cloned().ok_or_else(|| {
            RuntimeError::unknown(format!("Property '{name}' does not exist in record"))
        }),
        Value::Null => Err(RuntimeError::null_access(format!(
            "Cannot access property '{name}' of null"
        ))),
        other => Err(RuntimeError::type_mismatch(format!(
            "Cannot access property '{name}' of {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{BinOp, UnOp};
    use crate::interp::{Binding, ErrorKind, TypeMeta};
    use crate::types::BitmapType;

    fn eval(interp: &mut Interpreter, expr: Spanned<Expr>) -> InterpResult<Value> {
        interp.eval_expr(&expr)
    }

    // ====================================================================
    // Names
    // ====================================================================

    #[test]
    fn test_names_are_case_insensitive() {
        let mut interp = Interpreter::new();
        interp
            .ctx
            .env
            .define("total".into(), Binding::new(Value::Int(3)));
        assert_eq!(eval(&mut interp, var("TOTAL")).unwrap(), Value::Int(3));
        let err = eval(&mut interp, var("missing")).unwrap_err();
        assert_eq!(err.message, "Undefined variable 'missing'.");
        assert_eq!(err.kind, ErrorKind::UnknownBinding);
    }

    #[test]
    fn test_record_field_paths() {
        let mut interp = Interpreter::new();
        let rec = eval(
            &mut interp,
            map(vec![("name", string("ann")), ("addr", map(vec![("city", string("Oslo"))]))]),
        )
        .unwrap();
        interp.ctx.env.define("p".into(), Binding::new(rec));
        assert_eq!(eval(&mut interp, var("p.NAME")).unwrap(), Value::from("ann"));
        assert_eq!(
            eval(&mut interp, prop(prop(var("p"), "addr"), "city")).unwrap(),
            Value::from("Oslo")
        );
        let err = eval(&mut interp, var("p.age")).unwrap_err();
        assert_eq!(err.message, "Property 'age' does not exist in record");
    }

    #[test]
    fn test_bitmap_field_read() {
        let mut interp = Interpreter::new();
        let mut bt = BitmapType::new();
        bt.add_field("on", 0, 0).unwrap();
        bt.add_field("mode", 1, 3).unwrap();
        interp.ctx.env.define(
            "flags".into(),
            Binding {
                value: Value::Byte(0b1011),
                is_const: false,
                meta: Some(TypeMeta::new(Layout::Bitmap(bt))),
            },
        );
        assert_eq!(eval(&mut interp, var("flags.on")).unwrap(), Value::Int(1));
        assert_eq!(eval(&mut interp, var("flags.mode")).unwrap(), Value::Int(5));
    }

    // ====================================================================
    // Misc expressions
    // ====================================================================

    #[test]
    fn test_length() {
        let mut interp = Interpreter::new();
        assert_eq!(eval(&mut interp, length(string("héllo"))).unwrap(), Value::Int(5));
        assert_eq!(
            eval(&mut interp, length(array(vec![int(1), int(2)]))).unwrap(),
            Value::Int(2)
        );
        let err = eval(&mut interp, length(int(4))).unwrap_err();
        assert_eq!(err.message, "'.length' or '.size' can only be used on arrays and strings.");
    }

    #[test]
    fn test_chain_short_circuits() {
        let mut interp = Interpreter::new();
        let ok = chain(vec![int(1), int(2), int(3)], vec![BinOp::Lt, BinOp::Le]);
        assert_eq!(eval(&mut interp, ok).unwrap(), Value::Bool(true));
        // the failing link stops before the undefined variable
        let stops = chain(vec![int(3), int(2), var("nope")], vec![BinOp::Lt, BinOp::Lt]);
        assert_eq!(eval(&mut interp, stops).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_error_carries_expression_line() {
        let mut interp = Interpreter::new();
        let expr = at(7, unary(UnOp::Not, int(1)));
        let err = eval(&mut interp, expr).unwrap_err();
        assert_eq!(err.line, Some(7));
    }
}
