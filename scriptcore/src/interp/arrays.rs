//! Array literals, array creation, indexing and element assignment

use tracing::trace;

use super::props::conform_record;
use super::{fold, shared, InterpResult, Interpreter, ResolvedType, RuntimeError, Shared, Value};
use crate::arrays::{ArrayDef, ArrayFixed};
use crate::ast::{Expr, Spanned, TypeRef};
use crate::types::DataType;

impl Interpreter {
    /// `{a, b, c}` outside an assignment: a dynamic array whose element
    /// type is inferred from the values
    pub(crate) fn eval_array_literal(&mut self, elems: &[Spanned<Expr>]) -> InterpResult<Value> {
        let values = elems
            .iter()
            .map(|e| self.eval(e))
            .collect::<InterpResult<Vec<_>>>()?;
        let mut def = ArrayDef::dynamic(infer_elem(&values), 0);
        for v in values {
            def.add(v)?;
        }
        Ok(Value::array(def))
    }

    /// `int[3, *]`: one size per dimension, `None` for a dynamic level
    pub(crate) fn eval_array_init(
        &mut self,
        elem: &TypeRef,
        dims: &[Option<Spanned<Expr>>],
        init: Option<&[Spanned<Expr>]>,
    ) -> InterpResult<Value> {
        let resolved = self.ctx.typedefs.resolve(elem)?;
        let mut sizes = Vec::with_capacity(dims.len().max(1));
        for (k, dim) in dims.iter().enumerate() {
            let size = match dim {
                None => None,
                Some(expr) => {
                    let v = self.eval(expr)?;
                    let n = v.as_i64().filter(|_| v.is_number()).ok_or_else(|| {
                        RuntimeError::type_mismatch(format!(
                            "Array size at dimension {k} must be a number."
                        ))
                    })?;
                    if n < 0 {
                        return Err(RuntimeError::invalid(format!(
                            "Array size at dimension {k} must be non-negative."
                        )));
                    }
                    Some(n as usize)
                }
            };
            sizes.push(size);
        }
        if sizes.is_empty() {
            sizes.push(None);
        }
        let array = shared(build_dims(resolved.ty.data_type(), &sizes)?);
        if let Some(init) = init {
            self.assign_literal(&array, init)?;
        }
        if let Some(meta) = resolved.meta().filter(|m| m.record().is_some()) {
            self.ctx.pending_meta = Some(meta);
        }
        Ok(Value::Array(array))
    }

    /// Fill `target` from a literal element by element. Nested literals
    /// descend into (or create) child arrays.
    pub(crate) fn assign_literal(
        &mut self,
        target: &Shared<ArrayDef>,
        elems: &[Spanned<Expr>],
    ) -> InterpResult<()> {
        let (fixed, len) = {
            let a = target.read();
            (a.is_fixed(), a.len())
        };
        if elems.len() > len {
            if fixed {
                return Err(RuntimeError::capacity(format!(
                    "Array literal length ({}) exceeds fixed array length ({len}).",
                    elems.len()
                )));
            }
            target.write().expand(elems.len())?;
        }
        for (i, elem) in elems.iter().enumerate() {
            if let Expr::ArrayLiteral(children) = &elem.node {
                if matches!(*target.read(), ArrayDef::FixedByte(_)) {
                    return Err(RuntimeError::invalid(format!(
                        "Cannot assign a nested array literal into byte array element at index {i}."
                    )));
                }
                let existing = target.read().get(i)?;
                let child = match existing {
                    Value::Array(child) => child,
                    _ => {
                        let child = shared(target.read().child(children.len()));
                        target.write().set(i, Value::Array(child.clone()))?;
                        child
                    }
                };
                let (child_fixed, child_len) = {
                    let c = child.read();
                    (c.is_fixed(), c.len())
                };
                if child_fixed && children.len() > child_len {
                    return Err(RuntimeError::capacity(format!(
                        "Nested array literal length ({}) exceeds fixed child length ({child_len}) at index {i}.",
                        children.len()
                    )));
                }
                self.assign_literal(&child, children)?;
            } else {
                let value = self.eval(elem)?;
                target.write().set(i, value)?;
            }
        }
        trace!(elements = elems.len(), "array literal assigned");
        Ok(())
    }

    /// `a[i][j]`, also `map["key"]` and `str[i]`
    pub(crate) fn eval_index(
        &mut self,
        target: &Spanned<Expr>,
        indices: &[Spanned<Expr>],
    ) -> InterpResult<Value> {
        let mut current = self.eval(target)?;
        for idx_expr in indices {
            let idx = self.eval(idx_expr)?;
            current = index_into(current, &idx)?;
        }
        Ok(current)
    }

    /// `a[i][j] = value`
    pub(crate) fn assign_index(
        &mut self,
        target: &Spanned<Expr>,
        indices: &[Spanned<Expr>],
        value_expr: &Spanned<Expr>,
    ) -> InterpResult<()> {
        let Some((last, walk)) = indices.split_last() else {
            return Err(RuntimeError::invalid("Invalid assignment target."));
        };
        let mut container = self.eval(target)?;
        for idx_expr in walk {
            let idx = self.eval(idx_expr)?;
            container = index_into(container, &idx)?;
        }
        let idx = self.eval(last)?;
        match container {
            Value::Array(array) => {
                let i = array_index(&idx)?;
                if let Expr::ArrayLiteral(elems) = &value_expr.node {
                    let existing = array.read().get(i).ok();
                    if let Some(Value::Array(child)) = existing {
                        return self.assign_literal(&child, elems);
                    }
                }
                let mut value = self.eval(value_expr)?;
                // elements of an array-of-records binding are checked against its layout
                if let (Expr::Var(name), true) = (&target.node, walk.is_empty()) {
                    let lower = fold(name);
                    if let Some(rt) = self.ctx.env.meta(&lower).and_then(|m| m.record()).cloned() {
                        value = conform_record(&rt, value, &lower)?;
                    }
                }
                array.write().set(i, value)?;
                Ok(())
            }
            Value::Map(map) => {
                let value = self.eval(value_expr)?;
                let key = idx.to_string();
                let key = map.read().key_ci(&key).unwrap_or(&key).to_string();
                map.write().insert(key, value);
                Ok(())
            }
            Value::Null => Err(RuntimeError::null_access("Cannot index into null")),
            other => Err(RuntimeError::type_mismatch(format!(
                "Cannot index into {}",
                other.type_name()
            ))),
        }
    }
}

/// One indexing step
fn index_into(container: Value, idx: &Value) -> InterpResult<Value> {
    match container {
        Value::Array(array) => {
            let i = array_index(idx)?;
            let item = array.read().get(i)?;
            Ok(item)
        }
        Value::Map(map) => Ok(map.read().get_ci(&idx.to_string()).cloned().unwrap_or(Value::Null)),
        Value::Str(s) => {
            let i = array_index(idx)?;
            let size = s.chars().count();
            s.chars()
                .nth(i)
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| {
                    RuntimeError::index_out_of_bounds(format!(
                        "Index out of bounds: {i} (size {size})."
                    ))
                })
        }
        Value::Null => Err(RuntimeError::null_access("Cannot index into null")),
        other => Err(RuntimeError::type_mismatch(format!(
            "Cannot index into {}",
            other.type_name()
        ))),
    }
}

fn array_index(idx: &Value) -> InterpResult<usize> {
    let n = idx
        .as_i64()
        .filter(|_| idx.is_number())
        .ok_or_else(|| RuntimeError::type_mismatch(format!("Index {idx} must be a number.")))?;
    usize::try_from(n)
        .map_err(|_| RuntimeError::index_out_of_bounds(format!("Index {n} must be non-negative.")))
}

/// Element type of a literal: the common type of its non-null values,
/// int widening to long and float to double; anything mixed is `any`
fn infer_elem(values: &[Value]) -> DataType {
    let mut found: Option<DataType> = None;
    for v in values.iter().filter(|v| !v.is_null()) {
        let t = match v {
            Value::Array(a) => a.read().elem_type(),
            other => other.data_type(),
        };
        found = Some(match found {
            None => t,
            Some(prev) if prev == t => t,
            Some(DataType::Int | DataType::Long) if matches!(t, DataType::Int | DataType::Long) => {
                DataType::Long
            }
            Some(DataType::Float | DataType::Double)
                if matches!(t, DataType::Float | DataType::Double) =>
            {
                DataType::Double
            }
            Some(_) => return DataType::Any,
        });
    }
    found.unwrap_or(DataType::Any)
}

/// Nested arrays for a dimension list; inner levels are created eagerly
/// under fixed levels
fn build_dims(elem: DataType, sizes: &[Option<usize>]) -> InterpResult<ArrayDef> {
    let nested = sizes.len() > 1;
    let mut def = match sizes.first().copied().flatten() {
        // byte storage cannot hold child arrays
        Some(n) if nested => ArrayDef::Fixed(ArrayFixed::new(elem, n)),
        Some(n) => ArrayDef::fixed(elem, n),
        None => ArrayDef::dynamic(elem, 0),
    };
    if nested {
        for i in 0..def.len() {
            let child = build_dims(elem, &sizes[1..])?;
            def.set(i, Value::array(child))?;
        }
    }
    Ok(def)
}

/// Re-type an array for a declaration with a different element type.
/// Arrays already of the declared element type are kept (and aliased).
pub(crate) fn retype_array(
    name: &str,
    array: Shared<ArrayDef>,
    elem: &ResolvedType,
) -> InterpResult<Value> {
    let target = match elem {
        ResolvedType::Record(rt) => return conform_record(rt, Value::Array(array), name),
        ResolvedType::Array(_) => ResolvedType::Array(Box::new(elem.clone())).elem_type(),
        other => other.data_type(),
    };
    let (current, fixed, len) = {
        let a = array.read();
        (a.elem_type(), a.is_fixed(), a.len())
    };
    if current == target || target == DataType::Any {
        return Ok(Value::Array(array));
    }
    let mut out = if fixed {
        ArrayDef::fixed(target, len)
    } else {
        ArrayDef::dynamic(target, len)
    };
    for i in 0..len {
        let item = array.read().get(i)?;
        let item = match (item, elem) {
            (Value::Array(child), ResolvedType::Array(inner)) => retype_array(name, child, inner)?,
            (other, _) => other,
        };
        out.set(i, item).map_err(|e| {
            RuntimeError::type_mismatch(format!(
                "Type mismatch: expected {target} for variable '{name}' at index {i}: {e}"
            ))
        })?;
    }
    Ok(Value::array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::interp::{CaptureOutput, ErrorKind};
    use pretty_assertions::assert_eq;

    fn run(stmts: Vec<Spanned<crate::ast::Stmt>>) -> InterpResult<(Interpreter, CaptureOutput)> {
        let out = CaptureOutput::new();
        let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
        interp.run(&program(stmts))?;
        Ok((interp, out))
    }

    // ====================================================================
    // Literals and creation
    // ====================================================================

    #[test]
    fn test_literal_element_inference() {
        assert_eq!(infer_elem(&[Value::Int(1), Value::Null]), DataType::Int);
        assert_eq!(infer_elem(&[Value::Int(1), Value::Long(2)]), DataType::Long);
        assert_eq!(infer_elem(&[Value::Float(1.0), Value::Double(2.0)]), DataType::Double);
        assert_eq!(infer_elem(&[Value::Int(1), Value::from("a")]), DataType::Any);
        assert_eq!(infer_elem(&[]), DataType::Any);
    }

    #[test]
    fn test_multi_dimensional_init() {
        let (interp, _) = run(vec![let_(
            "grid",
            array_init(ty(DataType::Int), vec![Some(int(2)), Some(int(3))]),
        )])
        .unwrap();
        let Some(Value::Array(grid)) = interp.get_var("grid") else {
            panic!("expected array");
        };
        assert_eq!(grid.read().len(), 2);
        let Ok(Value::Array(row)) = grid.read().get(1) else {
            panic!("expected nested row");
        };
        assert!(row.read().is_fixed());
        assert_eq!(row.read().len(), 3);
    }

    #[test]
    fn test_negative_dimension() {
        let err = run(vec![let_("a", array_init(ty(DataType::Int), vec![Some(int(-1))]))])
            .err()
            .unwrap();
        assert_eq!(err.message, "Array size at dimension 0 must be non-negative.");
    }

    // ====================================================================
    // Literal assignment
    // ====================================================================

    #[test]
    fn test_fixed_literal_overflow() {
        let err = run(vec![
            let_("a", array_init(ty(DataType::Int), vec![Some(int(2))])),
            set("a", array(vec![int(1), int(2), int(3)])),
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind, ErrorKind::CapacityOverflow);
        assert_eq!(err.message, "Array literal length (3) exceeds fixed array length (2).");
    }

    #[test]
    fn test_dynamic_literal_expands_and_converts() {
        let (interp, _) = run(vec![
            let_("a", array_init(ty(DataType::Double), vec![None])),
            set("a", array(vec![int(1), string("2.5")])),
        ])
        .unwrap();
        let Some(Value::Array(a)) = interp.get_var("a") else {
            panic!("expected array");
        };
        assert_eq!(a.read().to_vec(), vec![Value::Double(1.0), Value::Double(2.5)]);
    }

    #[test]
    fn test_nested_literal_creates_children() {
        let (interp, out) = run(vec![
            let_("m", array_init(ty(DataType::Int), vec![None])),
            set("m", array(vec![array(vec![int(1), int(2)]), array(vec![int(3)])])),
            print(index(var("m"), vec![int(0), int(1)])),
            print(index(var("m"), vec![int(1), int(0)])),
        ])
        .unwrap();
        assert_eq!(out.lines(), vec!["2", "3"]);
        assert!(interp.get_var("m").is_some());
    }

    #[test]
    fn test_nested_literal_into_byte_array() {
        let err = run(vec![
            let_("b", array_init(ty(DataType::Byte), vec![Some(int(2))])),
            set("b", array(vec![int(1), array(vec![int(2)])])),
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
        assert_eq!(
            err.message,
            "Cannot assign a nested array literal into byte array element at index 1."
        );
    }

    // ====================================================================
    // Indexing
    // ====================================================================

    #[test]
    fn test_index_errors() {
        let err = run(vec![let_("a", array(vec![int(1)])), print(index(var("a"), vec![int(5)]))])
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        assert_eq!(err.message, "Index out of bounds: 5 (size 1).");

        let err = run(vec![let_("a", array(vec![int(1)])), print(index(var("a"), vec![string("x")]))])
            .err()
            .unwrap();
        assert_eq!(err.message, "Index x must be a number.");

        let err = run(vec![let_("n", int(1)), print(index(var("n"), vec![int(0)]))])
            .err()
            .unwrap();
        assert_eq!(err.message, "Cannot index into int");
    }

    #[test]
    fn test_index_assignment_appends_to_dynamic() {
        let (_, out) = run(vec![
            let_("a", array(vec![int(1)])),
            assign(index(var("a"), vec![int(1)]), int(2)),
            print(var("a")),
        ])
        .unwrap();
        assert_eq!(out.lines(), vec!["[1, 2]"]);
    }

    #[test]
    fn test_declared_array_retypes_literal() {
        let (interp, _) = run(vec![var_decl(
            "d",
            Some(TypeRef::Array(Box::new(ty(DataType::Double)))),
            Some(array(vec![int(1), int(2)])),
        )])
        .unwrap();
        let Some(Value::Array(d)) = interp.get_var("d") else {
            panic!("expected array");
        };
        assert_eq!(d.read().elem_type(), DataType::Double);
        assert_eq!(d.read().get(1).unwrap(), Value::Double(2.0));
    }
}
