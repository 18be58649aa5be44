//! Calls to builtins and declared script functions

use tracing::debug;

use super::{
    fold, Binding, FrameKind, Flow, InterpResult, Interpreter, ResolvedType, RuntimeError, Value,
    STACK_GROW_SIZE, STACK_RED_ZONE,
};
use crate::ast::{Arg, FnDef, Param};
use crate::types::DataType;

impl Interpreter {
    /// Builtins shadow script functions of the same name
    pub(crate) fn eval_call(&mut self, name: &str, args: &[Arg], line: usize) -> InterpResult<Value> {
        let lower = fold(name);
        if self.builtins.is_builtin(&lower) {
            return self.call_builtin(name, &lower, args, line);
        }
        let Some(def) = self.ctx.functions.get(&lower).cloned() else {
            return Err(RuntimeError::unknown(format!("Call cannot find '{name}'")));
        };
        let mut bound = Vec::with_capacity(args.len());
        for arg in args {
            bound.push((arg.name.clone(), self.eval(&arg.value)?));
        }
        self.invoke(&def, bound, line)
    }

    fn call_builtin(
        &mut self,
        name: &str,
        lower: &str,
        args: &[Arg],
        line: usize,
    ) -> InterpResult<Value> {
        let info = self.builtins.info(lower).cloned();
        let mut slots: Vec<Option<Value>> = Vec::with_capacity(args.len());
        let mut next = 0;
        for arg in args {
            let value = self.eval(&arg.value)?;
            let idx = match (&arg.name, &info) {
                (Some(param), Some(info)) => info.param_index(param).ok_or_else(|| {
                    RuntimeError::unknown(format!(
                        "Call to [{}] has no parameter named '{param}'",
                        info.name
                    ))
                })?,
                _ => {
                    next += 1;
                    next - 1
                }
            };
            if slots.len() <= idx {
                slots.resize(idx + 1, None);
            }
            slots[idx] = Some(value);
        }
        let values: Vec<Value> = slots.into_iter().map(Option::unwrap_or_default).collect();
        let values = self.builtins.coerce(lower, values)?;
        self.with_frame(line, FrameKind::Builtin, format!("Call {name}"), |this| {
            this.builtins.call(lower, &values).map_err(|e| {
                let message = format!("Call Builtin -> {}", e.message);
                e.with_message(message)
            })
        })
    }

    /// Run a declared function with evaluated arguments. `args` pairs each
    /// value with the parameter name it was passed by, if any.
    pub(crate) fn invoke(
        &mut self,
        def: &FnDef,
        args: Vec<(Option<String>, Value)>,
        line: usize,
    ) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.invoke_inner(def, args, line))
    }

    fn invoke_inner(
        &mut self,
        def: &FnDef,
        args: Vec<(Option<String>, Value)>,
        line: usize,
    ) -> InterpResult<Value> {
        if self.ctx.recursion_depth >= self.config.max_recursion_depth {
            return Err(RuntimeError::stack_overflow().at_line(line));
        }
        self.ctx.recursion_depth += 1;
        self.ctx.next_call_id += 1;
        let call_id = self.ctx.next_call_id;
        self.ctx.function_stack.push(call_id);
        debug!(
            function = %def.name,
            call_id,
            depth = self.ctx.recursion_depth,
            "call"
        );

        let result = self.with_frame(line, FrameKind::Block, format!("Block {}", def.name), |this| {
            this.with_scope(|this| {
                this.bind_params(def, args)?;
                this.exec_stmts(&def.body)
            })
        });

        self.ctx.function_stack.pop();
        self.ctx.recursion_depth -= 1;

        let value = match result? {
            Flow::Return { value, owner } if owner == Some(call_id) => value,
            _ => Value::Null,
        };
        self.check_return(def, value).map_err(|e| e.at_line(line))
    }

    /// Bind by name first, then by position, then the default expression
    fn bind_params(&mut self, def: &FnDef, args: Vec<(Option<String>, Value)>) -> InterpResult<()> {
        let mut named: Vec<(String, Value)> = Vec::new();
        let mut positional: Vec<Value> = Vec::new();
        for (name, value) in args {
            match name {
                Some(name) => named.push((fold(&name), value)),
                None => positional.push(value),
            }
        }
        if positional.len() > def.params.len() {
            return Err(RuntimeError::invalid(format!(
                "Call to [{}] expects at most {} arguments but got {}",
                def.name,
                def.params.len(),
                positional.len()
            )));
        }
        if let Some((unknown, _)) = named
            .iter()
            .find(|(n, _)| !def.params.iter().any(|p| fold(&p.name) == *n))
        {
            return Err(RuntimeError::unknown(format!(
                "Call to [{}] has no parameter named '{unknown}'",
                def.name
            )));
        }

        let mut positional = positional.into_iter();
        for param in &def.params {
            let pname = fold(&param.name);
            let by_position = positional.next();
            let supplied = match named.iter().position(|(n, _)| *n == pname) {
                Some(i) => Some(named.swap_remove(i).1),
                None => by_position,
            };
            let value = match (supplied, &param.default) {
                (Some(v), _) => v,
                (None, Some(default)) => self.eval(default)?,
                (None, None) => Value::Null,
            };
            let (value, meta) = self.coerce_param(def, param, value)?;
            self.ctx.env.define(
                pname,
                Binding {
                    value,
                    is_const: false,
                    meta,
                },
            );
        }
        Ok(())
    }

    fn coerce_param(
        &self,
        def: &FnDef,
        param: &Param,
        value: Value,
    ) -> InterpResult<(Value, Option<super::TypeMeta>)> {
        let Some(ty) = &param.ty else {
            return Ok((value, None));
        };
        let resolved = self.ctx.typedefs.resolve(ty)?;
        let wrong_type = |found: &str| {
            RuntimeError::type_mismatch(format!(
                "Call to [{}] parameter [{}:{ty}] wrong type, expected {ty} but found {found}",
                def.name, param.name
            ))
        };
        let value = match &resolved.ty {
            ResolvedType::Record(rt) => super::props::conform_record(rt, value, &param.name)?,
            ResolvedType::Simple(DataType::Json | DataType::Any) => value,
            other => {
                let dt = other.data_type();
                if dt.is_data_type(&value) {
                    value
                } else {
                    let found = value.type_name();
                    let converted = dt.convert(value).map_err(|_| wrong_type(found))?;
                    if !dt.is_data_type(&converted) {
                        return Err(wrong_type(found));
                    }
                    converted
                }
            }
        };
        Ok((value, resolved.meta()))
    }

    /// Enforce the declared return type; null always passes
    fn check_return(&self, def: &FnDef, value: Value) -> InterpResult<Value> {
        let Some(ty) = &def.return_type else {
            return Ok(value);
        };
        if value.is_null() {
            return Ok(value);
        }
        let resolved = self.ctx.typedefs.resolve(ty)?;
        let ok = match &resolved.ty {
            ResolvedType::Record(rt) => rt.validate_value(&value).is_ok(),
            other => other.data_type().accepts(&value),
        };
        if !ok {
            return Err(RuntimeError::type_mismatch(format!(
                "Return value '{value}' not correct type : {ty} in {}",
                def.name
            )));
        }
        match &resolved.ty {
            ResolvedType::Simple(dt) if dt.is_numeric() => Ok(dt.convert(value)?),
            _ => Ok(value),
        }
    }
}
